//! Backend Worker Thread Implementation
//!
//! This module contains the acquisition loop that runs in a separate thread
//! and owns the serial port. It communicates with the UI thread through
//! crossbeam channels.
//!
//! # Responsibilities
//!
//! - **Command processing**: connect, disconnect, excitation mode, pause
//! - **Acquisition**: fires one [`Acquisition::acquire`] per timer period
//! - **Publishing**: sends a complete [`CurveData`] snapshot after each success
//! - **Statistics tracking**: frame timing and success rates
//!
//! # Timer
//!
//! Elapsed time accumulates every loop iteration. Once it reaches the
//! acquisition interval and the worker is not paused, one acquisition is
//! attempted and the accumulator resets whether or not it succeeded. A failed
//! acquisition is simply retried on the next period.

use crate::backend::acquisition::Acquisition;
use crate::backend::discovery;
use crate::backend::serial::SerialPortTransport;
use crate::backend::transport::SerialTransport;
use crate::backend::{BackendCommand, BackendMessage};
use crate::config::DeviceConfig;
use crate::curve::CurveData;
use crate::types::{AcquisitionStats, ConnectionStatus, ExcitationMode};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "mock-device")]
use crate::backend::mock_device::{MockCurveTracer, MOCK_PORT_NAME};

/// How often statistics are pushed to the UI
const STATS_INTERVAL: Duration = Duration::from_millis(500);

/// Loop period when nothing else bounds the loop
const IDLE_SLEEP: Duration = Duration::from_millis(5);

/// Software timer that gates acquisitions
#[derive(Debug, Clone)]
pub struct AcquisitionTimer {
    interval: Duration,
    accumulated: Duration,
}

impl AcquisitionTimer {
    /// Create a timer firing every `interval`
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            accumulated: Duration::ZERO,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Add elapsed time
    pub fn advance(&mut self, dt: Duration) {
        self.accumulated = self.accumulated.saturating_add(dt);
    }

    /// Whether enough time has accumulated
    pub fn ready(&self) -> bool {
        self.accumulated >= self.interval
    }

    /// Start a new period
    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
    }

    /// Time left until the timer is ready
    pub fn remaining(&self) -> Duration {
        self.interval.saturating_sub(self.accumulated)
    }
}

/// The backend worker that runs the acquisition loop
pub struct AcquisitionWorker {
    /// Device configuration
    config: DeviceConfig,
    /// Command receiver from the UI
    command_rx: Receiver<BackendCommand>,
    /// Message sender to the UI
    message_tx: Sender<BackendMessage>,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Serial link (real or simulated)
    transport: Box<dyn SerialTransport>,
    /// Whether currently using the simulated instrument
    #[cfg(feature = "mock-device")]
    is_mock_device: bool,
    /// Frame protocol state and statistics
    acquisition: Acquisition,
    /// Authoritative curve model
    curves: CurveData,
    /// Current connection status
    connection_status: ConnectionStatus,
    /// Whether acquisitions are suspended
    paused: bool,
    /// Number of successful acquisitions
    frame_count: u64,
    /// Acquisition gate
    timer: AcquisitionTimer,
    /// Last loop iteration, for timer accumulation
    last_tick: Instant,
    /// Start of the current statistics period
    stats_started: Instant,
    /// Frames at the start of the current statistics period
    stats_frames_at_start: u64,
    /// Last time stats were sent to UI
    last_stats_time: Instant,
    /// Snapshots dropped due to backpressure
    dropped_messages: u64,
}

impl AcquisitionWorker {
    /// Create a worker using the real serial port
    pub fn new(
        config: DeviceConfig,
        command_rx: Receiver<BackendCommand>,
        message_tx: Sender<BackendMessage>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let transport = Box::new(SerialPortTransport::new(config.read_timeout()));
        Self::with_transport(config, transport, command_rx, message_tx, running)
    }

    /// Create a worker around an existing transport
    pub fn with_transport(
        config: DeviceConfig,
        transport: Box<dyn SerialTransport>,
        command_rx: Receiver<BackendCommand>,
        message_tx: Sender<BackendMessage>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let now = Instant::now();
        Self {
            acquisition: Acquisition::new(config.frame_timeout()),
            timer: AcquisitionTimer::new(config.acquire_interval()),
            config,
            command_rx,
            message_tx,
            running,
            transport,
            #[cfg(feature = "mock-device")]
            is_mock_device: false,
            curves: CurveData::new(),
            connection_status: ConnectionStatus::Disconnected,
            paused: false,
            frame_count: 0,
            last_tick: now,
            stats_started: now,
            stats_frames_at_start: 0,
            last_stats_time: now,
            dropped_messages: 0,
        }
    }

    /// Set the starting excitation mode
    pub fn set_excitation_mode(&mut self, mode: ExcitationMode) {
        self.curves.set_mode(mode);
    }

    /// Run the main worker loop
    pub fn run(&mut self) {
        tracing::info!("Acquisition worker started");

        if self.transport.is_open() {
            self.update_connection_status(ConnectionStatus::Connected);
        } else {
            self.connect_configured_port();
        }

        while self.running.load(Ordering::SeqCst) {
            self.process_commands();
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            self.tick();

            if self.last_stats_time.elapsed() >= STATS_INTERVAL {
                self.send_stats();
            }

            self.rate_limit();
        }

        self.transport.close();
        let _ = self.message_tx.send(BackendMessage::Shutdown);
        tracing::info!("Acquisition worker stopped");
    }

    /// Advance the timer and acquire if it fired
    fn tick(&mut self) {
        let now = Instant::now();
        self.timer.advance(now.duration_since(self.last_tick));
        self.last_tick = now;

        if !self.paused && self.timer.ready() {
            self.acquire_once();
            self.timer.reset();
        }
    }

    /// Perform one acquisition and publish the result
    fn acquire_once(&mut self) -> bool {
        match self
            .acquisition
            .acquire(self.transport.as_mut(), &mut self.curves)
        {
            Ok(_) => {
                if self.connection_status == ConnectionStatus::Error {
                    tracing::info!("Instrument responding again");
                    self.update_connection_status(ConnectionStatus::Connected);
                }
                self.frame_count += 1;
                self.try_send_message(BackendMessage::Curves {
                    frame: self.frame_count,
                    curves: Box::new(self.curves.clone()),
                });
                true
            }
            Err(e) if e.is_io_failure() && self.connection_status == ConnectionStatus::Connected => {
                let error_msg = format!("Acquisition failed: {}", e);
                tracing::warn!("{}", error_msg);
                self.update_connection_status(ConnectionStatus::Error);
                let _ = self
                    .message_tx
                    .send(BackendMessage::ConnectionError(error_msg));
                false
            }
            Err(e) => {
                tracing::debug!("Acquisition failed: {}", e);
                false
            }
        }
    }

    /// Process pending commands from the UI
    fn process_commands(&mut self) {
        loop {
            match self.command_rx.try_recv() {
                Ok(cmd) => self.handle_command(cmd),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
    }

    /// Handle a single command
    fn handle_command(&mut self, cmd: BackendCommand) {
        match cmd {
            BackendCommand::Connect { port, baud_rate } => {
                self.config.serial_port = port;
                self.config.baud_rate = baud_rate;
                self.handle_connect();
            }
            BackendCommand::Reconfigure(config) => {
                self.acquisition.set_frame_timeout(config.frame_timeout());
                if let Err(e) = self.transport.set_read_timeout(config.read_timeout()) {
                    tracing::warn!("Failed to apply read timeout: {}", e);
                }
                self.timer = AcquisitionTimer::new(config.acquire_interval());
                self.config = *config;
                self.transport.close();
                self.handle_connect();
            }
            BackendCommand::Disconnect => {
                self.transport.close();
                self.update_connection_status(ConnectionStatus::Disconnected);
                tracing::info!("Disconnected from instrument");
            }
            BackendCommand::SetExcitationMode(mode) => {
                self.curves.set_mode(mode);
                tracing::debug!("Excitation mode set to {}", mode);
            }
            BackendCommand::SetPaused(paused) => {
                self.paused = paused;
            }
            BackendCommand::RefreshPorts => {
                let _ = self
                    .message_tx
                    .send(BackendMessage::PortList(discovery::list_ports()));
            }
            BackendCommand::RequestStats => {
                self.send_stats();
            }
            BackendCommand::Shutdown => {
                self.running.store(false, Ordering::SeqCst);
            }
            #[cfg(feature = "mock-device")]
            BackendCommand::UseMockDevice(use_mock) => {
                if use_mock == self.is_mock_device {
                    return;
                }
                self.transport.close();
                self.update_connection_status(ConnectionStatus::Disconnected);

                if use_mock {
                    self.transport = Box::new(MockCurveTracer::new());
                    self.config.serial_port = MOCK_PORT_NAME.to_string();
                    tracing::info!("Switched to simulated instrument");
                } else {
                    self.transport = Box::new(SerialPortTransport::new(self.config.read_timeout()));
                    tracing::info!("Switched to serial instrument");
                }
                self.is_mock_device = use_mock;
                self.handle_connect();
            }
        }
    }

    /// Open the configured port, falling back to auto-discovery when enabled
    fn connect_configured_port(&mut self) {
        if self.handle_connect() || !self.config.auto_discover {
            return;
        }

        if let Some(port) = discovery::find_curve_tracer() {
            if port != self.config.serial_port {
                self.config.serial_port = port;
                self.handle_connect();
            }
        }
    }

    /// (Re)open the port named in the config
    fn handle_connect(&mut self) -> bool {
        self.update_connection_status(ConnectionStatus::Connecting);

        let port = self.config.serial_port.clone();
        match self.transport.open(&port, self.config.baud_rate) {
            Ok(()) => {
                self.update_connection_status(ConnectionStatus::Connected);
                tracing::info!("Connected to instrument on {}", port);
                true
            }
            Err(e) => {
                self.update_connection_status(ConnectionStatus::Error);
                let error_msg = format!("Failed to open {}: {}", port, e);
                tracing::warn!("{}", error_msg);
                let _ = self
                    .message_tx
                    .send(BackendMessage::ConnectionError(error_msg));
                false
            }
        }
    }

    /// Sleep until the next timer period or command check
    fn rate_limit(&self) {
        let sleep = if self.paused {
            IDLE_SLEEP
        } else {
            self.timer.remaining().min(IDLE_SLEEP)
        };
        if !sleep.is_zero() {
            std::thread::sleep(sleep);
        }
    }

    /// Update connection status and notify UI
    fn update_connection_status(&mut self, status: ConnectionStatus) {
        self.connection_status = status;
        let _ = self
            .message_tx
            .send(BackendMessage::ConnectionStatus(status));
    }

    /// Build the UI-facing statistics
    fn collect_stats(&self) -> AcquisitionStats {
        let frames = self.acquisition.stats();
        let period = self.stats_started.elapsed().as_secs_f64();
        let period_frames = frames.successful_frames - self.stats_frames_at_start;

        AcquisitionStats {
            successful_frames: frames.successful_frames,
            failed_frames: frames.failed_frames,
            incomplete_frames: frames.incomplete_frames,
            avg_frame_time_us: frames.avg_frame_time_us(),
            effective_frame_rate: if period > 0.0 {
                period_frames as f64 / period
            } else {
                0.0
            },
            total_bytes_read: frames.total_bytes_read,
            dropped_messages: self.dropped_messages,
            min_latency_us: frames.recent_min_us(),
            max_latency_us: frames.recent_max_us(),
            jitter_us: frames.jitter_us(),
        }
    }

    /// Send statistics to UI (using try_send for backpressure)
    fn send_stats(&mut self) {
        let stats = self.collect_stats();
        self.try_send_message(BackendMessage::Stats(stats));

        self.stats_started = Instant::now();
        self.stats_frames_at_start = self.acquisition.stats().successful_frames;
        self.last_stats_time = Instant::now();
    }

    /// Try to send a message without blocking
    ///
    /// If the queue is full, the message is dropped and the dropped_messages
    /// counter is incremented. Snapshots supersede each other, so a dropped
    /// one is never needed later.
    fn try_send_message(&mut self, msg: BackendMessage) {
        if self.message_tx.try_send(msg).is_err() {
            self.dropped_messages += 1;
        }
    }
}
