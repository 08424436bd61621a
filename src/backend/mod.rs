//! Backend module for talking to the curve tracer
//!
//! This module handles all serial communication in a separate thread to keep
//! the UI responsive. It uses crossbeam channels for thread-safe communication
//! with the frontend.
//!
//! # Architecture
//!
//! The backend runs in a separate thread from the UI, communicating via channels:
//!
//! - [`BackendCommand`] - Messages sent from UI to backend (connect, mode, pause, etc.)
//! - [`BackendMessage`] - Messages sent from backend to UI (curves, status, errors)
//! - [`FrontendReceiver`] - UI-side handle for sending commands and receiving messages
//! - [`CurveBackend`] - Main backend entry point that runs the worker loop
//!
//! # Components
//!
//! - [`SerialTransport`] - Byte-stream seam, with [`SerialPortTransport`] for hardware
//!   and [`MockCurveTracer`] for tests and the simulated instrument
//! - [`protocol`] - Frame geometry, decoding and encoding
//! - [`Acquisition`] - One command/frame exchange with all-or-nothing storage
//! - [`AcquisitionWorker`] - Timer-driven acquisition loop
//! - [`discovery`] - Port listing and instrument auto-discovery
//!
//! # Example
//!
//! ```ignore
//! use curvebug_rs::backend::{BackendMessage, CurveBackend};
//! use curvebug_rs::config::AppConfig;
//!
//! let config = AppConfig::default();
//! let (backend, frontend) = CurveBackend::new(config.device.clone());
//!
//! // Spawn backend thread
//! std::thread::spawn(move || backend.run());
//!
//! // Receive messages
//! for msg in frontend.drain() {
//!     if let BackendMessage::Curves { frame, curves } = msg {
//!         // Replace the displayed model wholesale
//!     }
//! }
//! ```

pub mod acquisition;
pub mod discovery;
pub mod mock_device;
pub mod protocol;
pub mod serial;
pub mod transport;
pub mod worker;

pub use acquisition::{Acquisition, FrameStats, DEFAULT_FRAME_TIMEOUT};
pub use discovery::{find_curve_tracer, list_ports, PortInfo};
pub use mock_device::{MockCurveTracer, MockDut};
pub use serial::SerialPortTransport;
pub use transport::SerialTransport;
pub use worker::{AcquisitionTimer, AcquisitionWorker};

use crate::config::DeviceConfig;
use crate::curve::CurveData;
use crate::types::{AcquisitionStats, ConnectionStatus, ExcitationMode};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Message sent from the UI to the backend
#[derive(Debug, Clone)]
pub enum BackendCommand {
    /// (Re)open a port
    Connect {
        /// Device path or COM name
        port: String,
        /// Requested baud rate
        baud_rate: u32,
    },
    /// Replace the device settings and reopen the port
    Reconfigure(Box<DeviceConfig>),
    /// Close the port
    Disconnect,
    /// Change the excitation policy
    SetExcitationMode(ExcitationMode),
    /// Suspend or resume acquisitions
    SetPaused(bool),
    /// Request a port list refresh
    RefreshPorts,
    /// Request current statistics
    RequestStats,
    /// Shutdown the backend
    Shutdown,
    /// Use the simulated instrument instead of hardware
    #[cfg(feature = "mock-device")]
    UseMockDevice(bool),
}

/// Message sent from the backend to the UI
#[derive(Debug, Clone)]
pub enum BackendMessage {
    /// Connection status changed
    ConnectionStatus(ConnectionStatus),
    /// Opening the port failed
    ConnectionError(String),
    /// A complete model after a successful acquisition
    Curves {
        /// Successful acquisitions so far
        frame: u64,
        /// Snapshot of every buffer
        curves: Box<CurveData>,
    },
    /// Statistics update
    Stats(AcquisitionStats),
    /// Port list update (response to RefreshPorts)
    PortList(Vec<PortInfo>),
    /// Backend is shutting down
    Shutdown,
}

/// Frontend receiver for backend messages
pub struct FrontendReceiver {
    /// Receiver for backend messages
    pub receiver: Receiver<BackendMessage>,
    /// Sender for commands to the backend
    pub command_sender: Sender<BackendCommand>,
}

impl FrontendReceiver {
    /// Try to receive a message without blocking
    pub fn try_recv(&self) -> Option<BackendMessage> {
        self.receiver.try_recv().ok()
    }

    /// Receive all pending messages
    pub fn drain(&self) -> Vec<BackendMessage> {
        self.receiver.try_iter().collect()
    }

    /// Send a command to the backend
    pub fn send_command(&self, cmd: BackendCommand) -> bool {
        self.command_sender.send(cmd).is_ok()
    }

    /// Request (re)connection
    pub fn connect(&self, port: String, baud_rate: u32) {
        let _ = self
            .command_sender
            .send(BackendCommand::Connect { port, baud_rate });
    }

    /// Apply new device settings and reconnect
    pub fn reconfigure(&self, config: DeviceConfig) {
        let _ = self
            .command_sender
            .send(BackendCommand::Reconfigure(Box::new(config)));
    }

    /// Request disconnection
    pub fn disconnect(&self) {
        let _ = self.command_sender.send(BackendCommand::Disconnect);
    }

    /// Change the excitation policy
    pub fn set_excitation_mode(&self, mode: ExcitationMode) {
        let _ = self
            .command_sender
            .send(BackendCommand::SetExcitationMode(mode));
    }

    /// Suspend or resume acquisitions
    pub fn set_paused(&self, paused: bool) {
        let _ = self.command_sender.send(BackendCommand::SetPaused(paused));
    }

    /// Ask for a fresh port list
    pub fn refresh_ports(&self) {
        let _ = self.command_sender.send(BackendCommand::RefreshPorts);
    }

    /// Set whether to use the simulated instrument
    #[cfg(feature = "mock-device")]
    pub fn use_mock_device(&self, use_mock: bool) {
        let _ = self
            .command_sender
            .send(BackendCommand::UseMockDevice(use_mock));
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        let _ = self.command_sender.send(BackendCommand::Shutdown);
    }
}

/// The acquisition backend that runs in a separate thread
pub struct CurveBackend {
    /// Device configuration
    config: DeviceConfig,
    /// Starting excitation mode
    mode: ExcitationMode,
    /// Transport override (the real serial port when `None`)
    transport: Option<Box<dyn SerialTransport>>,
    /// Receiver for commands from the UI
    command_receiver: Receiver<BackendCommand>,
    /// Sender for messages to the UI
    message_sender: Sender<BackendMessage>,
    /// Running flag
    running: Arc<AtomicBool>,
}

impl CurveBackend {
    /// Create a new backend with communication channels
    pub fn new(config: DeviceConfig) -> (Self, FrontendReceiver) {
        let (cmd_tx, cmd_rx) = bounded(256);
        // Snapshots are ~11 KB each; a short queue is plenty at 20 Hz
        let (msg_tx, msg_rx) = bounded(64);

        let backend = Self {
            config,
            mode: ExcitationMode::default(),
            transport: None,
            command_receiver: cmd_rx,
            message_sender: msg_tx,
            running: Arc::new(AtomicBool::new(true)),
        };

        let frontend = FrontendReceiver {
            receiver: msg_rx,
            command_sender: cmd_tx,
        };

        (backend, frontend)
    }

    /// Use this transport instead of opening a serial port
    pub fn with_transport(mut self, transport: Box<dyn SerialTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Start in this excitation mode
    pub fn with_excitation_mode(mut self, mode: ExcitationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run the backend loop
    pub fn run(self) {
        let mut worker = match self.transport {
            Some(transport) => AcquisitionWorker::with_transport(
                self.config,
                transport,
                self.command_receiver,
                self.message_sender,
                self.running,
            ),
            None => AcquisitionWorker::new(
                self.config,
                self.command_receiver,
                self.message_sender,
                self.running,
            ),
        };
        worker.set_excitation_mode(self.mode);
        worker.run();
    }

    /// Get a handle to stop the backend
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }
}
