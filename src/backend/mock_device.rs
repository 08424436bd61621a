//! Simulated curve tracer for testing without hardware
//!
//! [`MockCurveTracer`] implements [`SerialTransport`] and answers `T`/`W`
//! commands with synthetic frames. Builder methods inject the failure modes
//! the acquisition code has to survive: chunked delivery, slow reads,
//! truncated frames, and failed writes.

use crate::backend::protocol::{encode_frame, FRAME_BYTES, MAX_SAMPLES};
use crate::backend::serial::DEFAULT_READ_TIMEOUT;
use crate::backend::transport::SerialTransport;
use crate::error::{CurveBugError, Result};
use crate::types::Excitation;
use std::collections::VecDeque;
use std::f32::consts::TAU;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Port name reported by the simulated instrument
pub const MOCK_PORT_NAME: &str = "mock://curvebug";

/// Drive sweep centre, in raw ADC counts
const DRIVE_CENTER: f32 = 2048.0;
/// Drive sweep amplitude, in raw ADC counts
const DRIVE_AMPLITUDE: f32 = 1800.0;

/// Device-under-test behaviour of one simulated channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockDut {
    /// Nothing connected: the channel follows the drive, no current flows
    Open,
    /// Dead short: the channel sits at the origin
    Short,
    /// Linear load; `ratio` is the fraction of the drive swing seen across it
    Resistor { ratio: f32 },
    /// Forward-biased junction clamping at `knee` counts above the origin
    Diode { knee: f32 },
}

impl MockDut {
    fn respond(self, drive: f32, excitation: Excitation) -> f32 {
        let swing = drive - DRIVE_CENTER;
        let response = match self {
            MockDut::Open => swing,
            MockDut::Short => 0.0,
            MockDut::Resistor { ratio } => swing * ratio,
            MockDut::Diode { knee } => swing.min(knee),
        };
        let raw = match excitation {
            Excitation::Standard => DRIVE_CENTER + response,
            // The weak drive leaves most of the swing across the DUT
            Excitation::Weak => DRIVE_CENTER + swing - (swing - response) * 0.05,
        };
        raw.clamp(0.0, 4095.0)
    }
}

/// Bytes written to the mock, shared so tests can inspect them after the
/// transport has moved into a worker
pub type CommandLog = Arc<Mutex<Vec<u8>>>;

/// Scripted curve tracer
pub struct MockCurveTracer {
    open: bool,
    port_name: Option<String>,
    ch1: MockDut,
    ch2: MockDut,
    pending: VecDeque<u8>,
    chunk_size: usize,
    read_delay: Duration,
    read_timeout: Duration,
    truncate_to: Option<usize>,
    fail_writes: bool,
    fail_open: bool,
    command_log: CommandLog,
}

impl Default for MockCurveTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCurveTracer {
    /// Closed mock with a diode on channel 1 and a resistor on channel 2
    pub fn new() -> Self {
        Self {
            open: false,
            port_name: None,
            ch1: MockDut::Diode { knee: 300.0 },
            ch2: MockDut::Resistor { ratio: 0.5 },
            pending: VecDeque::with_capacity(FRAME_BYTES),
            chunk_size: 64,
            read_delay: Duration::ZERO,
            read_timeout: DEFAULT_READ_TIMEOUT,
            truncate_to: None,
            fail_writes: false,
            fail_open: false,
            command_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Mock that is already open
    pub fn connected() -> Self {
        let mut mock = Self::new();
        mock.open = true;
        mock.port_name = Some(MOCK_PORT_NAME.to_string());
        mock
    }

    /// Set the simulated devices on both channels
    pub fn with_duts(mut self, ch1: MockDut, ch2: MockDut) -> Self {
        self.ch1 = ch1;
        self.ch2 = ch2;
        self
    }

    /// Deliver at most `chunk_size` bytes per read
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Sleep this long on every read
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// Per-call read timeout; a read whose delay exceeds it returns nothing
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Only ever deliver the first `bytes` bytes of each frame
    pub fn with_truncated_frames(mut self, bytes: usize) -> Self {
        self.truncate_to = Some(bytes.min(FRAME_BYTES));
        self
    }

    /// Make every write fail
    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Make every open fail
    pub fn with_failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Share the command log with the caller
    pub fn command_log(&self) -> CommandLog {
        Arc::clone(&self.command_log)
    }

    /// Raw `(drive, ch1, ch2)` triplets the mock answers `excitation` with
    pub fn triplets(&self, excitation: Excitation) -> Vec<(u16, u16, u16)> {
        (0..MAX_SAMPLES)
            .map(|i| {
                let phase = TAU * i as f32 / MAX_SAMPLES as f32;
                let drive = DRIVE_CENTER + DRIVE_AMPLITUDE * phase.sin();
                (
                    drive.round() as u16,
                    self.ch1.respond(drive, excitation).round() as u16,
                    self.ch2.respond(drive, excitation).round() as u16,
                )
            })
            .collect()
    }

    fn queue_frame(&mut self, excitation: Excitation) {
        let frame = encode_frame(&self.triplets(excitation));
        let len = self.truncate_to.unwrap_or(FRAME_BYTES);
        self.pending.clear();
        self.pending.extend(frame[..len].iter().copied());
    }
}

impl SerialTransport for MockCurveTracer {
    fn open(&mut self, path: &str, _baud_rate: u32) -> Result<()> {
        self.close();
        if self.fail_open {
            return Err(CurveBugError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such device: {}", path),
            )));
        }
        self.open = true;
        self.port_name = Some(path.to_string());
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.port_name = None;
        self.pending.clear();
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        if !self.open {
            return Err(CurveBugError::TransportUnavailable);
        }
        if self.fail_writes {
            return Err(CurveBugError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "simulated write failure",
            )));
        }

        if let Ok(mut log) = self.command_log.lock() {
            log.extend_from_slice(bytes);
        }
        for &byte in bytes {
            if let Some(excitation) = Excitation::from_command_byte(byte) {
                self.queue_frame(excitation);
            }
        }
        Ok(bytes.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.open {
            return Err(CurveBugError::TransportUnavailable);
        }
        let wait = if !self.read_delay.is_zero() {
            self.read_delay
        } else if self.pending.is_empty() {
            // Nothing queued: behave like a short timed-out poll
            Duration::from_millis(1)
        } else {
            Duration::ZERO
        };
        if wait > self.read_timeout {
            std::thread::sleep(self.read_timeout);
            return Ok(0);
        }
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }

        let n = buf.len().min(self.chunk_size).min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.read_timeout = timeout;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if !self.open {
            return Err(CurveBugError::TransportUnavailable);
        }
        self.pending.clear();
        Ok(())
    }

    fn port_name(&self) -> Option<String> {
        self.port_name.clone()
    }
}
