//! SerialTransport trait for the instrument link
//!
//! This module provides a common trait for byte-stream transports, enabling
//! both the real serial port (via the serialport crate) and the simulated
//! instrument used in tests.
//!
//! Contract shared by every implementation:
//!
//! - A failed [`SerialTransport::open`] leaves the transport closed.
//! - On a closed transport, `write`, `read` and `flush` fail with
//!   [`CurveBugError::TransportUnavailable`](crate::error::CurveBugError::TransportUnavailable)
//!   and perform no I/O.
//! - [`SerialTransport::read`] never blocks indefinitely. A per-call timeout
//!   bounds each attempt and a timeout reads as `Ok(0)`.
//! - [`SerialTransport::set_read_timeout`] takes effect on the next `read`,
//!   whether or not the transport is open.
//! - [`SerialTransport::close`] is idempotent.

use crate::error::Result;
use std::time::Duration;

/// Unified interface for the instrument's byte stream
///
/// Implementations must be `Send` so the acquisition worker can own them.
///
/// # Example
///
/// ```ignore
/// fn ping(port: &mut dyn SerialTransport) -> Result<usize> {
///     port.flush()?;
///     port.write(b"T")
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait SerialTransport: Send {
    /// Open `path` at `baud_rate`. Unsupported rates fall back to 115200.
    fn open(&mut self, path: &str, baud_rate: u32) -> Result<()>;

    /// Release the handle
    fn close(&mut self);

    /// Check if the handle is open
    fn is_open(&self) -> bool;

    /// Write bytes, returning how many were accepted
    fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Read up to `buf.len()` bytes; `Ok(0)` when nothing arrived in time
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Current per-call read timeout
    fn read_timeout(&self) -> Duration;

    /// Change the per-call read timeout
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Discard queued input and output
    fn flush(&mut self) -> Result<()>;

    /// Name of the open port, if any
    fn port_name(&self) -> Option<String>;
}
