//! serialport-backed transport for the real instrument

use crate::backend::protocol::normalize_baud_rate;
use crate::backend::transport::SerialTransport;
use crate::error::{CurveBugError, Result};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

/// Per-call read timeout used when none is configured
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Serial port transport (8N1, no flow control, DTR asserted)
pub struct SerialPortTransport {
    port: Option<Box<dyn SerialPort>>,
    port_name: Option<String>,
    read_timeout: Duration,
}

impl Default for SerialPortTransport {
    fn default() -> Self {
        Self::new(DEFAULT_READ_TIMEOUT)
    }
}

impl SerialPortTransport {
    /// Create a closed transport with the given per-call read timeout
    pub fn new(read_timeout: Duration) -> Self {
        Self {
            port: None,
            port_name: None,
            read_timeout,
        }
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(CurveBugError::TransportUnavailable)
    }
}

impl SerialTransport for SerialPortTransport {
    fn open(&mut self, path: &str, baud_rate: u32) -> Result<()> {
        self.close();

        let baud_rate = normalize_baud_rate(baud_rate);
        let mut port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.read_timeout)
            .open()?;

        if let Err(e) = port.write_data_terminal_ready(true) {
            tracing::warn!("Could not assert DTR on {}: {}", path, e);
        }

        tracing::info!("Opened {} at {} baud", path, baud_rate);
        self.port = Some(port);
        self.port_name = Some(path.to_string());
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::info!(
                "Closed {}",
                self.port_name.as_deref().unwrap_or("serial port")
            );
        }
        self.port_name = None;
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let port = self.port_mut()?;
        let written = port.write(bytes)?;
        port.flush()?;
        Ok(written)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let port = self.port_mut()?;
        match port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.read_timeout = timeout;
        if let Some(port) = self.port.as_mut() {
            port.set_timeout(timeout)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.port_mut()?.clear(ClearBuffer::All)?;
        Ok(())
    }

    fn port_name(&self) -> Option<String> {
        self.port_name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_transport_refuses_io() {
        let mut port = SerialPortTransport::default();
        assert!(!port.is_open());
        assert!(matches!(port.write(b"T"), Err(CurveBugError::TransportUnavailable)));
        assert!(matches!(
            port.read(&mut [0u8; 8]),
            Err(CurveBugError::TransportUnavailable)
        ));
        assert!(port.flush().is_err());
        assert_eq!(port.port_name(), None);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut port = SerialPortTransport::new(Duration::from_millis(10));
        port.close();
        port.close();
        assert!(!port.is_open());
    }

    #[test]
    fn test_read_timeout_set_while_closed() {
        let mut port = SerialPortTransport::new(Duration::from_millis(50));
        port.set_read_timeout(Duration::from_millis(7)).unwrap();
        assert_eq!(port.read_timeout(), Duration::from_millis(7));
    }

    #[test]
    fn test_failed_open_leaves_port_closed() {
        let mut port = SerialPortTransport::default();
        let result = port.open("/nonexistent/curvebug-test-port", 115_200);
        assert!(result.is_err());
        assert!(!port.is_open());
        assert_eq!(port.port_name(), None);
    }
}
