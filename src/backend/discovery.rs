//! Serial port enumeration and instrument auto-discovery

use serialport::{SerialPortInfo, SerialPortType};

/// USB vendor ID of the CurveBug
pub const CURVEBUG_USB_VID: u16 = 0x16D0;
/// USB product ID of the CurveBug
pub const CURVEBUG_USB_PID: u16 = 0x13F9;
/// Product string the CurveBug reports
pub const CURVEBUG_PRODUCT_NAME: &str = "CurveBug";

/// Name fragments of USB serial device nodes on Linux and macOS
const USB_NAME_PATTERNS: [&str; 3] = ["ttyUSB", "ttyACM", "cu.usb"];

/// A serial port offered to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Path or COM name passed to `open`
    pub name: String,
    /// Human-readable description, when the OS provides one
    pub description: Option<String>,
    /// Whether the port identifies itself as a CurveBug
    pub is_curve_tracer: bool,
}

impl std::fmt::Display for PortInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(desc) => write!(f, "{} ({})", self.name, desc),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Whether a device name looks like a USB serial adapter
pub fn is_usb_serial_name(name: &str) -> bool {
    USB_NAME_PATTERNS.iter().any(|p| name.contains(p))
}

fn describe(info: &SerialPortInfo) -> PortInfo {
    match &info.port_type {
        SerialPortType::UsbPort(usb) => {
            let product_matches = usb
                .product
                .as_deref()
                .is_some_and(|p| p.contains(CURVEBUG_PRODUCT_NAME));
            let description = match (&usb.manufacturer, &usb.product) {
                (Some(m), Some(p)) => Some(format!("{} {}", m, p)),
                (None, Some(p)) => Some(p.clone()),
                (Some(m), None) => Some(m.clone()),
                (None, None) => Some(format!("USB {:04X}:{:04X}", usb.vid, usb.pid)),
            };
            PortInfo {
                name: info.port_name.clone(),
                description,
                is_curve_tracer: (usb.vid == CURVEBUG_USB_VID && usb.pid == CURVEBUG_USB_PID)
                    || product_matches,
            }
        }
        _ => PortInfo {
            name: info.port_name.clone(),
            description: None,
            is_curve_tracer: false,
        },
    }
}

/// Keep USB serial ports, plus anything whose name looks like one
pub fn filter_ports(ports: &[SerialPortInfo]) -> Vec<PortInfo> {
    ports
        .iter()
        .filter(|p| {
            matches!(p.port_type, SerialPortType::UsbPort(_)) || is_usb_serial_name(&p.port_name)
        })
        .map(describe)
        .collect()
}

/// Pick the instrument from a port list: an identified CurveBug first,
/// otherwise the first USB serial port
pub fn select_curve_tracer(ports: &[PortInfo]) -> Option<&PortInfo> {
    ports
        .iter()
        .find(|p| p.is_curve_tracer)
        .or_else(|| ports.first())
}

/// List candidate ports on this machine
pub fn list_ports() -> Vec<PortInfo> {
    match serialport::available_ports() {
        Ok(ports) => filter_ports(&ports),
        Err(e) => {
            tracing::warn!("Failed to enumerate serial ports: {}", e);
            Vec::new()
        }
    }
}

/// Find the port the instrument is most likely attached to
pub fn find_curve_tracer() -> Option<String> {
    let ports = list_ports();
    let found = select_curve_tracer(&ports).map(|p| p.name.clone());
    match &found {
        Some(name) => tracing::info!("Auto-discovered curve tracer on {}", name),
        None => tracing::info!("No curve tracer found"),
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::UsbPortInfo;

    fn usb(name: &str, vid: u16, pid: u16, product: Option<&str>) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid,
                pid,
                serial_number: None,
                manufacturer: None,
                product: product.map(str::to_string),
            }),
        }
    }

    fn plain(name: &str) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::Unknown,
        }
    }

    #[test]
    fn test_usb_name_patterns() {
        assert!(is_usb_serial_name("/dev/ttyUSB0"));
        assert!(is_usb_serial_name("/dev/ttyACM3"));
        assert!(is_usb_serial_name("/dev/cu.usbmodem1101"));
        assert!(!is_usb_serial_name("/dev/ttyS0"));
    }

    #[test]
    fn test_filter_keeps_usb_ports() {
        let ports = vec![plain("/dev/ttyS0"), plain("/dev/ttyACM0"), usb("COM7", 0x0403, 0x6001, None)];
        let filtered = filter_ports(&ports);
        let names: Vec<_> = filtered.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["/dev/ttyACM0", "COM7"]);
        assert!(filtered.iter().all(|p| !p.is_curve_tracer));
    }

    #[test]
    fn test_identifies_by_vid_pid() {
        let ports = filter_ports(&[
            usb("COM3", 0x0403, 0x6001, None),
            usb("COM4", CURVEBUG_USB_VID, CURVEBUG_USB_PID, None),
        ]);
        assert_eq!(select_curve_tracer(&ports).map(|p| p.name.as_str()), Some("COM4"));
    }

    #[test]
    fn test_identifies_by_product_name() {
        let ports = filter_ports(&[
            plain("/dev/ttyUSB0"),
            usb("/dev/ttyACM1", 0x1234, 0x5678, Some("CurveBug Tracer")),
        ]);
        let found = select_curve_tracer(&ports).unwrap();
        assert_eq!(found.name, "/dev/ttyACM1");
        assert_eq!(found.to_string(), "/dev/ttyACM1 (CurveBug Tracer)");
    }

    #[test]
    fn test_falls_back_to_first_port() {
        let ports = filter_ports(&[plain("/dev/ttyUSB2"), plain("/dev/ttyUSB3")]);
        assert_eq!(select_curve_tracer(&ports).unwrap().name, "/dev/ttyUSB2");
        assert!(select_curve_tracer(&[]).is_none());
    }
}
