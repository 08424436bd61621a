//! Core types shared between the acquisition backend and the UI
//!
//! # Main Types
//!
//! - [`ExcitationMode`] - Operator-selected drive policy (standard, weak, alternating)
//! - [`Excitation`] - The drive strength a single acquisition actually used
//! - [`Channel`] - One of the instrument's two measurement channels
//! - [`ConnectionStatus`] - Serial link state shown in the status bar
//! - [`AcquisitionStats`] - Frame timing and success counters sent to the UI

use serde::{Deserialize, Serialize};

/// Drive strength of a single acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Excitation {
    /// 4.7 kΩ reference resistor, command byte `T`
    #[default]
    Standard,
    /// 100 kΩ reference resistor, command byte `W`
    Weak,
}

impl Excitation {
    /// Command byte that asks the instrument for this excitation
    pub fn command_byte(self) -> u8 {
        match self {
            Excitation::Standard => b'T',
            Excitation::Weak => b'W',
        }
    }

    /// Map a command byte back to its excitation
    pub fn from_command_byte(byte: u8) -> Option<Self> {
        match byte {
            b'T' => Some(Excitation::Standard),
            b'W' => Some(Excitation::Weak),
            _ => None,
        }
    }

    /// Whether this is the weak drive
    pub fn is_weak(self) -> bool {
        self == Excitation::Weak
    }

    /// The other strength
    pub fn other(self) -> Self {
        match self {
            Excitation::Standard => Excitation::Weak,
            Excitation::Weak => Excitation::Standard,
        }
    }
}

/// Excitation policy selected by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExcitationMode {
    /// Always drive with the standard resistor
    #[default]
    Standard,
    /// Always drive with the weak resistor
    Weak,
    /// Alternate weak and standard on successive acquisitions
    Alternating,
}

impl ExcitationMode {
    /// All modes in cycle order
    pub const ALL: [ExcitationMode; 3] = [
        ExcitationMode::Standard,
        ExcitationMode::Weak,
        ExcitationMode::Alternating,
    ];

    /// Next mode in the standard → weak → alternating cycle
    pub fn next(self) -> Self {
        match self {
            ExcitationMode::Standard => ExcitationMode::Weak,
            ExcitationMode::Weak => ExcitationMode::Alternating,
            ExcitationMode::Alternating => ExcitationMode::Standard,
        }
    }

    /// Short label used in the plot header
    pub fn label(self) -> &'static str {
        match self {
            ExcitationMode::Standard => "4.7K(T)",
            ExcitationMode::Weak => "100K WEAK(W)",
            ExcitationMode::Alternating => "ALT",
        }
    }
}

impl std::fmt::Display for ExcitationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Measurement channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// DUT1, black lead
    Ch1,
    /// DUT2, red lead
    Ch2,
}

impl Channel {
    /// Legend text for this channel
    pub fn legend(self) -> &'static str {
        match self {
            Channel::Ch1 => "DUT1 (CH1 - Black Lead)",
            Channel::Ch2 => "DUT2 (CH2 - Red Lead)",
        }
    }
}

/// Connection status of the serial link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Port not open
    #[default]
    Disconnected,
    /// Attempting to open the port
    Connecting,
    /// Port open
    Connected,
    /// Opening the port failed
    Error,
}

impl ConnectionStatus {
    /// Whether the port is usable
    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connecting => write!(f, "Connecting..."),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Error => write!(f, "Error"),
        }
    }
}

/// Statistics about acquisitions, as displayed by the UI
#[derive(Debug, Clone, Default)]
pub struct AcquisitionStats {
    /// Number of complete frames decoded
    pub successful_frames: u64,
    /// Number of failed acquisitions (any cause)
    pub failed_frames: u64,
    /// Failures caused by the read budget expiring
    pub incomplete_frames: u64,
    /// Average frame time in microseconds
    pub avg_frame_time_us: f64,
    /// Effective acquisition rate in Hz
    pub effective_frame_rate: f64,
    /// Total bytes read from the instrument
    pub total_bytes_read: u64,
    /// Snapshots dropped because the UI queue was full
    pub dropped_messages: u64,

    // Latency tracking
    /// Minimum frame time in recent window (microseconds)
    pub min_latency_us: u64,
    /// Maximum frame time in recent window (microseconds)
    pub max_latency_us: u64,
    /// Frame time jitter (max - min) in microseconds
    pub jitter_us: u64,
}

impl AcquisitionStats {
    /// Calculate the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.successful_frames + self.failed_frames;
        if total == 0 {
            100.0
        } else {
            (self.successful_frames as f64 / total as f64) * 100.0
        }
    }
}
