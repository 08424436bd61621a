//! Error handling for CurveBug
//!
//! This module defines custom error types and a Result alias for use
//! throughout the application.

use thiserror::Error;

/// Main error type for CurveBug operations
#[derive(Error, Debug)]
pub enum CurveBugError {
    /// Operation attempted on a port that is not open
    #[error("Serial port is not open")]
    TransportUnavailable,

    /// The instrument did not deliver a full frame within the read budget
    #[error("Incomplete frame: received {received} of {expected} bytes")]
    FrameIncomplete { received: usize, expected: usize },

    /// Errors opening or configuring the serial port
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unrecognized key name in a key binding
    #[error("Invalid key binding: {0}")]
    KeyBinding(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CurveBugError>,
    },
}

impl CurveBugError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CurveBugError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) is a short frame
    pub fn is_frame_incomplete(&self) -> bool {
        match self {
            CurveBugError::FrameIncomplete { .. } => true,
            CurveBugError::WithContext { source, .. } => source.is_frame_incomplete(),
            _ => false,
        }
    }

    /// Whether this error (or the error it wraps) came from the port itself
    pub fn is_io_failure(&self) -> bool {
        match self {
            CurveBugError::Io(_) | CurveBugError::Serial(_) => true,
            CurveBugError::WithContext { source, .. } => source.is_io_failure(),
            _ => false,
        }
    }
}

/// Result type alias for CurveBug operations
pub type Result<T> = std::result::Result<T, CurveBugError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CurveBugError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
