//! # CurveBug-RS: I-V curve tracer front end
//!
//! Drives a CurveBug curve tracer over a serial link and plots the
//! current/voltage characteristics of two devices under test in real time.
//! The serial backend runs on its own thread, separate from the UI.
//!
//! ## Architecture
//!
//! - **Backend**: Sends `T`/`W` excitation commands, reads 2016-byte frames
//!   and decodes them into curve snapshots (see [`backend`])
//! - **Curve model**: Standard and weak buffers for both channels with the
//!   excitation bookkeeping (see [`curve`])
//! - **Frontend**: eframe/egui window with the plot transform engine, status
//!   bar and settings panel (see [`frontend`])
//! - **Communication**: Crossbeam channels for thread-safe data transfer
//!
//! ## Configuration
//!
//! Configuration and UI session state are stored in the platform-appropriate
//! data directory under `dev.hxyulin.curvebug-rs`:
//!
//! - **Linux**: `~/.local/share/dev.hxyulin.curvebug-rs/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.curvebug-rs/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.curvebug-rs\`
//!
//! ## Example
//!
//! ```ignore
//! use curvebug_rs::{backend::CurveBackend, config::{AppConfig, UiSession}, frontend::CurveBugApp};
//!
//! fn main() -> eframe::Result<()> {
//!     let config = AppConfig::load_or_default();
//!     let session = UiSession::load();
//!
//!     let (backend, frontend) = CurveBackend::new(config.device.clone());
//!     std::thread::spawn(move || backend.run());
//!
//!     eframe::run_native(
//!         "CurveBug",
//!         eframe::NativeOptions::default(),
//!         Box::new(|cc| Ok(Box::new(CurveBugApp::new(cc, frontend, config, session)))),
//!     )
//! }
//! ```

pub mod backend;
pub mod config;
pub mod curve;
pub mod error;
pub mod frontend;
pub mod types;

// Re-export commonly used types
pub use backend::{Acquisition, BackendCommand, BackendMessage, CurveBackend, SerialTransport};
pub use config::AppConfig;
pub use curve::{ChannelData, CurveData};
pub use error::{CurveBugError, Result};
pub use frontend::{CurveBugApp, PlotView};
pub use types::{Channel, Excitation, ExcitationMode};
