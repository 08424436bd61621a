//! Configuration module for CurveBug
//!
//! This module handles all configuration-related functionality including:
//!
//! - **Device settings**: Serial port, baud rate, acquisition timing
//! - **Window settings**: Initial window size
//! - **Theme**: The eleven plot colors (see [`theme`])
//! - **Key bindings**: The eight operator shortcuts (see [`keybinds`])
//!
//! # Storage
//!
//! The configuration is stored as JSON in the platform-appropriate data
//! directory under `dev.hxyulin.curvebug-rs`:
//!
//! - **Linux**: `~/.local/share/dev.hxyulin.curvebug-rs/curvebug.json`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.curvebug-rs/curvebug.json`
//! - **Windows**: `%APPDATA%\dev.hxyulin.curvebug-rs\curvebug.json`
//!
//! Every struct is `#[serde(default)]`, so hand-edited files may omit fields.
//!
//! # Submodules
//!
//! - [`theme`] - Color theme with dark/light presets
//! - [`keybinds`] - Key binding names and actions
//! - [`settings`] - Runtime toggles (pause, single channel, settings panel)
//! - [`ui_session`] - View state persisted between launches

pub mod keybinds;
pub mod settings;
pub mod theme;
pub mod ui_session;

pub use keybinds::{Action, KeyBindings};
pub use settings::RuntimeSettings;
pub use theme::{ColorTheme, ThemePreset};
pub use ui_session::UiSession;

use crate::backend::protocol::DEFAULT_BAUD_RATE;
use crate::error::{CurveBugError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier used for the data directory
pub const APP_ID: &str = "dev.hxyulin.curvebug-rs";

/// Configuration filename
pub const CONFIG_FILE: &str = "curvebug.json";

/// Default serial port
pub const DEFAULT_SERIAL_PORT: &str = "COM4";

/// Default acquisition period in milliseconds
pub const DEFAULT_ACQUIRE_INTERVAL_MS: u64 = 50;

/// Default frame read budget in milliseconds
pub const DEFAULT_FRAME_TIMEOUT_MS: u64 = 1000;

/// Default per-call serial read timeout in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 50;

/// Default window edge length in pixels
pub const DEFAULT_WINDOW_SIZE: u32 = 1080;

/// Get the application data directory
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        CurveBugError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            CurveBugError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

/// Serial link and acquisition timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device path or COM name
    pub serial_port: String,
    /// Baud rate (unsupported values fall back to 115200)
    pub baud_rate: u32,
    /// Acquisition period in milliseconds
    pub acquire_interval_ms: u64,
    /// Wall-clock budget for one frame in milliseconds
    pub frame_timeout_ms: u64,
    /// Per-call serial read timeout in milliseconds
    pub read_timeout_ms: u64,
    /// Try auto-discovery when the configured port fails to open
    pub auto_discover: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            serial_port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            acquire_interval_ms: DEFAULT_ACQUIRE_INTERVAL_MS,
            frame_timeout_ms: DEFAULT_FRAME_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            auto_discover: false,
        }
    }
}

impl DeviceConfig {
    pub fn acquire_interval(&self) -> Duration {
        Duration::from_millis(self.acquire_interval_ms)
    }

    pub fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_timeout_ms)
    }

    /// Per-call read timeout, never longer than the frame budget
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.clamp(1, self.frame_timeout_ms.max(1)))
    }
}

/// Initial window geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WINDOW_SIZE,
            height: DEFAULT_WINDOW_SIZE,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Serial link settings
    pub device: DeviceConfig,
    /// Window settings
    pub window: WindowConfig,
    /// Plot colors
    pub theme: ColorTheme,
    /// Operator shortcuts
    pub keybinds: KeyBindings,
}

impl AppConfig {
    /// Check values that would break the UI or the backend
    pub fn validate(&self) -> Result<()> {
        if self.device.serial_port.trim().is_empty() {
            return Err(CurveBugError::Config("Serial port must not be empty".to_string()));
        }
        if self.window.width < 400 || self.window.height < 400 {
            return Err(CurveBugError::Config(format!(
                "Window size {}x{} is too small (minimum 400x400)",
                self.window.width, self.window.height
            )));
        }
        self.keybinds.validate()
    }

    /// Load configuration from a file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CurveBugError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            CurveBugError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CurveBugError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| CurveBugError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            CurveBugError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Load configuration from the default location.
    ///
    /// A missing file is not an error; it yields defaults.
    pub fn load() -> Result<Self> {
        let path = config_path().ok_or_else(|| {
            CurveBugError::Config("Could not determine config path".to_string())
        })?;

        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    /// Load configuration, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(dir.join(CONFIG_FILE))?;
        tracing::info!("Saved configuration to {:?}", dir.join(CONFIG_FILE));
        Ok(())
    }
}
