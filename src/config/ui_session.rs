//! UI session state persistence
//!
//! The view toggles the operator had on when the app last closed. Saved
//! automatically on exit to `app_data_dir()/ui_session.json`; a missing or
//! unreadable file just means defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{app_data_dir, ensure_app_data_dir};
use crate::error::{CurveBugError, Result};
use crate::types::ExcitationMode;

/// UI session state filename
pub const UI_SESSION_FILE: &str = "ui_session.json";

/// UI session state persisted between app launches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSession {
    /// Excitation policy
    pub mode: ExcitationMode,
    /// Channel 2 hidden
    pub single_channel: bool,
    /// Auto-scale enabled
    pub auto_scale: bool,
}

impl UiSession {
    /// Load UI session state from default location
    pub fn load() -> Self {
        match app_data_dir().map(|p| p.join(UI_SESSION_FILE)) {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Self::default(),
        }
    }

    /// Load from a specific file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to read UI session {:?}: {}, using defaults", path, e);
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => {
                tracing::info!("Loaded UI session state from {:?}", path);
                state
            }
            Err(e) => {
                tracing::warn!("Failed to parse UI session state: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save UI session state to default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(&dir.join(UI_SESSION_FILE))
    }

    /// Save to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| CurveBugError::Config(format!("Failed to serialize UI session: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| CurveBugError::Config(format!("Failed to write UI session: {}", e)))?;

        tracing::debug!("Saved UI session state to {:?}", path);
        Ok(())
    }
}
