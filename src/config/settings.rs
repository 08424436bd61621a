//! Runtime settings that can be modified during application execution
//!
//! These are separate from the persistent configuration and control the
//! current state of acquisition and display.
//!
//! # Main Types
//!
//! - [`RuntimeSettings`] - Pause, single-channel display, settings panel and
//!   the excitation mode the operator last selected

use crate::types::ExcitationMode;

/// Runtime settings for the application
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// Acquisitions suspended
    pub paused: bool,

    /// Hide channel 2 and pool only channel 1 for scaling
    pub single_channel: bool,

    /// Settings panel open (acquisition is suspended while it is)
    pub show_settings: bool,

    /// Excitation policy last requested from the backend
    pub excitation_mode: ExcitationMode,
}

impl RuntimeSettings {
    /// Whether the backend should be acquiring
    pub fn acquiring(&self) -> bool {
        !self.paused && !self.show_settings
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn toggle_single_channel(&mut self) -> bool {
        self.single_channel = !self.single_channel;
        self.single_channel
    }

    /// Advance standard → weak → alternating → standard
    pub fn cycle_mode(&mut self) -> ExcitationMode {
        self.excitation_mode = self.excitation_mode.next();
        self.excitation_mode
    }
}
