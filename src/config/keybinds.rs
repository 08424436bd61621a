//! Operator key bindings
//!
//! Bindings are stored by name (`"P"`, `"SPACE"`, `"F1"`, ...) so the config
//! file stays readable. Names are matched case-insensitively.

use crate::error::{CurveBugError, Result};
use egui::Key;
use serde::{Deserialize, Serialize};

/// Something the operator can trigger from the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    TogglePause,
    ToggleSingleChannel,
    ToggleAutoScale,
    FitToData,
    ResetView,
    CycleMode,
    OpenSettings,
    Quit,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::TogglePause,
        Action::ToggleSingleChannel,
        Action::ToggleAutoScale,
        Action::FitToData,
        Action::ResetView,
        Action::CycleMode,
        Action::OpenSettings,
        Action::Quit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Action::TogglePause => "Pause/Resume",
            Action::ToggleSingleChannel => "Single Channel",
            Action::ToggleAutoScale => "Auto-Scale",
            Action::FitToData => "Fit to Data",
            Action::ResetView => "Reset View",
            Action::CycleMode => "Cycle Mode",
            Action::OpenSettings => "Settings",
            Action::Quit => "Quit",
        }
    }
}

/// Parse a binding name into an egui key
pub fn parse_key(name: &str) -> Option<Key> {
    let upper = name.trim().to_ascii_uppercase();
    match upper.as_str() {
        "SPACE" => return Some(Key::Space),
        "ESC" | "ESCAPE" => return Some(Key::Escape),
        _ => {}
    }

    if let Some(n) = upper.strip_prefix('F').filter(|rest| !rest.is_empty()) {
        return match n.parse::<u8>().ok()? {
            1 => Some(Key::F1),
            2 => Some(Key::F2),
            3 => Some(Key::F3),
            4 => Some(Key::F4),
            5 => Some(Key::F5),
            6 => Some(Key::F6),
            7 => Some(Key::F7),
            8 => Some(Key::F8),
            9 => Some(Key::F9),
            10 => Some(Key::F10),
            11 => Some(Key::F11),
            12 => Some(Key::F12),
            _ => None,
        };
    }

    let mut chars = upper.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_uppercase() => Key::from_name(&c.to_string()),
        _ => None,
    }
}

/// Binding names for every [`Action`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub pause: String,
    pub single_channel: String,
    pub auto_scale: String,
    pub fit_to_data: String,
    pub reset_view: String,
    pub cycle_mode: String,
    pub settings: String,
    pub quit: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            pause: "P".to_string(),
            single_channel: "S".to_string(),
            auto_scale: "A".to_string(),
            fit_to_data: "F".to_string(),
            reset_view: "R".to_string(),
            cycle_mode: "SPACE".to_string(),
            settings: "F1".to_string(),
            quit: "ESC".to_string(),
        }
    }
}

impl KeyBindings {
    /// Binding name for an action
    pub fn name(&self, action: Action) -> &str {
        match action {
            Action::TogglePause => &self.pause,
            Action::ToggleSingleChannel => &self.single_channel,
            Action::ToggleAutoScale => &self.auto_scale,
            Action::FitToData => &self.fit_to_data,
            Action::ResetView => &self.reset_view,
            Action::CycleMode => &self.cycle_mode,
            Action::OpenSettings => &self.settings,
            Action::Quit => &self.quit,
        }
    }

    /// Mutable binding name for an action, for the settings editor
    pub fn name_mut(&mut self, action: Action) -> &mut String {
        match action {
            Action::TogglePause => &mut self.pause,
            Action::ToggleSingleChannel => &mut self.single_channel,
            Action::ToggleAutoScale => &mut self.auto_scale,
            Action::FitToData => &mut self.fit_to_data,
            Action::ResetView => &mut self.reset_view,
            Action::CycleMode => &mut self.cycle_mode,
            Action::OpenSettings => &mut self.settings,
            Action::Quit => &mut self.quit,
        }
    }

    /// Key bound to an action, if the name parses
    pub fn key_for(&self, action: Action) -> Option<Key> {
        parse_key(self.name(action))
    }

    /// Every binding must parse and no key may be bound twice
    pub fn validate(&self) -> Result<()> {
        let mut seen: Vec<(Key, Action)> = Vec::with_capacity(Action::ALL.len());
        for action in Action::ALL {
            let name = self.name(action);
            let key = parse_key(name).ok_or_else(|| {
                CurveBugError::KeyBinding(format!(
                    "Invalid key '{}' for {}",
                    name,
                    action.label()
                ))
            })?;
            if let Some((_, other)) = seen.iter().find(|(k, _)| *k == key) {
                return Err(CurveBugError::KeyBinding(format!(
                    "Key '{}' is bound to both {} and {}",
                    name,
                    other.label(),
                    action.label()
                )));
            }
            seen.push((key, action));
        }
        Ok(())
    }

    /// Help text listing the current bindings
    pub fn help_line(&self) -> String {
        format!(
            "{}: Pause | {}: Single Ch | {}: Auto-Scale | {}: Fit | {}: Reset | {}: Mode | {}: Settings | {}: Quit | Wheel: Zoom | Drag: Pan",
            self.pause,
            self.single_channel,
            self.auto_scale,
            self.fit_to_data,
            self.reset_view,
            self.cycle_mode,
            self.settings,
            self.quit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_names() {
        assert_eq!(parse_key("P"), Some(Key::P));
        assert_eq!(parse_key("p"), Some(Key::P));
        assert_eq!(parse_key("space"), Some(Key::Space));
        assert_eq!(parse_key("Esc"), Some(Key::Escape));
        assert_eq!(parse_key("ESCAPE"), Some(Key::Escape));
        assert_eq!(parse_key("F1"), Some(Key::F1));
        assert_eq!(parse_key("f12"), Some(Key::F12));
        assert_eq!(parse_key("F"), Some(Key::F));
    }

    #[test]
    fn test_parse_key_rejects_unknown() {
        assert_eq!(parse_key(""), None);
        assert_eq!(parse_key("F13"), None);
        assert_eq!(parse_key("F0"), None);
        assert_eq!(parse_key("1"), None);
        assert_eq!(parse_key("PP"), None);
        assert_eq!(parse_key("ENTER"), None);
    }

    #[test]
    fn test_defaults_are_valid() {
        let bindings = KeyBindings::default();
        assert!(bindings.validate().is_ok());
        assert_eq!(bindings.key_for(Action::CycleMode), Some(Key::Space));
        assert_eq!(bindings.key_for(Action::OpenSettings), Some(Key::F1));
        assert_eq!(bindings.key_for(Action::Quit), Some(Key::Escape));
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut bindings = KeyBindings::default();
        *bindings.name_mut(Action::ResetView) = "p".to_string();
        let err = bindings.validate().unwrap_err();
        assert!(matches!(err, CurveBugError::KeyBinding(_)));
        assert!(err.to_string().contains("Pause/Resume"));
    }

    #[test]
    fn test_validate_rejects_invalid_name() {
        let bindings = KeyBindings {
            auto_scale: "CTRL".to_string(),
            ..KeyBindings::default()
        };
        assert!(bindings.validate().is_err());
    }

    #[test]
    fn test_help_line_reflects_bindings() {
        let bindings = KeyBindings {
            pause: "F5".to_string(),
            ..KeyBindings::default()
        };
        let help = bindings.help_line();
        assert!(help.starts_with("F5: Pause"));
        assert!(help.contains("SPACE: Mode"));
    }
}
