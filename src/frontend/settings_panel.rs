//! Settings panel
//!
//! Edits a draft copy of [`AppConfig`] across three tabs (General, Colors,
//! Key Bindings). Nothing touches the live configuration until Save, which
//! validates the draft first.

use egui::{Context, Ui};

use crate::backend::discovery::{find_curve_tracer, PortInfo};
use crate::backend::protocol::SUPPORTED_BAUD_RATES;
use crate::config::keybinds::parse_key;
use crate::config::{Action, AppConfig, ThemePreset};

/// Actions the panel can return after rendering
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DialogAction<A> {
    /// Keep the panel open, no action needed
    #[default]
    None,
    /// Close without applying anything
    Close,
    /// Close and apply
    CloseWithAction(A),
    /// Stay open but perform the action
    Action(A),
}

/// Settings tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsTab {
    #[default]
    General,
    Colors,
    KeyBindings,
}

impl SettingsTab {
    pub const ALL: [SettingsTab; 3] = [
        SettingsTab::General,
        SettingsTab::Colors,
        SettingsTab::KeyBindings,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SettingsTab::General => "General",
            SettingsTab::Colors => "Colors",
            SettingsTab::KeyBindings => "Key Bindings",
        }
    }
}

/// What the panel asks the app to do
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsAction {
    /// Persist and apply this configuration
    Save(Box<AppConfig>),
    /// Re-enumerate serial ports
    RefreshPorts,
}

/// Draft state while the panel is open
#[derive(Debug, Clone, Default)]
pub struct SettingsPanelState {
    pub draft: AppConfig,
    pub tab: SettingsTab,
    /// Validation or discovery message shown under the tabs
    pub message: Option<String>,
}

impl SettingsPanelState {
    /// Start editing a copy of `config`
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            draft: config.clone(),
            tab: SettingsTab::General,
            message: None,
        }
    }

    /// Validate the draft. On failure the message is kept for display.
    pub fn try_save(&mut self) -> Option<AppConfig> {
        match self.draft.validate() {
            Ok(()) => {
                self.message = None;
                Some(self.draft.clone())
            }
            Err(e) => {
                self.message = Some(e.to_string());
                None
            }
        }
    }

    /// Point the draft at a discovered instrument port
    pub fn apply_discovered_port(&mut self, port: Option<String>) {
        match port {
            Some(port) => {
                self.message = Some(format!("Found curve tracer on {}", port));
                self.draft.device.serial_port = port;
            }
            None => self.message = Some("No curve tracer found".to_string()),
        }
    }
}

/// Show the panel as a centered window. Returns the action to perform.
pub fn show_settings_panel(
    ctx: &Context,
    state: &mut SettingsPanelState,
    ports: &[PortInfo],
) -> DialogAction<SettingsAction> {
    let mut action = DialogAction::None;

    egui::Window::new("Settings")
        .collapsible(false)
        .resizable(false)
        .default_width(640.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            action = render(state, ports, ui);
        });

    action
}

fn render(
    state: &mut SettingsPanelState,
    ports: &[PortInfo],
    ui: &mut Ui,
) -> DialogAction<SettingsAction> {
    let mut action = DialogAction::None;

    ui.horizontal(|ui| {
        for tab in SettingsTab::ALL {
            ui.selectable_value(&mut state.tab, tab, tab.label());
        }
    });
    ui.separator();

    match state.tab {
        SettingsTab::General => {
            if let Some(a) = render_general(state, ports, ui) {
                action = DialogAction::Action(a);
            }
        }
        SettingsTab::Colors => render_colors(state, ui),
        SettingsTab::KeyBindings => render_key_bindings(state, ui),
    }

    if let Some(message) = &state.message {
        ui.add_space(4.0);
        ui.colored_label(egui::Color32::YELLOW, message);
    }

    ui.separator();
    ui.horizontal(|ui| {
        if ui.button("Save").clicked() {
            if let Some(config) = state.try_save() {
                action = DialogAction::CloseWithAction(SettingsAction::Save(Box::new(config)));
            }
        }
        if ui.button("Cancel").clicked() {
            action = DialogAction::Close;
        }
    });

    action
}

fn render_general(
    state: &mut SettingsPanelState,
    ports: &[PortInfo],
    ui: &mut Ui,
) -> Option<SettingsAction> {
    let mut action = None;
    let device = &mut state.draft.device;
    let mut discovered = None;

    egui::Grid::new("settings_general_grid")
        .num_columns(2)
        .spacing([10.0, 8.0])
        .show(ui, |ui| {
            ui.label("Serial Port:");
            ui.horizontal(|ui| {
                ui.text_edit_singleline(&mut device.serial_port);
                egui::ComboBox::from_id_salt("settings_port_list")
                    .selected_text("Ports")
                    .show_ui(ui, |ui| {
                        for port in ports {
                            ui.selectable_value(
                                &mut device.serial_port,
                                port.name.clone(),
                                port.to_string(),
                            );
                        }
                    });
                if ui.button("Refresh").clicked() {
                    action = Some(SettingsAction::RefreshPorts);
                }
                if ui.button("Auto Find").clicked() {
                    discovered = Some(find_curve_tracer());
                }
            });
            ui.end_row();

            ui.label("Baud Rate:");
            egui::ComboBox::from_id_salt("settings_baud_rate")
                .selected_text(device.baud_rate.to_string())
                .show_ui(ui, |ui| {
                    for rate in SUPPORTED_BAUD_RATES {
                        ui.selectable_value(&mut device.baud_rate, rate, rate.to_string());
                    }
                });
            ui.end_row();

            ui.label("Acquire Interval (ms):");
            ui.add(egui::DragValue::new(&mut device.acquire_interval_ms).range(10..=5000));
            ui.end_row();

            ui.label("Auto-discover on startup:");
            ui.checkbox(&mut device.auto_discover, "");
            ui.end_row();

            ui.label("Window Size:");
            ui.horizontal(|ui| {
                ui.add(egui::DragValue::new(&mut state.draft.window.width).range(400..=4096));
                ui.label("x");
                ui.add(egui::DragValue::new(&mut state.draft.window.height).range(400..=4096));
            });
            ui.end_row();
        });

    ui.label(egui::RichText::new("Window size applies on next launch.").small());

    if let Some(port) = discovered {
        state.apply_discovered_port(port);
    }
    action
}

fn render_colors(state: &mut SettingsPanelState, ui: &mut Ui) {
    ui.horizontal(|ui| {
        ui.label("Presets:");
        if ui.button("Dark").clicked() {
            state.draft.theme = ThemePreset::Dark.theme();
        }
        if ui.button("Light").clicked() {
            state.draft.theme = ThemePreset::Light.theme();
        }
    });
    ui.add_space(4.0);

    egui::Grid::new("settings_colors_grid")
        .num_columns(2)
        .spacing([10.0, 6.0])
        .show(ui, |ui| {
            for (label, color) in state.draft.theme.entries_mut() {
                ui.label(label);
                ui.color_edit_button_srgba_unmultiplied(color);
                ui.end_row();
            }
        });
}

fn render_key_bindings(state: &mut SettingsPanelState, ui: &mut Ui) {
    egui::Grid::new("settings_keys_grid")
        .num_columns(3)
        .spacing([10.0, 6.0])
        .show(ui, |ui| {
            for action in Action::ALL {
                ui.label(action.label());
                let name = state.draft.keybinds.name_mut(action);
                ui.add(egui::TextEdit::singleline(name).desired_width(80.0));
                if parse_key(name).is_none() {
                    ui.colored_label(egui::Color32::RED, "invalid");
                } else {
                    ui.label("");
                }
                ui.end_row();
            }
        });
    ui.add_space(4.0);
    ui.label(egui::RichText::new("Valid keys: A-Z, SPACE, ESC, F1-F12").small());
}
