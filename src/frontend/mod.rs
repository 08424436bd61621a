//! Frontend module for the egui UI
//!
//! Receives curve snapshots from the backend through crossbeam channels and
//! draws them every frame.
//!
//! # Architecture
//!
//! The window is a single central panel holding the plot, with a status bar
//! at the bottom and the settings panel as a centered window on top. The
//! displayed [`CurveData`] is replaced wholesale whenever the backend
//! publishes a snapshot, so drawing never sees a partially updated model.
//!
//! # Main Types
//!
//! - [`CurveBugApp`] - Application state implementing [`eframe::App`]
//! - [`PlotView`] - Scaling policy, zoom/pan and plot drawing
//!
//! # Submodules
//!
//! - [`plot`] - Data-to-screen transform and trace rendering
//! - [`status_bar`] - Connection indicator, frame statistics and help line
//! - [`settings_panel`] - General, Colors and Key Bindings tabs

pub mod plot;
pub mod settings_panel;
pub mod status_bar;

pub use plot::{DataWindow, PlotView};
pub use settings_panel::{SettingsAction, SettingsPanelState};

use crate::backend::{BackendMessage, FrontendReceiver, PortInfo};
use crate::config::theme::color32;
use crate::config::{Action, AppConfig, RuntimeSettings, UiSession};
use crate::curve::CurveData;
use crate::types::{AcquisitionStats, ConnectionStatus};
use egui::{vec2, Align2, Color32, FontId};
use settings_panel::{show_settings_panel, DialogAction};
use status_bar::{render_status_bar, StatusBarContext};
use std::time::Duration;

/// Repaint period while nothing is arriving from the backend
const IDLE_REPAINT: Duration = Duration::from_millis(100);

/// Main application state
pub struct CurveBugApp {
    /// Channel pair to the backend
    frontend: FrontendReceiver,
    /// Persistent configuration
    config: AppConfig,
    /// Pause, single channel, settings panel, excitation mode
    settings: RuntimeSettings,
    /// Plot scaling and drawing
    plot: PlotView,
    /// Latest snapshot from the backend
    curves: CurveData,
    /// Successful acquisitions reported by the backend
    frame_count: u64,
    connection_status: ConnectionStatus,
    stats: AcquisitionStats,
    last_error: Option<String>,
    /// Ports from the last refresh
    ports: Vec<PortInfo>,
    /// Draft while the settings panel is open
    settings_state: SettingsPanelState,
    /// Help text derived from the key bindings
    help_line: String,
    /// Visuals must follow a theme change
    visuals_dirty: bool,
    quit_requested: bool,
}

impl CurveBugApp {
    /// Create the application inside eframe
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        frontend: FrontendReceiver,
        config: AppConfig,
        session: UiSession,
    ) -> Self {
        let mut app = Self::from_parts(frontend, config, session);
        app.apply_visuals(&cc.egui_ctx);
        app
    }

    /// Create the application state without a window
    pub fn from_parts(frontend: FrontendReceiver, config: AppConfig, session: UiSession) -> Self {
        let settings = RuntimeSettings {
            single_channel: session.single_channel,
            excitation_mode: session.mode,
            ..RuntimeSettings::default()
        };
        let mut plot = PlotView::new();
        plot.auto_scale = session.auto_scale;

        if let Err(e) = config.keybinds.validate() {
            tracing::warn!("{}; affected actions are unbound", e);
        }

        frontend.set_excitation_mode(session.mode);
        frontend.refresh_ports();

        Self {
            frontend,
            help_line: config.keybinds.help_line(),
            config,
            curves: CurveData::with_mode(session.mode),
            settings,
            plot,
            frame_count: 0,
            connection_status: ConnectionStatus::Disconnected,
            stats: AcquisitionStats::default(),
            last_error: None,
            ports: Vec::new(),
            settings_state: SettingsPanelState::default(),
            visuals_dirty: false,
            quit_requested: false,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn plot(&self) -> &PlotView {
        &self.plot
    }

    pub fn curves(&self) -> &CurveData {
        &self.curves
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// View state to persist on exit
    pub fn session(&self) -> UiSession {
        UiSession {
            mode: self.settings.excitation_mode,
            single_channel: self.settings.single_channel,
            auto_scale: self.plot.auto_scale,
        }
    }

    /// Plot header line
    pub fn header_text(&self) -> String {
        format!(
            "I-V Characteristics - {} {} Zoom:{:.2}x Frame:{}",
            self.settings.excitation_mode.label(),
            if self.plot.auto_scale { "[AUTO]" } else { "[FIXED]" },
            self.plot.zoom,
            self.frame_count
        )
    }

    /// Apply everything the backend sent since the last frame
    pub fn process_backend_messages(&mut self) -> bool {
        let messages = self.frontend.drain();
        let had_messages = !messages.is_empty();

        for msg in messages {
            match msg {
                BackendMessage::ConnectionStatus(status) => {
                    self.connection_status = status;
                    if status == ConnectionStatus::Connected {
                        self.last_error = None;
                    }
                }
                BackendMessage::ConnectionError(err) => {
                    self.last_error = Some(err);
                    self.connection_status = ConnectionStatus::Error;
                }
                BackendMessage::Curves { frame, curves } => {
                    self.curves = *curves;
                    // A snapshot taken before a mode change still carries the old mode
                    self.curves.set_mode(self.settings.excitation_mode);
                    self.frame_count = frame;
                }
                BackendMessage::Stats(stats) => {
                    self.stats = stats;
                }
                BackendMessage::PortList(ports) => {
                    tracing::debug!("Received {} ports", ports.len());
                    self.ports = ports;
                }
                BackendMessage::Shutdown => {
                    tracing::info!("Backend shutdown received");
                }
            }
        }

        had_messages
    }

    /// Run key actions, honoring the settings-panel rule: while it is open
    /// only quit works, and it closes the panel instead of the app.
    pub fn dispatch(&mut self, actions: impl IntoIterator<Item = Action>) {
        for action in actions {
            if self.settings.show_settings {
                if action == Action::Quit {
                    self.close_settings();
                }
                continue;
            }
            self.apply_action(action);
        }
    }

    /// Perform one operator action
    pub fn apply_action(&mut self, action: Action) {
        match action {
            Action::TogglePause => {
                self.settings.toggle_pause();
                self.sync_acquisition();
            }
            Action::ToggleSingleChannel => {
                self.settings.toggle_single_channel();
            }
            Action::ToggleAutoScale => {
                self.plot.toggle_auto_scale();
            }
            Action::FitToData => {
                self.plot
                    .fit_to_data(&self.curves, self.settings.single_channel);
            }
            Action::ResetView => self.plot.reset(),
            Action::CycleMode => {
                let mode = self.settings.cycle_mode();
                self.curves.set_mode(mode);
                self.frontend.set_excitation_mode(mode);
                tracing::info!("Excitation mode: {}", mode);
            }
            Action::OpenSettings => self.open_settings(),
            Action::Quit => self.quit_requested = true,
        }
    }

    /// Open the settings panel on a copy of the configuration
    pub fn open_settings(&mut self) {
        self.settings_state = SettingsPanelState::from_config(&self.config);
        self.settings.show_settings = true;
        self.plot.end_drag();
        self.sync_acquisition();
        self.frontend.refresh_ports();
    }

    /// Close the settings panel, discarding the draft
    pub fn close_settings(&mut self) {
        self.settings.show_settings = false;
        self.settings_state = SettingsPanelState::default();
        self.sync_acquisition();
    }

    /// Adopt a validated configuration from the settings panel
    pub fn apply_saved_config(&mut self, config: AppConfig) {
        if let Err(e) = config.save() {
            tracing::warn!("Failed to save configuration: {}", e);
            self.last_error = Some(e.to_string());
        }

        self.visuals_dirty = config.theme != self.config.theme;
        self.help_line = config.keybinds.help_line();
        self.frontend.reconfigure(config.device.clone());
        self.config = config;
        self.close_settings();
    }

    fn sync_acquisition(&self) {
        self.frontend.set_paused(!self.settings.acquiring());
    }

    fn apply_visuals(&mut self, ctx: &egui::Context) {
        if self.config.theme.is_dark() {
            ctx.set_visuals(egui::Visuals::dark());
        } else {
            ctx.set_visuals(egui::Visuals::light());
        }
        self.visuals_dirty = false;
    }

    fn pressed_actions(&self, ctx: &egui::Context) -> Vec<Action> {
        let bindings: Vec<(Action, egui::Key)> = Action::ALL
            .iter()
            .filter_map(|&action| self.config.keybinds.key_for(action).map(|key| (action, key)))
            .collect();

        ctx.input(|i| {
            bindings
                .iter()
                .filter(|(_, key)| i.key_pressed(*key))
                .map(|(action, _)| *action)
                .collect()
        })
    }

    fn handle_pointer(&mut self, ui: &egui::Ui, response: &egui::Response) {
        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            self.plot.handle_zoom(scroll);
        }

        if response.drag_started() {
            let origin = ui
                .input(|i| i.pointer.press_origin())
                .or_else(|| response.interact_pointer_pos());
            if let Some(origin) = origin {
                self.plot.begin_drag(origin);
            }
        }
        if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.plot.update_drag(pos);
            }
        }
        if response.drag_stopped() {
            self.plot.end_drag();
        }
    }

    fn show_plot(&mut self, ui: &mut egui::Ui) {
        let surface = ui.max_rect();
        self.plot.set_area(plot::plot_area(surface));

        let response = ui.allocate_rect(surface, egui::Sense::drag());
        if !self.settings.show_settings {
            self.handle_pointer(ui, &response);
        }

        let painter = ui.painter_at(surface);
        let theme = self.config.theme;
        self.plot
            .draw(&painter, &self.curves, &theme, self.settings.single_channel);

        let area = self.plot.area();
        painter.text(
            area.min - vec2(0.0, 40.0),
            Align2::LEFT_TOP,
            self.header_text(),
            FontId::proportional(20.0),
            color32(theme.axis),
        );

        if self.settings.paused {
            painter.text(
                surface.center() - vec2(80.0, 0.0),
                Align2::LEFT_TOP,
                "PAUSED",
                FontId::proportional(48.0),
                Color32::YELLOW,
            );
        }
    }
}

impl eframe::App for CurveBugApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let had_messages = self.process_backend_messages();

        let actions = self.pressed_actions(ctx);
        self.dispatch(actions);
        if self.quit_requested {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
        if self.visuals_dirty {
            self.apply_visuals(ctx);
        }

        let mut settings_clicked = false;
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            let bar = StatusBarContext {
                status: self.connection_status,
                port: &self.config.device.serial_port,
                stats: &self.stats,
                last_error: self.last_error.as_deref(),
                help: &self.help_line,
            };
            settings_clicked = render_status_bar(ui, &bar);
        });
        if settings_clicked && !self.settings.show_settings {
            self.open_settings();
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(color32(self.config.theme.background)))
            .show(ctx, |ui| self.show_plot(ui));

        if self.settings.show_settings {
            match show_settings_panel(ctx, &mut self.settings_state, &self.ports) {
                DialogAction::None => {}
                DialogAction::Close => self.close_settings(),
                DialogAction::CloseWithAction(SettingsAction::Save(config)) => {
                    self.apply_saved_config(*config);
                }
                DialogAction::Action(SettingsAction::RefreshPorts)
                | DialogAction::CloseWithAction(SettingsAction::RefreshPorts) => {
                    self.frontend.refresh_ports();
                }
                DialogAction::Action(SettingsAction::Save(config)) => {
                    self.apply_saved_config(*config);
                }
            }
        }

        if had_messages || self.connection_status.is_connected() {
            ctx.request_repaint();
        } else {
            ctx.request_repaint_after(IDLE_REPAINT);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.frontend.shutdown();

        if let Err(e) = self.session().save() {
            tracing::warn!("Failed to save UI session: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendCommand;
    use crate::curve::ChannelData;
    use crate::types::{Excitation, ExcitationMode};
    use crossbeam_channel::{bounded, Receiver, Sender};

    fn create_test_app() -> (CurveBugApp, Receiver<BackendCommand>, Sender<BackendMessage>) {
        let (cmd_tx, cmd_rx) = bounded(64);
        let (msg_tx, msg_rx) = bounded(64);
        let frontend = FrontendReceiver {
            receiver: msg_rx,
            command_sender: cmd_tx,
        };
        let app = CurveBugApp::from_parts(frontend, AppConfig::default(), UiSession::default());
        // Startup commands
        cmd_rx.try_iter().for_each(drop);
        (app, cmd_rx, msg_tx)
    }

    fn snapshot(mode: ExcitationMode) -> Box<CurveData> {
        let mut curves = CurveData::with_mode(mode);
        let ch = ChannelData::from_points([(1000.0, -10.0), (1200.0, -40.0)]);
        curves.store_channels(Excitation::Standard, ch.clone(), ch);
        Box::new(curves)
    }

    #[test]
    fn test_initial_header() {
        let (app, _, _) = create_test_app();
        assert_eq!(
            app.header_text(),
            "I-V Characteristics - 4.7K(T) [FIXED] Zoom:1.00x Frame:0"
        );
    }

    #[test]
    fn test_session_restored() {
        let (cmd_tx, cmd_rx) = bounded(16);
        let (_msg_tx, msg_rx) = bounded::<BackendMessage>(16);
        let frontend = FrontendReceiver {
            receiver: msg_rx,
            command_sender: cmd_tx,
        };
        let session = UiSession {
            mode: ExcitationMode::Alternating,
            single_channel: true,
            auto_scale: true,
        };
        let app = CurveBugApp::from_parts(frontend, AppConfig::default(), session.clone());

        assert_eq!(app.session(), session);
        assert!(app.header_text().contains("ALT [AUTO]"));
        let commands: Vec<_> = cmd_rx.try_iter().collect();
        assert!(matches!(
            commands[0],
            BackendCommand::SetExcitationMode(ExcitationMode::Alternating)
        ));
        assert!(matches!(commands[1], BackendCommand::RefreshPorts));
    }

    #[test]
    fn test_snapshot_replaces_model() {
        let (mut app, _, msg_tx) = create_test_app();
        msg_tx
            .send(BackendMessage::Curves {
                frame: 7,
                curves: snapshot(ExcitationMode::Standard),
            })
            .unwrap();

        assert!(app.process_backend_messages());
        assert_eq!(app.frame_count(), 7);
        assert_eq!(app.curves().active_channel(crate::types::Channel::Ch1).len(), 2);
        assert!(app.header_text().ends_with("Frame:7"));
    }

    #[test]
    fn test_stale_snapshot_keeps_selected_mode() {
        let (mut app, _, msg_tx) = create_test_app();
        app.apply_action(Action::CycleMode);
        msg_tx
            .send(BackendMessage::Curves {
                frame: 1,
                curves: snapshot(ExcitationMode::Standard),
            })
            .unwrap();
        app.process_backend_messages();
        assert_eq!(app.curves().mode(), ExcitationMode::Weak);
    }

    #[test]
    fn test_connection_messages() {
        let (mut app, _, msg_tx) = create_test_app();
        msg_tx
            .send(BackendMessage::ConnectionError("Failed to open COM4".to_string()))
            .unwrap();
        app.process_backend_messages();
        assert_eq!(app.connection_status, ConnectionStatus::Error);
        assert!(app.last_error.is_some());

        msg_tx
            .send(BackendMessage::ConnectionStatus(ConnectionStatus::Connected))
            .unwrap();
        app.process_backend_messages();
        assert!(app.last_error.is_none());
    }

    #[test]
    fn test_pause_action_reaches_backend() {
        let (mut app, cmd_rx, _) = create_test_app();
        app.apply_action(Action::TogglePause);
        assert!(app.settings().paused);
        assert!(matches!(cmd_rx.try_recv(), Ok(BackendCommand::SetPaused(true))));

        app.apply_action(Action::TogglePause);
        assert!(matches!(cmd_rx.try_recv(), Ok(BackendCommand::SetPaused(false))));
    }

    #[test]
    fn test_cycle_mode_action() {
        let (mut app, cmd_rx, _) = create_test_app();
        app.apply_action(Action::CycleMode);
        assert!(app.header_text().contains("100K WEAK(W)"));
        assert!(matches!(
            cmd_rx.try_recv(),
            Ok(BackendCommand::SetExcitationMode(ExcitationMode::Weak))
        ));
    }

    #[test]
    fn test_view_actions() {
        let (mut app, _, msg_tx) = create_test_app();
        msg_tx
            .send(BackendMessage::Curves {
                frame: 1,
                curves: snapshot(ExcitationMode::Standard),
            })
            .unwrap();
        app.process_backend_messages();

        app.apply_action(Action::FitToData);
        assert!(app.plot().zoom <= 1.0);
        assert!(app.plot().pan_x != 0.0);

        app.apply_action(Action::ResetView);
        assert_eq!(app.plot().zoom, 1.0);
        assert_eq!(app.plot().pan_x, 0.0);

        app.apply_action(Action::ToggleAutoScale);
        assert!(app.header_text().contains("[AUTO]"));

        app.apply_action(Action::ToggleSingleChannel);
        assert!(app.settings().single_channel);
    }

    #[test]
    fn test_settings_panel_pauses_and_blocks_keys() {
        let (mut app, cmd_rx, _) = create_test_app();
        app.apply_action(Action::OpenSettings);
        assert!(app.settings().show_settings);
        let commands: Vec<_> = cmd_rx.try_iter().collect();
        assert!(matches!(commands[0], BackendCommand::SetPaused(true)));

        app.dispatch([Action::TogglePause, Action::CycleMode]);
        assert!(!app.settings().paused);
        assert!(app.header_text().contains("4.7K(T)"));

        app.dispatch([Action::Quit]);
        assert!(!app.settings().show_settings);
        assert!(!app.quit_requested());
        assert!(matches!(cmd_rx.try_recv(), Ok(BackendCommand::SetPaused(false))));
    }

    #[test]
    fn test_quit_action() {
        let (mut app, _, _) = create_test_app();
        app.dispatch([Action::Quit]);
        assert!(app.quit_requested());
    }
}
