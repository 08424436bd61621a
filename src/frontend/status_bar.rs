//! Status bar panel: bottom bar showing connection, frame stats, errors
//! and the key binding help.

use egui::{Color32, RichText, Ui};

use crate::types::{AcquisitionStats, ConnectionStatus};

/// Context needed to render the status bar.
pub struct StatusBarContext<'a> {
    pub status: ConnectionStatus,
    pub port: &'a str,
    pub stats: &'a AcquisitionStats,
    pub last_error: Option<&'a str>,
    pub help: &'a str,
}

/// Connection indicator text
pub fn connection_label(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Connected => "Connected",
        ConnectionStatus::Connecting => "Connecting...",
        ConnectionStatus::Disconnected | ConnectionStatus::Error => "NOT CONNECTED",
    }
}

/// Render the status bar. Returns true when the Settings button was clicked.
pub fn render_status_bar(ui: &mut Ui, ctx: &StatusBarContext<'_>) -> bool {
    let mut open_settings = false;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        // === Connection status dot + port ===
        let status_color = match ctx.status {
            ConnectionStatus::Connected => Color32::GREEN,
            ConnectionStatus::Connecting => Color32::YELLOW,
            ConnectionStatus::Disconnected | ConnectionStatus::Error => Color32::RED,
        };
        ui.colored_label(status_color, "●");
        ui.colored_label(
            status_color,
            RichText::new(format!("{}: {}", connection_label(ctx.status), ctx.port)).small(),
        );

        ui.separator();

        let stats = ctx.stats;
        let rate_color = if stats.effective_frame_rate > 0.0 {
            Color32::from_rgb(100, 255, 100)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new("Rate:").small());
        ui.colored_label(
            rate_color,
            RichText::new(format!("{:.1} Hz", stats.effective_frame_rate)).small(),
        );

        ui.separator();

        let error_color = if stats.failed_frames > 0 {
            Color32::LIGHT_RED
        } else {
            Color32::GRAY
        };
        ui.colored_label(
            error_color,
            RichText::new(format!(
                "Failed: {} ({} short)",
                stats.failed_frames, stats.incomplete_frames
            ))
            .small(),
        );

        ui.separator();

        ui.label(
            RichText::new(format!(
                "Frame: {:.1} ms (jitter {:.1} ms)",
                stats.avg_frame_time_us / 1000.0,
                stats.jitter_us as f64 / 1000.0
            ))
            .small(),
        );

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("Settings").clicked() {
                open_settings = true;
            }
            if let Some(error) = ctx.last_error {
                ui.colored_label(Color32::RED, RichText::new(error).small());
            }
        });
    });

    ui.label(RichText::new(ctx.help).small().color(Color32::LIGHT_GRAY));

    open_settings
}
