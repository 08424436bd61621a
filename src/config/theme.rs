//! Plot color theme
//!
//! Colors are stored as unmultiplied RGBA bytes so they serialize as plain
//! arrays and feed straight into egui's color pickers.

use egui::Color32;
use serde::{Deserialize, Serialize};

/// RGBA color as stored in the config file
pub type Rgba = [u8; 4];

/// Convert a stored color for painting
pub fn color32(c: Rgba) -> Color32 {
    Color32::from_rgba_unmultiplied(c[0], c[1], c[2], c[3])
}

/// Built-in palettes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemePreset {
    Dark,
    Light,
}

impl ThemePreset {
    pub fn theme(self) -> ColorTheme {
        match self {
            ThemePreset::Dark => ColorTheme::dark(),
            ThemePreset::Light => ColorTheme::light(),
        }
    }
}

/// The eleven named plot colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorTheme {
    pub background: Rgba,
    pub dut1_trace: Rgba,
    pub dut2_trace: Rgba,
    /// Channel 1 at the strength not acquired last (alternating mode)
    pub dut1_dimmed: Rgba,
    /// Channel 2 at the strength not acquired last (alternating mode)
    pub dut2_dimmed: Rgba,
    pub grid_background: Rgba,
    pub grid: Rgba,
    pub crosshair: Rgba,
    pub label: Rgba,
    pub axis: Rgba,
    pub border: Rgba,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self::dark()
    }
}

impl ColorTheme {
    /// Number of colors in a theme
    pub const COUNT: usize = 11;

    pub fn dark() -> Self {
        Self {
            background: [0, 0, 0, 255],
            dut1_trace: [50, 150, 255, 255],
            dut2_trace: [255, 50, 50, 255],
            dut1_dimmed: [25, 75, 128, 255],
            dut2_dimmed: [128, 25, 25, 255],
            grid_background: [30, 30, 30, 255],
            grid: [50, 50, 50, 255],
            crosshair: [255, 255, 50, 255],
            label: [200, 200, 200, 255],
            axis: [255, 255, 255, 255],
            border: [100, 100, 100, 255],
        }
    }

    pub fn light() -> Self {
        Self {
            background: [255, 255, 255, 255],
            dut1_trace: [0, 100, 200, 255],
            dut2_trace: [200, 0, 0, 255],
            dut1_dimmed: [150, 180, 220, 255],
            dut2_dimmed: [220, 150, 150, 255],
            grid_background: [240, 240, 240, 255],
            grid: [200, 200, 200, 255],
            crosshair: [180, 180, 0, 255],
            label: [60, 60, 60, 255],
            axis: [0, 0, 0, 255],
            border: [100, 100, 100, 255],
        }
    }

    /// Labelled mutable access to every color, in settings-panel order
    pub fn entries_mut(&mut self) -> [(&'static str, &mut Rgba); Self::COUNT] {
        [
            ("Background", &mut self.background),
            ("DUT1 Trace", &mut self.dut1_trace),
            ("DUT2 Trace", &mut self.dut2_trace),
            ("DUT1 Dimmed", &mut self.dut1_dimmed),
            ("DUT2 Dimmed", &mut self.dut2_dimmed),
            ("Grid Background", &mut self.grid_background),
            ("Grid Lines", &mut self.grid),
            ("Crosshair", &mut self.crosshair),
            ("Labels", &mut self.label),
            ("Axis Titles", &mut self.axis),
            ("Border", &mut self.border),
        ]
    }

    /// Whether the background is dark enough to want dark egui chrome
    pub fn is_dark(&self) -> bool {
        let [r, g, b, _] = self.background;
        // Rec. 601 luma
        (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000 < 128
    }
}
