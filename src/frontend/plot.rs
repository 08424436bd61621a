//! I-V plot: data-to-screen transform and trace rendering
//!
//! The plot works in instrument units. Voltage runs along X (mirrored, so
//! larger voltages land further left) and current along Y (growing downward
//! on screen). Two scaling policies are available:
//!
//! - **Auto-scale**: the visible window is the bounding box of the pooled
//!   samples, widened by [`AUTO_SCALE_MARGIN`] on each side.
//! - **Fixed scale**: the [`DataWindow::base`] window, shifted by pan and
//!   narrowed by zoom. Wheel, drag, fit and reset only act on this policy's
//!   state.
//!
//! # Main Types
//!
//! - [`PlotView`] - Scaling policy, zoom/pan state and drawing
//! - [`DataWindow`] - Visible data-space rectangle and the screen mapping
//! - [`SamplePool`] - Reusable buffer for bounding-box computation

use crate::backend::protocol::{ADC_MAX, ADC_ORIGIN, MAX_SAMPLES};
use crate::config::theme::color32;
use crate::config::ColorTheme;
use crate::curve::{ChannelData, CurveData};
use crate::types::Channel;
use egui::{pos2, vec2, Align2, Color32, FontId, Painter, Pos2, Rect, Shape, Stroke, StrokeKind};

/// Wheel zoom factor per tick
pub const ZOOM_STEP: f32 = 1.2;

/// Smallest zoom the wheel or fit can reach
pub const MIN_ZOOM: f32 = 0.1;

/// Largest zoom fit-to-data will choose
pub const MAX_FIT_ZOOM: f32 = 1.0;

/// Margin added on each side of the data in auto-scale mode
pub const AUTO_SCALE_MARGIN: f32 = 0.1;

/// Margin added on each side of the data by fit-to-data
pub const FIT_MARGIN: f32 = 0.2;

/// Grid divisions per axis
pub const GRID_DIVISIONS: usize = 10;

/// Plot area offset from the drawing surface's top-left corner
pub const PLOT_MARGIN_LEFT: f32 = 150.0;
pub const PLOT_MARGIN_TOP: f32 = 100.0;

/// Total horizontal and vertical space not used by the plot area
pub const PLOT_INSET: f32 = 200.0;

const TRACE_WIDTH: f32 = 1.5;
const BORDER_WIDTH: f32 = 2.0;
const LEGEND_LINE_WIDTH: f32 = 4.0;

/// A data-space rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataWindow {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

impl DataWindow {
    pub fn new(x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Full-scale window: voltage `0..ADC_MAX`, current biased 7/8 negative
    pub fn base() -> Self {
        let range = ADC_MAX - 700.0;
        Self::new(0.0, ADC_MAX, -range * 7.0 / 8.0, range / 8.0)
    }

    /// Window used when there is nothing to fit
    pub fn unit() -> Self {
        Self::new(0.0, 1.0, 0.0, 1.0)
    }

    pub fn x_range(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn y_range(&self) -> f32 {
        self.y_max - self.y_min
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    /// Widen a zero-width axis by one unit
    pub fn guarded(mut self) -> Self {
        if self.x_max == self.x_min {
            self.x_max = self.x_min + 1.0;
        }
        if self.y_max == self.y_min {
            self.y_max = self.y_min + 1.0;
        }
        self
    }

    /// Grow each axis by `fraction` of its extent on both sides
    pub fn with_margin(self, fraction: f32) -> Self {
        let dx = self.x_range() * fraction;
        let dy = self.y_range() * fraction;
        Self::new(self.x_min - dx, self.x_max + dx, self.y_min - dy, self.y_max + dy)
    }

    /// Normalized position of a data point (0..1 inside the window)
    pub fn normalize(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.x_min) / self.x_range(),
            (y - self.y_min) / self.y_range(),
        )
    }

    /// Map a data point into `rect`
    pub fn to_screen(&self, rect: Rect, x: f32, y: f32) -> Pos2 {
        let (xn, yn) = self.normalize(x, y);
        pos2(
            rect.min.x + rect.width() - xn * rect.width(),
            rect.min.y + yn * rect.height(),
        )
    }

    /// Inverse of [`to_screen`](Self::to_screen)
    pub fn from_screen(&self, rect: Rect, pos: Pos2) -> (f32, f32) {
        let xn = (rect.min.x + rect.width() - pos.x) / rect.width();
        let yn = (pos.y - rect.min.y) / rect.height();
        (
            self.x_min + xn * self.x_range(),
            self.y_min + yn * self.y_range(),
        )
    }

    /// Whether the point lies inside (edges included)
    pub fn contains(&self, x: f32, y: f32) -> bool {
        (self.x_min..=self.x_max).contains(&x) && (self.y_min..=self.y_max).contains(&y)
    }
}

/// Value label at one of the labelled grid lines
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisTick {
    /// Grid line index (0, 5 or 10)
    pub index: usize,
    /// Voltage shown under the vertical grid line at this index
    pub voltage: i32,
    /// Current shown beside the horizontal grid line at this index
    pub current: i32,
}

/// Labels for grid lines 0, 5 and 10. Voltage counts down from the left
/// edge to match the mirrored axis.
pub fn axis_ticks(window: &DataWindow) -> [AxisTick; 3] {
    [0, 5, 10].map(|index| {
        let voltage = window.x_min
            + window.x_range() * (GRID_DIVISIONS - index) as f32 / GRID_DIVISIONS as f32;
        let current = window.y_min + window.y_range() * index as f32 / GRID_DIVISIONS as f32;
        AxisTick {
            index,
            voltage: voltage as i32,
            current: current as i32,
        }
    })
}

/// Screen positions of the zero-reference lines, when they are in view.
///
/// Returns the x of the voltage-origin line and the y of the zero-current line.
pub fn crosshair(window: &DataWindow, rect: Rect) -> (Option<f32>, Option<f32>) {
    let (xn, yn) = window.normalize(ADC_ORIGIN, 0.0);
    let x = (0.0..=1.0)
        .contains(&xn)
        .then(|| rect.min.x + rect.width() - xn * rect.width());
    let y = (0.0..=1.0)
        .contains(&yn)
        .then(|| rect.min.y + yn * rect.height());
    (x, y)
}

/// Plot area for a drawing surface
pub fn plot_area(surface: Rect) -> Rect {
    Rect::from_min_size(
        surface.min + vec2(PLOT_MARGIN_LEFT, PLOT_MARGIN_TOP),
        vec2(
            (surface.width() - PLOT_INSET).max(1.0),
            (surface.height() - PLOT_INSET).max(1.0),
        ),
    )
}

/// Pooled sample coordinates, reused across frames
#[derive(Debug, Clone)]
pub struct SamplePool {
    x: Vec<f32>,
    y: Vec<f32>,
}

impl Default for SamplePool {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplePool {
    /// Capacity for all four channel buffers
    pub const CAPACITY: usize = 4 * MAX_SAMPLES;

    pub fn new() -> Self {
        Self {
            x: Vec::with_capacity(Self::CAPACITY),
            y: Vec::with_capacity(Self::CAPACITY),
        }
    }

    /// Replace the pool contents with every sample of `channels`
    pub fn fill(&mut self, channels: &[&ChannelData]) {
        self.x.clear();
        self.y.clear();
        for ch in channels {
            self.x.extend_from_slice(ch.voltage());
            self.y.extend_from_slice(ch.current());
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.x.capacity()
    }

    /// Bounding box of the pool, `None` when empty
    pub fn bounds(&self) -> Option<DataWindow> {
        let (&x0, &y0) = (self.x.first()?, self.y.first()?);
        let init = DataWindow::new(x0, x0, y0, y0);
        Some(
            self.x
                .iter()
                .zip(&self.y)
                .fold(init, |w, (&x, &y)| {
                    DataWindow::new(w.x_min.min(x), w.x_max.max(x), w.y_min.min(y), w.y_max.max(y))
                }),
        )
    }
}

/// Drag in progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    /// Pointer position when the drag started
    pub anchor: Pos2,
    /// Pan when the drag started
    pub start_pan: (f32, f32),
}

/// Plot view state
#[derive(Debug, Clone)]
pub struct PlotView {
    /// Derive the window from the data every frame
    pub auto_scale: bool,
    /// Magnification of the base window (fixed-scale only)
    pub zoom: f32,
    /// Offset of the visible window's center from the base window's center
    pub pan_x: f32,
    pub pan_y: f32,
    drag: Option<DragState>,
    area: Rect,
    pool: SamplePool,
}

impl Default for PlotView {
    fn default() -> Self {
        Self::new()
    }
}

impl PlotView {
    pub fn new() -> Self {
        Self {
            auto_scale: false,
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            drag: None,
            area: plot_area(Rect::from_min_size(Pos2::ZERO, vec2(1080.0, 1080.0))),
            pool: SamplePool::new(),
        }
    }

    /// Screen rectangle the plot draws into
    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn set_area(&mut self, area: Rect) {
        self.area = area;
    }

    /// Fixed-scale window for the current zoom and pan
    pub fn fixed_window(&self) -> DataWindow {
        let base = DataWindow::base();
        let (cx, cy) = base.center();
        let (cx, cy) = (cx + self.pan_x, cy + self.pan_y);
        let half_w = base.x_range() / self.zoom / 2.0;
        let half_h = base.y_range() / self.zoom / 2.0;
        DataWindow::new(cx - half_w, cx + half_w, cy - half_h, cy + half_h).guarded()
    }

    /// Auto-scale window for the pooled data
    pub fn auto_window(&mut self, curves: &CurveData, single_channel: bool) -> DataWindow {
        self.pool.fill(&curves.pooled_channels(single_channel));
        match self.pool.bounds() {
            Some(bounds) => bounds.with_margin(AUTO_SCALE_MARGIN).guarded(),
            None => DataWindow::unit(),
        }
    }

    /// Window the active policy selects
    pub fn visible_window(&mut self, curves: &CurveData, single_channel: bool) -> DataWindow {
        if self.auto_scale {
            self.auto_window(curves, single_channel)
        } else {
            self.fixed_window()
        }
    }

    /// Set zoom and pan so the fixed-scale window frames the data.
    ///
    /// Works regardless of the auto-scale flag and does not change it.
    pub fn fit_to_data(&mut self, curves: &CurveData, single_channel: bool) {
        if curves.active_channel(Channel::Ch1).is_empty() {
            return;
        }
        self.pool.fill(&curves.pooled_channels(single_channel));
        let Some(bounds) = self.pool.bounds() else {
            return;
        };
        let data = bounds.with_margin(FIT_MARGIN).guarded();
        let base = DataWindow::base();

        let zoom_x = base.x_range() / data.x_range();
        let zoom_y = base.y_range() / data.y_range();
        self.zoom = zoom_x.min(zoom_y).clamp(MIN_ZOOM, MAX_FIT_ZOOM);

        let (dx, dy) = data.center();
        let (bx, by) = base.center();
        self.pan_x = dx - bx;
        self.pan_y = dy - by;
    }

    /// Apply one wheel movement. Positive zooms in.
    pub fn handle_zoom(&mut self, wheel: f32) {
        if self.auto_scale || wheel == 0.0 {
            return;
        }
        if wheel > 0.0 {
            self.zoom *= ZOOM_STEP;
        } else {
            self.zoom = (self.zoom / ZOOM_STEP).max(MIN_ZOOM);
        }
    }

    /// Start a drag at `pos`; ignored while auto-scaling
    pub fn begin_drag(&mut self, pos: Pos2) {
        if self.auto_scale {
            return;
        }
        self.drag = Some(DragState {
            anchor: pos,
            start_pan: (self.pan_x, self.pan_y),
        });
    }

    /// Move an active drag to `pos`
    pub fn update_drag(&mut self, pos: Pos2) {
        if self.auto_scale {
            self.drag = None;
            return;
        }
        let Some(drag) = self.drag else {
            return;
        };
        let (w, h) = (self.area.width(), self.area.height());
        if w <= 0.0 || h <= 0.0 {
            return;
        }

        let base = DataWindow::base();
        let x_range = base.x_range() / self.zoom;
        let y_range = base.y_range() / self.zoom;
        let delta = pos - drag.anchor;

        self.pan_x = drag.start_pan.0 + delta.x * x_range / w;
        self.pan_y = drag.start_pan.1 - delta.y * y_range / h;
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Zoom 1, no pan
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }

    pub fn toggle_auto_scale(&mut self) -> bool {
        self.auto_scale = !self.auto_scale;
        if self.auto_scale {
            self.drag = None;
        }
        self.auto_scale
    }

    /// Draw the plot into the current area
    pub fn draw(
        &mut self,
        painter: &Painter,
        curves: &CurveData,
        theme: &ColorTheme,
        single_channel: bool,
    ) {
        let r = self.area;
        painter.rect_filled(r, 0.0, color32(theme.grid_background));

        if curves.active_channel(Channel::Ch1).is_empty() {
            painter.text(
                pos2(r.center().x - 40.0, r.center().y),
                Align2::LEFT_TOP,
                "No Data",
                FontId::proportional(20.0),
                Color32::WHITE,
            );
            return;
        }

        let window = self.visible_window(curves, single_channel);

        let grid = Stroke::new(1.0, color32(theme.grid));
        for i in 0..=GRID_DIVISIONS {
            let t = i as f32 / GRID_DIVISIONS as f32;
            let x = r.min.x + t * r.width();
            let y = r.min.y + t * r.height();
            painter.line_segment([pos2(x, r.min.y), pos2(x, r.max.y)], grid);
            painter.line_segment([pos2(r.min.x, y), pos2(r.max.x, y)], grid);
        }

        let cross = Stroke::new(1.0, color32(theme.crosshair));
        let (cross_x, cross_y) = crosshair(&window, r);
        if let Some(x) = cross_x {
            painter.line_segment([pos2(x, r.min.y), pos2(x, r.max.y)], cross);
        }
        if let Some(y) = cross_y {
            painter.line_segment([pos2(r.min.x, y), pos2(r.max.x, y)], cross);
        }

        let clipped = painter.with_clip_rect(r);
        for trace in curves.traces(single_channel) {
            let color = match (trace.channel, trace.dimmed) {
                (Channel::Ch1, false) => theme.dut1_trace,
                (Channel::Ch2, false) => theme.dut2_trace,
                (Channel::Ch1, true) => theme.dut1_dimmed,
                (Channel::Ch2, true) => theme.dut2_dimmed,
            };
            draw_trace(&clipped, trace.data, &window, r, color32(color));
        }

        self.draw_labels(painter, &window, theme, single_channel);
        painter.rect_stroke(
            r,
            0.0,
            Stroke::new(BORDER_WIDTH, color32(theme.border)),
            StrokeKind::Inside,
        );
    }

    fn draw_labels(
        &self,
        painter: &Painter,
        window: &DataWindow,
        theme: &ColorTheme,
        single_channel: bool,
    ) {
        let r = self.area;
        let label_font = FontId::proportional(16.0);
        let label_color = color32(theme.label);

        for tick in axis_ticks(window) {
            let t = tick.index as f32 / GRID_DIVISIONS as f32;
            painter.text(
                pos2(r.min.x + t * r.width() - 20.0, r.max.y + 10.0),
                Align2::LEFT_TOP,
                tick.voltage.to_string(),
                label_font.clone(),
                label_color,
            );
            painter.text(
                pos2(r.min.x - 50.0, r.min.y + t * r.height() - 6.0),
                Align2::LEFT_TOP,
                tick.current.to_string(),
                label_font.clone(),
                label_color,
            );
        }

        let title_font = FontId::proportional(20.0);
        let axis_color = color32(theme.axis);
        painter.text(
            pos2(r.center().x - 50.0, r.max.y + 35.0),
            Align2::LEFT_TOP,
            "DUT Voltage",
            title_font.clone(),
            axis_color,
        );
        painter.text(
            pos2(r.min.x - 80.0, r.center().y + 10.0),
            Align2::LEFT_TOP,
            "Current",
            title_font,
            axis_color,
        );

        let legend = pos2(r.min.x + 20.0, r.max.y - 40.0);
        let mut entries = vec![(Channel::Ch1, theme.dut1_trace)];
        if !single_channel {
            entries.push((Channel::Ch2, theme.dut2_trace));
        }
        for (row, (channel, color)) in entries.into_iter().enumerate() {
            let y = legend.y - 30.0 * row as f32;
            let color = color32(color);
            painter.line_segment(
                [pos2(legend.x, y), pos2(legend.x + 40.0, y)],
                Stroke::new(LEGEND_LINE_WIDTH, color),
            );
            painter.text(
                pos2(legend.x + 50.0, y - 6.0),
                Align2::LEFT_TOP,
                channel.legend(),
                FontId::proportional(12.0),
                color,
            );
        }
    }
}

/// Draw one channel buffer as a polyline
fn draw_trace(painter: &Painter, data: &ChannelData, window: &DataWindow, rect: Rect, color: Color32) {
    if data.len() < 2 {
        return;
    }
    let points: Vec<Pos2> = data
        .points()
        .map(|(v, i)| window.to_screen(rect, v, i))
        .collect();
    painter.add(Shape::line(points, Stroke::new(TRACE_WIDTH, color)));
}
