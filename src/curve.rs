//! Curve data model
//!
//! Holds the most recent standard and weak acquisitions for both channels,
//! and which of the two strengths is currently "active".
//!
//! # Main Types
//!
//! - [`ChannelData`] - Fixed-capacity voltage/current sample set for one channel
//! - [`CurveData`] - Four channel buffers plus excitation bookkeeping
//! - [`Trace`] - One buffer to draw, in draw order, with its emphasis

use crate::backend::protocol::{decode_frame_into, Frame, MAX_SAMPLES};
use crate::types::{Channel, Excitation, ExcitationMode};

/// Voltage/current samples for one channel, paired by index
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelData {
    voltage: [f32; MAX_SAMPLES],
    current: [f32; MAX_SAMPLES],
    count: usize,
}

impl Default for ChannelData {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelData {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            voltage: [0.0; MAX_SAMPLES],
            current: [0.0; MAX_SAMPLES],
            count: 0,
        }
    }

    /// Build a buffer from `(voltage, current)` points; extra points are dropped
    pub fn from_points(points: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let mut data = Self::new();
        for (v, c) in points {
            if !data.push(v, c) {
                break;
            }
        }
        data
    }

    /// Number of valid samples
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the buffer holds no samples
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Drop all samples
    pub fn clear(&mut self) {
        self.count = 0;
    }

    /// Append a sample; returns false when the buffer is full
    pub fn push(&mut self, voltage: f32, current: f32) -> bool {
        if self.count >= MAX_SAMPLES {
            return false;
        }
        self.voltage[self.count] = voltage;
        self.current[self.count] = current;
        self.count += 1;
        true
    }

    /// Valid voltage samples
    pub fn voltage(&self) -> &[f32] {
        &self.voltage[..self.count]
    }

    /// Valid current samples
    pub fn current(&self) -> &[f32] {
        &self.current[..self.count]
    }

    /// Iterate `(voltage, current)` pairs
    pub fn points(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.voltage().iter().copied().zip(self.current().iter().copied())
    }
}

/// A buffer selected for drawing
#[derive(Debug, Clone, Copy)]
pub struct Trace<'a> {
    pub channel: Channel,
    pub excitation: Excitation,
    pub data: &'a ChannelData,
    /// Drawn in the de-emphasized color
    pub dimmed: bool,
}

/// All acquired curves plus excitation bookkeeping
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CurveData {
    ch1_std: ChannelData,
    ch2_std: ChannelData,
    ch1_weak: ChannelData,
    ch2_weak: ChannelData,
    /// Strength of the last successful acquisition
    active: Excitation,
    mode: ExcitationMode,
    /// Next strength to fire in alternating mode
    alt_use_weak: bool,
}

impl CurveData {
    /// Create an empty model in standard mode
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty model in the given mode
    pub fn with_mode(mode: ExcitationMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> ExcitationMode {
        self.mode
    }

    /// Change the excitation policy. The alternating toggle keeps its value.
    pub fn set_mode(&mut self, mode: ExcitationMode) {
        self.mode = mode;
    }

    /// Advance to the next excitation policy
    pub fn cycle_mode(&mut self) -> ExcitationMode {
        self.mode = self.mode.next();
        self.mode
    }

    /// Strength the active buffers were acquired with
    pub fn active(&self) -> Excitation {
        self.active
    }

    /// Whether the last successful acquisition used the weak drive
    pub fn last_was_weak(&self) -> bool {
        self.active.is_weak()
    }

    /// Alternating-mode toggle: true when the next alternating call sends `W`
    pub fn alt_use_weak(&self) -> bool {
        self.alt_use_weak
    }

    /// Buffer for a channel and strength
    pub fn channel(&self, channel: Channel, excitation: Excitation) -> &ChannelData {
        match (channel, excitation) {
            (Channel::Ch1, Excitation::Standard) => &self.ch1_std,
            (Channel::Ch2, Excitation::Standard) => &self.ch2_std,
            (Channel::Ch1, Excitation::Weak) => &self.ch1_weak,
            (Channel::Ch2, Excitation::Weak) => &self.ch2_weak,
        }
    }

    /// Buffer for a channel at the active strength
    pub fn active_channel(&self, channel: Channel) -> &ChannelData {
        self.channel(channel, self.active)
    }

    /// Pick the strength for the next acquisition.
    ///
    /// In alternating mode this flips the toggle every call, before any I/O,
    /// so the sequence alternates whether or not individual calls succeed.
    pub fn next_excitation(&mut self) -> Excitation {
        match self.mode {
            ExcitationMode::Standard => Excitation::Standard,
            ExcitationMode::Weak => Excitation::Weak,
            ExcitationMode::Alternating => {
                let excitation = if self.alt_use_weak {
                    Excitation::Weak
                } else {
                    Excitation::Standard
                };
                self.alt_use_weak = !self.alt_use_weak;
                excitation
            }
        }
    }

    /// Decode a complete frame into the buffers for `excitation` and make
    /// them active. This is the only place buffers or the active strength change.
    pub fn store_frame(&mut self, excitation: Excitation, frame: &Frame) {
        let (ch1, ch2) = match excitation {
            Excitation::Standard => (&mut self.ch1_std, &mut self.ch2_std),
            Excitation::Weak => (&mut self.ch1_weak, &mut self.ch2_weak),
        };
        decode_frame_into(frame, ch1, ch2);
        self.active = excitation;
    }

    /// Replace the buffers for `excitation` with already-decoded data and make them active
    pub fn store_channels(&mut self, excitation: Excitation, ch1: ChannelData, ch2: ChannelData) {
        match excitation {
            Excitation::Standard => {
                self.ch1_std = ch1;
                self.ch2_std = ch2;
            }
            Excitation::Weak => {
                self.ch1_weak = ch1;
                self.ch2_weak = ch2;
            }
        }
        self.active = excitation;
    }

    /// Alternating mode with both strengths acquired at least once
    pub fn showing_both_strengths(&self) -> bool {
        self.mode == ExcitationMode::Alternating
            && !self.ch1_std.is_empty()
            && !self.ch1_weak.is_empty()
    }

    /// Buffers whose samples define the data extent.
    ///
    /// Active buffers normally; all four (or both channel-1 buffers in
    /// single-channel mode) when alternating with both strengths present.
    pub fn pooled_channels(&self, single_channel: bool) -> Vec<&ChannelData> {
        let strengths: &[Excitation] = if self.showing_both_strengths() {
            &[Excitation::Standard, Excitation::Weak]
        } else {
            std::slice::from_ref(&self.active)
        };

        let mut pooled = Vec::with_capacity(4);
        for &excitation in strengths {
            pooled.push(self.channel(Channel::Ch1, excitation));
            if !single_channel {
                pooled.push(self.channel(Channel::Ch2, excitation));
            }
        }
        pooled
    }

    /// Buffers to draw, in draw order.
    ///
    /// When both strengths are shown, the strength not acquired last comes
    /// first and dimmed, then the last-acquired strength at full color.
    pub fn traces(&self, single_channel: bool) -> Vec<Trace<'_>> {
        let mut traces = Vec::with_capacity(4);
        let mut add = |excitation: Excitation, dimmed: bool| {
            for channel in [Channel::Ch1, Channel::Ch2] {
                if channel == Channel::Ch2 && single_channel {
                    continue;
                }
                traces.push(Trace {
                    channel,
                    excitation,
                    data: self.channel(channel, excitation),
                    dimmed,
                });
            }
        };

        if self.showing_both_strengths() {
            add(self.active.other(), true);
        }
        add(self.active, false);
        traces
    }
}
