//! Test data builders for frames and curve models

use curvebug_rs::backend::protocol::{encode_frame, Frame, MAX_SAMPLES};
use curvebug_rs::curve::{ChannelData, CurveData};
use curvebug_rs::types::{Excitation, ExcitationMode};

/// Builder for raw 2016-byte instrument frames
pub struct FrameBuilder {
    triplets: Vec<(u16, u16, u16)>,
}

impl FrameBuilder {
    /// Every sample set to the same triplet
    pub fn constant(drive: u16, ch1: u16, ch2: u16) -> Self {
        Self {
            triplets: vec![(drive, ch1, ch2); MAX_SAMPLES],
        }
    }

    /// Drive ramps from 0; channel 1 follows at half the drive, channel 2 is shorted
    pub fn ramp() -> Self {
        Self {
            triplets: (0..MAX_SAMPLES)
                .map(|i| {
                    let drive = (i * 12) as u16;
                    (drive, drive / 2, 0)
                })
                .collect(),
        }
    }

    /// Override one sample
    pub fn sample(mut self, index: usize, drive: u16, ch1: u16, ch2: u16) -> Self {
        self.triplets[index] = (drive, ch1, ch2);
        self
    }

    pub fn build(self) -> Box<Frame> {
        encode_frame(&self.triplets)
    }

    /// The encoded frame as a byte vector
    pub fn bytes(self) -> Vec<u8> {
        self.build().to_vec()
    }
}

/// Builder for curve models in a known state
pub struct CurveDataBuilder {
    curves: CurveData,
}

impl CurveDataBuilder {
    pub fn new(mode: ExcitationMode) -> Self {
        Self {
            curves: CurveData::with_mode(mode),
        }
    }

    /// Store both channels at `excitation` from `(voltage, current)` points
    pub fn with_points(
        mut self,
        excitation: Excitation,
        ch1: &[(f32, f32)],
        ch2: &[(f32, f32)],
    ) -> Self {
        self.curves.store_channels(
            excitation,
            ChannelData::from_points(ch1.iter().copied()),
            ChannelData::from_points(ch2.iter().copied()),
        );
        self
    }

    /// Store a decoded frame at `excitation`
    pub fn with_frame(mut self, excitation: Excitation, frame: &Frame) -> Self {
        self.curves.store_frame(excitation, frame);
        self
    }

    pub fn build(self) -> CurveData {
        self.curves
    }
}
