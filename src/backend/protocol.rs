//! Wire format of the curve tracer
//!
//! One ASCII command byte goes out (`T` or `W`); exactly [`FRAME_BYTES`] come
//! back. The frame is [`FRAME_WORDS`] little-endian 16-bit words, each masked
//! to the 12-bit ADC range, grouped as [`MAX_SAMPLES`] triplets of
//! `(drive, ch1, ch2)`.

use crate::curve::ChannelData;

/// Samples per channel in one frame
pub const MAX_SAMPLES: usize = 336;

/// 16-bit words per frame (three per sample point)
pub const FRAME_WORDS: usize = MAX_SAMPLES * 3;

/// Bytes per frame
pub const FRAME_BYTES: usize = FRAME_WORDS * 2;

/// Mask selecting the 12 ADC bits of a word
pub const ADC_MASK: u16 = 0x0FFF;

/// Full-scale value used for the fixed plot window
pub const ADC_MAX: f32 = 2800.0;

/// Raw voltage reading of the instrument's zero-volt point
pub const ADC_ORIGIN: f32 = 2048.0;

/// Baud rates the transport accepts; anything else falls back to [`DEFAULT_BAUD_RATE`]
pub const SUPPORTED_BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115_200];

/// Baud rate of the instrument
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// A complete raw frame
pub type Frame = [u8; FRAME_BYTES];

/// Clamp a requested baud rate to one the transport supports
pub fn normalize_baud_rate(baud_rate: u32) -> u32 {
    if SUPPORTED_BAUD_RATES.contains(&baud_rate) {
        baud_rate
    } else {
        DEFAULT_BAUD_RATE
    }
}

/// Read word `index` of a frame, masked to 12 bits
#[inline]
pub fn frame_word(frame: &Frame, index: usize) -> u16 {
    u16::from_le_bytes([frame[index * 2], frame[index * 2 + 1]]) & ADC_MASK
}

/// Decode a frame into the two channel buffers.
///
/// Both buffers are cleared and refilled from index 0 with all
/// [`MAX_SAMPLES`] points. Voltage is the raw channel reading; current is
/// `drive - raw`.
pub fn decode_frame_into(frame: &Frame, ch1: &mut ChannelData, ch2: &mut ChannelData) {
    ch1.clear();
    ch2.clear();

    for i in 0..MAX_SAMPLES {
        let drive = frame_word(frame, i * 3) as f32;
        let ch1_raw = frame_word(frame, i * 3 + 1) as f32;
        let ch2_raw = frame_word(frame, i * 3 + 2) as f32;

        ch1.push(ch1_raw, drive - ch1_raw);
        ch2.push(ch2_raw, drive - ch2_raw);
    }
}

/// Decode a frame into fresh channel buffers
pub fn decode_frame(frame: &Frame) -> (ChannelData, ChannelData) {
    let mut ch1 = ChannelData::new();
    let mut ch2 = ChannelData::new();
    decode_frame_into(frame, &mut ch1, &mut ch2);
    (ch1, ch2)
}

/// Build a frame from `(drive, ch1, ch2)` triplets.
///
/// Missing triplets are zero-filled; extra ones are ignored. Used by the
/// simulated instrument and by tests.
pub fn encode_frame(triplets: &[(u16, u16, u16)]) -> Box<Frame> {
    let mut frame = Box::new([0u8; FRAME_BYTES]);
    for (i, &(drive, ch1, ch2)) in triplets.iter().take(MAX_SAMPLES).enumerate() {
        for (slot, word) in [drive, ch1, ch2].into_iter().enumerate() {
            let offset = (i * 3 + slot) * 2;
            frame[offset..offset + 2].copy_from_slice(&word.to_le_bytes());
        }
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_frame_geometry() {
        assert_eq!(FRAME_WORDS, 1008);
        assert_eq!(FRAME_BYTES, 2016);
    }

    #[test]
    fn test_baud_rate_fallback() {
        assert_eq!(normalize_baud_rate(9600), 9600);
        assert_eq!(normalize_baud_rate(57600), 57600);
        assert_eq!(normalize_baud_rate(115_200), 115_200);
        assert_eq!(normalize_baud_rate(250_000), DEFAULT_BAUD_RATE);
        assert_eq!(normalize_baud_rate(0), DEFAULT_BAUD_RATE);
    }

    #[test]
    fn test_decode_flat_frame() {
        let frame = encode_frame(&[(2048, 2048, 2048); MAX_SAMPLES]);
        let (ch1, ch2) = decode_frame(&frame);

        assert_eq!(ch1.len(), MAX_SAMPLES);
        assert_eq!(ch2.len(), MAX_SAMPLES);
        assert!(ch1.voltage().iter().all(|&v| v == 2048.0));
        assert!(ch1.current().iter().all(|&c| c == 0.0));
        assert!(ch2.voltage().iter().all(|&v| v == 2048.0));
        assert!(ch2.current().iter().all(|&c| c == 0.0));
    }

    #[test]
    fn test_decode_interleave_and_sign() {
        let mut triplets = vec![(0u16, 0u16, 0u16); MAX_SAMPLES];
        triplets[0] = (3000, 1000, 3500);
        triplets[335] = (100, 200, 50);
        let (ch1, ch2) = decode_frame(&encode_frame(&triplets));

        assert_eq!(ch1.voltage()[0], 1000.0);
        assert_eq!(ch1.current()[0], 2000.0);
        assert_eq!(ch2.voltage()[0], 3500.0);
        assert_eq!(ch2.current()[0], -500.0);

        assert_eq!(ch1.current()[335], -100.0);
        assert_eq!(ch2.current()[335], 50.0);
    }

    #[test]
    fn test_decode_masks_high_nibble() {
        let frame = encode_frame(&[(0xF800, 0xFFFF, 0x1001); MAX_SAMPLES]);
        let (ch1, ch2) = decode_frame(&frame);

        assert_eq!(ch1.voltage()[10], 4095.0);
        assert_eq!(ch2.voltage()[10], 1.0);
        assert_eq!(ch1.current()[10], 0x800 as f32 - 4095.0);
    }

    #[test]
    fn test_decode_into_replaces_previous_contents() {
        let (mut ch1, mut ch2) = decode_frame(&encode_frame(&[(4000, 1, 2); MAX_SAMPLES]));
        let frame = encode_frame(&[(10, 20, 30); MAX_SAMPLES]);
        decode_frame_into(&frame, &mut ch1, &mut ch2);

        assert_eq!(ch1.len(), MAX_SAMPLES);
        assert!(ch1.voltage().iter().all(|&v| v == 20.0));
        assert!(ch2.current().iter().all(|&c| c == -20.0));
    }

    proptest! {
        #[test]
        fn prop_decoded_values_are_12_bit(bytes in proptest::collection::vec(any::<u8>(), FRAME_BYTES)) {
            let mut frame = [0u8; FRAME_BYTES];
            frame.copy_from_slice(&bytes);
            let (ch1, ch2) = decode_frame(&frame);

            for ch in [&ch1, &ch2] {
                prop_assert_eq!(ch.len(), MAX_SAMPLES);
                for &v in ch.voltage() {
                    prop_assert!((0.0..=4095.0).contains(&v));
                }
                for &c in ch.current() {
                    prop_assert!((-4095.0..=4095.0).contains(&c));
                }
            }
        }

        #[test]
        fn prop_decode_is_deterministic(bytes in proptest::collection::vec(any::<u8>(), FRAME_BYTES)) {
            let mut frame = [0u8; FRAME_BYTES];
            frame.copy_from_slice(&bytes);
            prop_assert_eq!(decode_frame(&frame), decode_frame(&frame));
        }
    }
}
