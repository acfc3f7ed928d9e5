//! TDC1: temporal delta compression of depth frames on top of RVL.
//!
//! Frame layout: `[width: i32 LE][height: i32 LE][keyframe: i32 LE][rvl payload]`.
//! Keyframes carry absolute values. Delta frames carry per-pixel differences
//! against the previous reconstructed frame; changes too small relative to the
//! previous value are suppressed so both sides keep the old value.

use crate::depth::{DepthFrame, pixel_count, read_i32_le};
use crate::error::{Result, RgbdError};
use crate::rvl;

pub const TDC1_HEADER_SIZE: usize = 12;

/// Multiplier used when encoding through [`crate::depth::DepthEncoder`].
pub const DEFAULT_DIFF_MULTIPLIER: i32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tdc1Header {
    pub width: i32,
    pub height: i32,
    pub keyframe: bool,
}

impl Tdc1Header {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let field = |offset| {
            read_i32_le(bytes, offset).ok_or(RgbdError::TruncatedFrameHeader {
                expected: TDC1_HEADER_SIZE,
                got: bytes.len(),
            })
        };
        Ok(Self {
            width: field(0)?,
            height: field(4)?,
            keyframe: field(8)? > 0,
        })
    }
}

/// Report a TDC1 frame's keyframe flag by reading only its header.
pub fn is_tdc1_keyframe(bytes: &[u8]) -> Result<bool> {
    Ok(Tdc1Header::parse(bytes)?.keyframe)
}

/// Stateful TDC1 encoder. Frames must be decoded in the order they were encoded.
#[derive(Debug, Clone)]
pub struct Tdc1Encoder {
    width: i32,
    height: i32,
    diff_multiplier: i32,
    previous_depth_values: Vec<i32>,
}

impl Tdc1Encoder {
    pub fn new(width: i32, height: i32, diff_multiplier: i32) -> Result<Self> {
        let count = pixel_count(width, height)?;
        Ok(Self {
            width,
            height,
            diff_multiplier,
            previous_depth_values: vec![0; count],
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn encode(&mut self, depth_values: &[i32], keyframe: bool) -> Result<Vec<u8>> {
        let expected = self.previous_depth_values.len();
        if depth_values.len() != expected {
            return Err(RgbdError::InvalidFrameSize {
                expected,
                got: depth_values.len(),
            });
        }

        let mut bytes = Vec::with_capacity(TDC1_HEADER_SIZE + expected);
        bytes.extend_from_slice(&self.width.to_le_bytes());
        bytes.extend_from_slice(&self.height.to_le_bytes());
        bytes.extend_from_slice(&(keyframe as i32).to_le_bytes());

        if keyframe {
            self.previous_depth_values.copy_from_slice(depth_values);
            bytes.extend_from_slice(&rvl::compress(depth_values)?);
            return Ok(bytes);
        }

        let multiplier = self.diff_multiplier as i64;
        let mut diffs = vec![0i32; expected];
        for ((diff, previous), &value) in diffs
            .iter_mut()
            .zip(self.previous_depth_values.iter_mut())
            .zip(depth_values)
        {
            let change = value as i64 - *previous as i64;
            if change.abs().saturating_mul(multiplier) > *previous as i64 {
                *diff = value.wrapping_sub(*previous);
                *previous = value;
            }
        }
        bytes.extend_from_slice(&rvl::compress(&diffs)?);
        Ok(bytes)
    }
}

/// Stateful TDC1 decoder.
///
/// State is sized by the first frame seen. A keyframe with new dimensions
/// resets it; a delta frame with new dimensions is rejected.
#[derive(Debug, Clone, Default)]
pub struct Tdc1Decoder {
    width: i32,
    height: i32,
    previous_depth_values: Option<Vec<i32>>,
}

impl Tdc1Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> Result<DepthFrame> {
        let header = Tdc1Header::parse(bytes)?;
        let count = pixel_count(header.width, header.height)?;

        let same_size = self.width == header.width && self.height == header.height;
        if self.previous_depth_values.is_some() && !same_size && !header.keyframe {
            return Err(RgbdError::InvalidFrameSequence(format!(
                "delta frame of {}x{} follows state of {}x{}",
                header.width, header.height, self.width, self.height
            )));
        }

        let values: Vec<i32> = rvl::decompress(&bytes[TDC1_HEADER_SIZE..], count)?;
        let state = if header.keyframe {
            values
        } else {
            let mut state = match self.previous_depth_values.take() {
                Some(state) if same_size => state,
                _ => vec![0; count],
            };
            for (previous, diff) in state.iter_mut().zip(&values) {
                *previous = previous.wrapping_add(*diff);
            }
            state
        };
        self.width = header.width;
        self.height = header.height;

        let frame = DepthFrame {
            width: header.width,
            height: header.height,
            values: state.clone(),
        };
        self.previous_depth_values = Some(state);
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(base: i32, step: i32) -> Vec<i32> {
        (0..12).map(|i| if i % 5 == 0 { 0 } else { base + i * step }).collect()
    }

    #[test]
    fn test_header_layout() {
        let mut encoder = Tdc1Encoder::new(4, 3, DEFAULT_DIFF_MULTIPLIER).unwrap();
        let bytes = encoder.encode(&frame(1000, 1), true).unwrap();
        assert_eq!(&bytes[0..4], &4i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &3i32.to_le_bytes());
        assert_eq!(&bytes[8..12], &1i32.to_le_bytes());
        assert!(is_tdc1_keyframe(&bytes).unwrap());

        let bytes = encoder.encode(&frame(1000, 2), false).unwrap();
        assert_eq!(&bytes[8..12], &0i32.to_le_bytes());
        assert!(!is_tdc1_keyframe(&bytes).unwrap());
    }

    #[test]
    fn test_keyframe_check_reads_only_header() {
        let mut header = Vec::new();
        header.extend_from_slice(&640i32.to_le_bytes());
        header.extend_from_slice(&576i32.to_le_bytes());
        header.extend_from_slice(&0i32.to_le_bytes());
        assert!(!is_tdc1_keyframe(&header).unwrap());
        assert!(matches!(
            is_tdc1_keyframe(&header[..11]),
            Err(RgbdError::TruncatedFrameHeader { expected: 12, got: 11 })
        ));
    }

    #[test]
    fn test_lossless_sequence_when_every_change_is_significant() {
        // A multiplier above every previous value makes any nonzero change significant.
        let frames = vec![
            frame(1000, 1),
            frame(1001, 1),
            frame(990, 3),
            frame(-50, 7),
            frame(i32::MAX - 100, 1),
            frame(i32::MIN + 100, -1),
        ];
        let mut encoder = Tdc1Encoder::new(4, 3, i32::MAX).unwrap();
        let mut decoder = Tdc1Decoder::new();
        for (i, values) in frames.iter().enumerate() {
            let bytes = encoder.encode(values, i == 0).unwrap();
            let decoded = decoder.decode(&bytes).unwrap();
            assert_eq!(decoded.width, 4);
            assert_eq!(decoded.height, 3);
            assert_eq!(&decoded.values, values, "frame {i}");
        }
    }

    #[test]
    fn test_small_changes_are_suppressed() {
        let first = vec![1000; 12];
        let second = vec![1004; 12];

        // |4| * 1 is not greater than 1000, so nothing changes.
        let mut encoder = Tdc1Encoder::new(4, 3, 1).unwrap();
        let mut decoder = Tdc1Decoder::new();
        decoder.decode(&encoder.encode(&first, true).unwrap()).unwrap();
        let decoded = decoder.decode(&encoder.encode(&second, false).unwrap()).unwrap();
        assert_eq!(decoded.values, first);

        // A large jump on one pixel passes the threshold.
        let mut third = first.clone();
        third[3] = 3000;
        let decoded = decoder.decode(&encoder.encode(&third, false).unwrap()).unwrap();
        assert_eq!(decoded.values, third);
    }

    #[test]
    fn test_first_delta_frame_decodes_against_zero_state() {
        let values = frame(200, 2);
        let mut encoder = Tdc1Encoder::new(4, 3, DEFAULT_DIFF_MULTIPLIER).unwrap();
        let bytes = encoder.encode(&values, false).unwrap();
        let decoded = Tdc1Decoder::new().decode(&bytes).unwrap();
        assert_eq!(decoded.values, values);
    }

    #[test]
    fn test_wrong_frame_size_is_rejected() {
        let mut encoder = Tdc1Encoder::new(4, 3, DEFAULT_DIFF_MULTIPLIER).unwrap();
        let err = encoder.encode(&[1, 2, 3], true).unwrap_err();
        assert!(matches!(err, RgbdError::InvalidFrameSize { expected: 12, got: 3 }));
    }

    #[test]
    fn test_dimension_change_requires_keyframe() {
        let mut small = Tdc1Encoder::new(4, 3, DEFAULT_DIFF_MULTIPLIER).unwrap();
        let mut large = Tdc1Encoder::new(6, 2, DEFAULT_DIFF_MULTIPLIER).unwrap();
        let mut decoder = Tdc1Decoder::new();

        decoder.decode(&small.encode(&frame(500, 1), true).unwrap()).unwrap();

        let delta = large.encode(&[9; 12], false).unwrap();
        let err = decoder.decode(&delta).unwrap_err();
        assert!(matches!(err, RgbdError::InvalidFrameSequence(_)));

        let key = large.encode(&[9; 12], true).unwrap();
        let decoded = decoder.decode(&key).unwrap();
        assert_eq!((decoded.width, decoded.height), (6, 2));
        assert_eq!(decoded.values, vec![9; 12]);
    }

    #[test]
    fn test_corrupt_dimensions_are_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&i32::MAX.to_le_bytes());
        bytes.extend_from_slice(&i32::MAX.to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&[0; 8]);
        let err = Tdc1Decoder::new().decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            RgbdError::InvalidDimensions { width: i32::MAX, height: i32::MAX }
        ));
    }
}
