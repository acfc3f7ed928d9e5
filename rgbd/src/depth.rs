use crate::codec::DepthCodecType;
use crate::error::{Result, RgbdError};
use crate::rvl;
use crate::tdc1::{DEFAULT_DIFF_MULTIPLIER, Tdc1Decoder, Tdc1Encoder};

/// Header of a framed RVL payload: `[width: i32 LE][height: i32 LE]`.
pub const RVL_FRAME_HEADER_SIZE: usize = 8;

/// A decoded depth image, row-major with `width * height` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthFrame {
    pub width: i32,
    pub height: i32,
    pub values: Vec<i32>,
}

impl DepthFrame {
    pub fn new(width: i32, height: i32, values: Vec<i32>) -> Result<Self> {
        let expected = pixel_count(width, height)?;
        if values.len() != expected {
            return Err(RgbdError::InvalidFrameSize {
                expected,
                got: values.len(),
            });
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Value at (`col`, `row`), or None outside the frame.
    pub fn get(&self, col: i32, row: i32) -> Option<i32> {
        if col < 0 || row < 0 || col >= self.width || row >= self.height {
            return None;
        }
        self.values.get((row * self.width + col) as usize).copied()
    }
}

/// Largest frame a header may declare (8192 x 8192 pixels).
pub const MAX_PIXELS: usize = 1 << 26;

pub(crate) fn pixel_count(width: i32, height: i32) -> Result<usize> {
    let invalid = || RgbdError::InvalidDimensions { width, height };
    if width < 0 || height < 0 {
        return Err(invalid());
    }
    (width as usize)
        .checked_mul(height as usize)
        .filter(|&count| count <= MAX_PIXELS)
        .ok_or_else(invalid)
}

pub(crate) fn read_i32_le(buf: &[u8], offset: usize) -> Option<i32> {
    buf.get(offset..offset + 4)?
        .try_into()
        .ok()
        .map(i32::from_le_bytes)
}

/// Stateless RVL encoder that prefixes each frame with its dimensions.
#[derive(Debug, Clone)]
pub struct RvlEncoder {
    width: i32,
    height: i32,
}

impl RvlEncoder {
    pub fn new(width: i32, height: i32) -> Result<Self> {
        pixel_count(width, height)?;
        Ok(Self { width, height })
    }

    pub fn encode(&self, depth_values: &[i32]) -> Result<Vec<u8>> {
        let expected = pixel_count(self.width, self.height)?;
        if depth_values.len() != expected {
            return Err(RgbdError::InvalidFrameSize {
                expected,
                got: depth_values.len(),
            });
        }
        let payload = rvl::compress(depth_values)?;
        let mut bytes = Vec::with_capacity(RVL_FRAME_HEADER_SIZE + payload.len());
        bytes.extend_from_slice(&self.width.to_le_bytes());
        bytes.extend_from_slice(&self.height.to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RvlDecoder;

impl RvlDecoder {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<DepthFrame> {
        let truncated = || RgbdError::TruncatedFrameHeader {
            expected: RVL_FRAME_HEADER_SIZE,
            got: bytes.len(),
        };
        let width = read_i32_le(bytes, 0).ok_or_else(truncated)?;
        let height = read_i32_le(bytes, 4).ok_or_else(truncated)?;
        let count = pixel_count(width, height)?;
        let values = rvl::decompress(&bytes[RVL_FRAME_HEADER_SIZE..], count)?;
        Ok(DepthFrame {
            width,
            height,
            values,
        })
    }
}

/// Depth encoder for either codec a recording's depth track may use.
#[derive(Debug, Clone)]
pub enum DepthEncoder {
    Rvl(RvlEncoder),
    Tdc1(Tdc1Encoder),
}

impl DepthEncoder {
    /// Create an encoder for `codec`. TDC1 uses [`DEFAULT_DIFF_MULTIPLIER`].
    pub fn new(codec: DepthCodecType, width: i32, height: i32) -> Result<Self> {
        Ok(match codec {
            DepthCodecType::Rvl => DepthEncoder::Rvl(RvlEncoder::new(width, height)?),
            DepthCodecType::Tdc1 => {
                DepthEncoder::Tdc1(Tdc1Encoder::new(width, height, DEFAULT_DIFF_MULTIPLIER)?)
            }
        })
    }

    pub fn codec_type(&self) -> DepthCodecType {
        match self {
            DepthEncoder::Rvl(_) => DepthCodecType::Rvl,
            DepthEncoder::Tdc1(_) => DepthCodecType::Tdc1,
        }
    }

    /// Encode one frame. RVL frames are always self-contained, so `keyframe`
    /// only affects TDC1.
    pub fn encode(&mut self, depth_values: &[i32], keyframe: bool) -> Result<Vec<u8>> {
        match self {
            DepthEncoder::Rvl(encoder) => encoder.encode(depth_values),
            DepthEncoder::Tdc1(encoder) => encoder.encode(depth_values, keyframe),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DepthDecoder {
    Rvl(RvlDecoder),
    Tdc1(Tdc1Decoder),
}

impl DepthDecoder {
    pub fn new(codec: DepthCodecType) -> Self {
        match codec {
            DepthCodecType::Rvl => DepthDecoder::Rvl(RvlDecoder::new()),
            DepthCodecType::Tdc1 => DepthDecoder::Tdc1(Tdc1Decoder::new()),
        }
    }

    pub fn codec_type(&self) -> DepthCodecType {
        match self {
            DepthDecoder::Rvl(_) => DepthCodecType::Rvl,
            DepthDecoder::Tdc1(_) => DepthCodecType::Tdc1,
        }
    }

    pub fn decode(&mut self, bytes: &[u8]) -> Result<DepthFrame> {
        match self {
            DepthDecoder::Rvl(decoder) => decoder.decode(bytes),
            DepthDecoder::Tdc1(decoder) => decoder.decode(bytes),
        }
    }
}
