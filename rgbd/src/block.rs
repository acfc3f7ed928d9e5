use crate::element::{vint_at, vint_width, write_vint};
use crate::error::{Result, RgbdError};

/// Flags byte of a SimpleBlock header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockFlags(pub u8);

impl BlockFlags {
    pub const KEYFRAME: u8 = 0x80;
    pub const LACING: u8 = 0x06;

    pub fn new(keyframe: bool) -> Self {
        Self(if keyframe { Self::KEYFRAME } else { 0 })
    }

    /// Bit 7: the block can be decoded without earlier blocks.
    pub fn keyframe(self) -> bool {
        self.0 & Self::KEYFRAME != 0
    }

    /// Bits 2-1: lacing mode. Zero means one frame per block.
    pub fn lacing(self) -> u8 {
        (self.0 & Self::LACING) >> 1
    }
}

/// A SimpleBlock (or the Block inside a BlockGroup), borrowing its frame data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleBlock<'a> {
    pub track_number: u64,
    /// Timecode relative to the enclosing cluster, in timecode-scale units.
    pub relative_timecode: i16,
    pub flags: BlockFlags,
    pub data: &'a [u8],
}

impl<'a> SimpleBlock<'a> {
    /// Parse a block payload. `offset` locates the element for error reporting.
    pub fn parse(payload: &'a [u8], offset: u64) -> Result<Self> {
        let (track_number, len) =
            vint_at(payload, 0).ok_or(RgbdError::InvalidVint { offset })?;
        let header = payload
            .get(len..len + 3)
            .ok_or(RgbdError::ShortPayload {
                offset,
                expected: len + 3,
                got: payload.len(),
            })?;
        let relative_timecode = i16::from_be_bytes([header[0], header[1]]);
        let flags = BlockFlags(header[2]);
        if flags.lacing() != 0 {
            return Err(RgbdError::InvalidPayload {
                offset,
                what: "laced block",
            });
        }
        Ok(Self {
            track_number,
            relative_timecode,
            flags,
            data: &payload[len + 3..],
        })
    }

    pub fn keyframe(&self) -> bool {
        self.flags.keyframe()
    }
}

/// Serialize a SimpleBlock payload (without the element header).
pub fn encode_simple_block(
    track_number: u64,
    relative_timecode: i16,
    keyframe: bool,
    data: &[u8],
) -> Vec<u8> {
    let width = vint_width(track_number);
    let mut buf = Vec::with_capacity(width + 3 + data.len());
    write_vint(&mut buf, track_number, width);
    buf.extend_from_slice(&relative_timecode.to_be_bytes());
    buf.push(BlockFlags::new(keyframe).0);
    buf.extend_from_slice(data);
    buf
}
