use crate::error::{Result, RgbdError};

/// Data bits carried by each nibble. The fourth bit flags a continuation.
const NIBBLE_DATA_BITS: u32 = 3;
const CONTINUATION: u8 = 0x8;

/// Nibbles packed into one 64-bit word, most significant nibble first.
const NIBBLES_PER_WORD: u32 = 16;

/// Upper bound on nibbles per value: 21 nibbles carry 63 bits of magnitude.
pub const MAX_NIBBLES: u32 = 21;

/// Largest value that survives an encode/decode round trip.
pub const MAX_VALUE: u64 = i64::MAX as u64;

/// Packs unsigned values into a nibble stream.
///
/// Each value is emitted low 3 bits first. Completed words are appended to
/// the output as little-endian `u64`s; a trailing partial word is shifted so
/// its first nibble still occupies the top 4 bits.
#[derive(Debug, Default)]
pub struct VleWriter {
    buf: Vec<u8>,
    word: u64,
    nibbles: u32,
}

impl VleWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(bytes),
            word: 0,
            nibbles: 0,
        }
    }

    /// Append one value. Values above [`MAX_VALUE`] are rejected rather than truncated.
    pub fn write(&mut self, value: u64) -> Result<()> {
        if value > MAX_VALUE {
            return Err(RgbdError::VleOverflow);
        }

        let mut remaining = value;
        loop {
            let mut nibble = (remaining & 0x7) as u8;
            remaining >>= NIBBLE_DATA_BITS;
            if remaining != 0 {
                nibble |= CONTINUATION;
            }
            self.push_nibble(nibble);
            if remaining == 0 {
                return Ok(());
            }
        }
    }

    fn push_nibble(&mut self, nibble: u8) {
        self.word = (self.word << 4) | nibble as u64;
        self.nibbles += 1;
        if self.nibbles == NIBBLES_PER_WORD {
            self.buf.extend_from_slice(&self.word.to_le_bytes());
            self.word = 0;
            self.nibbles = 0;
        }
    }

    /// Flush any partial word and return the packed bytes.
    pub fn finish(mut self) -> Vec<u8> {
        if self.nibbles > 0 {
            let word = self.word << (4 * (NIBBLES_PER_WORD - self.nibbles));
            self.buf.extend_from_slice(&word.to_le_bytes());
        }
        self.buf
    }
}

/// Reads values back out of a nibble stream produced by [`VleWriter`].
#[derive(Debug)]
pub struct VleReader<'a> {
    input: &'a [u8],
    pos: usize,
    word: u64,
    nibbles_left: u32,
}

impl<'a> VleReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            word: 0,
            nibbles_left: 0,
        }
    }

    fn next_nibble(&mut self) -> Option<u8> {
        if self.nibbles_left == 0 {
            let chunk: [u8; 8] = self.input.get(self.pos..self.pos + 8)?.try_into().ok()?;
            self.word = u64::from_le_bytes(chunk);
            self.pos += 8;
            self.nibbles_left = NIBBLES_PER_WORD;
        }
        let nibble = (self.word >> 60) as u8;
        self.word <<= 4;
        self.nibbles_left -= 1;
        Some(nibble)
    }

    /// Read the next value. Returns `Ok(None)` when the input runs out.
    ///
    /// A value still flagging continuation after [`MAX_NIBBLES`] nibbles is an
    /// error: its magnitude would not fit the 63-bit budget.
    pub fn read(&mut self) -> Result<Option<u64>> {
        let mut value = 0u64;
        let mut shift = 0u32;
        for _ in 0..MAX_NIBBLES {
            let Some(nibble) = self.next_nibble() else {
                return Ok(None);
            };
            value |= ((nibble & 0x7) as u64) << shift;
            if nibble & CONTINUATION == 0 {
                return Ok(Some(value));
            }
            shift += NIBBLE_DATA_BITS;
        }
        Err(RgbdError::VleOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(values: &[u64]) -> Vec<u8> {
        let mut writer = VleWriter::new();
        for &v in values {
            writer.write(v).unwrap();
        }
        writer.finish()
    }

    #[test]
    fn test_single_nibble_occupies_top_of_word() {
        let bytes = encode(&[1]);
        assert_eq!(bytes.len(), 8);
        // Word 0x1000_0000_0000_0000 stored little-endian.
        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0, 0, 0x10]);
    }

    #[test]
    fn test_continuation_nibble_order() {
        // 8 = 0b001_000: low group 0 with continuation, then 1.
        let bytes = encode(&[8]);
        assert_eq!(bytes[7], 0x81);
        assert!(bytes[..7].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_values_span_word_boundaries() {
        let values: Vec<u64> = (0..200).map(|i| i * 977 + (i % 7) * 1_000_003).collect();
        let bytes = encode(&values);
        assert_eq!(bytes.len() % 8, 0);

        let mut reader = VleReader::new(&bytes);
        for &v in &values {
            assert_eq!(reader.read().unwrap(), Some(v));
        }
    }

    #[test]
    fn test_max_value_round_trips() {
        let bytes = encode(&[MAX_VALUE, 0, MAX_VALUE - 1]);
        let mut reader = VleReader::new(&bytes);
        assert_eq!(reader.read().unwrap(), Some(MAX_VALUE));
        assert_eq!(reader.read().unwrap(), Some(0));
        assert_eq!(reader.read().unwrap(), Some(MAX_VALUE - 1));
    }

    #[test]
    fn test_value_beyond_63_bits_is_rejected() {
        let mut writer = VleWriter::new();
        assert!(matches!(writer.write(1 << 63), Err(RgbdError::VleOverflow)));
        assert!(matches!(writer.write(u64::MAX), Err(RgbdError::VleOverflow)));
    }

    #[test]
    fn test_22_nibble_value_is_rejected() {
        // 32 nibbles, all flagging continuation.
        let bytes = [0xFFu8; 16];
        let mut reader = VleReader::new(&bytes);
        assert!(matches!(reader.read(), Err(RgbdError::VleOverflow)));
    }

    #[test]
    fn test_exhausted_input_returns_none() {
        let mut reader = VleReader::new(&[]);
        assert_eq!(reader.read().unwrap(), None);

        // A lone word of continuation nibbles ends mid-value.
        let bytes = [0x88u8; 8];
        let mut reader = VleReader::new(&bytes);
        assert_eq!(reader.read().unwrap(), None);
    }
}
