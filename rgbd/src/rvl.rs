//! RVL: lossless run-length and variable-length compression for depth images.
//!
//! The stream alternates between a zero-run length and a nonzero-run length,
//! each nonzero run followed by the zig-zag folded delta of every value in it
//! against the previous nonzero value. Nothing in the stream records the pixel
//! count; callers supply it on decompression.

use crate::error::{Result, RgbdError};
use crate::vle::{VleReader, VleWriter};

/// Integer widths RVL can carry. Deltas are always computed in `i64`.
pub trait DepthValue: Copy + Default + PartialEq + Into<i64> + TryFrom<i64> {}

impl DepthValue for i16 {}
impl DepthValue for i32 {}

/// Fold a signed delta so small magnitudes of either sign map to small values.
fn fold(delta: i64) -> u64 {
    ((delta << 1) ^ (delta >> 63)) as u64
}

fn unfold(folded: u64) -> i64 {
    ((folded >> 1) as i64) ^ -((folded & 1) as i64)
}

/// Compress `input` into an RVL byte stream. An empty input yields an empty stream.
pub fn compress<T: DepthValue>(input: &[T]) -> Result<Vec<u8>> {
    let zero = T::default();
    let mut writer = VleWriter::with_capacity(input.len());
    let mut previous = 0i64;
    let mut i = 0;

    while i < input.len() {
        let zeros_start = i;
        while i < input.len() && input[i] == zero {
            i += 1;
        }
        writer.write((i - zeros_start) as u64)?;

        let nonzeros_start = i;
        while i < input.len() && input[i] != zero {
            i += 1;
        }
        writer.write((i - nonzeros_start) as u64)?;

        for &value in &input[nonzeros_start..i] {
            let current: i64 = value.into();
            writer.write(fold(current - previous))?;
            previous = current;
        }
    }

    Ok(writer.finish())
}

/// Decompress exactly `num_pixels` values from an RVL stream.
///
/// A stream that ends early, a run longer than the pixels left, or a value
/// outside `T`'s range is reported as an error instead of producing a
/// partially garbage frame.
pub fn decompress<T: DepthValue>(input: &[u8], num_pixels: usize) -> Result<Vec<T>> {
    // Every nonzero value takes at least one nibble; zero runs grow the buffer as they come.
    let mut output: Vec<T> = Vec::with_capacity(num_pixels.min(input.len().saturating_mul(2)));
    let mut reader = VleReader::new(input);
    let mut previous = 0i64;

    let truncated = |decoded: usize| RgbdError::RvlTruncated {
        decoded,
        expected: num_pixels,
    };

    while output.len() < num_pixels {
        let zeros = reader.read()?.ok_or_else(|| truncated(output.len()))?;
        let remaining = num_pixels - output.len();
        if zeros > remaining as u64 {
            return Err(RgbdError::RvlOverrun {
                run: zeros,
                remaining,
            });
        }
        output.resize(output.len() + zeros as usize, T::default());
        if output.len() == num_pixels {
            break;
        }

        let nonzeros = reader.read()?.ok_or_else(|| truncated(output.len()))?;
        let remaining = num_pixels - output.len();
        if nonzeros > remaining as u64 {
            return Err(RgbdError::RvlOverrun {
                run: nonzeros,
                remaining,
            });
        }
        for _ in 0..nonzeros {
            let folded = reader.read()?.ok_or_else(|| truncated(output.len()))?;
            let current = previous.wrapping_add(unfold(folded));
            let value = T::try_from(current)
                .map_err(|_| RgbdError::RvlValueOutOfRange { value: current })?;
            output.push(value);
            previous = current;
        }
    }

    Ok(output)
}
