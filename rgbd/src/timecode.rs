use crate::error::{Result, RgbdError};

/// Nanoseconds per timecode tick written to Info. Timecodes are microseconds.
pub const TIMECODE_SCALE_NS: u64 = 1000;

/// Nominal video frame duration (30 fps) in nanoseconds.
pub const VIDEO_DEFAULT_DURATION_NS: u64 = 1_000_000_000 / 30;

/// Nanoseconds one audio sample lasts at `sample_rate`.
pub fn audio_default_duration_ns(sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    1_000_000_000 / sample_rate as u64
}

/// Convert a cluster timecode to microseconds.
///
/// Uses i128 so that large timecodes with coarse scales do not overflow.
pub fn timecode_to_us(timecode: u64, timecode_scale_ns: u64) -> i64 {
    let us = timecode as i128 * timecode_scale_ns as i128 / 1000;
    us.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Convert a microsecond offset to ticks of `timecode_scale_ns`.
pub fn us_to_timecode(us: u64, timecode_scale_ns: u64) -> u64 {
    if timecode_scale_ns == 0 {
        return 0;
    }
    (us as u128 * 1000 / timecode_scale_ns as u128) as u64
}

/// Info Duration (in timecode ticks) to seconds.
pub fn duration_seconds(duration: f64, timecode_scale_ns: u64) -> f64 {
    duration * timecode_scale_ns as f64 / 1e9
}

/// Anchors absolute timestamps at the first frame written and hands out
/// non-decreasing relative timecodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeAnchor {
    initial_time_point_us: Option<i64>,
    last_timecode: u64,
}

impl TimeAnchor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_time_point_us(&self) -> Option<i64> {
        self.initial_time_point_us
    }

    /// Timecode of the most recent frame, zero before any frame.
    pub fn last_timecode(&self) -> u64 {
        self.last_timecode
    }

    /// Timecode for a frame at `time_point_us`, anchoring on the first call.
    ///
    /// Fails for frames before the anchor or before the previous frame.
    pub fn timecode(&mut self, time_point_us: i64) -> Result<u64> {
        let initial = *self.initial_time_point_us.get_or_insert(time_point_us);
        let relative = time_point_us.checked_sub(initial).unwrap_or(-1);
        if relative < 0 {
            return Err(RgbdError::TimestampOrderViolation {
                time_point_us,
                last_us: initial,
            });
        }
        let timecode = us_to_timecode(relative as u64, TIMECODE_SCALE_NS);
        if timecode < self.last_timecode {
            return Err(RgbdError::TimestampOrderViolation {
                time_point_us,
                last_us: initial.saturating_add(timecode_to_us(self.last_timecode, TIMECODE_SCALE_NS)),
            });
        }
        self.last_timecode = timecode;
        Ok(timecode)
    }
}
