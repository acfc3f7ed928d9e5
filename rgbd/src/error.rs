use thiserror::Error;

#[derive(Error, Debug)]
pub enum RgbdError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error at offset 0x{offset:X} ({context}): {source}")]
    IoAtOffset {
        offset: u64,
        context: &'static str,
        source: std::io::Error,
    },

    #[error("unexpected EOF at offset 0x{offset:X}")]
    UnexpectedEof { offset: u64 },

    #[error("invalid variable-length integer at offset 0x{offset:X}")]
    InvalidVint { offset: u64 },

    #[error("element at offset 0x{offset:X} has an unknown size")]
    UnknownSize { offset: u64 },

    #[error("unexpected element at offset 0x{offset:X}: expected 0x{expected:X}, got 0x{got:X}")]
    UnexpectedElement { offset: u64, expected: u32, got: u32 },

    #[error("invalid {what} in element at offset 0x{offset:X}")]
    InvalidPayload { offset: u64, what: &'static str },

    #[error("payload too short at offset 0x{offset:X}: expected at least {expected} bytes, got {got}")]
    ShortPayload {
        offset: u64,
        expected: usize,
        got: usize,
    },

    #[error("missing mandatory element: {name}")]
    MissingElement { name: &'static str },

    #[error("missing mandatory track: {name}")]
    MissingTrack { name: &'static str },

    #[error("invalid {track} codec: {codec}")]
    InvalidCodec { track: &'static str, codec: String },

    #[error("recording has no camera calibration")]
    MissingCalibration,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cluster at offset 0x{offset:X} has no {missing} block")]
    IncompleteCluster { offset: u64, missing: &'static str },

    #[error("value does not fit in 63 bits of variable-length encoding")]
    VleOverflow,

    #[error("RVL stream ended after {decoded} of {expected} values")]
    RvlTruncated { decoded: usize, expected: usize },

    #[error("RVL run of {run} values overruns the {remaining} remaining values")]
    RvlOverrun { run: u64, remaining: usize },

    #[error("RVL value {value} does not fit the target depth type")]
    RvlValueOutOfRange { value: i64 },

    #[error("depth frame header too short: expected {expected} bytes, got {got}")]
    TruncatedFrameHeader { expected: usize, got: usize },

    #[error("invalid depth frame dimensions {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },

    #[error("depth frame has {got} values, expected {expected}")]
    InvalidFrameSize { expected: usize, got: usize },

    #[error("invalid frame sequence: {0}")]
    InvalidFrameSequence(String),

    #[error("timestamp {time_point_us}us is out of order (anchor or last written timestamp is {last_us}us)")]
    TimestampOrderViolation { time_point_us: i64, last_us: i64 },

    #[error("track {0} is not configured in this recording")]
    TrackNotConfigured(&'static str),

    #[error("element of {size} bytes does not fit its reserved space of {reserved} bytes")]
    ElementTooLarge { size: u64, reserved: u64 },
}

pub type Result<T> = std::result::Result<T, RgbdError>;
