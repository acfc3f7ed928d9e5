use glam::{Quat, Vec3};
use serde::Serializer;

use crate::calibration::CameraCalibration;
use crate::error::{Result, RgbdError};

/// Size of a little-endian vec3 block payload.
pub const VEC3_PAYLOAD_SIZE: usize = 12;
/// Size of a little-endian quaternion block payload (w, x, y, z).
pub const QUAT_PAYLOAD_SIZE: usize = 16;

/// Frame payloads are summarized by their size in serialized output.
pub(crate) fn serialize_len<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(bytes.len() as u64)
}

/// Color and depth blocks sharing one timestamp.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct VideoFrame {
    /// Microseconds relative to the first frame of the recording.
    pub time_point_us: i64,
    pub keyframe: bool,
    /// Encoded color frame (VP8).
    #[serde(rename = "color_size", serialize_with = "serialize_len")]
    #[cfg_attr(feature = "jsonschema", schemars(with = "u64"))]
    pub color_bytes: Vec<u8>,
    /// Encoded depth frame (RVL or TDC1).
    #[serde(rename = "depth_size", serialize_with = "serialize_len")]
    #[cfg_attr(feature = "jsonschema", schemars(with = "u64"))]
    pub depth_bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct AudioFrame {
    pub time_point_us: i64,
    /// One encoded Opus packet.
    #[serde(rename = "size", serialize_with = "serialize_len")]
    #[cfg_attr(feature = "jsonschema", schemars(with = "u64"))]
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct ImuFrame {
    pub time_point_us: i64,
    #[cfg_attr(feature = "jsonschema", schemars(with = "[f32; 3]"))]
    pub acceleration: Vec3,
    #[cfg_attr(feature = "jsonschema", schemars(with = "[f32; 3]"))]
    pub rotation_rate: Vec3,
    #[cfg_attr(feature = "jsonschema", schemars(with = "[f32; 3]"))]
    pub magnetic_field: Vec3,
    #[cfg_attr(feature = "jsonschema", schemars(with = "[f32; 3]"))]
    pub gravity: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct PoseFrame {
    pub time_point_us: i64,
    #[cfg_attr(feature = "jsonschema", schemars(with = "[f32; 3]"))]
    pub translation: Vec3,
    /// Serialized as [x, y, z, w].
    #[cfg_attr(feature = "jsonschema", schemars(with = "[f32; 4]"))]
    pub rotation: Quat,
}

/// A calibration change taking effect at `time_point_us`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct CalibrationFrame {
    pub time_point_us: i64,
    pub camera_calibration: CameraCalibration,
}

/// One cluster's worth of content.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(tag = "type")]
pub enum RecordFrame {
    Video(VideoFrame),
    Audio(AudioFrame),
    Imu(ImuFrame),
    Pose(PoseFrame),
    Calibration(CalibrationFrame),
}

impl RecordFrame {
    pub fn time_point_us(&self) -> i64 {
        match self {
            RecordFrame::Video(f) => f.time_point_us,
            RecordFrame::Audio(f) => f.time_point_us,
            RecordFrame::Imu(f) => f.time_point_us,
            RecordFrame::Pose(f) => f.time_point_us,
            RecordFrame::Calibration(f) => f.time_point_us,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RecordFrame::Video(_) => "video",
            RecordFrame::Audio(_) => "audio",
            RecordFrame::Imu(_) => "imu",
            RecordFrame::Pose(_) => "pose",
            RecordFrame::Calibration(_) => "calibration",
        }
    }
}

pub fn vec3_to_bytes(v: Vec3) -> [u8; VEC3_PAYLOAD_SIZE] {
    let mut out = [0u8; VEC3_PAYLOAD_SIZE];
    for (chunk, value) in out.chunks_exact_mut(4).zip([v.x, v.y, v.z]) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    out
}

pub fn quat_to_bytes(q: Quat) -> [u8; QUAT_PAYLOAD_SIZE] {
    let mut out = [0u8; QUAT_PAYLOAD_SIZE];
    for (chunk, value) in out.chunks_exact_mut(4).zip([q.w, q.x, q.y, q.z]) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    out
}

fn read_f32s<const N: usize>(data: &[u8], offset: u64) -> Result<[f32; N]> {
    if data.len() < N * 4 {
        return Err(RgbdError::ShortPayload {
            offset,
            expected: N * 4,
            got: data.len(),
        });
    }
    let mut values = [0f32; N];
    for (value, chunk) in values.iter_mut().zip(data.chunks_exact(4)) {
        *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(values)
}

/// Decode a vec3 block payload. `offset` locates the block for errors.
pub fn vec3_from_bytes(data: &[u8], offset: u64) -> Result<Vec3> {
    let [x, y, z] = read_f32s::<3>(data, offset)?;
    Ok(Vec3::new(x, y, z))
}

/// Decode a quaternion block payload stored as (w, x, y, z).
pub fn quat_from_bytes(data: &[u8], offset: u64) -> Result<Quat> {
    let [w, x, y, z] = read_f32s::<4>(data, offset)?;
    Ok(Quat::from_xyzw(x, y, z, w))
}
