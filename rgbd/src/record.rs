use serde::Serializer;

use crate::calibration::{CameraCalibration, DirectionTable};
use crate::codec::{AudioCodecType, ColorCodecType, DepthCodecType};
use crate::frame::{AudioFrame, CalibrationFrame, ImuFrame, PoseFrame, RecordFrame, VideoFrame};
use crate::timecode;
use crate::track::TrackKind;

/// Depth unit assumed when the depth track carries no codec-private blob.
pub const DEFAULT_DEPTH_UNIT: f32 = 0.001;

pub const CALIBRATION_FILE_NAME: &str = "calibration.json";
pub const CALIBRATION_MIME_TYPE: &str = "application/octet-stream";
pub const COVER_FILE_NAME: &str = "cover.png";
pub const COVER_MIME_TYPE: &str = "image/png";

fn serialize_opt_len<S: Serializer>(
    bytes: &Option<Vec<u8>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match bytes {
        Some(bytes) => serializer.serialize_some(&bytes.len()),
        None => serializer.serialize_none(),
    }
}

/// Absolute file offsets of the top-level elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct RecordOffsets {
    /// First byte of the Segment payload; SeekHead and Cue positions are relative to it.
    pub segment_data_offset: u64,
    pub seek_head_offset: Option<u64>,
    pub info_offset: u64,
    pub tracks_offset: u64,
    pub attachments_offset: u64,
    pub first_cluster_offset: Option<u64>,
    pub cues_offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct RecordInfo {
    pub timecode_scale_ns: u64,
    /// Duration in timecode-scale ticks, as stored.
    pub duration: f64,
    pub muxing_app: Option<String>,
    pub writing_app: String,
    pub title: Option<String>,
    /// Nanoseconds since 2001-01-01T00:00:00 UTC.
    pub date_utc: Option<i64>,
}

impl RecordInfo {
    pub fn duration_us(&self) -> i64 {
        timecode::timecode_to_us(self.duration.max(0.0) as u64, self.timecode_scale_ns)
    }

    pub fn duration_seconds(&self) -> f64 {
        timecode::duration_seconds(self.duration, self.timecode_scale_ns)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct ColorTrack {
    pub track_number: u64,
    pub codec: ColorCodecType,
    pub width: u64,
    pub height: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct DepthTrack {
    pub track_number: u64,
    pub codec: DepthCodecType,
    pub width: u64,
    pub height: u64,
    /// Meters per depth value step.
    pub depth_unit: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct AudioTrack {
    pub track_number: u64,
    pub codec: AudioCodecType,
    pub sampling_frequency: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct RecordTracks {
    pub color_track: ColorTrack,
    pub depth_track: DepthTrack,
    pub audio_track: AudioTrack,
    pub acceleration_track_number: Option<u64>,
    pub rotation_rate_track_number: Option<u64>,
    pub magnetic_field_track_number: Option<u64>,
    pub gravity_track_number: Option<u64>,
    pub translation_track_number: Option<u64>,
    pub rotation_track_number: Option<u64>,
    pub calibration_track_number: Option<u64>,
}

impl RecordTracks {
    /// Track number carrying `kind`, if the recording declares it.
    pub fn track_number(&self, kind: TrackKind) -> Option<u64> {
        match kind {
            TrackKind::Color => Some(self.color_track.track_number),
            TrackKind::Depth => Some(self.depth_track.track_number),
            TrackKind::Audio => Some(self.audio_track.track_number),
            TrackKind::Acceleration => self.acceleration_track_number,
            TrackKind::RotationRate => self.rotation_rate_track_number,
            TrackKind::MagneticField => self.magnetic_field_track_number,
            TrackKind::Gravity => self.gravity_track_number,
            TrackKind::Translation => self.translation_track_number,
            TrackKind::Rotation => self.rotation_track_number,
            TrackKind::Calibration => self.calibration_track_number,
        }
    }

    /// Reverse lookup of [`Self::track_number`].
    pub fn kind_of(&self, track_number: u64) -> Option<TrackKind> {
        crate::track::ALL_TRACK_KINDS
            .iter()
            .copied()
            .find(|&kind| self.track_number(kind) == Some(track_number))
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct RecordAttachments {
    pub camera_calibration: CameraCalibration,
    /// PNG cover image, summarized by size in serialized output.
    #[serde(rename = "cover_png_size", serialize_with = "serialize_opt_len")]
    #[cfg_attr(feature = "jsonschema", schemars(with = "Option<u64>"))]
    pub cover_png_bytes: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct CuePoint {
    pub time_point_us: i64,
    pub track_number: u64,
    /// Cluster position relative to the Segment payload.
    pub cluster_position: u64,
}

/// A parsed recording.
#[derive(Debug, Clone, serde::Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct Record {
    pub offsets: RecordOffsets,
    pub info: RecordInfo,
    pub tracks: RecordTracks,
    pub attachments: RecordAttachments,
    pub video_frames: Vec<VideoFrame>,
    pub audio_frames: Vec<AudioFrame>,
    pub imu_frames: Vec<ImuFrame>,
    pub pose_frames: Vec<PoseFrame>,
    pub calibration_frames: Vec<CalibrationFrame>,
    pub cue_points: Vec<CuePoint>,
    #[serde(skip)]
    #[cfg_attr(feature = "jsonschema", schemars(skip))]
    pub direction_table: Option<DirectionTable>,
}

impl Record {
    pub fn frame_count(&self) -> usize {
        self.video_frames.len()
            + self.audio_frames.len()
            + self.imu_frames.len()
            + self.pose_frames.len()
            + self.calibration_frames.len()
    }

    /// All frames merged by timestamp. Frames with equal timestamps keep
    /// video, audio, IMU, pose, calibration order.
    pub fn frames(&self) -> Vec<RecordFrame> {
        let mut frames = Vec::with_capacity(self.frame_count());
        frames.extend(self.video_frames.iter().cloned().map(RecordFrame::Video));
        frames.extend(self.audio_frames.iter().cloned().map(RecordFrame::Audio));
        frames.extend(self.imu_frames.iter().copied().map(RecordFrame::Imu));
        frames.extend(self.pose_frames.iter().copied().map(RecordFrame::Pose));
        frames.extend(
            self.calibration_frames
                .iter()
                .cloned()
                .map(RecordFrame::Calibration),
        );
        frames.sort_by_key(|f| f.time_point_us());
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::UndistortedCalibration;

    fn tracks() -> RecordTracks {
        RecordTracks {
            color_track: ColorTrack { track_number: 1, codec: ColorCodecType::Vp8, width: 640, height: 480 },
            depth_track: DepthTrack {
                track_number: 2,
                codec: DepthCodecType::Tdc1,
                width: 320,
                height: 240,
                depth_unit: DEFAULT_DEPTH_UNIT,
            },
            audio_track: AudioTrack { track_number: 3, codec: AudioCodecType::Opus, sampling_frequency: 48000.0 },
            acceleration_track_number: Some(4),
            rotation_rate_track_number: None,
            magnetic_field_track_number: None,
            gravity_track_number: None,
            translation_track_number: None,
            rotation_track_number: None,
            calibration_track_number: Some(10),
        }
    }

    #[test]
    fn test_track_lookup() {
        let tracks = tracks();
        assert_eq!(tracks.track_number(TrackKind::Depth), Some(2));
        assert_eq!(tracks.track_number(TrackKind::Gravity), None);
        assert_eq!(tracks.kind_of(4), Some(TrackKind::Acceleration));
        assert_eq!(tracks.kind_of(10), Some(TrackKind::Calibration));
        assert_eq!(tracks.kind_of(7), None);
    }

    #[test]
    fn test_info_duration() {
        let info = RecordInfo {
            timecode_scale_ns: 1000,
            duration: 1_500_000.0,
            muxing_app: None,
            writing_app: "librgbd-test".into(),
            title: None,
            date_utc: None,
        };
        assert_eq!(info.duration_us(), 1_500_000);
        assert_eq!(info.duration_seconds(), 1.5);
    }

    #[test]
    fn test_frames_are_merged_by_time() {
        let record = Record {
            offsets: RecordOffsets::default(),
            info: RecordInfo {
                timecode_scale_ns: 1000,
                duration: 0.0,
                muxing_app: None,
                writing_app: String::new(),
                title: None,
                date_utc: None,
            },
            tracks: tracks(),
            attachments: RecordAttachments {
                camera_calibration: CameraCalibration::Undistorted(UndistortedCalibration {
                    color_width: 640,
                    color_height: 480,
                    depth_width: 320,
                    depth_height: 240,
                    fx: 1.0,
                    fy: 1.0,
                    cx: 0.5,
                    cy: 0.5,
                }),
                cover_png_bytes: Some(vec![0; 3]),
            },
            video_frames: vec![VideoFrame {
                time_point_us: 100,
                keyframe: true,
                color_bytes: vec![],
                depth_bytes: vec![],
            }],
            audio_frames: vec![
                AudioFrame { time_point_us: 0, bytes: vec![] },
                AudioFrame { time_point_us: 100, bytes: vec![] },
            ],
            imu_frames: vec![],
            pose_frames: vec![],
            calibration_frames: vec![],
            cue_points: vec![],
            direction_table: None,
        };

        let kinds: Vec<&str> = record.frames().iter().map(|f| f.kind()).collect();
        assert_eq!(kinds, vec!["audio", "video", "audio"]);
        assert_eq!(record.frame_count(), 3);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["attachments"]["cover_png_size"], 3);
        assert!(value.get("direction_table").is_none());
    }
}
