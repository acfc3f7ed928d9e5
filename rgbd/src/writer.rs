//! Streaming writer for recordings.
//!
//! Layout: EBML header, then a Segment holding SeekHead and Info placeholders,
//! Tracks, Attachments, one Cluster per frame and finally Cues. The
//! placeholders and the Segment size are patched in [`RecordWriter::flush`].

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use glam::{Quat, Vec3};
use log::{debug, info};

use crate::block::encode_simple_block;
use crate::calibration::CameraCalibration;
use crate::codec::{AudioCodecType, ColorCodecType, DepthCodecPrivate, DepthCodecType};
use crate::element::*;
use crate::error::{Result, RgbdError};
use crate::frame::{quat_to_bytes, vec3_to_bytes, RecordFrame};
use crate::record::{
    CuePoint, CALIBRATION_FILE_NAME, CALIBRATION_MIME_TYPE, COVER_FILE_NAME, COVER_MIME_TYPE,
    DEFAULT_DEPTH_UNIT,
};
use crate::timecode::{self, TimeAnchor, TIMECODE_SCALE_NS, VIDEO_DEFAULT_DURATION_NS};
use crate::track::{TrackKind, ALL_TRACK_KINDS, TRACK_COLOR};
use crate::version::{MUXING_APP, WRITING_APP};

/// Bytes reserved for each of the SeekHead and Info elements.
pub const PLACEHOLDER_SIZE: usize = 256;

/// Opus decoder delay in samples at 48 kHz.
pub const OPUS_PRE_SKIP: u16 = 3840;

/// SeekPreRoll for the audio track, in nanoseconds.
pub const OPUS_SEEK_PRE_ROLL_NS: u64 = 80_000_000;

/// Seconds between the Unix epoch and the Matroska epoch (2001-01-01).
const MATROSKA_EPOCH_UNIX_SECS: u64 = 978_307_200;

/// Segment size field width, wide enough for any recording.
const SEGMENT_SIZE_WIDTH: usize = 8;

#[derive(Debug, Clone)]
pub struct RecordWriterConfig {
    pub sample_rate: u32,
    pub color_codec: ColorCodecType,
    pub depth_codec: DepthCodecType,
    pub audio_codec: AudioCodecType,
    pub depth_unit: f32,
    /// Mandatory. Attached as `calibration.json`.
    pub camera_calibration: Option<CameraCalibration>,
    /// Attached as `cover.png` when present.
    pub cover_png_bytes: Option<Vec<u8>>,
    pub title: Option<String>,
    /// Declare ACCELERATION, ROTATION_RATE, MAGNETIC_FIELD and GRAVITY.
    pub imu_tracks: bool,
    /// Declare TRANSLATION and ROTATION.
    pub pose_tracks: bool,
    /// Declare the CALIBRATION track.
    pub calibration_track: bool,
}

impl Default for RecordWriterConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            color_codec: ColorCodecType::Vp8,
            depth_codec: DepthCodecType::Tdc1,
            audio_codec: AudioCodecType::Opus,
            depth_unit: DEFAULT_DEPTH_UNIT,
            camera_calibration: None,
            cover_png_bytes: None,
            title: None,
            imu_tracks: true,
            pose_tracks: true,
            calibration_track: true,
        }
    }
}

impl RecordWriterConfig {
    pub fn declares(&self, kind: TrackKind) -> bool {
        match kind {
            TrackKind::Color | TrackKind::Depth | TrackKind::Audio => true,
            TrackKind::Calibration => self.calibration_track,
            k if k.is_imu() => self.imu_tracks,
            _ => self.pose_tracks,
        }
    }
}

/// RFC 7845 identification header for a mono stream.
pub fn opus_head(sample_rate: u32) -> Vec<u8> {
    let mut head = Vec::with_capacity(19);
    head.extend_from_slice(b"OpusHead");
    head.push(1); // version
    head.push(1); // channels
    head.extend_from_slice(&OPUS_PRE_SKIP.to_le_bytes());
    head.extend_from_slice(&sample_rate.to_le_bytes());
    head.extend_from_slice(&0u16.to_le_bytes()); // output gain
    head.push(0); // mapping family
    head
}

/// Stable TrackUID derived from the track number.
fn track_uid(track_number: u64) -> u64 {
    0x5247_4244_0000_0000 | track_number
}

fn file_uid(index: u64) -> u64 {
    0x4154_5441_0000_0000 | index
}

fn ebml_header() -> Vec<u8> {
    let mut buf = ElementBuf::new();
    buf.master(ID_EBML, |ebml| {
        ebml.uint(ID_EBML_VERSION, 1)
            .uint(ID_EBML_READ_VERSION, 1)
            .uint(ID_EBML_MAX_ID_LENGTH, 4)
            .uint(ID_EBML_MAX_SIZE_LENGTH, 8)
            .string(ID_DOC_TYPE, "matroska")
            .uint(ID_DOC_TYPE_VERSION, 2)
            .uint(ID_DOC_TYPE_READ_VERSION, 2);
    });
    buf.into_bytes()
}

fn tracks_payload(config: &RecordWriterConfig, calibration: &CameraCalibration) -> Result<Vec<u8>> {
    let depth_private = DepthCodecPrivate {
        depth_unit: config.depth_unit,
    }
    .to_bytes()?;

    let mut tracks = ElementBuf::new();
    for &kind in ALL_TRACK_KINDS.iter().filter(|&&k| config.declares(k)) {
        let codec_id = match kind {
            TrackKind::Color => config.color_codec.info().codec_id.to_string(),
            TrackKind::Depth => config.depth_codec.info().codec_id.to_string(),
            TrackKind::Audio => config.audio_codec.info().codec_id.to_string(),
            _ => kind.auxiliary_codec_id().unwrap_or_default(),
        };
        tracks.master(ID_TRACK_ENTRY, |entry| {
            entry
                .uint(ID_TRACK_NUMBER, kind.number())
                .uint(ID_TRACK_UID, track_uid(kind.number()))
                .uint(ID_TRACK_TYPE, kind.matroska_track_type())
                .string(ID_NAME, kind.name())
                .string(ID_CODEC_ID, &codec_id);
            match kind {
                TrackKind::Color | TrackKind::Depth => {
                    let (width, height) = if kind == TrackKind::Color {
                        (calibration.color_width(), calibration.color_height())
                    } else {
                        (calibration.depth_width(), calibration.depth_height())
                    };
                    entry.uint(ID_DEFAULT_DURATION, VIDEO_DEFAULT_DURATION_NS);
                    if kind == TrackKind::Depth {
                        entry.binary(ID_CODEC_PRIVATE, &depth_private);
                    }
                    entry.master(ID_VIDEO, |video| {
                        video
                            .uint(ID_PIXEL_WIDTH, width.max(0) as u64)
                            .uint(ID_PIXEL_HEIGHT, height.max(0) as u64);
                    });
                }
                TrackKind::Audio => {
                    let rate = config.sample_rate as f64;
                    entry
                        .uint(
                            ID_DEFAULT_DURATION,
                            timecode::audio_default_duration_ns(config.sample_rate),
                        )
                        .binary(ID_CODEC_PRIVATE, &opus_head(config.sample_rate))
                        .uint(ID_SEEK_PRE_ROLL, OPUS_SEEK_PRE_ROLL_NS)
                        .master(ID_AUDIO, |audio| {
                            audio
                                .float(ID_SAMPLING_FREQUENCY, rate)
                                .float(ID_OUTPUT_SAMPLING_FREQUENCY, rate)
                                .uint(ID_CHANNELS, 1)
                                .uint(ID_BIT_DEPTH, 32);
                        });
                }
                _ => {}
            }
        });
    }
    Ok(tracks.into_bytes())
}

fn attachments_payload(calibration: &CameraCalibration, cover_png: Option<&[u8]>) -> Result<Vec<u8>> {
    let calibration_json = calibration.to_json()?;
    let mut attachments = ElementBuf::new();
    attachments.master(ID_ATTACHED_FILE, |file| {
        file.string(ID_FILE_NAME, CALIBRATION_FILE_NAME)
            .string(ID_FILE_MIME_TYPE, CALIBRATION_MIME_TYPE)
            .binary(ID_FILE_DATA, calibration_json.as_bytes())
            .uint(ID_FILE_UID, file_uid(1));
    });
    if let Some(cover) = cover_png {
        attachments.master(ID_ATTACHED_FILE, |file| {
            file.string(ID_FILE_NAME, COVER_FILE_NAME)
                .string(ID_FILE_MIME_TYPE, COVER_MIME_TYPE)
                .binary(ID_FILE_DATA, cover)
                .uint(ID_FILE_UID, file_uid(2));
        });
    }
    Ok(attachments.into_bytes())
}

/// Info payload. Duration and DateUTC have fixed widths, so only the title
/// changes its size between `new` and `flush`.
fn info_payload(title: Option<&str>, duration: f64, date_utc: i64) -> Vec<u8> {
    let mut info = ElementBuf::new();
    info.uint(ID_TIMECODE_SCALE, TIMECODE_SCALE_NS)
        .float(ID_DURATION, duration)
        .string(ID_MUXING_APP, MUXING_APP)
        .string(ID_WRITING_APP, WRITING_APP)
        .binary(ID_DATE_UTC, &date_utc.to_be_bytes());
    if let Some(title) = title {
        info.string(ID_TITLE, title);
    }
    info.into_bytes()
}

fn date_utc_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64 - (MATROSKA_EPOCH_UNIX_SECS * 1_000_000_000) as i64)
        .unwrap_or(0)
}

/// Encode `id` + `payload` to occupy exactly `reserved` bytes, padding with Void.
fn fill_placeholder(id: u32, payload: &[u8], reserved: usize) -> Result<Vec<u8>> {
    let mut element = encode_element(id, payload, None);
    if element.len() > reserved {
        return Err(RgbdError::ElementTooLarge {
            size: element.len() as u64,
            reserved: reserved as u64,
        });
    }
    match reserved - element.len() {
        0 => {}
        // Too small for a Void; widen the size field by one byte instead.
        1 => {
            let width = vint_width(payload.len() as u64) + 1;
            element = encode_element(id, payload, Some(width));
        }
        leftover => {
            if let Some(void) = void_element(leftover) {
                element.extend_from_slice(&void);
            }
        }
    }
    Ok(element)
}

/// Writes a recording to any seekable sink.
pub struct RecordWriter<W: Write + Seek> {
    writer: W,
    config: RecordWriterConfig,
    segment_offset: u64,
    segment_data_offset: u64,
    seek_head_offset: u64,
    info_offset: u64,
    tracks_offset: u64,
    attachments_offset: u64,
    anchor: TimeAnchor,
    cue_points: Vec<CuePoint>,
    cluster_count: u64,
}

impl RecordWriter<BufWriter<File>> {
    /// Create (or truncate) `path` and start a recording in it.
    pub fn create(path: &Path, config: RecordWriterConfig) -> Result<Self> {
        let file = File::create(path).map_err(|e| RgbdError::IoAtOffset {
            offset: 0,
            context: "create output",
            source: e,
        })?;
        Self::new(BufWriter::new(file), config)
    }
}

impl<W: Write + Seek> RecordWriter<W> {
    /// Write everything up to the first cluster. Fails without a calibration.
    pub fn new(mut writer: W, config: RecordWriterConfig) -> Result<Self> {
        let calibration = config
            .camera_calibration
            .as_ref()
            .ok_or(RgbdError::MissingCalibration)?;
        // Fail before touching the sink if the title cannot fit the Info placeholder.
        fill_placeholder(ID_INFO, &info_payload(config.title.as_deref(), 0.0, 0), PLACEHOLDER_SIZE)?;

        let tracks = encode_element(ID_TRACKS, &tracks_payload(&config, calibration)?, None);
        let attachments = encode_element(
            ID_ATTACHMENTS,
            &attachments_payload(calibration, config.cover_png_bytes.as_deref())?,
            None,
        );

        writer.write_all(&ebml_header())?;

        let segment_offset = writer.stream_position()?;
        let mut segment_header = Vec::with_capacity(4 + SEGMENT_SIZE_WIDTH);
        write_id(&mut segment_header, ID_SEGMENT);
        // Unknown size until flush.
        segment_header.extend_from_slice(&[0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        writer.write_all(&segment_header)?;
        let segment_data_offset = writer.stream_position()?;

        let placeholder = void_element(PLACEHOLDER_SIZE).unwrap_or_default();
        let seek_head_offset = segment_data_offset;
        writer.write_all(&placeholder)?;
        let info_offset = writer.stream_position()?;
        writer.write_all(&placeholder)?;

        let tracks_offset = writer.stream_position()?;
        writer.write_all(&tracks)?;
        let attachments_offset = writer.stream_position()?;
        writer.write_all(&attachments)?;

        debug!(
            "started recording: segment data at 0x{segment_data_offset:X}, tracks at 0x{tracks_offset:X}, {} depth",
            config.depth_codec.info().codec_name
        );

        Ok(Self {
            writer,
            config,
            segment_offset,
            segment_data_offset,
            seek_head_offset,
            info_offset,
            tracks_offset,
            attachments_offset,
            anchor: TimeAnchor::new(),
            cue_points: Vec::new(),
            cluster_count: 0,
        })
    }

    pub fn config(&self) -> &RecordWriterConfig {
        &self.config
    }

    /// Absolute time of the first frame written, once known.
    pub fn initial_time_point_us(&self) -> Option<i64> {
        self.anchor.initial_time_point_us()
    }

    fn require(&self, kinds: &[TrackKind]) -> Result<()> {
        match kinds.iter().find(|&&k| !self.config.declares(k)) {
            Some(kind) => Err(RgbdError::TrackNotConfigured(kind.name())),
            None => Ok(()),
        }
    }

    fn write_cluster(&mut self, timecode: u64, blocks: &[(u64, bool, &[u8])]) -> Result<u64> {
        let position = self.writer.stream_position()? - self.segment_data_offset;
        let mut cluster = ElementBuf::new();
        cluster.master(ID_CLUSTER, |c| {
            c.uint(ID_TIMECODE, timecode);
            for &(track_number, keyframe, data) in blocks {
                c.binary(
                    ID_SIMPLE_BLOCK,
                    &encode_simple_block(track_number, 0, keyframe, data),
                );
            }
        });
        self.writer.write_all(cluster.as_bytes())?;
        self.cluster_count += 1;
        Ok(position)
    }

    /// Write color and depth blocks sharing one timestamp. Keyframes get a cue.
    pub fn write_video_frame(
        &mut self,
        time_point_us: i64,
        keyframe: bool,
        color_bytes: &[u8],
        depth_bytes: &[u8],
    ) -> Result<()> {
        let timecode = self.anchor.timecode(time_point_us)?;
        let position = self.write_cluster(
            timecode,
            &[
                (TrackKind::Color.number(), keyframe, color_bytes),
                (TrackKind::Depth.number(), keyframe, depth_bytes),
            ],
        )?;
        if keyframe {
            self.cue_points.push(CuePoint {
                time_point_us: timecode::timecode_to_us(timecode, TIMECODE_SCALE_NS),
                track_number: TRACK_COLOR,
                cluster_position: position,
            });
        }
        Ok(())
    }

    pub fn write_audio_frame(&mut self, time_point_us: i64, bytes: &[u8]) -> Result<()> {
        let timecode = self.anchor.timecode(time_point_us)?;
        self.write_cluster(timecode, &[(TrackKind::Audio.number(), true, bytes)])?;
        Ok(())
    }

    pub fn write_imu_frame(
        &mut self,
        time_point_us: i64,
        acceleration: Vec3,
        rotation_rate: Vec3,
        magnetic_field: Vec3,
        gravity: Vec3,
    ) -> Result<()> {
        self.require(crate::track::IMU_TRACK_KINDS)?;
        let timecode = self.anchor.timecode(time_point_us)?;
        let payloads = [acceleration, rotation_rate, magnetic_field, gravity].map(vec3_to_bytes);
        self.write_cluster(
            timecode,
            &[
                (TrackKind::Acceleration.number(), true, &payloads[0][..]),
                (TrackKind::RotationRate.number(), true, &payloads[1][..]),
                (TrackKind::MagneticField.number(), true, &payloads[2][..]),
                (TrackKind::Gravity.number(), true, &payloads[3][..]),
            ],
        )?;
        Ok(())
    }

    pub fn write_pose_frame(&mut self, time_point_us: i64, translation: Vec3, rotation: Quat) -> Result<()> {
        self.require(crate::track::POSE_TRACK_KINDS)?;
        let timecode = self.anchor.timecode(time_point_us)?;
        self.write_cluster(
            timecode,
            &[
                (TrackKind::Translation.number(), true, &vec3_to_bytes(translation)[..]),
                (TrackKind::Rotation.number(), true, &quat_to_bytes(rotation)[..]),
            ],
        )?;
        Ok(())
    }

    pub fn write_calibration_frame(
        &mut self,
        time_point_us: i64,
        calibration: &CameraCalibration,
    ) -> Result<()> {
        self.require(&[TrackKind::Calibration])?;
        let json = calibration.to_json()?;
        let timecode = self.anchor.timecode(time_point_us)?;
        self.write_cluster(
            timecode,
            &[(TrackKind::Calibration.number(), true, json.as_bytes())],
        )?;
        Ok(())
    }

    pub fn write_frame(&mut self, frame: &RecordFrame) -> Result<()> {
        match frame {
            RecordFrame::Video(f) => {
                self.write_video_frame(f.time_point_us, f.keyframe, &f.color_bytes, &f.depth_bytes)
            }
            RecordFrame::Audio(f) => self.write_audio_frame(f.time_point_us, &f.bytes),
            RecordFrame::Imu(f) => self.write_imu_frame(
                f.time_point_us,
                f.acceleration,
                f.rotation_rate,
                f.magnetic_field,
                f.gravity,
            ),
            RecordFrame::Pose(f) => self.write_pose_frame(f.time_point_us, f.translation, f.rotation),
            RecordFrame::Calibration(f) => {
                self.write_calibration_frame(f.time_point_us, &f.camera_calibration)
            }
        }
    }

    fn cues_payload(&self) -> Vec<u8> {
        let mut cues = ElementBuf::new();
        for cue in &self.cue_points {
            cues.master(ID_CUE_POINT, |point| {
                point
                    .uint(ID_CUE_TIME, timecode::us_to_timecode(cue.time_point_us as u64, TIMECODE_SCALE_NS))
                    .master(ID_CUE_TRACK_POSITIONS, |positions| {
                        positions
                            .uint(ID_CUE_TRACK, cue.track_number)
                            .uint(ID_CUE_CLUSTER_POSITION, cue.cluster_position);
                    });
            });
        }
        cues.into_bytes()
    }

    fn seek_head_payload(&self, cues_offset: Option<u64>) -> Vec<u8> {
        let mut entries = vec![
            (ID_INFO, self.info_offset),
            (ID_TRACKS, self.tracks_offset),
            (ID_ATTACHMENTS, self.attachments_offset),
        ];
        entries.extend(cues_offset.map(|offset| (ID_CUES, offset)));

        let mut seek_head = ElementBuf::new();
        for (id, offset) in entries {
            let mut id_bytes = Vec::with_capacity(4);
            write_id(&mut id_bytes, id);
            seek_head.master(ID_SEEK, |seek| {
                seek.binary(ID_SEEK_ID, &id_bytes)
                    .uint(ID_SEEK_POSITION, offset - self.segment_data_offset);
            });
        }
        seek_head.into_bytes()
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        self.writer.seek(SeekFrom::Start(offset))?;
        self.writer.write_all(bytes)?;
        Ok(())
    }

    /// Write Cues, patch SeekHead, Info and the Segment size, and hand back
    /// the sink positioned at its end.
    pub fn flush(mut self) -> Result<W> {
        let cues_offset = if self.cue_points.is_empty() {
            None
        } else {
            let offset = self.writer.stream_position()?;
            let cues = encode_element(ID_CUES, &self.cues_payload(), None);
            self.writer.write_all(&cues)?;
            Some(offset)
        };
        let end = self.writer.stream_position()?;

        let info_payload = info_payload(
            self.config.title.as_deref(),
            self.anchor.last_timecode() as f64,
            date_utc_now(),
        );
        let info = fill_placeholder(ID_INFO, &info_payload, PLACEHOLDER_SIZE)?;
        self.write_at(self.info_offset, &info)?;

        let seek_head = fill_placeholder(ID_SEEK_HEAD, &self.seek_head_payload(cues_offset), PLACEHOLDER_SIZE)?;
        self.write_at(self.seek_head_offset, &seek_head)?;

        let segment_size = end - self.segment_data_offset;
        let mut size = Vec::with_capacity(SEGMENT_SIZE_WIDTH);
        write_vint(&mut size, segment_size, SEGMENT_SIZE_WIDTH);
        self.write_at(self.segment_offset + 4, &size)?;

        self.writer.seek(SeekFrom::Start(end))?;
        self.writer.flush()?;

        info!(
            "wrote {} clusters, {} cues, duration {:.3}s",
            self.cluster_count,
            self.cue_points.len(),
            timecode::duration_seconds(self.anchor.last_timecode() as f64, TIMECODE_SCALE_NS)
        );
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::UndistortedCalibration;
    use std::io::Cursor;

    fn config() -> RecordWriterConfig {
        RecordWriterConfig {
            camera_calibration: Some(CameraCalibration::Undistorted(UndistortedCalibration {
                color_width: 640,
                color_height: 480,
                depth_width: 320,
                depth_height: 240,
                fx: 1.0,
                fy: 1.0,
                cx: 0.5,
                cy: 0.5,
            })),
            ..Default::default()
        }
    }

    #[test]
    fn test_opus_head_layout() {
        let head = opus_head(48_000);
        assert_eq!(head.len(), 19);
        assert_eq!(&head[..8], b"OpusHead");
        assert_eq!(head[8], 1);
        assert_eq!(head[9], 1);
        assert_eq!(u16::from_le_bytes([head[10], head[11]]), 3840);
        assert_eq!(u32::from_le_bytes([head[12], head[13], head[14], head[15]]), 48_000);
        assert_eq!(&head[16..], &[0, 0, 0]);
    }

    #[test]
    fn test_fill_placeholder_sizes() {
        for payload_len in [0usize, 10, 120, 126, 200, 248, 249, 250] {
            let payload = vec![0xAB; payload_len];
            let element = fill_placeholder(ID_INFO, &payload, PLACEHOLDER_SIZE).unwrap();
            assert_eq!(element.len(), PLACEHOLDER_SIZE, "payload {payload_len}");
            let first = children(&element, 0).next().unwrap().unwrap();
            assert_eq!(first.id, ID_INFO);
            assert_eq!(first.data.len(), payload_len);
        }
        assert!(matches!(
            fill_placeholder(ID_INFO, &[0; 300], PLACEHOLDER_SIZE),
            Err(RgbdError::ElementTooLarge { reserved: 256, .. })
        ));
    }

    #[test]
    fn test_oversized_title_is_rejected_up_front() {
        let result = RecordWriter::new(
            Cursor::new(Vec::new()),
            RecordWriterConfig {
                title: Some("x".repeat(300)),
                ..config()
            },
        );
        assert!(matches!(
            result,
            Err(RgbdError::ElementTooLarge { reserved: 256, .. })
        ));

        let mut writer = RecordWriter::new(
            Cursor::new(Vec::new()),
            RecordWriterConfig {
                title: Some("x".repeat(150)),
                ..config()
            },
        )
        .unwrap();
        writer.write_audio_frame(10, &[1]).unwrap();
        assert!(writer.flush().is_ok());
    }

    #[test]
    fn test_missing_calibration_is_fatal() {
        let result = RecordWriter::new(Cursor::new(Vec::new()), RecordWriterConfig::default());
        assert!(matches!(result, Err(RgbdError::MissingCalibration)));
    }

    #[test]
    fn test_segment_size_is_patched() {
        let mut writer = RecordWriter::new(Cursor::new(Vec::new()), config()).unwrap();
        writer.write_audio_frame(10, &[1, 2, 3]).unwrap();
        let bytes = writer.flush().unwrap().into_inner();

        let mut cursor = Cursor::new(&bytes);
        let ebml = read_element_header(&mut cursor).unwrap().unwrap();
        skip_element(&mut cursor, &ebml).unwrap();
        let segment = read_element_header(&mut cursor).unwrap().unwrap();
        assert_eq!(segment.id, ID_SEGMENT);
        assert_eq!(segment.end().unwrap(), bytes.len() as u64);
    }

    #[test]
    fn test_unconfigured_tracks_are_rejected() {
        let mut writer = RecordWriter::new(
            Cursor::new(Vec::new()),
            RecordWriterConfig {
                imu_tracks: false,
                ..config()
            },
        )
        .unwrap();
        assert!(matches!(
            writer.write_imu_frame(0, Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, Vec3::ZERO),
            Err(RgbdError::TrackNotConfigured("ACCELERATION"))
        ));
        // The rejected frame did not anchor the timeline.
        assert_eq!(writer.initial_time_point_us(), None);
    }

    #[test]
    fn test_out_of_order_frame_is_rejected() {
        let mut writer = RecordWriter::new(Cursor::new(Vec::new()), config()).unwrap();
        writer.write_video_frame(1_000, true, &[1], &[2]).unwrap();
        assert!(matches!(
            writer.write_audio_frame(999, &[3]),
            Err(RgbdError::TimestampOrderViolation { .. })
        ));
    }
}
