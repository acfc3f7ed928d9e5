use std::io::Cursor;

use glam::{Quat, Vec2, Vec3};
use rgbd::calibration::{CameraCalibration, KinectCalibration, UndistortedCalibration};
use rgbd::codec::DepthCodecType;
use rgbd::depth::{DepthDecoder, DepthEncoder};
use rgbd::frame::{AudioFrame, CalibrationFrame, ImuFrame, PoseFrame, VideoFrame};
use rgbd::parser::RecordParser;
use rgbd::tdc1::{Tdc1Encoder, is_tdc1_keyframe};
use rgbd::element::void_element;
use rgbd::writer::{RecordWriter, RecordWriterConfig, PLACEHOLDER_SIZE};
use rgbd::{RecordBuilder, RgbdError};

const DEPTH_WIDTH: i32 = 8;
const DEPTH_HEIGHT: i32 = 6;

fn undistorted() -> CameraCalibration {
    CameraCalibration::Undistorted(UndistortedCalibration {
        color_width: 16,
        color_height: 12,
        depth_width: DEPTH_WIDTH,
        depth_height: DEPTH_HEIGHT,
        fx: 0.9,
        fy: 1.2,
        cx: 0.5,
        cy: 0.5,
    })
}

fn kinect() -> CameraCalibration {
    CameraCalibration::AzureKinect(KinectCalibration {
        color_width: 1280,
        color_height: 720,
        depth_width: 640,
        depth_height: 576,
        resolution_width: 640,
        resolution_height: 576,
        cx: 319.5,
        cy: 338.6,
        fx: 504.2,
        fy: 504.3,
        k1: 0.71,
        k2: 0.33,
        k3: 0.016,
        k4: 1.05,
        k5: 0.56,
        k6: 0.09,
        codx: 0.0,
        cody: 0.0,
        p1: -0.00011,
        p2: 0.00005,
        max_radius_for_projection: 1.7,
    })
}

fn depth_image(seed: i32) -> Vec<i32> {
    (0..DEPTH_WIDTH * DEPTH_HEIGHT)
        .map(|i| if i % 7 == 0 { 0 } else { 1000 + seed * 100 + i * 3 })
        .collect()
}

fn imu(time_point_us: i64) -> ImuFrame {
    ImuFrame {
        time_point_us,
        acceleration: Vec3::new(0.1, -9.8, 0.25),
        rotation_rate: Vec3::new(0.01, 0.02, -0.03),
        magnetic_field: Vec3::new(30.5, -12.25, 4.0),
        gravity: Vec3::new(0.0, -1.0, 0.0),
    }
}

fn pose(time_point_us: i64) -> PoseFrame {
    PoseFrame {
        time_point_us,
        translation: Vec3::new(1.5, -0.25, 3.0),
        rotation: Quat::from_xyzw(0.1, 0.2, 0.3, 0.927_362),
    }
}

fn video(time_point_us: i64, keyframe: bool) -> VideoFrame {
    VideoFrame {
        time_point_us,
        keyframe,
        color_bytes: vec![time_point_us as u8; 4],
        depth_bytes: vec![1, 2, 3],
    }
}

/// Rewrite a track's Name element in place to a name of the same length.
fn rename_track(bytes: &mut [u8], from: &str, to: &str) {
    assert_eq!(from.len(), to.len());
    let mut needle = vec![0x53, 0x6E, 0x80 | from.len() as u8];
    needle.extend_from_slice(from.as_bytes());
    let at = bytes
        .windows(needle.len())
        .position(|w| w == needle.as_slice())
        .expect("track name present");
    bytes[at + 3..at + needle.len()].copy_from_slice(to.as_bytes());
}

#[test]
fn test_container_round_trip() {
    let mut builder = RecordBuilder::new()
        .calibration(undistorted())
        .depth_codec(DepthCodecType::Rvl)
        .depth_unit(0.0005)
        .cover_png(vec![0x89, b'P', b'N', b'G', 1, 2, 3])
        .title("round trip");

    builder.add_video_frame(VideoFrame {
        time_point_us: 1_000_000,
        keyframe: true,
        color_bytes: vec![1, 2, 3],
        depth_bytes: vec![4, 5, 6, 7],
    });
    builder.add_video_frame(VideoFrame {
        time_point_us: 1_033_333,
        keyframe: false,
        color_bytes: vec![8; 300],
        depth_bytes: vec![9; 20],
    });
    builder.add_audio_frame(AudioFrame {
        time_point_us: 1_010_000,
        bytes: vec![0xFC, 0xFF, 0xFE],
    });
    builder.add_imu_frame(imu(1_020_000));
    builder.add_pose_frame(pose(1_025_000));
    builder.add_calibration_frame(CalibrationFrame {
        time_point_us: 1_030_000,
        camera_calibration: kinect(),
    });

    let bytes = builder.build().expect("failed to build recording");
    let record = RecordParser::from_bytes(bytes)
        .parse(true, false)
        .expect("failed to parse recording");

    assert_eq!(record.info.timecode_scale_ns, 1000);
    assert_eq!(record.info.title.as_deref(), Some("round trip"));
    assert!(record.info.writing_app.starts_with("librgbd-"));
    assert_eq!(record.info.duration_us(), 33_333);

    let tracks = &record.tracks;
    assert_eq!(tracks.color_track.track_number, 1);
    assert_eq!((tracks.color_track.width, tracks.color_track.height), (16, 12));
    assert_eq!(tracks.depth_track.codec, DepthCodecType::Rvl);
    assert_eq!((tracks.depth_track.width, tracks.depth_track.height), (8, 6));
    assert_eq!(tracks.depth_track.depth_unit, 0.0005);
    assert_eq!(tracks.audio_track.sampling_frequency, 48000.0);
    assert_eq!(tracks.acceleration_track_number, Some(4));
    assert_eq!(tracks.rotation_track_number, Some(9));
    assert_eq!(tracks.calibration_track_number, Some(10));

    assert_eq!(record.attachments.camera_calibration, undistorted());
    assert_eq!(
        record.attachments.cover_png_bytes.as_deref(),
        Some(&[0x89, b'P', b'N', b'G', 1, 2, 3][..])
    );

    assert_eq!(record.video_frames.len(), 2);
    assert_eq!(record.video_frames[0].time_point_us, 0);
    assert!(record.video_frames[0].keyframe);
    assert_eq!(record.video_frames[0].color_bytes, vec![1, 2, 3]);
    assert_eq!(record.video_frames[0].depth_bytes, vec![4, 5, 6, 7]);
    assert_eq!(record.video_frames[1].time_point_us, 33_333);
    assert!(!record.video_frames[1].keyframe);
    assert_eq!(record.video_frames[1].color_bytes, vec![8; 300]);

    assert_eq!(record.audio_frames.len(), 1);
    assert_eq!(record.audio_frames[0].time_point_us, 10_000);
    assert_eq!(record.audio_frames[0].bytes, vec![0xFC, 0xFF, 0xFE]);

    assert_eq!(record.imu_frames, vec![imu(20_000)]);
    assert_eq!(record.pose_frames, vec![pose(25_000)]);

    assert_eq!(record.calibration_frames.len(), 1);
    assert_eq!(record.calibration_frames[0].time_point_us, 30_000);
    assert_eq!(record.calibration_frames[0].camera_calibration, kinect());

    assert_eq!(record.cue_points.len(), 1);
    assert_eq!(record.cue_points[0].time_point_us, 0);
    assert_eq!(record.cue_points[0].track_number, 1);

    let kinds: Vec<&str> = record.frames().iter().map(|f| f.kind()).collect();
    assert_eq!(kinds, vec!["video", "audio", "imu", "pose", "calibration", "video"]);
}

#[test]
fn test_metadata_only_parse() {
    let mut builder = RecordBuilder::new().calibration(undistorted());
    builder.add_video_frame(VideoFrame {
        time_point_us: 0,
        keyframe: true,
        color_bytes: vec![1],
        depth_bytes: vec![2],
    });
    let bytes = builder.build().expect("failed to build recording");

    let record = RecordParser::from_bytes(bytes)
        .parse(false, true)
        .expect("failed to parse recording");
    assert_eq!(record.frame_count(), 0);
    assert!(record.offsets.first_cluster_offset.is_some());

    let table = record.direction_table.expect("direction table requested");
    assert_eq!((table.width, table.height), (DEPTH_WIDTH, DEPTH_HEIGHT));
    let center = table.get_direction(Vec2::new(0.5, 0.5)).expect("center is inside the table");
    assert!(center.z < 0.0);
}

#[test]
fn test_tdc1_sequence_through_container() {
    let images: Vec<Vec<i32>> = (0..4).map(depth_image).collect();
    let mut encoder = DepthEncoder::new(DepthCodecType::Tdc1, DEPTH_WIDTH, DEPTH_HEIGHT)
        .expect("valid dimensions");

    let mut builder = RecordBuilder::new().calibration(undistorted());
    for (i, image) in images.iter().enumerate() {
        let keyframe = i % 2 == 0;
        let depth_bytes = encoder.encode(image, keyframe).expect("failed to encode depth");
        builder.add_video_frame(VideoFrame {
            time_point_us: i as i64 * 33_333,
            keyframe,
            color_bytes: vec![i as u8],
            depth_bytes,
        });
    }

    let bytes = builder.build().expect("failed to build recording");
    let record = RecordParser::from_bytes(bytes)
        .parse(true, false)
        .expect("failed to parse recording");
    assert_eq!(record.tracks.depth_track.codec, DepthCodecType::Tdc1);
    assert_eq!(record.cue_points.len(), 2);

    let mut decoder = DepthDecoder::new(record.tracks.depth_track.codec);
    for (frame, image) in record.video_frames.iter().zip(&images) {
        assert_eq!(is_tdc1_keyframe(&frame.depth_bytes).expect("valid header"), frame.keyframe);
        let decoded = decoder.decode(&frame.depth_bytes).expect("failed to decode depth");
        assert_eq!((decoded.width, decoded.height), (DEPTH_WIDTH, DEPTH_HEIGHT));
        // Every pixel moves by at least 100 between frames, so none is dropped.
        assert_eq!(&decoded.values, image);
    }
}

#[test]
fn test_legacy_keyframe_flags_are_corrected() {
    let mut encoder = Tdc1Encoder::new(DEPTH_WIDTH, DEPTH_HEIGHT, 500).expect("valid dimensions");
    let keyframe = encoder.encode(&depth_image(0), true).expect("encode keyframe");
    let delta = encoder.encode(&depth_image(1), false).expect("encode delta");

    let config = RecordWriterConfig {
        camera_calibration: Some(undistorted()),
        ..RecordWriterConfig::default()
    };
    let mut writer = RecordWriter::new(Cursor::new(Vec::new()), config).expect("writer");
    // Older writers set the block keyframe flag on every frame.
    writer.write_video_frame(0, true, &[1], &keyframe).expect("write");
    writer.write_video_frame(33_333, true, &[2], &delta).expect("write");
    let bytes = writer.flush().expect("flush").into_inner();

    let record = RecordParser::from_bytes(bytes)
        .parse(true, false)
        .expect("failed to parse recording");
    let flags: Vec<bool> = record.video_frames.iter().map(|f| f.keyframe).collect();
    assert_eq!(flags, vec![true, false]);
}

#[test]
fn test_out_of_order_writes_are_rejected() {
    let config = RecordWriterConfig {
        camera_calibration: Some(undistorted()),
        ..RecordWriterConfig::default()
    };
    let mut writer = RecordWriter::new(Cursor::new(Vec::new()), config).expect("writer");
    writer.write_audio_frame(5_000, &[1]).expect("write");
    assert!(matches!(
        writer.write_audio_frame(4_000, &[2]),
        Err(RgbdError::TimestampOrderViolation { .. })
    ));
}

#[test]
fn test_build_to_path_and_open() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("capture.mkv");

    let mut builder = RecordBuilder::new().calibration(kinect());
    builder.add_video_frame(VideoFrame {
        time_point_us: 10,
        keyframe: true,
        color_bytes: vec![7; 64],
        depth_bytes: vec![3; 16],
    });
    builder.add_audio_frame(AudioFrame {
        time_point_us: 20,
        bytes: vec![1, 2],
    });
    builder.build_to_path(&path).expect("failed to write recording");

    let record = RecordParser::open(&path)
        .expect("failed to open recording")
        .parse(true, false)
        .expect("failed to parse recording");
    assert_eq!(record.attachments.camera_calibration, kinect());
    assert_eq!((record.tracks.depth_track.width, record.tracks.depth_track.height), (640, 576));
    assert_eq!(record.video_frames.len(), 1);
    assert_eq!(record.audio_frames[0].time_point_us, 10);
}

#[test]
fn test_gzipped_recording_opens() {
    use std::io::Write;

    let mut builder = RecordBuilder::new().calibration(undistorted());
    builder.add_video_frame(VideoFrame {
        time_point_us: 0,
        keyframe: true,
        color_bytes: vec![1],
        depth_bytes: vec![2],
    });
    let bytes = builder.build().expect("failed to build recording");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("capture.mkv.gz");
    let file = std::fs::File::create(&path).expect("create");
    let mut gz = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    gz.write_all(&bytes).expect("compress");
    gz.finish().expect("finish");

    let record = RecordParser::open(&path)
        .expect("failed to open recording")
        .parse(true, false)
        .expect("failed to parse recording");
    assert_eq!(record.video_frames.len(), 1);
}

#[test]
fn test_calibration_json_round_trip() {
    for calibration in [undistorted(), kinect()] {
        let json = calibration.to_json().expect("serialize");
        let parsed = CameraCalibration::from_json(&json).expect("parse");
        assert_eq!(parsed, calibration);
        assert_eq!(parsed.to_json().expect("serialize"), json);
    }
}

#[test]
fn test_linear_scan_without_seek_head() {
    let mut builder = RecordBuilder::new().calibration(undistorted());
    builder.add_video_frame(video(0, true));
    builder.add_video_frame(video(33_333, false));
    builder.add_audio_frame(AudioFrame {
        time_point_us: 10_000,
        bytes: vec![9],
    });
    let mut bytes = builder.build().expect("failed to build recording");

    let offsets = RecordParser::from_bytes(bytes.clone())
        .parse(false, false)
        .expect("failed to parse recording")
        .offsets;
    let seek_head = offsets.seek_head_offset.expect("writer emits a SeekHead") as usize;
    let void = void_element(PLACEHOLDER_SIZE).expect("placeholder fits a Void");
    bytes[seek_head..seek_head + PLACEHOLDER_SIZE].copy_from_slice(&void);

    let record = RecordParser::from_bytes(bytes)
        .parse(true, false)
        .expect("failed to parse recording");
    assert_eq!(record.offsets.seek_head_offset, None);
    assert_eq!(record.offsets.info_offset, offsets.info_offset);
    assert_eq!(record.offsets.tracks_offset, offsets.tracks_offset);
    assert_eq!(record.offsets.first_cluster_offset, offsets.first_cluster_offset);
    // Cues sit after the clusters and are only reachable through the SeekHead.
    assert_eq!(record.offsets.cues_offset, None);
    assert!(record.cue_points.is_empty());
    assert_eq!(record.video_frames.len(), 2);
    assert_eq!(record.audio_frames.len(), 1);
}

#[test]
fn test_unknown_track_name_is_skipped() {
    let mut builder = RecordBuilder::new().calibration(undistorted());
    builder.add_video_frame(video(0, true));
    let mut bytes = builder.build().expect("failed to build recording");
    rename_track(&mut bytes, "TRANSLATION", "TRANSLATIOX");

    let record = RecordParser::from_bytes(bytes)
        .parse(true, false)
        .expect("failed to parse recording");
    assert_eq!(record.tracks.translation_track_number, None);
    assert_eq!(record.tracks.rotation_track_number, Some(9));
    assert_eq!(record.video_frames.len(), 1);
}

#[test]
fn test_clusters_of_unknown_tracks_are_skipped() {
    let mut builder = RecordBuilder::new().calibration(undistorted());
    builder.add_video_frame(video(0, true));
    builder.add_pose_frame(pose(5_000));
    builder.add_video_frame(video(33_333, false));
    let mut bytes = builder.build().expect("failed to build recording");
    rename_track(&mut bytes, "TRANSLATION", "TRANSLATIOX");
    rename_track(&mut bytes, "ROTATION", "ROTATIOX");

    let record = RecordParser::from_bytes(bytes)
        .parse(true, false)
        .expect("failed to parse recording");
    assert_eq!(record.tracks.translation_track_number, None);
    assert_eq!(record.tracks.rotation_track_number, None);
    assert!(record.pose_frames.is_empty());
    let times: Vec<i64> = record.video_frames.iter().map(|f| f.time_point_us).collect();
    assert_eq!(times, vec![0, 33_333]);
}

#[test]
fn test_cluster_size_past_end_of_stream() {
    let mut builder = RecordBuilder::new().calibration(undistorted());
    builder.add_video_frame(video(0, true));
    let mut bytes = builder.build().expect("failed to build recording");

    let offsets = RecordParser::from_bytes(bytes.clone())
        .parse(false, false)
        .expect("failed to parse recording")
        .offsets;
    // Open-ended segment, then a cluster declaring 2^50 payload bytes.
    let size_field = offsets.segment_data_offset as usize - 8;
    bytes[size_field..size_field + 8].copy_from_slice(&[0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    bytes.extend_from_slice(&[0x1F, 0x43, 0xB6, 0x75, 0x01, 0x04, 0, 0, 0, 0, 0, 0]);
    bytes.extend_from_slice(&[0xE7, 0x81, 0x00]);
    let cluster_offset = bytes.len() as u64 - 15;

    match RecordParser::from_bytes(bytes).parse(true, false) {
        Err(RgbdError::UnexpectedEof { offset }) => assert_eq!(offset, cluster_offset),
        other => panic!("expected UnexpectedEof, got {other:?}"),
    }
}
