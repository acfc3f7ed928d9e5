use std::io::{Cursor, Seek, Write};
use std::path::Path;

use log::debug;

use crate::calibration::CameraCalibration;
use crate::codec::DepthCodecType;
use crate::error::Result;
use crate::frame::{AudioFrame, CalibrationFrame, ImuFrame, PoseFrame, RecordFrame, VideoFrame};
use crate::writer::{RecordWriter, RecordWriterConfig};

/// Collects frames in any order and writes them as one recording.
///
/// Frames are sorted per kind and interleaved by timestamp. The first video
/// frame anchors the timeline; other frames before it are dropped.
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    config: RecordWriterConfig,
    video_frames: Vec<VideoFrame>,
    audio_frames: Vec<AudioFrame>,
    imu_frames: Vec<ImuFrame>,
    pose_frames: Vec<PoseFrame>,
    calibration_frames: Vec<CalibrationFrame>,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RecordWriterConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    pub fn depth_codec(mut self, depth_codec: DepthCodecType) -> Self {
        self.config.depth_codec = depth_codec;
        self
    }

    pub fn depth_unit(mut self, depth_unit: f32) -> Self {
        self.config.depth_unit = depth_unit;
        self
    }

    pub fn calibration(mut self, calibration: CameraCalibration) -> Self {
        self.config.camera_calibration = Some(calibration);
        self
    }

    pub fn cover_png(mut self, png_bytes: Vec<u8>) -> Self {
        self.config.cover_png_bytes = Some(png_bytes);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn config(&self) -> &RecordWriterConfig {
        &self.config
    }

    pub fn add_video_frame(&mut self, frame: VideoFrame) {
        self.video_frames.push(frame);
    }

    pub fn add_audio_frame(&mut self, frame: AudioFrame) {
        self.audio_frames.push(frame);
    }

    pub fn add_imu_frame(&mut self, frame: ImuFrame) {
        self.imu_frames.push(frame);
    }

    pub fn add_pose_frame(&mut self, frame: PoseFrame) {
        self.pose_frames.push(frame);
    }

    pub fn add_calibration_frame(&mut self, frame: CalibrationFrame) {
        self.calibration_frames.push(frame);
    }

    pub fn add_frame(&mut self, frame: RecordFrame) {
        match frame {
            RecordFrame::Video(f) => self.add_video_frame(f),
            RecordFrame::Audio(f) => self.add_audio_frame(f),
            RecordFrame::Imu(f) => self.add_imu_frame(f),
            RecordFrame::Pose(f) => self.add_pose_frame(f),
            RecordFrame::Calibration(f) => self.add_calibration_frame(f),
        }
    }

    /// All frames in write order.
    fn ordered_frames(&self) -> Vec<RecordFrame> {
        let anchor = self.video_frames.iter().map(|f| f.time_point_us).min();

        let mut frames: Vec<RecordFrame> = Vec::new();
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

        let total = frames.len();
        if let Some(anchor) = anchor {
            frames.retain(|f| f.time_point_us() >= anchor);
        }
        if frames.len() < total {
            debug!("dropped {} frames preceding the first video frame", total - frames.len());
        }

        // Stable: equal timestamps keep video, audio, IMU, pose, calibration order.
        frames.sort_by_key(|f| f.time_point_us());
        frames
    }

    fn write_frames<W: Write + Seek>(&self, mut writer: RecordWriter<W>) -> Result<W> {
        for frame in self.ordered_frames() {
            writer.write_frame(&frame)?;
        }
        writer.flush()
    }

    pub fn build(&self) -> Result<Vec<u8>> {
        let writer = RecordWriter::new(Cursor::new(Vec::new()), self.config.clone())?;
        Ok(self.write_frames(writer)?.into_inner())
    }

    pub fn build_to_path(&self, path: &Path) -> Result<()> {
        let writer = RecordWriter::create(path, self.config.clone())?;
        self.write_frames(writer)?;
        Ok(())
    }
}
