//! Recording parser.
//!
//! Parsing runs in two phases. The first locates the top-level elements and
//! reads Info, Tracks, Attachments and Cues. The second, only run when frames
//! are requested, walks the clusters and turns each into one [`RecordFrame`].

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use flate2::read::GzDecoder;
use log::{debug, info, warn};

use crate::block::SimpleBlock;
use crate::calibration::{CameraCalibration, DirectionTable};
use crate::codec::{AudioCodecType, ColorCodecType, DepthCodecPrivate, DepthCodecType};
use crate::element::*;
use crate::error::{Result, RgbdError};
use crate::frame::{
    quat_from_bytes, vec3_from_bytes, AudioFrame, CalibrationFrame, ImuFrame, PoseFrame,
    RecordFrame, VideoFrame,
};
use crate::record::{
    AudioTrack, ColorTrack, CuePoint, DepthTrack, Record, RecordAttachments, RecordInfo,
    RecordOffsets, RecordTracks, CALIBRATION_FILE_NAME, COVER_FILE_NAME, DEFAULT_DEPTH_UNIT,
};
use crate::tdc1::is_tdc1_keyframe;
use crate::timecode::timecode_to_us;
use crate::track::{is_legacy_track_name, TrackKind};

/// TimecodeScale when Info omits it.
const DEFAULT_TIMECODE_SCALE_NS: u64 = 1_000_000;

/// SamplingFrequency when the audio track omits it.
const DEFAULT_SAMPLING_FREQUENCY: f64 = 8000.0;

/// A reader that transparently handles both plain `.mkv` and gzip-compressed `.mkv.gz` files.
pub enum RgbdReader {
    File(BufReader<File>),
    Memory(Cursor<Vec<u8>>),
}

impl Read for RgbdReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            RgbdReader::File(r) => r.read(buf),
            RgbdReader::Memory(r) => r.read(buf),
        }
    }
}

impl Seek for RgbdReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match self {
            RgbdReader::File(r) => r.seek(pos),
            RgbdReader::Memory(r) => r.seek(pos),
        }
    }
}

/// Open a recording and return a seekable reader.
///
/// Gzip-compressed files are fully decompressed into memory.
pub fn open_rgbd(path: &Path) -> std::io::Result<RgbdReader> {
    let is_gz = path.extension().is_some_and(|ext| ext == "gz");

    let file = File::open(path)?;
    if is_gz {
        let mut decoder = GzDecoder::new(file);
        let mut buf = Vec::new();
        decoder.read_to_end(&mut buf)?;
        Ok(RgbdReader::Memory(Cursor::new(buf)))
    } else {
        Ok(RgbdReader::File(BufReader::new(file)))
    }
}

/// Block extracted from a cluster, with its keyframe flag resolved.
struct ClusterBlock<'a> {
    track_number: u64,
    keyframe: bool,
    offset: u64,
    data: &'a [u8],
}

/// Offsets and metadata gathered by the first phase.
struct Head {
    offsets: RecordOffsets,
    segment_end: Option<u64>,
    info: RecordInfo,
    tracks: RecordTracks,
    attachments: RecordAttachments,
    cue_points: Vec<CuePoint>,
}

/// Top-level element offsets found so far.
#[derive(Default)]
struct OffsetScan {
    seek_head: Option<u64>,
    info: Option<u64>,
    tracks: Option<u64>,
    attachments: Option<u64>,
    cues: Option<u64>,
    first_cluster: Option<u64>,
}

impl OffsetScan {
    fn slot(&mut self, id: u32) -> Option<&mut Option<u64>> {
        match id {
            ID_INFO => Some(&mut self.info),
            ID_TRACKS => Some(&mut self.tracks),
            ID_ATTACHMENTS => Some(&mut self.attachments),
            ID_CUES => Some(&mut self.cues),
            _ => None,
        }
    }

    fn has_mandatory(&self) -> bool {
        self.info.is_some() && self.tracks.is_some() && self.attachments.is_some()
    }
}

pub struct RecordParser<R: Read + Seek> {
    reader: R,
}

impl RecordParser<RgbdReader> {
    /// Parse the file at `path` (`.gz` files are decompressed first).
    pub fn open(path: &Path) -> Result<Self> {
        let reader = open_rgbd(path).map_err(|e| RgbdError::IoAtOffset {
            offset: 0,
            context: "open recording",
            source: e,
        })?;
        Ok(Self::new(reader))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(RgbdReader::Memory(Cursor::new(bytes)))
    }
}

impl<R: Read + Seek> RecordParser<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Parse the recording. Without `with_frames` only metadata is read.
    /// `with_directions` derives a per-depth-pixel direction table from the calibration.
    pub fn parse(&mut self, with_frames: bool, with_directions: bool) -> Result<Record> {
        let head = self.parse_except_clusters()?;

        let mut record = Record {
            offsets: head.offsets,
            info: head.info,
            tracks: head.tracks,
            attachments: head.attachments,
            video_frames: Vec::new(),
            audio_frames: Vec::new(),
            imu_frames: Vec::new(),
            pose_frames: Vec::new(),
            calibration_frames: Vec::new(),
            cue_points: head.cue_points,
            direction_table: None,
        };

        if with_frames {
            self.parse_all_clusters(&mut record, head.segment_end)?;
            info!(
                "parsed {} video, {} audio, {} imu, {} pose, {} calibration frames",
                record.video_frames.len(),
                record.audio_frames.len(),
                record.imu_frames.len(),
                record.pose_frames.len(),
                record.calibration_frames.len()
            );
        }

        if with_directions {
            record.direction_table = Some(DirectionTable::new(&record.attachments.camera_calibration));
        }

        Ok(record)
    }

    fn parse_except_clusters(&mut self) -> Result<Head> {
        self.reader.seek(SeekFrom::Start(0))?;

        let ebml = read_element_header(&mut self.reader)?
            .ok_or(RgbdError::MissingElement { name: "EBML" })?;
        if ebml.id != ID_EBML {
            return Err(RgbdError::UnexpectedElement {
                offset: ebml.offset,
                expected: ID_EBML,
                got: ebml.id,
            });
        }
        self.check_doc_type(&ebml)?;
        skip_element(&mut self.reader, &ebml)?;

        let segment = read_element_header(&mut self.reader)?
            .ok_or(RgbdError::MissingElement { name: "Segment" })?;
        if segment.id != ID_SEGMENT {
            return Err(RgbdError::UnexpectedElement {
                offset: segment.offset,
                expected: ID_SEGMENT,
                got: segment.id,
            });
        }
        let segment_data_offset = segment.data_offset;
        let segment_end = segment.size.map(|size| segment.data_offset + size);

        let scan = self.scan_offsets(segment_data_offset, segment_end)?;

        let offsets = RecordOffsets {
            segment_data_offset,
            seek_head_offset: scan.seek_head,
            info_offset: scan.info.ok_or(RgbdError::MissingElement { name: "Info" })?,
            tracks_offset: scan.tracks.ok_or(RgbdError::MissingElement { name: "Tracks" })?,
            attachments_offset: scan
                .attachments
                .ok_or(RgbdError::MissingElement { name: "Attachments" })?,
            first_cluster_offset: scan.first_cluster,
            cues_offset: scan.cues,
        };

        let info = self.parse_info(offsets.info_offset)?;
        let tracks = self.parse_tracks(offsets.tracks_offset)?;
        let attachments = self.parse_attachments(offsets.attachments_offset)?;
        let cue_points = match offsets.cues_offset {
            Some(offset) => self
                .parse_cues(offset, segment_data_offset, info.timecode_scale_ns)
                .unwrap_or_else(|e| {
                    warn!("ignoring unreadable Cues at 0x{offset:X}: {e}");
                    Vec::new()
                }),
            None => Vec::new(),
        };

        Ok(Head {
            offsets,
            segment_end,
            info,
            tracks,
            attachments,
            cue_points,
        })
    }

    fn check_doc_type(&mut self, ebml: &ElementHeader) -> Result<()> {
        let data = read_element_data(&mut self.reader, ebml)?;
        for child in children(&data, ebml.data_offset) {
            let child = child?;
            if child.id == ID_DOC_TYPE {
                let doc_type = child.string()?;
                if doc_type != "matroska" && doc_type != "webm" {
                    warn!("unexpected DocType {doc_type:?}");
                }
            }
        }
        Ok(())
    }

    /// Walk the Segment's children, taking positions from a SeekHead where
    /// present and from the elements themselves as they are passed.
    fn scan_offsets(&mut self, segment_data_offset: u64, segment_end: Option<u64>) -> Result<OffsetScan> {
        let mut scan = OffsetScan::default();
        self.reader.seek(SeekFrom::Start(segment_data_offset))?;

        loop {
            let position = self.reader.stream_position()?;
            if segment_end.is_some_and(|end| position >= end) {
                break;
            }
            let Some(header) = read_element_header(&mut self.reader)? else {
                break;
            };

            match header.id {
                ID_SEEK_HEAD => {
                    scan.seek_head.get_or_insert(header.offset);
                    let data = read_element_data(&mut self.reader, &header)?;
                    for (id, position) in parse_seek_head(&data, header.data_offset)? {
                        let Some(offset) = segment_data_offset.checked_add(position) else {
                            warn!("ignoring seek entry 0x{id:X} with position {position}");
                            continue;
                        };
                        if let Some(slot) = scan.slot(id) {
                            slot.get_or_insert(offset);
                        }
                    }
                }
                ID_CLUSTER => {
                    scan.first_cluster.get_or_insert(header.offset);
                    if scan.has_mandatory() {
                        break;
                    }
                }
                id => {
                    if let Some(slot) = scan.slot(id) {
                        *slot = Some(header.offset);
                    }
                }
            }

            if header.size.is_none() {
                debug!("stopping offset scan at unknown-size element 0x{:X}", header.id);
                break;
            }
            skip_element(&mut self.reader, &header)?;
        }

        Ok(scan)
    }

    fn read_top_level(&mut self, offset: u64, id: u32) -> Result<(ElementHeader, Vec<u8>)> {
        let header = read_element_header_at(&mut self.reader, offset, id)?;
        let data = read_element_data(&mut self.reader, &header)?;
        Ok((header, data))
    }

    fn parse_info(&mut self, offset: u64) -> Result<RecordInfo> {
        let (header, data) = self.read_top_level(offset, ID_INFO)?;

        let mut info = RecordInfo {
            timecode_scale_ns: DEFAULT_TIMECODE_SCALE_NS,
            duration: 0.0,
            muxing_app: None,
            writing_app: String::new(),
            title: None,
            date_utc: None,
        };
        for child in children(&data, header.data_offset) {
            let child = child?;
            match child.id {
                ID_TIMECODE_SCALE => info.timecode_scale_ns = child.uint()?,
                ID_DURATION => info.duration = child.float()?,
                ID_MUXING_APP => info.muxing_app = Some(child.string()?),
                ID_WRITING_APP => info.writing_app = child.string()?,
                ID_TITLE => info.title = Some(child.string()?),
                ID_DATE_UTC => info.date_utc = Some(child.int()?),
                _ => {}
            }
        }
        Ok(info)
    }

    fn parse_tracks(&mut self, offset: u64) -> Result<RecordTracks> {
        let (header, data) = self.read_top_level(offset, ID_TRACKS)?;

        let mut color = None;
        let mut depth = None;
        let mut audio = None;
        let mut aux = Vec::new();

        for entry in children(&data, header.data_offset) {
            let entry = entry?;
            if entry.id != ID_TRACK_ENTRY {
                continue;
            }
            let parsed = TrackEntry::parse(&entry)?;
            let Some(kind) = TrackKind::from_name(&parsed.name) else {
                if is_legacy_track_name(&parsed.name) {
                    debug!("ignoring legacy track {}", parsed.name);
                } else {
                    warn!("ignoring unknown track {:?} (number {})", parsed.name, parsed.number);
                }
                continue;
            };

            match kind {
                TrackKind::Color => {
                    let codec = ColorCodecType::from_codec_id(&parsed.codec_id).ok_or_else(|| {
                        RgbdError::InvalidCodec {
                            track: "COLOR",
                            codec: parsed.codec_id.clone(),
                        }
                    })?;
                    color = Some(ColorTrack {
                        track_number: parsed.number,
                        codec,
                        width: parsed.pixel_width,
                        height: parsed.pixel_height,
                    });
                }
                TrackKind::Depth => {
                    let codec = DepthCodecType::from_codec_id(&parsed.codec_id).ok_or_else(|| {
                        RgbdError::InvalidCodec {
                            track: "DEPTH",
                            codec: parsed.codec_id.clone(),
                        }
                    })?;
                    let depth_unit = match &parsed.codec_private {
                        Some(bytes) => DepthCodecPrivate::from_bytes(bytes)?.depth_unit,
                        None => DEFAULT_DEPTH_UNIT,
                    };
                    depth = Some(DepthTrack {
                        track_number: parsed.number,
                        codec,
                        width: parsed.pixel_width,
                        height: parsed.pixel_height,
                        depth_unit,
                    });
                }
                TrackKind::Audio => {
                    let codec = AudioCodecType::from_codec_id(&parsed.codec_id).ok_or_else(|| {
                        RgbdError::InvalidCodec {
                            track: "AUDIO",
                            codec: parsed.codec_id.clone(),
                        }
                    })?;
                    audio = Some(AudioTrack {
                        track_number: parsed.number,
                        codec,
                        sampling_frequency: parsed
                            .sampling_frequency
                            .unwrap_or(DEFAULT_SAMPLING_FREQUENCY),
                    });
                }
                aux_kind => aux.push((aux_kind, parsed.number)),
            }
        }

        let aux_number = |kind: TrackKind| aux.iter().find(|(k, _)| *k == kind).map(|&(_, n)| n);
        Ok(RecordTracks {
            color_track: color.ok_or(RgbdError::MissingTrack { name: "COLOR" })?,
            depth_track: depth.ok_or(RgbdError::MissingTrack { name: "DEPTH" })?,
            audio_track: audio.ok_or(RgbdError::MissingTrack { name: "AUDIO" })?,
            acceleration_track_number: aux_number(TrackKind::Acceleration),
            rotation_rate_track_number: aux_number(TrackKind::RotationRate),
            magnetic_field_track_number: aux_number(TrackKind::MagneticField),
            gravity_track_number: aux_number(TrackKind::Gravity),
            translation_track_number: aux_number(TrackKind::Translation),
            rotation_track_number: aux_number(TrackKind::Rotation),
            calibration_track_number: aux_number(TrackKind::Calibration),
        })
    }

    fn parse_attachments(&mut self, offset: u64) -> Result<RecordAttachments> {
        let (header, data) = self.read_top_level(offset, ID_ATTACHMENTS)?;

        let mut camera_calibration = None;
        let mut cover_png_bytes = None;
        for file in children(&data, header.data_offset) {
            let file = file?;
            if file.id != ID_ATTACHED_FILE {
                continue;
            }
            let mut name = None;
            let mut file_data = None;
            for child in file.children() {
                let child = child?;
                match child.id {
                    ID_FILE_NAME => name = Some(child.string()?),
                    ID_FILE_DATA => file_data = Some(child.data),
                    _ => {}
                }
            }

            match (name.as_deref(), file_data) {
                (Some(CALIBRATION_FILE_NAME), Some(bytes)) => {
                    camera_calibration = Some(CameraCalibration::from_json_bytes(bytes)?);
                }
                (Some(COVER_FILE_NAME), Some(bytes)) => cover_png_bytes = Some(bytes.to_vec()),
                (name, _) => warn!("ignoring attachment {name:?} at 0x{:X}", file.offset),
            }
        }

        Ok(RecordAttachments {
            camera_calibration: camera_calibration.ok_or(RgbdError::MissingCalibration)?,
            cover_png_bytes,
        })
    }

    fn parse_cues(
        &mut self,
        offset: u64,
        segment_data_offset: u64,
        timecode_scale_ns: u64,
    ) -> Result<Vec<CuePoint>> {
        let (header, data) = self.read_top_level(offset, ID_CUES)?;

        let mut cue_points = Vec::new();
        for point in children(&data, header.data_offset) {
            let point = point?;
            if point.id != ID_CUE_POINT {
                continue;
            }
            let mut time = 0;
            let mut positions = Vec::new();
            for child in point.children() {
                let child = child?;
                match child.id {
                    ID_CUE_TIME => time = child.uint()?,
                    ID_CUE_TRACK_POSITIONS => {
                        let mut track_number = 0;
                        let mut cluster_position = 0;
                        for position in child.children() {
                            let position = position?;
                            match position.id {
                                ID_CUE_TRACK => track_number = position.uint()?,
                                ID_CUE_CLUSTER_POSITION => cluster_position = position.uint()?,
                                _ => {}
                            }
                        }
                        positions.push((track_number, cluster_position));
                    }
                    _ => {}
                }
            }
            for (track_number, cluster_position) in positions {
                cue_points.push(CuePoint {
                    time_point_us: timecode_to_us(time, timecode_scale_ns),
                    track_number,
                    cluster_position,
                });
            }
        }
        debug!(
            "read {} cue points (segment data at 0x{segment_data_offset:X})",
            cue_points.len()
        );
        Ok(cue_points)
    }

    fn parse_all_clusters(&mut self, record: &mut Record, segment_end: Option<u64>) -> Result<()> {
        let Some(first_cluster) = record.offsets.first_cluster_offset else {
            return Ok(());
        };
        self.reader.seek(SeekFrom::Start(first_cluster))?;

        loop {
            let position = self.reader.stream_position()?;
            if segment_end.is_some_and(|end| position >= end) {
                break;
            }
            let Some(header) = read_element_header(&mut self.reader)? else {
                break;
            };

            if header.id != ID_CLUSTER {
                debug!("skipping element 0x{:X} at 0x{:X}", header.id, header.offset);
                skip_element(&mut self.reader, &header)?;
                continue;
            }

            let data = read_element_data(&mut self.reader, &header)?;
            match parse_cluster(&data, &header, &record.tracks, record.info.timecode_scale_ns)? {
                Some(RecordFrame::Video(frame)) => record.video_frames.push(frame),
                Some(RecordFrame::Audio(frame)) => record.audio_frames.push(frame),
                Some(RecordFrame::Imu(frame)) => record.imu_frames.push(frame),
                Some(RecordFrame::Pose(frame)) => record.pose_frames.push(frame),
                Some(RecordFrame::Calibration(frame)) => record.calibration_frames.push(frame),
                None => warn!("cluster at 0x{:X} holds no frame, skipping", header.offset),
            }
        }
        Ok(())
    }
}

/// Fields of one TrackEntry.
struct TrackEntry {
    number: u64,
    name: String,
    codec_id: String,
    codec_private: Option<Vec<u8>>,
    pixel_width: u64,
    pixel_height: u64,
    sampling_frequency: Option<f64>,
}

impl TrackEntry {
    fn parse(entry: &Element<'_>) -> Result<Self> {
        let mut track = TrackEntry {
            number: 0,
            name: String::new(),
            codec_id: String::new(),
            codec_private: None,
            pixel_width: 0,
            pixel_height: 0,
            sampling_frequency: None,
        };
        for child in entry.children() {
            let child = child?;
            match child.id {
                ID_TRACK_NUMBER => track.number = child.uint()?,
                ID_NAME => track.name = child.string()?,
                ID_CODEC_ID => track.codec_id = child.string()?,
                ID_CODEC_PRIVATE => track.codec_private = Some(child.data.to_vec()),
                ID_VIDEO => {
                    for video in child.children() {
                        let video = video?;
                        match video.id {
                            ID_PIXEL_WIDTH => track.pixel_width = video.uint()?,
                            ID_PIXEL_HEIGHT => track.pixel_height = video.uint()?,
                            _ => {}
                        }
                    }
                }
                ID_AUDIO => {
                    for audio in child.children() {
                        let audio = audio?;
                        if audio.id == ID_SAMPLING_FREQUENCY {
                            track.sampling_frequency = Some(audio.float()?);
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(track)
    }
}

/// Seek entries as (element id, position relative to the segment data).
fn parse_seek_head(data: &[u8], data_offset: u64) -> Result<Vec<(u32, u64)>> {
    let mut entries = Vec::new();
    for seek in children(data, data_offset) {
        let seek = seek?;
        if seek.id != ID_SEEK {
            continue;
        }
        let mut id = None;
        let mut position = None;
        for child in seek.children() {
            let child = child?;
            match child.id {
                ID_SEEK_ID => id = id_at(child.data, 0).map(|(id, _)| id),
                ID_SEEK_POSITION => position = Some(child.uint()?),
                _ => {}
            }
        }
        if let (Some(id), Some(position)) = (id, position) {
            entries.push((id, position));
        }
    }
    Ok(entries)
}

fn cluster_blocks<'a>(data: &'a [u8], header: &ElementHeader) -> Result<(u64, Vec<ClusterBlock<'a>>)> {
    let mut timecode = 0;
    let mut blocks = Vec::new();
    for child in children(data, header.data_offset) {
        let child = child?;
        match child.id {
            ID_TIMECODE => timecode = child.uint()?,
            ID_SIMPLE_BLOCK => {
                let block = SimpleBlock::parse(child.data, child.offset)?;
                blocks.push(ClusterBlock {
                    track_number: block.track_number,
                    keyframe: block.keyframe(),
                    offset: child.offset,
                    data: block.data,
                });
            }
            ID_BLOCK_GROUP => {
                let mut block = None;
                let mut referenced = false;
                for member in child.children() {
                    let member = member?;
                    match member.id {
                        ID_BLOCK => block = Some((SimpleBlock::parse(member.data, member.offset)?, member.offset)),
                        ID_REFERENCE_BLOCK => referenced = true,
                        _ => {}
                    }
                }
                if let Some((block, offset)) = block {
                    blocks.push(ClusterBlock {
                        track_number: block.track_number,
                        keyframe: !referenced,
                        offset,
                        data: block.data,
                    });
                }
            }
            ID_VOID | ID_CRC32 => {}
            id => warn!("unexpected element 0x{id:X} in cluster at 0x{:X}", header.offset),
        }
    }
    Ok((timecode, blocks))
}

/// Turn one cluster into a frame. Priority: video, audio, IMU, pose, calibration.
fn parse_cluster(
    data: &[u8],
    header: &ElementHeader,
    tracks: &RecordTracks,
    timecode_scale_ns: u64,
) -> Result<Option<RecordFrame>> {
    let (timecode, blocks) = cluster_blocks(data, header)?;
    let time_point_us = timecode_to_us(timecode, timecode_scale_ns);

    let find = |kind: TrackKind| {
        let number = tracks.track_number(kind)?;
        blocks.iter().find(|b| b.track_number == number)
    };
    let require = |kind: TrackKind| {
        find(kind).ok_or(RgbdError::IncompleteCluster {
            offset: header.offset,
            missing: kind.name(),
        })
    };

    if let Some(color) = find(TrackKind::Color) {
        let depth_bytes = require(TrackKind::Depth)?.data.to_vec();
        let mut keyframe = color.keyframe;
        // Older writers flagged every block as a keyframe; trust the TDC1 header.
        if keyframe
            && tracks.depth_track.codec == DepthCodecType::Tdc1
            && matches!(is_tdc1_keyframe(&depth_bytes), Ok(false))
        {
            debug!("correcting keyframe flag of cluster at 0x{:X}", header.offset);
            keyframe = false;
        }
        return Ok(Some(RecordFrame::Video(VideoFrame {
            time_point_us,
            keyframe,
            color_bytes: color.data.to_vec(),
            depth_bytes,
        })));
    }

    if let Some(audio) = find(TrackKind::Audio) {
        return Ok(Some(RecordFrame::Audio(AudioFrame {
            time_point_us,
            bytes: audio.data.to_vec(),
        })));
    }

    if crate::track::IMU_TRACK_KINDS.iter().any(|&k| find(k).is_some()) {
        let vec3 = |kind: TrackKind| -> Result<glam::Vec3> {
            let block = require(kind)?;
            vec3_from_bytes(block.data, block.offset)
        };
        return Ok(Some(RecordFrame::Imu(ImuFrame {
            time_point_us,
            acceleration: vec3(TrackKind::Acceleration)?,
            rotation_rate: vec3(TrackKind::RotationRate)?,
            magnetic_field: vec3(TrackKind::MagneticField)?,
            gravity: vec3(TrackKind::Gravity)?,
        })));
    }

    if crate::track::POSE_TRACK_KINDS.iter().any(|&k| find(k).is_some()) {
        let translation = require(TrackKind::Translation)?;
        let rotation = require(TrackKind::Rotation)?;
        return Ok(Some(RecordFrame::Pose(PoseFrame {
            time_point_us,
            translation: vec3_from_bytes(translation.data, translation.offset)?,
            rotation: quat_from_bytes(rotation.data, rotation.offset)?,
        })));
    }

    if let Some(calibration) = find(TrackKind::Calibration) {
        return Ok(Some(RecordFrame::Calibration(CalibrationFrame {
            time_point_us,
            camera_calibration: CameraCalibration::from_json_bytes(calibration.data)?,
        })));
    }

    Ok(None)
}
