use std::path::{Path, PathBuf};

use clap::Parser;
use rgbd::depth::DepthDecoder;
use rgbd::frame::RecordFrame;
use rgbd::record::Record;
use rgbd::track::TrackKind;

#[derive(Parser)]
#[command(name = "rgbd-info", about = "Parse and display RGBD recording structure")]
struct Args {
    /// Input recording (.mkv or .mkv.gz)
    #[arg(short = 'f', long = "file")]
    file: Option<String>,

    /// Input recording (positional)
    #[arg(conflicts_with = "file", required_unless_present_any = ["file", "schema", "version"])]
    input: Option<String>,

    /// Filter the frame table by track number
    #[arg(short = 't', long = "track")]
    track_filter: Option<u64>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Print JSON schema for the output format and exit
    #[arg(long)]
    schema: bool,

    /// Write the cover.png attachment to this path
    #[arg(long, value_name = "OUT")]
    cover: Option<PathBuf>,

    /// Decode the depth track and print per-frame statistics
    #[arg(long)]
    depth_stats: bool,

    /// Display version and quit
    #[arg(long)]
    version: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Reset SIGPIPE to default so piped output (e.g. head/tail) exits cleanly
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    if args.version {
        rgbd::version::print_cli_version_banner(
            "RGBD Info Tool",
            env!("CARGO_PKG_VERSION"),
            env!("RELEASE_VERSION"),
            env!("GIT_COMMIT"),
        );
        return Ok(());
    }

    if args.schema {
        let schema = schemars::schema_for!(rgbd::record::Record);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let file = args.file.or(args.input).expect("file argument required");
    let mut parser = rgbd::parser::RecordParser::open(Path::new(&file))?;
    let record = parser.parse(true, false)?;

    if let Some(out) = &args.cover {
        match &record.attachments.cover_png_bytes {
            Some(png) => {
                std::fs::write(out, png)?;
                log::info!("wrote {} byte cover to {}", png.len(), out.display());
            }
            None => return Err(format!("{file} has no cover.png attachment").into()),
        }
    }

    if args.json {
        println!("{}", serde_json::to_string(&record)?);
        return Ok(());
    }

    print_summary(&record);

    if args.depth_stats {
        print_depth_stats(&record)?;
        return Ok(());
    }

    print_frames(&record, args.track_filter);
    Ok(())
}

fn print_summary(record: &Record) {
    let tracks = &record.tracks;
    let color = tracks.color_track;
    let depth = tracks.depth_track;
    let audio = tracks.audio_track;

    println!("Writing app:   {}", record.info.writing_app);
    if let Some(title) = &record.info.title {
        println!("Title:         {title}");
    }
    println!("Duration:      {:.3}s", record.info.duration_seconds());
    println!(
        "Color:         #{} {} {}x{}",
        color.track_number,
        color.codec.info().codec_id,
        color.width,
        color.height
    );
    println!(
        "Depth:         #{} {} {}x{} unit {}m",
        depth.track_number,
        depth.codec.info().codec_id,
        depth.width,
        depth.height,
        depth.depth_unit
    );
    println!(
        "Audio:         #{} {} {}Hz",
        audio.track_number,
        audio.codec.info().codec_id,
        audio.sampling_frequency
    );
    println!(
        "Calibration:   {}",
        record.attachments.camera_calibration.calibration_type()
    );
    if let Some(cover) = &record.attachments.cover_png_bytes {
        println!("Cover:         {} bytes", cover.len());
    }

    let color_bytes: usize = record.video_frames.iter().map(|f| f.color_bytes.len()).sum();
    let depth_bytes: usize = record.video_frames.iter().map(|f| f.depth_bytes.len()).sum();
    let audio_bytes: usize = record.audio_frames.iter().map(|f| f.bytes.len()).sum();
    let keyframes = record.video_frames.iter().filter(|f| f.keyframe).count();
    println!(
        "Video frames:  {} ({} keyframes, {} color bytes, {} depth bytes)",
        record.video_frames.len(),
        keyframes,
        color_bytes,
        depth_bytes
    );
    println!("Audio frames:  {} ({} bytes)", record.audio_frames.len(), audio_bytes);
    println!("IMU frames:    {}", record.imu_frames.len());
    println!("Pose frames:   {}", record.pose_frames.len());
    println!("Calibrations:  {}", record.calibration_frames.len());
    println!("Cue points:    {}", record.cue_points.len());
    println!();
}

/// Track numbers a frame's blocks were stored under.
fn frame_tracks(record: &Record, frame: &RecordFrame) -> Vec<u64> {
    let kinds: &[TrackKind] = match frame {
        RecordFrame::Video(_) => &[TrackKind::Color, TrackKind::Depth],
        RecordFrame::Audio(_) => &[TrackKind::Audio],
        RecordFrame::Imu(_) => rgbd::track::IMU_TRACK_KINDS,
        RecordFrame::Pose(_) => rgbd::track::POSE_TRACK_KINDS,
        RecordFrame::Calibration(_) => &[TrackKind::Calibration],
    };
    kinds
        .iter()
        .filter_map(|&k| record.tracks.track_number(k))
        .collect()
}

fn print_frames(record: &Record, track_filter: Option<u64>) {
    println!(
        "{:>12} {:>8} {:>3} {:>14} {:>10} {:>10}",
        "Type", "Tracks", "KF", "TIME_US", "SIZE", "DELTA_US"
    );

    if let Some(filter) = track_filter {
        match record.tracks.kind_of(filter) {
            Some(kind) => log::info!("showing frames of track {filter} ({})", kind.name()),
            None => log::warn!("recording has no track {filter}"),
        }
    }

    let mut prev_time: Option<i64> = None;
    for frame in record.frames() {
        let tracks = frame_tracks(record, &frame);
        if let Some(filter) = track_filter {
            if !tracks.contains(&filter) {
                continue;
            }
        }

        let (keyframe, size) = match &frame {
            RecordFrame::Video(f) => (
                if f.keyframe { "1" } else { "0" },
                f.color_bytes.len() + f.depth_bytes.len(),
            ),
            RecordFrame::Audio(f) => ("", f.bytes.len()),
            RecordFrame::Imu(_) => ("", 4 * rgbd::frame::VEC3_PAYLOAD_SIZE),
            RecordFrame::Pose(_) => (
                "",
                rgbd::frame::VEC3_PAYLOAD_SIZE + rgbd::frame::QUAT_PAYLOAD_SIZE,
            ),
            RecordFrame::Calibration(_) => ("", 0),
        };

        let time = frame.time_point_us();
        let delta = prev_time.map_or(0, |prev| time - prev);
        prev_time = Some(time);

        let track_list = tracks
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "{:>12} {:>8} {:>3} {:>14} {:>10} {:>10}",
            frame.kind(),
            track_list,
            keyframe,
            time,
            size,
            delta
        );
    }
}

fn print_depth_stats(record: &Record) -> Result<(), Box<dyn std::error::Error>> {
    let depth_unit = record.tracks.depth_track.depth_unit;
    let mut decoder = DepthDecoder::new(record.tracks.depth_track.codec);

    println!(
        "{:>14} {:>3} {:>9} {:>10} {:>10} {:>10}",
        "TIME_US", "KF", "SIZE", "VALID", "MIN_M", "MAX_M"
    );
    for frame in &record.video_frames {
        let depth = decoder.decode(&frame.depth_bytes)?;
        let valid: Vec<i32> = depth.values.iter().copied().filter(|&v| v > 0).collect();
        let min = valid.iter().min().map_or(0.0, |&v| v as f32 * depth_unit);
        let max = valid.iter().max().map_or(0.0, |&v| v as f32 * depth_unit);
        println!(
            "{:>14} {:>3} {:>9} {:>10} {:>10.3} {:>10.3}",
            frame.time_point_us,
            if frame.keyframe { 1 } else { 0 },
            frame.depth_bytes.len(),
            valid.len(),
            min,
            max
        );
    }
    Ok(())
}
