//! motion - run the background model and motion detector over a frame source
//!
//! Subcommands:
//! - `detect`: process a source, log motion events, optionally export them
//! - `background`: build a background estimate and save it as an image
//! - `stats`: summarize a previously exported event file

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use scene_motion::{
    open_source, AppConfig, DetectionMode, EventLog, EventStats, Frame, FrameOutcome, Pipeline,
    RunOptions,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Config file (TOML or JSON).
    #[arg(long, env = "MOTION_CONFIG", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect motion and record events.
    Detect(DetectArgs),
    /// Estimate the background and write it to an image file.
    Background(BackgroundArgs),
    /// Print statistics for an exported event file.
    Stats {
        /// Event JSON written by `detect --events-json`.
        events: PathBuf,
    },
}

#[derive(Args, Debug)]
struct DetectArgs {
    /// Source URI (stub://name, raw:path, dir:path); overrides config.
    #[arg(long)]
    source: Option<String>,
    /// background-model or frame-difference; overrides config.
    #[arg(long)]
    mode: Option<DetectionMode>,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
    /// Export all events as JSON on exit.
    #[arg(long)]
    events_json: Option<PathBuf>,
    /// Append events to a CSV file as they happen.
    #[arg(long)]
    events_csv: Option<PathBuf>,
    /// Pace processing at the source's target fps.
    #[arg(long)]
    realtime: bool,
}

#[derive(Args, Debug)]
struct BackgroundArgs {
    /// Source URI; overrides config.
    #[arg(long)]
    source: Option<String>,
    /// Frames to observe (defaults to history length).
    #[arg(long)]
    frames: Option<u64>,
    /// Output file (.pgm for gray, .ppm for color; png/jpg with ingest-image).
    #[arg(long, default_value = "background.ppm")]
    out: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut cfg = AppConfig::load_from(cli.config.as_deref())?;

    match cli.command {
        Command::Detect(args) => detect(&mut cfg, args),
        Command::Background(args) => background(&mut cfg, args),
        Command::Stats { events } => stats(&events),
    }
}

fn detect(cfg: &mut AppConfig, args: DetectArgs) -> Result<()> {
    if let Some(uri) = args.source {
        cfg.source.uri = uri;
    }
    if let Some(mode) = args.mode {
        cfg.mode = mode;
    }
    let json_path = args.events_json.or_else(|| cfg.events.json_path.clone());
    let csv_path = args.events_csv.or_else(|| cfg.events.csv_path.clone());

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .context("error setting Ctrl-C handler")?;

    let mut source = open_source(&cfg.source)?;
    source.connect()?;
    let mut pipeline = Pipeline::from_config(cfg)?;
    let mut events = match &csv_path {
        Some(path) => EventLog::with_csv(path)?,
        None => EventLog::new(),
    };

    log::info!(
        "motion running: mode={} source={} history={} threshold={} kernel={} min_area={}",
        cfg.mode,
        cfg.source.uri,
        cfg.background.history_length,
        cfg.detector.diff_threshold,
        cfg.detector.morph_kernel_size,
        cfg.detector.min_region_area
    );

    let pace = args
        .realtime
        .then(|| Duration::from_secs_f64(1.0 / cfg.source.target_fps.max(1) as f64));
    let options = RunOptions {
        max_frames: args.max_frames,
        reset_interval: cfg.reset_interval,
        cancel: Some(cancel),
        ..RunOptions::default()
    };

    let summary = pipeline.run(source.as_mut(), &options, |report| {
        if let FrameOutcome::Detected(detection) = &report.outcome {
            events.record(report.frame_index, detection)?;
        }
        if let Some(interval) = pace {
            std::thread::sleep(interval);
        }
        Ok(())
    })?;

    log::info!(
        "processed={} skipped={} motion_frames={} events={}",
        summary.frames_processed,
        summary.frames_skipped,
        summary.motion_frames,
        events.len()
    );
    if let Some(path) = json_path {
        events.export_json(&path)?;
    }
    print_stats(&events.stats())
}

fn background(cfg: &mut AppConfig, args: BackgroundArgs) -> Result<()> {
    if let Some(uri) = args.source {
        cfg.source.uri = uri;
    }
    let frames = args
        .frames
        .unwrap_or(cfg.background.history_length as u64);
    if frames == 0 {
        return Err(anyhow!("frames must be >= 1"));
    }

    let mut source = open_source(&cfg.source)?;
    source.connect()?;
    let mut pipeline = Pipeline::new(
        DetectionMode::BackgroundModel,
        cfg.background.clone(),
        cfg.detector.clone(),
    )?;
    let options = RunOptions {
        max_frames: Some(frames),
        ..RunOptions::default()
    };
    let summary = pipeline.run(source.as_mut(), &options, |_| Ok(()))?;

    let estimate = pipeline
        .background_estimate()
        .ok_or_else(|| anyhow!("source produced no usable frames"))?;
    save_frame(&args.out, estimate)?;
    log::info!(
        "background from {} frame(s) written to {}",
        summary.frames_processed,
        args.out.display()
    );
    Ok(())
}

fn stats(path: &Path) -> Result<()> {
    let events = EventLog::load_json(path)?;
    print_stats(&EventStats::from_events(&events))
}

fn print_stats(stats: &EventStats) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(stats)?);
    Ok(())
}

/// Gray frames are saved as one channel, everything else as RGB (alpha dropped).
fn save_frame(path: &Path, frame: &Frame) -> Result<()> {
    let channels = frame.channels() as usize;
    let gray = channels == 1;
    let body: Vec<u8> = match channels {
        1 | 3 => frame.samples().to_vec(),
        _ => frame
            .samples()
            .chunks_exact(channels)
            .flat_map(|px| px[..3].iter().copied())
            .collect(),
    };
    encode(path, frame.width(), frame.height(), gray, &body)
}

/// Format follows the file extension (png, jpg, pgm, ppm, ...).
#[cfg(feature = "ingest-image")]
fn encode(path: &Path, width: u32, height: u32, gray: bool, body: &[u8]) -> Result<()> {
    let color = if gray {
        image::ColorType::L8
    } else {
        image::ColorType::Rgb8
    };
    image::save_buffer(path, body, width, height, color)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Binary PGM/PPM when no image codec is compiled in.
#[cfg(not(feature = "ingest-image"))]
fn encode(path: &Path, width: u32, height: u32, gray: bool, body: &[u8]) -> Result<()> {
    use std::io::Write;

    let magic = if gray { "P5" } else { "P6" };
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write!(file, "{}\n{} {}\n255\n", magic, width, height)?;
    file.write_all(body)?;
    Ok(())
}
