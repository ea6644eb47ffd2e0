//! Detection parameters and process configuration.
//!
//! `BackgroundConfig` and `DetectorConfig` are handed explicitly to the core
//! constructors. `AppConfig::load` is the outer layer: optional file named by
//! `MOTION_CONFIG`, then environment overrides, then validation. Validation
//! always runs before the first frame is processed.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::MotionError;
use crate::ingest::{PixelFormat, SourceSettings};

pub const DEFAULT_HISTORY_LENGTH: usize = 200;
pub const DEFAULT_DIFF_THRESHOLD: f32 = 30.0;
pub const DEFAULT_MORPH_KERNEL_SIZE: usize = 5;
pub const DEFAULT_MIN_REGION_AREA: usize = 500;

const DEFAULT_SOURCE_URI: &str = "stub://scene";
const DEFAULT_SOURCE_WIDTH: u32 = 640;
const DEFAULT_SOURCE_HEIGHT: u32 = 480;
const DEFAULT_SOURCE_FPS: u32 = 30;

// ----------------------------------------------------------------------------
// Core parameters
// ----------------------------------------------------------------------------

/// What the live frame is diffed against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMode {
    #[default]
    BackgroundModel,
    FrameDifference,
}

impl FromStr for DetectionMode {
    type Err = MotionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "background-model" => Ok(DetectionMode::BackgroundModel),
            "frame-difference" => Ok(DetectionMode::FrameDifference),
            other => Err(MotionError::config(format!(
                "unknown detection_mode '{}' (expected background-model or frame-difference)",
                other
            ))),
        }
    }
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionMode::BackgroundModel => f.write_str("background-model"),
            DetectionMode::FrameDifference => f.write_str("frame-difference"),
        }
    }
}

/// Per-sample statistic used to collapse the frame history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundMethod {
    /// Robust to transient foreground in up to half of the buffered frames.
    #[default]
    Median,
    /// Truncated arithmetic mean; cheaper but smeared by moving objects.
    Mean,
}

impl FromStr for BackgroundMethod {
    type Err = MotionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "median" => Ok(BackgroundMethod::Median),
            "mean" => Ok(BackgroundMethod::Mean),
            other => Err(MotionError::config(format!(
                "unknown background method '{}' (expected median or mean)",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackgroundConfig {
    /// FrameBuffer capacity.
    pub history_length: usize,
    pub method: BackgroundMethod,
    /// Frames required before the estimate is considered ready for detection.
    pub min_fill: usize,
}

impl BackgroundConfig {
    /// Median model that becomes ready once the history is full.
    pub fn new(history_length: usize) -> Self {
        Self {
            history_length,
            method: BackgroundMethod::Median,
            min_fill: history_length,
        }
    }

    pub fn with_method(mut self, method: BackgroundMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_min_fill(mut self, min_fill: usize) -> Self {
        self.min_fill = min_fill;
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.history_length == 0 {
            return Err(MotionError::config("history_length must be > 0"));
        }
        if self.min_fill == 0 || self.min_fill > self.history_length {
            return Err(MotionError::config(format!(
                "min_fill must be in 1..={} (history_length), got {}",
                self.history_length, self.min_fill
            )));
        }
        Ok(())
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LENGTH)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    /// A pixel is foreground iff its combined difference strictly exceeds this.
    pub diff_threshold: f32,
    /// Side of the square opening kernel; odd, 1 disables cleanup.
    pub morph_kernel_size: usize,
    /// Components smaller than this many pixels are discarded.
    pub min_region_area: usize,
}

impl DetectorConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if !self.diff_threshold.is_finite() || self.diff_threshold <= 0.0 {
            return Err(MotionError::config(format!(
                "diff_threshold must be a positive number, got {}",
                self.diff_threshold
            )));
        }
        if self.morph_kernel_size == 0 || self.morph_kernel_size % 2 == 0 {
            return Err(MotionError::config(format!(
                "morph_kernel_size must be an odd integer >= 1, got {}",
                self.morph_kernel_size
            )));
        }
        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            diff_threshold: DEFAULT_DIFF_THRESHOLD,
            morph_kernel_size: DEFAULT_MORPH_KERNEL_SIZE,
            min_region_area: DEFAULT_MIN_REGION_AREA,
        }
    }
}

// ----------------------------------------------------------------------------
// Process configuration (file + env)
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
struct AppConfigFile {
    detection_mode: Option<DetectionMode>,
    history_length: Option<usize>,
    background_method: Option<BackgroundMethod>,
    min_fill: Option<usize>,
    diff_threshold: Option<f32>,
    morph_kernel_size: Option<usize>,
    min_region_area: Option<usize>,
    reset_interval: Option<u64>,
    source: Option<SourceConfigFile>,
    events: Option<EventsConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    uri: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    pixel_format: Option<PixelFormat>,
    target_fps: Option<u32>,
    frame_limit: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct EventsConfigFile {
    json_path: Option<PathBuf>,
    csv_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct EventSettings {
    pub json_path: Option<PathBuf>,
    pub csv_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mode: DetectionMode,
    pub background: BackgroundConfig,
    pub detector: DetectorConfig,
    /// Reset the background model every N processed frames.
    pub reset_interval: Option<u64>,
    pub source: SourceSettings,
    pub events: EventSettings,
}

impl AppConfig {
    /// Load from the file named by `MOTION_CONFIG` (if set), apply env overrides, validate.
    pub fn load() -> Result<Self> {
        let path = std::env::var("MOTION_CONFIG").ok().map(PathBuf::from);
        Self::load_from(path.as_deref())
    }

    /// Same as `load` with an explicit file path taking the place of `MOTION_CONFIG`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => AppConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Self {
        let history_length = file.history_length.unwrap_or(DEFAULT_HISTORY_LENGTH);
        let background = BackgroundConfig {
            history_length,
            method: file.background_method.unwrap_or_default(),
            min_fill: file.min_fill.unwrap_or(history_length),
        };
        let detector = DetectorConfig {
            diff_threshold: file.diff_threshold.unwrap_or(DEFAULT_DIFF_THRESHOLD),
            morph_kernel_size: file.morph_kernel_size.unwrap_or(DEFAULT_MORPH_KERNEL_SIZE),
            min_region_area: file.min_region_area.unwrap_or(DEFAULT_MIN_REGION_AREA),
        };
        let source_file = file.source.unwrap_or_default();
        let source = SourceSettings {
            uri: source_file
                .uri
                .unwrap_or_else(|| DEFAULT_SOURCE_URI.to_string()),
            width: source_file.width.unwrap_or(DEFAULT_SOURCE_WIDTH),
            height: source_file.height.unwrap_or(DEFAULT_SOURCE_HEIGHT),
            pixel_format: source_file.pixel_format.unwrap_or_default(),
            target_fps: source_file.target_fps.unwrap_or(DEFAULT_SOURCE_FPS),
            frame_limit: source_file.frame_limit,
        };
        let events_file = file.events.unwrap_or_default();
        Self {
            mode: file.detection_mode.unwrap_or_default(),
            background,
            detector,
            reset_interval: file.reset_interval,
            source,
            events: EventSettings {
                json_path: events_file.json_path,
                csv_path: events_file.csv_path,
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(uri) = std::env::var("MOTION_SOURCE") {
            if !uri.trim().is_empty() {
                self.source.uri = uri;
            }
        }
        if let Ok(mode) = std::env::var("MOTION_MODE") {
            self.mode = mode.parse()?;
        }
        if let Some(history) = env_number::<usize>("MOTION_HISTORY_LENGTH")? {
            // Keep "ready when full" unless min_fill was set independently.
            if self.background.min_fill == self.background.history_length {
                self.background.min_fill = history;
            }
            self.background.history_length = history;
        }
        if let Some(threshold) = env_number::<f32>("MOTION_DIFF_THRESHOLD")? {
            self.detector.diff_threshold = threshold;
        }
        if let Some(kernel) = env_number::<usize>("MOTION_KERNEL_SIZE")? {
            self.detector.morph_kernel_size = kernel;
        }
        if let Some(area) = env_number::<usize>("MOTION_MIN_AREA")? {
            self.detector.min_region_area = area;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.background.validate()?;
        self.detector.validate()?;
        if self.reset_interval == Some(0) {
            return Err(anyhow!("reset_interval must be greater than zero"));
        }
        if self.source.uri.trim().is_empty() {
            return Err(anyhow!("source uri must not be empty"));
        }
        Ok(())
    }
}

fn env_number<T: FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a number, got '{}'", key, raw)),
        _ => Ok(None),
    }
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
