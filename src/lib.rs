//! Scene Motion
//!
//! Background modelling and foreground motion detection for fixed-camera
//! video streams.
//!
//! # Architecture
//!
//! Each frame flows through one pass:
//!
//! 1. **Ingest**: a `FrameSource` yields owned frames (synthetic, raw file, image directory).
//! 2. **Reference**: the backend keeps either a bounded history whose per-sample
//!    median is the background, or just the previous frame.
//! 3. **Detect**: absolute difference, strict threshold, morphological opening,
//!    8-connected labeling and an area filter produce regions.
//! 4. **Record**: frames with surviving regions become `MotionEvent`s.
//!
//! # Module Structure
//!
//! - `frame`: Frame, FrameShape, ForegroundMask, FrameBuffer
//! - `background`: BackgroundModel (median or mean over the history)
//! - `detect`: MotionDetector and the detector backends
//! - `ingest`: frame sources
//! - `events`: event log with CSV and JSON export
//! - `pipeline`: frame-by-frame driver
//! - `config`: file + environment configuration
//! - `error`: MotionError

pub mod background;
pub mod config;
pub mod detect;
pub mod error;
pub mod events;
pub mod frame;
pub mod ingest;
pub mod pipeline;

pub use background::BackgroundModel;
pub use config::{AppConfig, BackgroundConfig, BackgroundMethod, DetectionMode, DetectorConfig};
pub use detect::{
    backend_for_mode, BoundingBox, Detection, DetectorBackend, FrameOutcome, MotionDetector,
    MotionRegion,
};
pub use error::{MotionError, Result};
pub use events::{EventLog, EventStats, MotionEvent};
pub use frame::{ForegroundMask, Frame, FrameBuffer, FrameShape};
pub use ingest::{open_source, FrameSource, PixelFormat, SourceSettings, SourceStats};
pub use pipeline::{FrameReport, Pipeline, RunOptions, RunSummary};
