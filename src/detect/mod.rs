//! Foreground detection.
//!
//! - `difference` / `morphology` / `components`: the per-frame pixel chain.
//! - `MotionDetector`: runs the chain against one reference frame.
//! - `DetectorBackend`: stateful strategies that own their reference
//!   (median background history or previous frame).

mod backend;
mod backends;
pub mod components;
mod detector;
pub mod difference;
pub mod morphology;
mod result;

pub use backend::{backend_for_mode, DetectorBackend};
pub use backends::{BackgroundSubtractionBackend, FrameDifferenceBackend};
pub use detector::MotionDetector;
pub use result::{BoundingBox, Detection, FrameOutcome, MotionRegion};
