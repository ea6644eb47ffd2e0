//! Error taxonomy for the background model and motion detector.
//!
//! Core operations fail fast with a `MotionError`; the driving loop decides
//! whether to skip the frame, wait for more observations, or abort. Outer
//! layers (config loading, frame sources, binaries) wrap these in `anyhow`.

use crate::frame::FrameShape;

pub type Result<T> = std::result::Result<T, MotionError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MotionError {
    /// Frame shape differs from the shape already established for the model.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: FrameShape,
        actual: FrameShape,
    },

    /// An estimate was requested before enough frames were observed.
    #[error("insufficient data: {buffered} frame(s) buffered, {required} required")]
    InsufficientData { buffered: usize, required: usize },

    /// Invalid threshold, kernel, area or history parameters.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Sample buffer does not agree with the declared frame shape.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

impl MotionError {
    pub fn config(message: impl Into<String>) -> Self {
        MotionError::Configuration(message.into())
    }

    /// True for errors that are fatal to one call but not to the process.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MotionError::DimensionMismatch { .. } | MotionError::InsufficientData { .. }
        )
    }
}
