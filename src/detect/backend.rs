use crate::config::{BackgroundConfig, DetectionMode, DetectorConfig};
use crate::detect::backends::{BackgroundSubtractionBackend, FrameDifferenceBackend};
use crate::detect::result::FrameOutcome;
use crate::error::Result;
use crate::frame::Frame;

/// Stateful per-frame detection strategy.
///
/// A backend owns whatever reference it diffs against (background history or
/// previous frame). `process` either fully succeeds or leaves that reference
/// exactly as it was; there are no partial results.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    fn mode(&self) -> DetectionMode;

    /// Feed one frame and classify it against the current reference.
    fn process(&mut self, frame: &Frame) -> Result<FrameOutcome>;

    /// Forget the reference (scene change or periodic refresh).
    fn reset(&mut self);

    /// Current reference frame for visualization, if one exists.
    fn reference_frame(&mut self) -> Option<&Frame>;
}

/// Build the backend for a configured detection mode.
pub fn backend_for_mode(
    mode: DetectionMode,
    background: BackgroundConfig,
    detector: DetectorConfig,
) -> Result<Box<dyn DetectorBackend>> {
    let backend: Box<dyn DetectorBackend> = match mode {
        DetectionMode::BackgroundModel => {
            Box::new(BackgroundSubtractionBackend::new(background, detector)?)
        }
        DetectionMode::FrameDifference => {
            // History settings are validated in both modes.
            background.validate()?;
            Box::new(FrameDifferenceBackend::new(detector)?)
        }
    };
    Ok(backend)
}
