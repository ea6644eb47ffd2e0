use crate::background::BackgroundModel;
use crate::config::{BackgroundConfig, DetectionMode, DetectorConfig};
use crate::detect::backend::DetectorBackend;
use crate::detect::detector::MotionDetector;
use crate::detect::result::FrameOutcome;
use crate::error::Result;
use crate::frame::Frame;

/// Observe every frame into a median history, then diff against the estimate.
///
/// No detection happens until the history holds `min_fill` frames.
#[derive(Debug)]
pub struct BackgroundSubtractionBackend {
    model: BackgroundModel,
    detector: MotionDetector,
    announced_ready: bool,
}

impl BackgroundSubtractionBackend {
    pub fn new(background: BackgroundConfig, detector: DetectorConfig) -> Result<Self> {
        Ok(Self {
            model: BackgroundModel::new(background)?,
            detector: MotionDetector::new(detector)?,
            announced_ready: false,
        })
    }

    pub fn model(&self) -> &BackgroundModel {
        &self.model
    }
}

impl DetectorBackend for BackgroundSubtractionBackend {
    fn name(&self) -> &'static str {
        "background-subtraction"
    }

    fn mode(&self) -> DetectionMode {
        DetectionMode::BackgroundModel
    }

    fn process(&mut self, frame: &Frame) -> Result<FrameOutcome> {
        self.model.observe(frame.clone())?;
        if !self.model.is_ready() {
            return Ok(FrameOutcome::Warming {
                buffered: self.model.len(),
                required: self.model.config().min_fill,
            });
        }
        if !self.announced_ready {
            log::info!(
                "background model ready ({} frame(s), {:?})",
                self.model.len(),
                self.model.config().method
            );
            self.announced_ready = true;
        }
        let background = self.model.ready_estimate()?;
        let detection = self.detector.detect(frame, background)?;
        Ok(FrameOutcome::Detected(detection))
    }

    fn reset(&mut self) {
        self.model.reset();
        self.announced_ready = false;
    }

    fn reference_frame(&mut self) -> Option<&Frame> {
        self.model.estimate().ok()
    }
}
