use crate::config::DetectorConfig;
use crate::detect::components;
use crate::detect::difference::{difference_image, threshold_mask};
use crate::detect::morphology;
use crate::detect::result::{Detection, MotionRegion};
use crate::error::Result;
use crate::frame::Frame;

/// Stateless foreground classifier.
///
/// `detect` runs the fixed chain: difference, strict threshold, opening,
/// labeling, area filter. The reference may be a background estimate or the
/// previous frame; the chain is the same either way.
#[derive(Clone, Debug)]
pub struct MotionDetector {
    config: DetectorConfig,
}

impl MotionDetector {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Classify `frame` against `reference`. Shapes must match exactly.
    pub fn detect(&self, frame: &Frame, reference: &Frame) -> Result<Detection> {
        let diff = difference_image(frame, reference)?;
        let raw = threshold_mask(&diff, frame.width(), frame.height(), self.config.diff_threshold);
        let mask = morphology::open(&raw, self.config.morph_kernel_size);

        let regions: Vec<MotionRegion> = components::label(&mask)
            .into_iter()
            .filter(|c| c.area >= self.config.min_region_area)
            .map(|c| MotionRegion {
                bbox: c.bbox,
                area: c.area,
            })
            .collect();

        log::debug!(
            "detect: {} raw fg px, {} after opening, {} region(s)",
            raw.count(),
            mask.count(),
            regions.len()
        );

        Ok(Detection { mask, regions })
    }
}
