use crate::config::{DetectionMode, DetectorConfig};
use crate::detect::backend::DetectorBackend;
use crate::detect::detector::MotionDetector;
use crate::detect::result::FrameOutcome;
use crate::error::Result;
use crate::frame::Frame;

/// Simple frame differencing: each frame is compared with the one before it.
#[derive(Debug)]
pub struct FrameDifferenceBackend {
    detector: MotionDetector,
    previous: Option<Frame>,
}

impl FrameDifferenceBackend {
    pub fn new(detector: DetectorConfig) -> Result<Self> {
        Ok(Self {
            detector: MotionDetector::new(detector)?,
            previous: None,
        })
    }
}

impl DetectorBackend for FrameDifferenceBackend {
    fn name(&self) -> &'static str {
        "frame-difference"
    }

    fn mode(&self) -> DetectionMode {
        DetectionMode::FrameDifference
    }

    fn process(&mut self, frame: &Frame) -> Result<FrameOutcome> {
        let Some(previous) = self.previous.as_ref() else {
            self.previous = Some(frame.clone());
            return Ok(FrameOutcome::Warming {
                buffered: 0,
                required: 1,
            });
        };
        let detection = self.detector.detect(frame, previous)?;
        self.previous = Some(frame.clone());
        Ok(FrameOutcome::Detected(detection))
    }

    fn reset(&mut self) {
        self.previous = None;
    }

    fn reference_frame(&mut self) -> Option<&Frame> {
        self.previous.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MotionError;

    fn backend() -> FrameDifferenceBackend {
        FrameDifferenceBackend::new(DetectorConfig {
            diff_threshold: 25.0,
            morph_kernel_size: 3,
            min_region_area: 9,
        })
        .unwrap()
    }

    fn square_at(x0: u32) -> Frame {
        Frame::from_fn(24, 12, 3, |x, y, _| {
            if x >= x0 && x < x0 + 4 && (4..8).contains(&y) {
                255
            } else {
                0
            }
        })
        .unwrap()
    }

    #[test]
    fn first_frame_only_primes_the_reference() {
        let mut backend = backend();
        assert_eq!(
            backend.process(&square_at(2)).unwrap(),
            FrameOutcome::Warming {
                buffered: 0,
                required: 1
            }
        );
        assert_eq!(backend.reference_frame(), Some(&square_at(2)));
    }

    #[test]
    fn moving_square_leaves_two_regions() {
        let mut backend = backend();
        backend.process(&square_at(2)).unwrap();
        let outcome = backend.process(&square_at(14)).unwrap();
        // Vacated area and newly covered area, left to right.
        let regions = outcome.regions();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].bbox.x, 2);
        assert_eq!(regions[1].bbox.x, 14);
        assert!(regions.iter().all(|r| r.area == 16));
    }

    #[test]
    fn static_scene_has_no_motion() {
        let mut backend = backend();
        backend.process(&square_at(5)).unwrap();
        let outcome = backend.process(&square_at(5)).unwrap();
        assert!(outcome.regions().is_empty());
    }

    #[test]
    fn mismatch_keeps_previous_frame() {
        let mut backend = backend();
        backend.process(&square_at(5)).unwrap();
        let err = backend.process(&Frame::filled(24, 12, 1, 0).unwrap()).unwrap_err();
        assert!(matches!(err, MotionError::DimensionMismatch { .. }));
        assert_eq!(backend.reference_frame(), Some(&square_at(5)));
    }
}
