//! Frame-by-frame driver.
//!
//! `Pipeline` owns one detector backend and numbers the frames it accepts.
//! `run` pulls from a `FrameSource` until the stream ends, a frame budget is
//! used up, or a cancellation flag is raised. Frames with the wrong shape are
//! skipped; anything else the core rejects aborts the run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{AppConfig, BackgroundConfig, DetectionMode, DetectorConfig};
use crate::detect::{backend_for_mode, DetectorBackend, FrameOutcome};
use crate::error::{MotionError, Result};
use crate::frame::Frame;
use crate::ingest::FrameSource;

const DEFAULT_MAX_SOURCE_ERRORS: u32 = 3;
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Outcome for one accepted frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    /// Zero-based index among frames the pipeline accepted.
    pub frame_index: u64,
    pub outcome: FrameOutcome,
}

impl FrameReport {
    pub fn motion_detected(&self) -> bool {
        !self.outcome.regions().is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct RunOptions {
    /// Stop after pulling this many frames from the source.
    pub max_frames: Option<u64>,
    /// Reset the backend after every N processed frames.
    pub reset_interval: Option<u64>,
    /// Checked before every pull; set it to stop the run.
    pub cancel: Option<Arc<AtomicBool>>,
    /// Consecutive source errors tolerated before giving up.
    pub max_source_errors: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_frames: None,
            reset_interval: None,
            cancel: None,
            max_source_errors: DEFAULT_MAX_SOURCE_ERRORS,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub motion_frames: u64,
}

pub struct Pipeline {
    backend: Box<dyn DetectorBackend>,
    next_index: u64,
}

impl Pipeline {
    pub fn new(
        mode: DetectionMode,
        background: BackgroundConfig,
        detector: DetectorConfig,
    ) -> Result<Self> {
        let backend = backend_for_mode(mode, background, detector)?;
        log::info!("pipeline using {} backend", backend.name());
        Ok(Self {
            backend,
            next_index: 0,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.mode, config.background.clone(), config.detector.clone())
    }

    pub fn mode(&self) -> DetectionMode {
        self.backend.mode()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Number of frames accepted so far.
    pub fn frames_processed(&self) -> u64 {
        self.next_index
    }

    /// Feed one frame. On error nothing changes, including the frame counter.
    pub fn process(&mut self, frame: &Frame) -> Result<FrameReport> {
        let outcome = self.backend.process(frame)?;
        let report = FrameReport {
            frame_index: self.next_index,
            outcome,
        };
        self.next_index += 1;
        Ok(report)
    }

    /// Drop the reference so the next frames start a fresh warm-up.
    pub fn reset(&mut self) {
        self.backend.reset();
    }

    /// Current background estimate, only in background-model mode.
    pub fn background_estimate(&mut self) -> Option<&Frame> {
        match self.backend.mode() {
            DetectionMode::BackgroundModel => self.backend.reference_frame(),
            DetectionMode::FrameDifference => None,
        }
    }

    /// Pull frames from `source` and hand every report to `sink`.
    pub fn run<F>(
        &mut self,
        source: &mut dyn FrameSource,
        options: &RunOptions,
        mut sink: F,
    ) -> anyhow::Result<RunSummary>
    where
        F: FnMut(&FrameReport) -> anyhow::Result<()>,
    {
        let mut summary = RunSummary::default();
        let mut pulled = 0u64;
        let mut since_reset = 0u64;
        let mut consecutive_errors = 0u32;
        let mut last_health_log = Instant::now();

        loop {
            if let Some(cancel) = &options.cancel {
                if cancel.load(Ordering::SeqCst) {
                    log::info!("run cancelled after {} frame(s)", pulled);
                    break;
                }
            }
            if options.max_frames.is_some_and(|max| pulled >= max) {
                break;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => {
                    consecutive_errors = 0;
                    frame
                }
                Ok(None) => {
                    log::info!("source exhausted after {} frame(s)", pulled);
                    break;
                }
                Err(e) => {
                    consecutive_errors += 1;
                    if consecutive_errors > options.max_source_errors {
                        return Err(e.context(format!(
                            "giving up after {} consecutive source errors",
                            consecutive_errors
                        )));
                    }
                    log::warn!("source error ({}): {:#}", consecutive_errors, e);
                    continue;
                }
            };
            pulled += 1;

            match self.process(&frame) {
                Ok(report) => {
                    summary.frames_processed += 1;
                    if report.motion_detected() {
                        summary.motion_frames += 1;
                    }
                    sink(&report)?;
                    since_reset += 1;
                    if options.reset_interval.is_some_and(|n| since_reset >= n) {
                        log::info!("periodic reset after {} frame(s)", since_reset);
                        self.reset();
                        since_reset = 0;
                    }
                }
                Err(e @ MotionError::DimensionMismatch { .. }) => {
                    log::warn!("skipping frame: {}", e);
                    summary.frames_skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let stats = source.stats();
                log::info!(
                    "source health={} frames={} errors={} uri={}",
                    source.is_healthy(),
                    stats.frames_captured,
                    stats.read_errors,
                    stats.uri
                );
                last_health_log = Instant::now();
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::SourceStats;
    use anyhow::anyhow;
    use std::collections::VecDeque;

    /// Scripted source: each entry is a frame or a read failure.
    struct ScriptedSource {
        script: VecDeque<Option<Frame>>,
        captured: u64,
    }

    impl ScriptedSource {
        fn new(script: Vec<Option<Frame>>) -> Self {
            Self {
                script: script.into(),
                captured: 0,
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn connect(&mut self) -> anyhow::Result<()> {
            Ok(())
        }

        fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
            match self.script.pop_front() {
                Some(Some(frame)) => {
                    self.captured += 1;
                    Ok(Some(frame))
                }
                Some(None) => Err(anyhow!("simulated read failure")),
                None => Ok(None),
            }
        }

        fn is_healthy(&self) -> bool {
            true
        }

        fn stats(&self) -> SourceStats {
            SourceStats {
                frames_captured: self.captured,
                read_errors: 0,
                uri: "scripted".to_string(),
            }
        }
    }

    fn gray(value: u8) -> Frame {
        Frame::filled(12, 12, 1, value).unwrap()
    }

    fn detector() -> DetectorConfig {
        DetectorConfig {
            diff_threshold: 30.0,
            morph_kernel_size: 1,
            min_region_area: 1,
        }
    }

    fn pipeline(mode: DetectionMode, history: usize) -> Pipeline {
        Pipeline::new(mode, BackgroundConfig::new(history), detector()).unwrap()
    }

    #[test]
    fn frame_index_counts_accepted_frames_only() {
        let mut pipeline = pipeline(DetectionMode::FrameDifference, 1);
        assert_eq!(pipeline.process(&gray(10)).unwrap().frame_index, 0);
        assert!(pipeline.process(&Frame::filled(4, 4, 1, 10).unwrap()).is_err());
        assert_eq!(pipeline.process(&gray(10)).unwrap().frame_index, 1);
        assert_eq!(pipeline.frames_processed(), 2);
    }

    #[test]
    fn run_skips_mismatched_frames_and_counts_motion() {
        let mut pipeline = pipeline(DetectionMode::FrameDifference, 1);
        let mut source = ScriptedSource::new(vec![
            Some(gray(10)),
            Some(Frame::filled(6, 6, 1, 10).unwrap()),
            Some(gray(200)),
            Some(gray(200)),
        ]);
        let mut indices = Vec::new();
        let summary = pipeline
            .run(&mut source, &RunOptions::default(), |report| {
                indices.push(report.frame_index);
                Ok(())
            })
            .unwrap();
        assert_eq!(
            summary,
            RunSummary {
                frames_processed: 3,
                frames_skipped: 1,
                motion_frames: 1,
            }
        );
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn run_retries_then_gives_up_on_source_errors() {
        let mut pipeline = pipeline(DetectionMode::FrameDifference, 1);
        let mut recovering = ScriptedSource::new(vec![None, None, Some(gray(1)), None]);
        let options = RunOptions {
            max_source_errors: 2,
            ..RunOptions::default()
        };
        let summary = pipeline.run(&mut recovering, &options, |_| Ok(())).unwrap();
        assert_eq!(summary.frames_processed, 1);

        let mut failing = ScriptedSource::new(vec![None, None, None]);
        assert!(pipeline.run(&mut failing, &options, |_| Ok(())).is_err());
    }

    #[test]
    fn run_respects_max_frames_and_cancel() {
        let mut pipeline = pipeline(DetectionMode::FrameDifference, 1);
        let mut source = ScriptedSource::new((0..10).map(|_| Some(gray(5))).collect());
        let options = RunOptions {
            max_frames: Some(4),
            ..RunOptions::default()
        };
        let summary = pipeline.run(&mut source, &options, |_| Ok(())).unwrap();
        assert_eq!(summary.frames_processed, 4);

        let cancel = Arc::new(AtomicBool::new(true));
        let options = RunOptions {
            cancel: Some(cancel),
            ..RunOptions::default()
        };
        let summary = pipeline.run(&mut source, &options, |_| Ok(())).unwrap();
        assert_eq!(summary.frames_processed, 0);
    }

    #[test]
    fn reset_interval_restarts_warm_up() {
        let mut pipeline = pipeline(DetectionMode::BackgroundModel, 2);
        let mut source = ScriptedSource::new((0..6).map(|_| Some(gray(50))).collect());
        let options = RunOptions {
            reset_interval: Some(3),
            ..RunOptions::default()
        };
        let mut warming = Vec::new();
        pipeline
            .run(&mut source, &options, |report| {
                warming.push(matches!(report.outcome, FrameOutcome::Warming { .. }));
                Ok(())
            })
            .unwrap();
        assert_eq!(warming, vec![true, false, false, true, false, false]);
    }

    #[test]
    fn background_estimate_only_in_background_mode() {
        let mut bg = pipeline(DetectionMode::BackgroundModel, 3);
        assert!(bg.background_estimate().is_none());
        bg.process(&gray(40)).unwrap();
        assert_eq!(bg.background_estimate(), Some(&gray(40)));

        let mut diff = pipeline(DetectionMode::FrameDifference, 3);
        diff.process(&gray(40)).unwrap();
        assert!(diff.background_estimate().is_none());
    }
}
