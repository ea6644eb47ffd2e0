//! Rolling background estimate.
//!
//! `BackgroundModel` owns a `FrameBuffer` of the most recent frames and a lazily
//! cached estimate. Observing a frame only invalidates the cache; the per-sample
//! statistic is recomputed on the next `estimate()` call.
//!
//! Median tie-break: for an even number of buffered frames the estimate is the
//! truncated integer average of the two middle samples, `(lo + hi) / 2`.

use crate::config::{BackgroundConfig, BackgroundMethod};
use crate::error::{MotionError, Result};
use crate::frame::{Frame, FrameBuffer, FrameShape};

#[derive(Debug)]
pub struct BackgroundModel {
    config: BackgroundConfig,
    frames: FrameBuffer,
    cached: Option<Frame>,
}

impl BackgroundModel {
    pub fn new(config: BackgroundConfig) -> Result<Self> {
        config.validate()?;
        let frames = FrameBuffer::new(config.history_length)?;
        Ok(Self {
            config,
            frames,
            cached: None,
        })
    }

    /// Append a frame to the history, evicting the oldest when full.
    ///
    /// A frame whose shape differs from the buffered frames is rejected with
    /// `DimensionMismatch` and the history is left as it was.
    pub fn observe(&mut self, frame: Frame) -> Result<()> {
        self.frames.push(frame)?;
        self.cached = None;
        Ok(())
    }

    /// Current background estimate over every buffered frame.
    ///
    /// Repeated calls without new observations return the same cached frame.
    pub fn estimate(&mut self) -> Result<&Frame> {
        let shape = self.frames.shape().ok_or(MotionError::InsufficientData {
            buffered: 0,
            required: 1,
        })?;
        let method = self.config.method;
        let frames = &self.frames;
        Ok(self.cached.get_or_insert_with(|| {
            log::debug!(
                "recomputing {:?} background over {} frame(s)",
                method,
                frames.len()
            );
            compute_estimate(frames, shape, method)
        }))
    }

    /// Estimate, but only once the history holds at least `min_fill` frames.
    pub fn ready_estimate(&mut self) -> Result<&Frame> {
        if !self.is_ready() {
            return Err(MotionError::InsufficientData {
                buffered: self.frames.len(),
                required: self.config.min_fill,
            });
        }
        self.estimate()
    }

    /// Drop the history and cached estimate (scene change or periodic refresh).
    pub fn reset(&mut self) {
        if !self.frames.is_empty() {
            log::info!(
                "background model reset ({} buffered frame(s) dropped)",
                self.frames.len()
            );
        }
        self.frames.clear();
        self.cached = None;
    }

    pub fn is_ready(&self) -> bool {
        self.frames.len() >= self.config.min_fill
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.frames.capacity()
    }

    pub fn shape(&self) -> Option<FrameShape> {
        self.frames.shape()
    }

    pub fn config(&self) -> &BackgroundConfig {
        &self.config
    }
}

fn compute_estimate(frames: &FrameBuffer, shape: FrameShape, method: BackgroundMethod) -> Frame {
    let planes: Vec<&[u8]> = frames.iter().map(|f| f.samples()).collect();
    let len = shape.sample_count();

    let mut data = Vec::with_capacity(len);
    let mut column = Vec::with_capacity(planes.len());
    for i in 0..len {
        column.clear();
        column.extend(planes.iter().map(|p| p[i]));
        let value = match method {
            BackgroundMethod::Median => median(&mut column),
            BackgroundMethod::Mean => mean(&column),
        };
        data.push(value);
    }
    Frame::from_parts(shape, data)
}

fn median(values: &mut [u8]) -> u8 {
    let n = values.len();
    if n == 0 {
        return 0;
    }
    let mid = n / 2;
    let (lower, upper_mid, _) = values.select_nth_unstable(mid);
    let hi = *upper_mid;
    if n % 2 == 1 {
        return hi;
    }
    let lo = lower.iter().copied().max().unwrap_or(hi);
    ((lo as u16 + hi as u16) / 2) as u8
}

fn mean(values: &[u8]) -> u8 {
    if values.is_empty() {
        return 0;
    }
    let sum: u32 = values.iter().map(|&v| v as u32).sum();
    (sum / values.len() as u32) as u8
}
