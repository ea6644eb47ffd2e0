//! Frame, mask and frame-history types.
//!
//! - `Frame`: immutable grid of 8-bit samples with explicit width, height and channel count.
//! - `ForegroundMask`: binary per-pixel classification derived from one frame.
//! - `FrameBuffer`: bounded ring buffer of the most recent frames (median history).
//!
//! Samples are stored interleaved and row-major. Three-channel frames are RGB,
//! four-channel frames are RGBA (alpha is carried but never compared).

use std::collections::VecDeque;
use std::fmt;

use crate::error::{MotionError, Result};

/// Channel counts accepted by `Frame`.
pub const SUPPORTED_CHANNELS: [u8; 3] = [1, 3, 4];

/// Upper bound on slots reserved up front; the buffer grows toward `capacity` as frames arrive.
const PREALLOCATED_FRAMES: usize = 64;

// ----------------------------------------------------------------------------
// FrameShape
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameShape {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

impl FrameShape {
    pub fn new(width: u32, height: u32, channels: u8) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn sample_count(&self) -> usize {
        self.pixel_count() * self.channels as usize
    }

    /// Same spatial grid, channel layout ignored.
    pub fn same_grid(&self, other: &FrameShape) -> bool {
        self.width == other.width && self.height == other.height
    }

    fn validate(&self) -> Result<usize> {
        if self.width == 0 || self.height == 0 {
            return Err(MotionError::InvalidFrame(format!(
                "frame dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !SUPPORTED_CHANNELS.contains(&self.channels) {
            return Err(MotionError::InvalidFrame(format!(
                "unsupported channel count {} (expected 1, 3 or 4)",
                self.channels
            )));
        }
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|v| v.checked_mul(self.channels as usize))
            .ok_or_else(|| MotionError::InvalidFrame("frame dimensions overflow".to_string()))
    }
}

impl fmt::Display for FrameShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.channels)
    }
}

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// Immutable image frame. There is no mutable access to the samples once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    shape: FrameShape,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap an interleaved sample buffer. The buffer length must match the shape exactly.
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self> {
        let shape = FrameShape::new(width, height, channels);
        let expected = shape.validate()?;
        if data.len() != expected {
            return Err(MotionError::InvalidFrame(format!(
                "sample buffer length mismatch for {}: expected {}, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Uniform frame where every sample has `value`.
    pub fn filled(width: u32, height: u32, channels: u8, value: u8) -> Result<Self> {
        let shape = FrameShape::new(width, height, channels);
        let len = shape.validate()?;
        Ok(Self {
            shape,
            data: vec![value; len],
        })
    }

    /// Build a frame sample by sample; `f` receives `(x, y, channel)`.
    pub fn from_fn(
        width: u32,
        height: u32,
        channels: u8,
        mut f: impl FnMut(u32, u32, u8) -> u8,
    ) -> Result<Self> {
        let shape = FrameShape::new(width, height, channels);
        let len = shape.validate()?;
        let mut data = Vec::with_capacity(len);
        for y in 0..height {
            for x in 0..width {
                for c in 0..channels {
                    data.push(f(x, y, c));
                }
            }
        }
        Ok(Self { shape, data })
    }

    pub(crate) fn from_parts(shape: FrameShape, data: Vec<u8>) -> Self {
        debug_assert_eq!(shape.sample_count(), data.len());
        Self { shape, data }
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    pub fn width(&self) -> u32 {
        self.shape.width
    }

    pub fn height(&self) -> u32 {
        self.shape.height
    }

    pub fn channels(&self) -> u8 {
        self.shape.channels
    }

    /// Read-only view of the interleaved samples.
    pub fn samples(&self) -> &[u8] {
        &self.data
    }

    /// Samples of the pixel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.shape.width || y >= self.shape.height {
            return None;
        }
        let ch = self.shape.channels as usize;
        let start = (y as usize * self.shape.width as usize + x as usize) * ch;
        self.data.get(start..start + ch)
    }

    pub fn into_samples(self) -> Vec<u8> {
        self.data
    }

    /// Fail with `DimensionMismatch` unless `other` has exactly this frame's shape.
    pub fn ensure_same_shape(&self, other: &Frame) -> Result<()> {
        ensure_shape(self.shape, other.shape)
    }
}

pub(crate) fn ensure_shape(expected: FrameShape, actual: FrameShape) -> Result<()> {
    if expected != actual {
        return Err(MotionError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// ForegroundMask
// ----------------------------------------------------------------------------

/// Binary grid; `true` marks foreground.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForegroundMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl ForegroundMask {
    /// All-background mask.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut bits = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                bits.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            bits,
        }
    }

    pub(crate) fn from_bits(width: u32, height: u32, bits: Vec<bool>) -> Self {
        debug_assert_eq!(bits.len(), width as usize * height as usize);
        Self {
            width,
            height,
            bits,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.bits[y as usize * self.width as usize + x as usize]
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Number of foreground pixels.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// True when no pixel is foreground.
    pub fn is_clear(&self) -> bool {
        !self.bits.iter().any(|&b| b)
    }

    /// Render as a single-channel frame (255 = foreground) for display collaborators.
    pub fn to_frame(&self) -> Result<Frame> {
        let data = self.bits.iter().map(|&b| if b { 255 } else { 0 }).collect();
        Frame::new(self.width, self.height, 1, data)
    }
}

// ----------------------------------------------------------------------------
// FrameBuffer: bounded ring buffer of recent frames
// ----------------------------------------------------------------------------

/// Fixed-capacity history of the most recently observed frames.
///
/// - Length never exceeds `capacity`; the oldest frame is evicted first.
/// - The first pushed frame fixes the shape; later frames must match it.
/// - A rejected push leaves the buffer untouched.
#[derive(Debug)]
pub struct FrameBuffer {
    buffer: VecDeque<Frame>,
    capacity: usize,
    shape: Option<FrameShape>,
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(MotionError::config("frame buffer capacity must be > 0"));
        }
        Ok(Self {
            buffer: VecDeque::with_capacity(capacity.min(PREALLOCATED_FRAMES)),
            capacity,
            shape: None,
        })
    }

    /// Push a frame, returning the evicted frame if the buffer was full.
    pub fn push(&mut self, frame: Frame) -> Result<Option<Frame>> {
        if let Some(expected) = self.shape {
            ensure_shape(expected, frame.shape())?;
        }
        self.shape = Some(frame.shape());

        let evicted = if self.buffer.len() >= self.capacity {
            self.buffer.pop_front()
        } else {
            None
        };
        self.buffer.push_back(frame);
        Ok(evicted)
    }

    /// Most recent frame.
    pub fn latest(&self) -> Option<&Frame> {
        self.buffer.back()
    }

    /// Frames oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Frame> + '_ {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Shape established by the first frame since the last clear.
    pub fn shape(&self) -> Option<FrameShape> {
        self.shape
    }

    /// Drop all frames and forget the established shape.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.shape = None;
    }

    /// Memory usage estimate.
    pub fn memory_bytes(&self) -> usize {
        self.buffer.iter().map(|f| f.samples().len()).sum()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(value: u8) -> Frame {
        Frame::filled(4, 3, 1, value).unwrap()
    }

    #[test]
    fn frame_rejects_wrong_buffer_length() {
        let err = Frame::new(2, 2, 3, vec![0; 11]).unwrap_err();
        assert!(matches!(err, MotionError::InvalidFrame(_)));
    }

    #[test]
    fn frame_rejects_unsupported_channels_and_empty_grid() {
        assert!(Frame::filled(2, 2, 2, 0).is_err());
        assert!(Frame::filled(0, 2, 1, 0).is_err());
    }

    #[test]
    fn pixel_access_is_row_major_interleaved() {
        let frame = Frame::from_fn(3, 2, 3, |x, y, c| (y * 30 + x * 3) as u8 + c).unwrap();
        assert_eq!(frame.pixel(2, 1), Some(&[36u8, 37, 38][..]));
        assert_eq!(frame.pixel(3, 0), None);
    }

    #[test]
    fn frame_buffer_evicts_oldest_at_capacity() {
        let mut buf = FrameBuffer::new(3).unwrap();
        for v in 0..3 {
            assert!(buf.push(gray(v)).unwrap().is_none());
        }
        let evicted = buf.push(gray(3)).unwrap();
        assert_eq!(evicted, Some(gray(0)));
        assert_eq!(buf.len(), 3);
        let firsts: Vec<u8> = buf.iter().map(|f| f.samples()[0]).collect();
        assert_eq!(firsts, vec![1, 2, 3]);
    }

    #[test]
    fn frame_buffer_rejects_shape_change_without_mutation() {
        let mut buf = FrameBuffer::new(2).unwrap();
        buf.push(gray(1)).unwrap();
        let err = buf.push(Frame::filled(4, 3, 3, 1).unwrap()).unwrap_err();
        assert!(matches!(err, MotionError::DimensionMismatch { .. }));
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.latest(), Some(&gray(1)));
    }

    #[test]
    fn frame_buffer_clear_forgets_shape() {
        let mut buf = FrameBuffer::new(2).unwrap();
        buf.push(gray(1)).unwrap();
        buf.clear();
        assert!(buf.shape().is_none());
        buf.push(Frame::filled(8, 8, 3, 0).unwrap()).unwrap();
        assert_eq!(buf.shape(), Some(FrameShape::new(8, 8, 3)));
    }

    #[test]
    fn huge_capacity_does_not_reserve_up_front() {
        let mut buf = FrameBuffer::new(usize::MAX).unwrap();
        assert_eq!(buf.capacity(), usize::MAX);
        buf.push(gray(7)).unwrap();
        assert_eq!(buf.len(), 1);
        assert!(!buf.is_full());
    }

    #[test]
    fn zero_capacity_is_a_configuration_error() {
        assert!(matches!(
            FrameBuffer::new(0).unwrap_err(),
            MotionError::Configuration(_)
        ));
    }

    #[test]
    fn mask_renders_to_binary_frame() {
        let mask = ForegroundMask::from_fn(2, 2, |x, y| x == y);
        assert_eq!(mask.count(), 2);
        assert_eq!(mask.to_frame().unwrap().samples(), &[255, 0, 0, 255]);
        assert!(ForegroundMask::empty(3, 3).is_clear());
    }
}
