use serde::{Deserialize, Serialize};

use crate::frame::ForegroundMask;

/// Tight, inclusive pixel bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Box spanning the inclusive corner coordinates.
    pub fn from_corners(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        }
    }

    /// Last column inside the box.
    pub fn max_x(&self) -> u32 {
        self.x + self.width - 1
    }

    /// Last row inside the box.
    pub fn max_y(&self) -> u32 {
        self.y + self.height - 1
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x <= self.max_x() && y >= self.y && y <= self.max_y()
    }

    pub fn box_area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// One connected foreground component that survived the area filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionRegion {
    pub bbox: BoundingBox,
    /// Foreground pixel count (not the box area).
    pub area: usize,
}

/// Per-frame detection output. Recomputed every frame, never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Detection {
    /// Thresholded and opened mask.
    pub mask: ForegroundMask,
    /// Regions in raster order of their first pixel.
    pub regions: Vec<MotionRegion>,
}

impl Detection {
    pub fn motion_detected(&self) -> bool {
        !self.regions.is_empty()
    }

    pub fn total_area(&self) -> usize {
        self.regions.iter().map(|r| r.area).sum()
    }
}

/// What a backend produced for one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Reference not established yet; the frame was absorbed, nothing detected.
    Warming { buffered: usize, required: usize },
    Detected(Detection),
}

impl FrameOutcome {
    pub fn detection(&self) -> Option<&Detection> {
        match self {
            FrameOutcome::Detected(detection) => Some(detection),
            FrameOutcome::Warming { .. } => None,
        }
    }

    pub fn regions(&self) -> &[MotionRegion] {
        self.detection().map_or(&[], |d| d.regions.as_slice())
    }
}
