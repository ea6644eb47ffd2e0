//! Synthetic scene (`stub://`) for tests and demos.
//!
//! A uniform gray background with bounded sensor noise and a bright square
//! that sweeps left to right. The noise generator is seeded from the URI, so
//! the same URI always produces the same frames.

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{FrameSource, SourceSettings, SourceStats};
use crate::frame::Frame;

const BACKGROUND_LEVEL: u8 = 96;
const OBJECT_LEVEL: u8 = 230;
/// Noise stays well below any sensible difference threshold.
const NOISE_AMPLITUDE: i16 = 4;
const OBJECT_STEP_PX: u32 = 4;

pub struct SyntheticSource {
    settings: SourceSettings,
    rng: StdRng,
    frame_count: u64,
    connected: bool,
}

impl SyntheticSource {
    pub fn new(settings: SourceSettings) -> Result<Self> {
        if settings.width < 8 || settings.height < 8 {
            return Err(anyhow!(
                "synthetic source needs at least 8x8 pixels, got {}x{}",
                settings.width,
                settings.height
            ));
        }
        let seed = settings
            .uri
            .bytes()
            .fold(0x5eed_u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        Ok(Self {
            settings,
            rng: StdRng::seed_from_u64(seed),
            frame_count: 0,
            connected: false,
        })
    }

    /// Side length of the moving square.
    pub fn object_size(&self) -> u32 {
        (self.settings.width.min(self.settings.height) / 8).max(4)
    }

    /// Top-left corner of the square in frame `index`.
    pub fn object_origin(&self, index: u64) -> (u32, u32) {
        let size = self.object_size();
        let travel = (self.settings.width - size) as u64 + 1;
        let x = (index * OBJECT_STEP_PX as u64 % travel) as u32;
        let y = (self.settings.height - size) / 2;
        (x, y)
    }

    fn render(&mut self) -> Result<Frame> {
        let size = self.object_size();
        let (ox, oy) = self.object_origin(self.frame_count);
        let rng = &mut self.rng;
        let frame = Frame::from_fn(self.settings.width, self.settings.height, 3, |x, y, _| {
            if x >= ox && x < ox + size && y >= oy && y < oy + size {
                OBJECT_LEVEL
            } else {
                let noise = rng.gen_range(-NOISE_AMPLITUDE..=NOISE_AMPLITUDE);
                (BACKGROUND_LEVEL as i16 + noise) as u8
            }
        })?;
        Ok(frame)
    }
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected to {} ({}x{})",
            self.settings.uri,
            self.settings.width,
            self.settings.height
        );
        self.connected = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.connected {
            return Err(anyhow!("synthetic source is not connected"));
        }
        if let Some(limit) = self.settings.frame_limit {
            if self.frame_count >= limit {
                return Ok(None);
            }
        }
        let frame = self.render()?;
        self.frame_count += 1;
        Ok(Some(frame))
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            read_errors: 0,
            uri: self.settings.uri.clone(),
        }
    }
}
