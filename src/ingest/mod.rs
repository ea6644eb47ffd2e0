//! Frame ingestion sources.
//!
//! Sources are selected by URI:
//! - `stub://<name>`: synthetic scene with a moving object (testing, demos)
//! - `raw:<path>`: headerless raw video in `gray8`, `rgb24` or `nv12`
//! - `dir:<path>`: directory of still images (feature: ingest-image)
//!
//! Every source yields owned `Frame` values; the pipeline never hands a frame
//! back to its source. `Ok(None)` from `next_frame` means the stream ended.

#[cfg(feature = "ingest-image")]
mod image_dir;
mod normalize;
mod raw;
mod synthetic;

use anyhow::{anyhow, Result};

use crate::frame::Frame;

#[cfg(feature = "ingest-image")]
pub use image_dir::ImageDirSource;
pub use normalize::PixelFormat;
pub use raw::RawFileSource;
pub use synthetic::SyntheticSource;

/// Where frames come from and how to interpret them.
#[derive(Clone, Debug)]
pub struct SourceSettings {
    /// `stub://...`, `raw:<path>` or `dir:<path>`.
    pub uri: String,
    pub width: u32,
    pub height: u32,
    /// Only used by `raw:` sources.
    pub pixel_format: PixelFormat,
    /// Nominal rate; used for pacing by the binary, not by sources.
    pub target_fps: u32,
    /// Stop after this many frames (synthetic sources only).
    pub frame_limit: Option<u64>,
}

/// Statistics for a frame source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub read_errors: u64,
    pub uri: String,
}

pub trait FrameSource: Send {
    /// Open the underlying stream.
    fn connect(&mut self) -> Result<()>;

    /// Next frame, `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    fn is_healthy(&self) -> bool;

    fn stats(&self) -> SourceStats;
}

/// Build (but do not connect) the source named by `settings.uri`.
pub fn open_source(settings: &SourceSettings) -> Result<Box<dyn FrameSource>> {
    let uri = settings.uri.trim();
    if uri.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(settings.clone())?));
    }
    if let Some(path) = uri.strip_prefix("raw:") {
        return Ok(Box::new(RawFileSource::new(path, settings)?));
    }
    if let Some(path) = uri.strip_prefix("dir:") {
        #[cfg(feature = "ingest-image")]
        {
            return Ok(Box::new(ImageDirSource::new(path)?));
        }
        #[cfg(not(feature = "ingest-image"))]
        {
            return Err(anyhow!(
                "image directory source {:?} requires the ingest-image feature",
                path
            ));
        }
    }
    Err(anyhow!(
        "unsupported source uri {:?} (expected stub://, raw: or dir:)",
        uri
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(uri: &str) -> SourceSettings {
        SourceSettings {
            uri: uri.to_string(),
            width: 32,
            height: 24,
            pixel_format: PixelFormat::Rgb24,
            target_fps: 30,
            frame_limit: Some(2),
        }
    }

    #[test]
    fn stub_uri_opens_synthetic_source() -> Result<()> {
        let mut source = open_source(&settings("stub://test"))?;
        source.connect()?;
        assert!(source.next_frame()?.is_some());
        assert_eq!(source.stats().uri, "stub://test");
        Ok(())
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        assert!(open_source(&settings("rtsp://camera/stream")).is_err());
        assert!(open_source(&settings("/tmp/video.mp4")).is_err());
    }
}
