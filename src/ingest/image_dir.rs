//! Directory of still images (`dir:<path>`), decoded with the `image` crate.
//!
//! Files with a `png`, `jpg` or `jpeg` extension are read in file-name order
//! and converted to RGB. A file that fails to decode is reported once and
//! skipped on the next call.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next_index: usize,
    frame_count: u64,
    read_errors: u64,
    connected: bool,
}

impl ImageDirSource {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if dir.as_os_str().is_empty() {
            return Err(anyhow!("image directory path is empty"));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            files: Vec::new(),
            next_index: 0,
            frame_count: 0,
            read_errors: 0,
            connected: false,
        })
    }

    fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }
}

impl FrameSource for ImageDirSource {
    fn connect(&mut self) -> Result<()> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to list {}", self.dir.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && Self::is_image(&path) {
                files.push(path);
            }
        }
        files.sort();
        log::info!(
            "ImageDirSource: {} image(s) in {}",
            files.len(),
            self.dir.display()
        );
        self.files = files;
        self.next_index = 0;
        self.connected = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.connected {
            return Err(anyhow!("image directory source is not connected"));
        }
        let Some(path) = self.files.get(self.next_index) else {
            return Ok(None);
        };
        self.next_index += 1;
        let decoded = match image::open(path) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                self.read_errors += 1;
                return Err(anyhow!("failed to decode {}: {}", path.display(), e));
            }
        };
        let (width, height) = decoded.dimensions();
        let frame = Frame::new(width, height, 3, decoded.into_raw())?;
        self.frame_count += 1;
        Ok(Some(frame))
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            read_errors: self.read_errors,
            uri: format!("dir:{}", self.dir.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_images_in_name_order_and_skips_other_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        image::RgbImage::from_pixel(3, 2, image::Rgb([200, 10, 10])).save(dir.path().join("b.png"))?;
        image::RgbImage::from_pixel(3, 2, image::Rgb([10, 10, 200])).save(dir.path().join("a.png"))?;
        std::fs::write(dir.path().join("notes.txt"), "ignored")?;

        let mut source = ImageDirSource::new(dir.path())?;
        source.connect()?;
        let first = source.next_frame()?.ok_or_else(|| anyhow!("missing frame"))?;
        assert_eq!(first.pixel(0, 0), Some(&[10u8, 10, 200][..]));
        let second = source.next_frame()?.ok_or_else(|| anyhow!("missing frame"))?;
        assert_eq!(second.pixel(2, 1), Some(&[200u8, 10, 10][..]));
        assert!(source.next_frame()?.is_none());
        Ok(())
    }
}
