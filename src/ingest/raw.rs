//! Headerless raw video file source (`raw:<path>`).
//!
//! Frames are stored back to back with no container. Width, height and pixel
//! layout come from `SourceSettings`. A trailing partial frame is treated as
//! end of stream.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::normalize::{normalize_frame, PixelFormat};
use super::{FrameSource, SourceStats};
use crate::frame::Frame;
use crate::ingest::SourceSettings;

pub struct RawFileSource {
    path: PathBuf,
    uri: String,
    width: u32,
    height: u32,
    format: PixelFormat,
    frame_len: usize,
    reader: Option<BufReader<File>>,
    frame_count: u64,
    read_errors: u64,
    finished: bool,
}

impl RawFileSource {
    pub fn new(path: impl AsRef<Path>, settings: &SourceSettings) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(anyhow!("raw source path is empty"));
        }
        let frame_len = settings
            .pixel_format
            .frame_len(settings.width, settings.height)?;
        if frame_len == 0 {
            return Err(anyhow!(
                "raw source needs non-zero dimensions, got {}x{}",
                settings.width,
                settings.height
            ));
        }
        Ok(Self {
            path: path.to_path_buf(),
            uri: settings.uri.clone(),
            width: settings.width,
            height: settings.height,
            format: settings.pixel_format,
            frame_len,
            reader: None,
            frame_count: 0,
            read_errors: 0,
            finished: false,
        })
    }

    /// Fill `buf` as far as the file allows; returns the number of bytes read.
    fn fill(reader: &mut BufReader<File>, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl FrameSource for RawFileSource {
    fn connect(&mut self) -> Result<()> {
        let file = File::open(&self.path)
            .with_context(|| format!("failed to open raw video {}", self.path.display()))?;
        self.reader = Some(BufReader::new(file));
        self.finished = false;
        log::info!(
            "RawFileSource: opened {} ({}x{} {:?}, {} bytes/frame)",
            self.path.display(),
            self.width,
            self.height,
            self.format,
            self.frame_len
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| anyhow!("raw source is not connected"))?;

        let mut buf = vec![0u8; self.frame_len];
        let filled = match Self::fill(reader, &mut buf) {
            Ok(n) => n,
            Err(e) => {
                self.read_errors += 1;
                return Err(e).with_context(|| format!("read error in {}", self.path.display()));
            }
        };
        if filled < self.frame_len {
            if filled > 0 {
                log::warn!(
                    "RawFileSource: ignoring trailing partial frame ({} of {} bytes)",
                    filled,
                    self.frame_len
                );
            }
            self.finished = true;
            return Ok(None);
        }

        let frame = normalize_frame(&buf, self.width, self.height, self.format)?;
        self.frame_count += 1;
        Ok(Some(frame))
    }

    fn is_healthy(&self) -> bool {
        self.reader.is_some()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            read_errors: self.read_errors,
            uri: self.uri.clone(),
        }
    }
}
