use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// Pixel layout of headerless raw input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Gray8,
    #[default]
    Rgb24,
    Nv12,
}

impl PixelFormat {
    /// Bytes occupied by one frame of `width` x `height` in this layout.
    pub fn frame_len(self, width: u32, height: u32) -> Result<usize> {
        let pixels = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        let len = match self {
            PixelFormat::Gray8 => Some(pixels),
            PixelFormat::Rgb24 => pixels.checked_mul(3),
            PixelFormat::Nv12 => pixels.checked_add(pixels / 2),
        };
        len.ok_or_else(|| anyhow!("frame dimensions overflow"))
    }
}

impl std::str::FromStr for PixelFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gray8" | "gray" => Ok(PixelFormat::Gray8),
            "rgb24" | "rgb" => Ok(PixelFormat::Rgb24),
            "nv12" => Ok(PixelFormat::Nv12),
            other => Err(anyhow!("unknown pixel format {:?}", other)),
        }
    }
}

/// Turn one raw frame into a `Frame`. Gray stays single channel, NV12 becomes RGB.
pub(crate) fn normalize_frame(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Frame> {
    let expected = format.frame_len(width, height)?;
    if pixels.len() != expected {
        return Err(anyhow!(
            "{:?} frame length mismatch: expected {}, got {}",
            format,
            expected,
            pixels.len()
        ));
    }
    let frame = match format {
        PixelFormat::Gray8 => Frame::new(width, height, 1, pixels.to_vec())?,
        PixelFormat::Rgb24 => Frame::new(width, height, 3, pixels.to_vec())?,
        PixelFormat::Nv12 => Frame::new(width, height, 3, nv12_to_rgb(pixels, width, height))?,
    };
    Ok(frame)
}

// Caller has checked the length.
fn nv12_to_rgb(pixels: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let y_plane = w * h;

    let mut rgb = vec![0u8; y_plane * 3];
    for j in 0..h {
        for i in 0..w {
            let y = pixels[j * w + i] as f32;
            let uv_index = y_plane + (j / 2) * w + (i / 2) * 2;
            let u = pixels[uv_index] as f32 - 128.0;
            let v = pixels[uv_index + 1] as f32 - 128.0;

            let r = y + 1.402_f32 * v;
            let g = y - 0.344_136_f32 * u - 0.714_136_f32 * v;
            let b = y + 1.772_f32 * u;

            let offset = (j * w + i) * 3;
            rgb[offset] = clamp_to_u8(r);
            rgb[offset + 1] = clamp_to_u8(g);
            rgb[offset + 2] = clamp_to_u8(b);
        }
    }
    rgb
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nv12_conversion_produces_gray() -> Result<()> {
        let y_plane = vec![128u8; 4];
        let uv_plane = vec![128u8; 2];
        let nv12 = [y_plane, uv_plane].concat();

        let frame = normalize_frame(&nv12, 2, 2, PixelFormat::Nv12)?;
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.samples(), &[128u8; 12][..]);
        Ok(())
    }

    #[test]
    fn rgb_pass_through_validates_length() -> Result<()> {
        let pixels = vec![1u8; 9];
        let frame = normalize_frame(&pixels, 1, 3, PixelFormat::Rgb24)?;
        assert_eq!(frame.samples(), &pixels[..]);
        assert!(normalize_frame(&pixels, 2, 3, PixelFormat::Rgb24).is_err());
        Ok(())
    }

    #[test]
    fn gray_stays_single_channel() -> Result<()> {
        let frame = normalize_frame(&[7, 8, 9, 10], 2, 2, PixelFormat::Gray8)?;
        assert_eq!(frame.channels(), 1);
        assert_eq!(frame.pixel(1, 1), Some(&[10u8][..]));
        Ok(())
    }

    #[test]
    fn frame_len_per_format() -> Result<()> {
        assert_eq!(PixelFormat::Gray8.frame_len(4, 2)?, 8);
        assert_eq!(PixelFormat::Rgb24.frame_len(4, 2)?, 24);
        assert_eq!(PixelFormat::Nv12.frame_len(4, 2)?, 12);
        assert_eq!("NV12".parse::<PixelFormat>()?, PixelFormat::Nv12);
        Ok(())
    }
}
