//! Absolute difference and thresholding shared by every detection mode.
//!
//! Multi-channel differences are combined into one value per pixel with integer
//! BT.601 luma weights. The weights sum to 256, so a difference of `d` in every
//! channel combines to exactly `d`. Alpha is ignored.

use crate::error::Result;
use crate::frame::{Frame, ForegroundMask};

const LUMA_R: u32 = 77;
const LUMA_G: u32 = 150;
const LUMA_B: u32 = 29;

/// Combined per-pixel difference between two frames of identical shape.
pub fn difference_image(frame: &Frame, reference: &Frame) -> Result<Vec<u8>> {
    reference.ensure_same_shape(frame)?;
    let channels = frame.channels() as usize;
    let diff = frame
        .samples()
        .chunks_exact(channels)
        .zip(reference.samples().chunks_exact(channels))
        .map(|(a, b)| {
            if channels == 1 {
                a[0].abs_diff(b[0])
            } else {
                combine_rgb(a[0].abs_diff(b[0]), a[1].abs_diff(b[1]), a[2].abs_diff(b[2]))
            }
        })
        .collect();
    Ok(diff)
}

/// BT.601 luma of a per-channel difference triple, rounded.
pub fn combine_rgb(r: u8, g: u8, b: u8) -> u8 {
    ((LUMA_R * r as u32 + LUMA_G * g as u32 + LUMA_B * b as u32 + 128) >> 8) as u8
}

/// Foreground iff the combined difference strictly exceeds `threshold`.
pub fn threshold_mask(diff: &[u8], width: u32, height: u32, threshold: f32) -> ForegroundMask {
    let bits = diff.iter().map(|&d| d as f32 > threshold).collect();
    ForegroundMask::from_bits(width, height, bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MotionError;

    #[test]
    fn equal_channel_differences_combine_exactly() {
        for d in [0u8, 1, 29, 30, 128, 255] {
            assert_eq!(combine_rgb(d, d, d), d);
        }
    }

    #[test]
    fn green_dominates_combined_difference() {
        assert!(combine_rgb(0, 100, 0) > combine_rgb(100, 0, 0));
        assert!(combine_rgb(100, 0, 0) > combine_rgb(0, 0, 100));
    }

    #[test]
    fn difference_is_symmetric_and_ignores_alpha() {
        let a = Frame::new(1, 1, 4, vec![10, 10, 10, 0]).unwrap();
        let b = Frame::new(1, 1, 4, vec![50, 50, 50, 255]).unwrap();
        assert_eq!(difference_image(&a, &b).unwrap(), vec![40]);
        assert_eq!(difference_image(&b, &a).unwrap(), vec![40]);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let a = Frame::filled(2, 2, 1, 0).unwrap();
        let b = Frame::filled(2, 3, 1, 0).unwrap();
        assert!(matches!(
            difference_image(&a, &b).unwrap_err(),
            MotionError::DimensionMismatch { .. }
        ));
    }

    #[test]
    fn threshold_is_strict() {
        let mask = threshold_mask(&[29, 30, 31], 3, 1, 30.0);
        assert_eq!(mask.bits(), &[false, false, true]);
    }
}
