//! Binary morphology with a square structuring element.
//!
//! Both passes are separable (rows, then columns) and use running counts, so
//! cost does not grow with the kernel size. Neighbours outside the grid are
//! ignored: the border neither erodes a blob nor seeds dilation.

use crate::frame::ForegroundMask;

#[derive(Clone, Copy)]
enum Op {
    Erode,
    Dilate,
}

#[derive(Clone, Copy)]
enum Axis {
    Rows,
    Columns,
}

/// Erosion followed by dilation. A kernel of 1 (or 0) returns the mask unchanged.
pub fn open(mask: &ForegroundMask, kernel_size: usize) -> ForegroundMask {
    if kernel_size <= 1 {
        return mask.clone();
    }
    dilate(&erode(mask, kernel_size), kernel_size)
}

pub fn erode(mask: &ForegroundMask, kernel_size: usize) -> ForegroundMask {
    apply(mask, kernel_size, Op::Erode)
}

pub fn dilate(mask: &ForegroundMask, kernel_size: usize) -> ForegroundMask {
    apply(mask, kernel_size, Op::Dilate)
}

fn apply(mask: &ForegroundMask, kernel_size: usize, op: Op) -> ForegroundMask {
    let (width, height) = (mask.width() as usize, mask.height() as usize);
    let radius = kernel_size / 2;
    if radius == 0 || width == 0 || height == 0 {
        return mask.clone();
    }
    let rows = pass(mask.bits(), width, height, radius, op, Axis::Rows);
    let both = pass(&rows, width, height, radius, op, Axis::Columns);
    ForegroundMask::from_bits(mask.width(), mask.height(), both)
}

fn pass(bits: &[bool], width: usize, height: usize, radius: usize, op: Op, axis: Axis) -> Vec<bool> {
    let (lines, len) = match axis {
        Axis::Rows => (height, width),
        Axis::Columns => (width, height),
    };
    let index = |line: usize, i: usize| match axis {
        Axis::Rows => line * width + i,
        Axis::Columns => i * width + line,
    };

    let mut out = vec![false; bits.len()];
    let mut prefix = vec![0usize; len + 1];
    for line in 0..lines {
        for i in 0..len {
            prefix[i + 1] = prefix[i] + bits[index(line, i)] as usize;
        }
        for i in 0..len {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius).min(len - 1);
            let count = prefix[hi + 1] - prefix[lo];
            out[index(line, i)] = match op {
                Op::Erode => count == hi - lo + 1,
                Op::Dilate => count > 0,
            };
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(width: u32, height: u32, x0: u32, y0: u32, w: u32, h: u32) -> ForegroundMask {
        ForegroundMask::from_fn(width, height, |x, y| {
            x >= x0 && x < x0 + w && y >= y0 && y < y0 + h
        })
    }

    #[test]
    fn opening_removes_isolated_pixels() {
        let mask = ForegroundMask::from_fn(9, 9, |x, y| (x, y) == (4, 4) || (x, y) == (0, 8));
        assert!(open(&mask, 3).is_clear());
    }

    #[test]
    fn opening_preserves_blocks_at_least_kernel_sized() {
        let mask = block(20, 12, 5, 3, 6, 4);
        assert_eq!(open(&mask, 3), mask);
        let square = block(20, 12, 2, 2, 5, 5);
        assert_eq!(open(&square, 5), square);
    }

    #[test]
    fn opening_removes_blocks_narrower_than_kernel() {
        let thin = block(20, 20, 5, 5, 2, 10);
        assert!(open(&thin, 3).is_clear());
    }

    #[test]
    fn border_does_not_erode_touching_blobs() {
        let corner = block(10, 10, 0, 0, 3, 3);
        assert_eq!(erode(&corner, 3).count(), 4);
        assert_eq!(open(&corner, 3), corner);
    }

    #[test]
    fn dilation_grows_by_radius_clipped_to_grid() {
        let dot = ForegroundMask::from_fn(5, 5, |x, y| (x, y) == (0, 0));
        let grown = dilate(&dot, 3);
        assert_eq!(grown.count(), 4);
        assert!(grown.get(1, 1));
        assert!(!grown.get(2, 0));
    }

    #[test]
    fn unit_kernel_is_identity() {
        let mask = ForegroundMask::from_fn(4, 4, |x, y| (x + y) % 3 == 0);
        assert_eq!(open(&mask, 1), mask);
    }
}
