//! Connected-component labeling of a foreground mask.
//!
//! 8-connectivity. Components are emitted in row-major order of their first
//! (top-most, then left-most) pixel, so the output is stable for a given mask.

use crate::detect::result::BoundingBox;
use crate::frame::ForegroundMask;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Component {
    pub bbox: BoundingBox,
    pub area: usize,
}

const NEIGHBOURS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

pub fn label(mask: &ForegroundMask) -> Vec<Component> {
    let width = mask.width() as usize;
    let height = mask.height() as usize;
    let bits = mask.bits();
    let mut visited = vec![false; bits.len()];
    let mut components = Vec::new();
    let mut stack: Vec<usize> = Vec::new();

    for start in 0..bits.len() {
        if !bits[start] || visited[start] {
            continue;
        }
        visited[start] = true;
        stack.push(start);

        let mut area = 0usize;
        let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
        let (mut max_x, mut max_y) = (0usize, 0usize);

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % width, idx / width);
            area += 1;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);

            for (dx, dy) in NEIGHBOURS {
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                    continue;
                }
                let n = ny as usize * width + nx as usize;
                if bits[n] && !visited[n] {
                    visited[n] = true;
                    stack.push(n);
                }
            }
        }

        components.push(Component {
            bbox: BoundingBox::from_corners(
                min_x as u32,
                min_y as u32,
                max_x as u32,
                max_y as u32,
            ),
            area,
        });
    }

    components
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mask_has_no_components() {
        assert!(label(&ForegroundMask::empty(8, 8)).is_empty());
    }

    #[test]
    fn diagonal_pixels_are_one_component() {
        let mask = ForegroundMask::from_fn(4, 4, |x, y| x == y);
        let components = label(&mask);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].area, 4);
        assert_eq!(components[0].bbox, BoundingBox::from_corners(0, 0, 3, 3));
    }

    #[test]
    fn components_follow_raster_order_of_first_pixel() {
        // Right blob starts on row 1, left blob on row 2.
        let mask = ForegroundMask::from_fn(10, 6, |x, y| {
            ((6..=8).contains(&x) && (1..=2).contains(&y)) || (x <= 1 && (2..=5).contains(&y))
        });
        let components = label(&mask);
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].bbox, BoundingBox::from_corners(6, 1, 8, 2));
        assert_eq!(components[0].area, 6);
        assert_eq!(components[1].bbox, BoundingBox::from_corners(0, 2, 1, 5));
        assert_eq!(components[1].area, 8);
    }

    #[test]
    fn area_counts_pixels_not_box() {
        // Vertical bar of 4 and bottom bar of 4 sharing the corner pixel.
        let mask = ForegroundMask::from_fn(5, 5, |x, y| (x == 1 && y <= 3) || (y == 3 && x <= 3));
        let components = label(&mask);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].area, 7);
        assert_eq!(components[0].bbox.box_area(), 16);
    }
}
