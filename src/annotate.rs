//! Bounding box overlay.
//!
//! Only the axis-aligned rectangle of each accepted contour is drawn; the
//! contour polygon itself is not.

use image::Rgb;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::detect::DetectionResult;
use crate::frame::Frame;

/// Box color (green).
pub const DETECTION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Box line thickness in pixels.
pub const BOX_THICKNESS: u32 = 2;

/// Draw every detected shape's bounding rectangle onto the frame.
pub fn annotate(frame: &mut Frame, result: &DetectionResult) {
    for shape in &result.shapes {
        let bounds = shape.bounds;
        for inset in 0..BOX_THICKNESS {
            let width = bounds.width.saturating_sub(2 * inset);
            let height = bounds.height.saturating_sub(2 * inset);
            if width == 0 || height == 0 {
                break;
            }
            let rect = Rect::at(bounds.x + inset as i32, bounds.y + inset as i32)
                .of_size(width, height);
            draw_hollow_rect_mut(frame, rect, DETECTION_COLOR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingRect, Shape};
    use imageproc::point::Point;

    fn shape_at(x: i32, y: i32, width: u32, height: u32) -> Shape {
        Shape {
            points: vec![Point::new(x, y)],
            area: (width * height) as f64,
            bounds: BoundingRect {
                x,
                y,
                width,
                height,
            },
        }
    }

    #[test]
    fn draws_two_pixel_outline_only() {
        let mut frame = Frame::new(40, 40);
        let result = DetectionResult {
            shapes: vec![shape_at(10, 10, 12, 8)],
            ..DetectionResult::default()
        };
        annotate(&mut frame, &result);

        assert_eq!(frame.get_pixel(10, 10), &DETECTION_COLOR);
        assert_eq!(frame.get_pixel(11, 11), &DETECTION_COLOR);
        assert_eq!(frame.get_pixel(21, 17), &DETECTION_COLOR);
        assert_eq!(frame.get_pixel(12, 12), &Rgb([0, 0, 0]));
        assert_eq!(frame.get_pixel(9, 9), &Rgb([0, 0, 0]));
        assert_eq!(frame.get_pixel(22, 18), &Rgb([0, 0, 0]));
    }

    #[test]
    fn one_pixel_shapes_do_not_panic() {
        let mut frame = Frame::new(5, 5);
        let result = DetectionResult {
            shapes: vec![shape_at(2, 2, 1, 1)],
            ..DetectionResult::default()
        };
        annotate(&mut frame, &result);
        assert_eq!(frame.get_pixel(2, 2), &DETECTION_COLOR);
    }
}
