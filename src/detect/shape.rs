use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use imageproc::rect::Rect;

/// Smallest axis-aligned rectangle enclosing a contour, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingRect {
    pub fn to_rect(self) -> Rect {
        Rect::at(self.x, self.y).of_size(self.width, self.height)
    }
}

/// An accepted contour: its polygon, enclosed area and bounding rectangle.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub points: Vec<Point<i32>>,
    pub area: f64,
    pub bounds: BoundingRect,
}

impl Shape {
    /// Build a shape from a closed polygon. Returns `None` for an empty one.
    pub fn from_points(points: Vec<Point<i32>>) -> Option<Self> {
        let bounds = bounding_rect(&points)?;
        let area = polygon_area(&points);
        Some(Self {
            points,
            area,
            bounds,
        })
    }
}

/// Outer borders of every top-level foreground blob in a binary image.
///
/// Holes, and blobs nested inside holes, are skipped. Runs of points along a
/// straight horizontal, vertical or diagonal line are reduced to their ends.
pub(crate) fn external_contours(binary: &GrayImage) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|contour| {
            matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none()
        })
        .map(|contour| compress_runs(contour.points))
        .collect()
}

/// Drop points that continue the previous step in the same direction.
fn compress_runs(points: Vec<Point<i32>>) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points;
    }
    let step = |from: Point<i32>, to: Point<i32>| {
        ((to.x - from.x).signum(), (to.y - from.y).signum())
    };
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect()
}

/// Enclosed area of a closed polygon (shoelace formula).
pub(crate) fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let doubled: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    doubled.abs() as f64 / 2.0
}

fn bounding_rect(points: &[Point<i32>]) -> Option<BoundingRect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(BoundingRect {
        x: min_x,
        y: min_y,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn pts(raw: &[(i32, i32)]) -> Vec<Point<i32>> {
        raw.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn square_area_and_bounds() {
        let shape = Shape::from_points(pts(&[(2, 3), (12, 3), (12, 13), (2, 13)])).unwrap();
        assert_eq!(shape.area, 100.0);
        assert_eq!(
            shape.bounds,
            BoundingRect {
                x: 2,
                y: 3,
                width: 11,
                height: 11
            }
        );
    }

    #[test]
    fn degenerate_polygons_have_no_area() {
        assert_eq!(polygon_area(&pts(&[(0, 0), (5, 5)])), 0.0);
        assert!(Shape::from_points(Vec::new()).is_none());
    }

    #[test]
    fn straight_runs_collapse_to_corners() {
        let square = pts(&[
            (0, 0),
            (1, 0),
            (2, 0),
            (2, 1),
            (2, 2),
            (1, 2),
            (0, 2),
            (0, 1),
        ]);
        assert_eq!(compress_runs(square), pts(&[(0, 0), (2, 0), (2, 2), (0, 2)]));
    }

    #[test]
    fn nested_blobs_are_not_reported() {
        // Ring with a dot inside its hole: only the ring's outer border counts.
        let mut img = GrayImage::new(30, 30);
        for y in 5..25 {
            for x in 5..25 {
                let on_ring = !(8..22).contains(&x) || !(8..22).contains(&y);
                let dot = (14..16).contains(&x) && (14..16).contains(&y);
                if on_ring || dot {
                    img.put_pixel(x, y, Luma([255]));
                }
            }
        }

        let contours = external_contours(&img);
        assert_eq!(contours.len(), 1);
        let shape = Shape::from_points(contours[0].clone()).unwrap();
        assert_eq!(
            shape.bounds,
            BoundingRect {
                x: 5,
                y: 5,
                width: 20,
                height: 20
            }
        );
        assert_eq!(shape.area, 19.0 * 19.0);
    }
}
