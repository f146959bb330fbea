use std::time::Instant;

use anyhow::Result;
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::gaussian_blur_f32;

use super::params::ParameterSnapshot;
use super::result::DetectionResult;
use super::shape::{external_contours, Shape};
use crate::frame::{ensure_usable, Frame};

/// Neighborhood size of the adaptive threshold. Not operator-tunable.
pub const ADAPTIVE_BLOCK_SIZE: u32 = 11;

/// Subtracted from the local mean before comparing. Not operator-tunable.
pub const ADAPTIVE_OFFSET: f32 = 2.0;

type IntensityImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Count the objects in a color frame.
///
/// Stages, each feeding the next:
/// 1. intensity (BT.601 luma)
/// 2. Gaussian blur with a `blur_size` square kernel (1 = no-op)
/// 3. inverted adaptive threshold: a pixel is foreground when it is at least
///    `ADAPTIVE_OFFSET` darker than its Gaussian-weighted neighborhood mean
/// 4. outer contours of top-level blobs only
/// 5. keep contours enclosing strictly more than `min_area` pixels²
///
/// `threshold` in the snapshot is not consulted; binarization is local.
/// The returned processing time covers stages 1-5.
pub fn count_objects(frame: &Frame, params: &ParameterSnapshot) -> Result<DetectionResult> {
    ensure_usable(frame)?;
    let started = Instant::now();

    let gray = intensity(frame);
    let blurred = blur(gray, params.blur_size);
    let binary = adaptive_threshold_inv(&blurred);

    let min_area = params.min_area as f64;
    let shapes = external_contours(&binary)
        .into_iter()
        .filter_map(Shape::from_points)
        .filter(|shape| shape.area > min_area)
        .collect();

    Ok(DetectionResult {
        shapes,
        processing_time: started.elapsed(),
    })
}

fn intensity(frame: &Frame) -> IntensityImage {
    IntensityImage::from_fn(frame.width(), frame.height(), |x, y| {
        let [r, g, b] = frame.get_pixel(x, y).0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        Luma([luma.round()])
    })
}

/// Blur with the Gaussian matching a `kernel_size` square kernel. Values are
/// rounded back to whole intensities, as an 8-bit intermediate would be.
fn blur(gray: IntensityImage, kernel_size: u32) -> IntensityImage {
    if kernel_size <= 1 {
        return gray;
    }
    let mut blurred = gaussian_blur_f32(&gray, sigma_for_kernel(kernel_size));
    for pixel in blurred.pixels_mut() {
        pixel.0[0] = pixel.0[0].round();
    }
    blurred
}

fn adaptive_threshold_inv(src: &IntensityImage) -> GrayImage {
    let mean = gaussian_blur_f32(src, sigma_for_kernel(ADAPTIVE_BLOCK_SIZE));
    GrayImage::from_fn(src.width(), src.height(), |x, y| {
        if is_foreground(src.get_pixel(x, y).0[0], mean.get_pixel(x, y).0[0]) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// The local mean is rounded to a whole intensity before the offset applies.
fn is_foreground(value: f32, local_mean: f32) -> bool {
    value <= local_mean.round() - ADAPTIVE_OFFSET
}

/// Standard deviation implied by an odd kernel size when none is given.
fn sigma_for_kernel(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}
