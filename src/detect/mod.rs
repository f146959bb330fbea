//! Object detection.
//!
//! A frame goes through grayscale, blur, adaptive threshold, external contour
//! extraction and an area filter. The number of surviving contours is the
//! object count.

mod params;
mod pipeline;
mod result;
mod shape;

pub use params::{
    DetectionParameters, ParameterSnapshot, BLUR_SIZE_RANGE, DEFAULT_BLUR_SIZE, DEFAULT_MIN_AREA,
    DEFAULT_THRESHOLD, MIN_AREA_RANGE, THRESHOLD_RANGE,
};
pub use pipeline::{count_objects, ADAPTIVE_BLOCK_SIZE, ADAPTIVE_OFFSET};
pub use result::{throughput_fps, DetectionResult};
pub use shape::{BoundingRect, Shape};
