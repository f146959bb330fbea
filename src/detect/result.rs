use std::time::Duration;

use super::shape::Shape;

/// Result of running detection on a frame.
#[derive(Clone, Debug, Default)]
pub struct DetectionResult {
    /// Contours that passed the area filter.
    pub shapes: Vec<Shape>,
    /// Wall-clock time spent in the pipeline.
    pub processing_time: Duration,
}

impl DetectionResult {
    /// Number of detected objects.
    pub fn count(&self) -> usize {
        self.shapes.len()
    }

    /// Frames per second implied by the processing time.
    pub fn fps(&self) -> f64 {
        throughput_fps(self.processing_time)
    }
}

/// Inverse of a processing duration. Zero durations and non-finite results
/// report 0 so the readout is always a finite, non-negative number.
pub fn throughput_fps(elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    let fps = 1.0 / secs;
    if fps.is_finite() {
        fps
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_reports_zero() {
        assert_eq!(throughput_fps(Duration::ZERO), 0.0);
        assert_eq!(DetectionResult::default().fps(), 0.0);
    }

    #[test]
    fn throughput_is_finite_and_non_negative() {
        for elapsed in [
            Duration::from_nanos(1),
            Duration::from_micros(250),
            Duration::from_millis(20),
            Duration::from_secs(3),
            Duration::MAX,
        ] {
            let fps = throughput_fps(elapsed);
            assert!(fps.is_finite(), "{elapsed:?} gave {fps}");
            assert!(fps >= 0.0);
        }
        assert!((throughput_fps(Duration::from_millis(20)) - 50.0).abs() < 1e-9);
    }
}
