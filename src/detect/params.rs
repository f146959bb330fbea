use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU32, Ordering};

pub const DEFAULT_MIN_AREA: u32 = 500;
pub const DEFAULT_THRESHOLD: u8 = 180;
pub const DEFAULT_BLUR_SIZE: u32 = 5;

/// Operator slider ranges.
pub const MIN_AREA_RANGE: RangeInclusive<u32> = 100..=2000;
pub const THRESHOLD_RANGE: RangeInclusive<u32> = 0..=255;
pub const BLUR_SIZE_RANGE: RangeInclusive<u32> = 1..=15;

/// Tunable detection parameters, shared between the interactive thread and
/// the acquisition worker.
///
/// Each value is an independent atomic. The worker takes a [`ParameterSnapshot`]
/// once per frame, so a slider moved mid-frame takes effect on the next one.
#[derive(Debug)]
pub struct DetectionParameters {
    min_area: AtomicU32,
    threshold: AtomicU32,
    blur_size: AtomicU32,
}

impl DetectionParameters {
    pub fn new(min_area: u32, threshold: u8, blur_size: u32) -> Self {
        Self {
            min_area: AtomicU32::new(min_area),
            threshold: AtomicU32::new(threshold as u32),
            blur_size: AtomicU32::new(odd_kernel_size(blur_size)),
        }
    }

    pub fn min_area(&self) -> u32 {
        self.min_area.load(Ordering::Relaxed)
    }

    pub fn set_min_area(&self, value: u32) {
        self.min_area.store(value, Ordering::Relaxed);
    }

    /// Stored and displayed, but not consumed by the adaptive threshold.
    pub fn threshold(&self) -> u8 {
        self.threshold.load(Ordering::Relaxed) as u8
    }

    pub fn set_threshold(&self, value: u8) {
        self.threshold.store(value as u32, Ordering::Relaxed);
    }

    pub fn blur_size(&self) -> u32 {
        self.blur_size.load(Ordering::Relaxed)
    }

    /// Store a blur kernel size, bumping even values to the next odd one.
    /// Returns the stored value.
    pub fn set_blur_size(&self, value: u32) -> u32 {
        let value = odd_kernel_size(value);
        self.blur_size.store(value, Ordering::Relaxed);
        value
    }

    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            min_area: self.min_area(),
            threshold: self.threshold(),
            blur_size: self.blur_size(),
        }
    }
}

impl Default for DetectionParameters {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_AREA, DEFAULT_THRESHOLD, DEFAULT_BLUR_SIZE)
    }
}

/// Point-in-time copy of the parameters used for one detection pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParameterSnapshot {
    pub min_area: u32,
    pub threshold: u8,
    pub blur_size: u32,
}

fn odd_kernel_size(value: u32) -> u32 {
    if value % 2 == 0 {
        value.saturating_add(1)
    } else {
        value
    }
}
