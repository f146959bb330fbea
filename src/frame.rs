//! Frame handling.
//!
//! - `Frame`: an owned RGB image, 8 bits per channel.
//! - `to_working_resolution`: every frame is processed at 640x480.
//! - `LastFrameSlot`: single-value handoff of the last annotated frame between
//!   the acquisition worker and the interactive thread.
//!
//! Frames are owned by one stage at a time. The only cross-thread frame is the
//! last annotated result, which is published as an immutable `Arc` and replaced
//! wholesale on every cycle.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::OperatorNotice;

/// Working resolution width. Frames are resized to this before detection.
pub const WORKING_WIDTH: u32 = 640;

/// Working resolution height.
pub const WORKING_HEIGHT: u32 = 480;

/// Color frame in RGB channel order.
pub type Frame = RgbImage;

/// Reject frames that cannot be processed.
pub fn ensure_usable(frame: &Frame) -> Result<()> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(OperatorNotice::malformed_frame(format!(
            "frame has zero size ({}x{})",
            frame.width(),
            frame.height()
        ))
        .into());
    }
    Ok(())
}

/// Resize to the working resolution (bilinear). Frames already at the working
/// size are returned untouched.
pub fn to_working_resolution(frame: Frame) -> Result<Frame> {
    ensure_usable(&frame)?;
    if frame.dimensions() == (WORKING_WIDTH, WORKING_HEIGHT) {
        return Ok(frame);
    }
    Ok(imageops::resize(
        &frame,
        WORKING_WIDTH,
        WORKING_HEIGHT,
        FilterType::Triangle,
    ))
}

// ----------------------------------------------------------------------------
// LastFrameSlot: last annotated frame handoff
// ----------------------------------------------------------------------------

/// Holds the most recent annotated frame.
///
/// A short mutex lock guards the pointer: writers swap in a new `Arc`, readers
/// clone the current one. Frames are never drawn or encoded under the lock, so
/// a reader may see the previous frame but never a partially written one.
#[derive(Clone, Default)]
pub struct LastFrameSlot {
    inner: Arc<Mutex<Option<Arc<Frame>>>>,
}

impl LastFrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a frame, returning the one it replaced.
    pub fn publish(&self, frame: Frame) -> Option<Arc<Frame>> {
        let frame = Arc::new(frame);
        match self.inner.lock() {
            Ok(mut guard) => guard.replace(frame),
            Err(poisoned) => poisoned.into_inner().replace(frame),
        }
    }

    /// Current frame, if any was published.
    pub fn latest(&self) -> Option<Arc<Frame>> {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.latest().is_none()
    }
}
