//! Frame acquisition.
//!
//! This module provides the two ways frames enter the program:
//! - Still images from local files (`load_frame`)
//! - Capture devices producing a continuous stream (`CaptureSource`):
//!   V4L2 cameras (feature: ingest-v4l2) and a synthetic `stub://` camera
//!
//! All sources produce RGB `Frame`s at whatever resolution they capture;
//! resizing to the working resolution happens in the acquisition loop.
//!
//! Failures to open or decode are reported as `SourceUnavailable` notices;
//! frames that decode but cannot be used are `MalformedFrame` notices.

pub mod capture;
mod image_file;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
#[cfg(feature = "ingest-v4l2")]
mod v4l2;

pub use capture::{CaptureConfig, CaptureSource, CaptureStats};
pub use image_file::load_frame;
