//! Still image source.
//!
//! Decodes a local PNG, JPEG or BMP file into an RGB frame. Remote URLs are
//! not fetched.

use std::path::Path;

use anyhow::Result;

use crate::frame::{ensure_usable, Frame};
use crate::OperatorNotice;

/// Load a still image from disk.
///
/// A missing, unreadable or undecodable file yields a `SourceUnavailable`
/// notice; an image that decodes to zero pixels yields `MalformedFrame`.
pub fn load_frame(path: impl AsRef<Path>) -> Result<Frame> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() || path.to_string_lossy().contains("://") {
        return Err(OperatorNotice::source_unavailable(format!(
            "not a local image path: '{}'",
            path.display()
        ))
        .into());
    }
    if !path.is_file() {
        return Err(OperatorNotice::source_unavailable(format!(
            "could not load image: {} does not exist",
            path.display()
        ))
        .into());
    }

    let decoded = image::open(path).map_err(|err| {
        OperatorNotice::source_unavailable(format!(
            "could not load image {}: {}",
            path.display(),
            err
        ))
    })?;
    let frame = decoded.to_rgb8();
    ensure_usable(&frame)?;

    log::debug!(
        "loaded image {} ({}x{})",
        path.display(),
        frame.width(),
        frame.height()
    );
    Ok(frame)
}
