//! Frame persistence.
//!
//! The encoding is chosen from the destination extension (`png`, `jpg`,
//! `jpeg`). A destination without an extension is saved as PNG. Writes go to
//! a temporary file in the destination directory which is then renamed over
//! the target, so a failed save never leaves a partial image behind.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use image::ImageFormat;

use crate::frame::Frame;
use crate::OperatorNotice;

/// Encode `frame` and write it to `path`. Returns the path actually written,
/// which differs from `path` when a `.png` extension had to be added.
pub fn save_frame(frame: &Frame, path: impl AsRef<Path>) -> Result<PathBuf> {
    let requested = path.as_ref();
    if requested.as_os_str().is_empty() {
        return Err(OperatorNotice::save_failed("no destination path given").into());
    }
    let (path, format) = resolve_destination(requested)?;
    crate::frame::ensure_usable(frame)
        .map_err(|err| OperatorNotice::save_failed(format!("{}: {err:#}", path.display())))?;

    let mut encoded = Vec::new();
    frame
        .write_to(&mut Cursor::new(&mut encoded), format)
        .map_err(|err| {
            OperatorNotice::save_failed(format!("encode {}: {err}", path.display()))
        })?;

    write_atomic(&path, &encoded)
        .map_err(|err| OperatorNotice::save_failed(format!("{}: {err:#}", path.display())))?;
    log::info!(
        "saved {}x{} frame to {}",
        frame.width(),
        frame.height(),
        path.display()
    );
    Ok(path)
}

fn resolve_destination(path: &Path) -> Result<(PathBuf, ImageFormat)> {
    let Some(ext) = path.extension() else {
        let mut with_ext = path.as_os_str().to_owned();
        with_ext.push(".png");
        return Ok((PathBuf::from(with_ext), ImageFormat::Png));
    };
    let format = match ext.to_string_lossy().to_ascii_lowercase().as_str() {
        "png" => ImageFormat::Png,
        "jpg" | "jpeg" => ImageFormat::Jpeg,
        other => {
            return Err(OperatorNotice::save_failed(format!(
                "unsupported image format '.{other}' (use .png, .jpg or .jpeg)"
            ))
            .into())
        }
    };
    Ok((path.to_path_buf(), format))
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
