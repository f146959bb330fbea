//! Presentation surfaces.
//!
//! A render surface receives every annotated frame. Scaling to the surface is
//! aspect-ratio preserving and centred; the unused area is black.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::Rgb;

use crate::frame::Frame;
use crate::storage::save_frame;

/// Target size of a render surface in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Scale `frame` to fit inside `viewport` keeping its aspect ratio, and centre
/// it on a black canvas of exactly the viewport size.
pub fn fit_to_viewport(frame: &Frame, viewport: Viewport) -> Result<Frame> {
    if viewport.width == 0 || viewport.height == 0 {
        return Err(anyhow!(
            "viewport has zero size ({}x{})",
            viewport.width,
            viewport.height
        ));
    }
    crate::frame::ensure_usable(frame)?;

    let (fw, fh) = (frame.width() as f64, frame.height() as f64);
    let frame_ratio = fw / fh;
    let viewport_ratio = viewport.width as f64 / viewport.height as f64;
    let (width, height) = if viewport_ratio > frame_ratio {
        let height = viewport.height;
        ((height as f64 * frame_ratio) as u32, height)
    } else {
        let width = viewport.width;
        (width, (width as f64 / frame_ratio) as u32)
    };
    let (width, height) = (width.max(1), height.max(1));

    let scaled = if (width, height) == frame.dimensions() {
        frame.clone()
    } else {
        imageops::resize(frame, width, height, FilterType::Lanczos3)
    };

    let mut canvas = Frame::from_pixel(viewport.width, viewport.height, Rgb([0, 0, 0]));
    let x = (viewport.width - width) / 2;
    let y = (viewport.height - height) / 2;
    imageops::replace(&mut canvas, &scaled, x as i64, y as i64);
    Ok(canvas)
}

/// Receives annotated frames for display.
pub trait RenderSurface: Send {
    /// Surface identifier.
    fn name(&self) -> &'static str;

    /// Present a frame. Failures are reported but never stop acquisition.
    fn present(&mut self, frame: &Frame) -> Result<()>;
}

/// Surface that discards frames.
#[derive(Debug, Default)]
pub struct NullSurface;

impl RenderSurface for NullSurface {
    fn name(&self) -> &'static str {
        "null"
    }

    fn present(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }
}

/// Surface that keeps a preview image file up to date, fitted to a viewport.
///
/// The file is replaced atomically, so an image viewer watching it never sees
/// a half-written frame.
#[derive(Debug)]
pub struct PreviewFileSurface {
    path: PathBuf,
    viewport: Viewport,
    frames_presented: u64,
}

impl PreviewFileSurface {
    pub fn new(path: impl Into<PathBuf>, viewport: Viewport) -> Self {
        Self {
            path: path.into(),
            viewport,
            frames_presented: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

impl RenderSurface for PreviewFileSurface {
    fn name(&self) -> &'static str {
        "preview-file"
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        let fitted = fit_to_viewport(frame, self.viewport)?;
        save_frame(&fitted, &self.path)?;
        self.frames_presented += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    #[test]
    fn wide_viewport_pillarboxes() -> Result<()> {
        let frame = Frame::from_pixel(640, 480, WHITE);
        let fitted = fit_to_viewport(&frame, Viewport::new(1000, 480))?;
        assert_eq!(fitted.dimensions(), (1000, 480));
        // 640 wide image centred: bars of 180 px each side.
        assert_eq!(fitted.get_pixel(179, 240), &BLACK);
        assert_eq!(fitted.get_pixel(181, 240), &WHITE);
        assert_eq!(fitted.get_pixel(818, 240), &WHITE);
        assert_eq!(fitted.get_pixel(821, 240), &BLACK);
        Ok(())
    }

    #[test]
    fn tall_viewport_letterboxes() -> Result<()> {
        let frame = Frame::from_pixel(640, 480, WHITE);
        let fitted = fit_to_viewport(&frame, Viewport::new(320, 400))?;
        // Scaled to 320x240, bars of 80 px above and below.
        assert_eq!(fitted.get_pixel(160, 70), &BLACK);
        assert_eq!(fitted.get_pixel(160, 200), &WHITE);
        assert_eq!(fitted.get_pixel(160, 330), &BLACK);
        Ok(())
    }

    #[test]
    fn zero_viewport_is_rejected() {
        let frame = Frame::from_pixel(4, 4, WHITE);
        assert!(fit_to_viewport(&frame, Viewport::new(0, 10)).is_err());
    }

    #[test]
    fn preview_surface_writes_fitted_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("preview.png");
        let mut surface = PreviewFileSurface::new(&path, Viewport::new(200, 100));

        surface.present(&Frame::from_pixel(640, 480, WHITE))?;
        surface.present(&Frame::from_pixel(640, 480, WHITE))?;

        let written = image::open(&path)?.to_rgb8();
        assert_eq!(written.dimensions(), (200, 100));
        assert_eq!(surface.frames_presented(), 2);
        assert_eq!(surface.path(), path.as_path());
        Ok(())
    }
}
