//! Capture device source.
//!
//! This module provides `CaptureSource`, the continuous frame stream used in
//! streaming mode.
//!
//! The capture source is responsible for:
//! - Resolving a device specifier (`0`, `/dev/video2`, `stub://bench`)
//! - Opening the device and negotiating a frame format
//! - Producing RGB `Frame`s until the stream ends or fails
//! - Releasing the device on every exit path (explicitly or on drop)
//!
//! At most one `CaptureSource` should be open at a time; the session enforces
//! this.

use std::path::PathBuf;

use anyhow::Result;
use image::Rgb;
use imageproc::drawing::draw_filled_circle_mut;

#[cfg(feature = "ingest-v4l2")]
use super::v4l2::DeviceCapture;
use crate::frame::Frame;
use crate::OperatorNotice;

const SYNTHETIC_PREFIX: &str = "stub://";

/// Configuration for a capture source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Device index (`0` → `/dev/video0`), device path, or `stub://<name>`.
    pub device: String,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
    /// Requested frame rate (frames per second). 0 leaves the device default.
    pub target_fps: u32,
    /// Synthetic sources end after this many frames. Ignored by real devices.
    pub frame_limit: Option<u64>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: "0".to_string(),
            width: 640,
            height: 480,
            target_fps: 30,
            frame_limit: None,
        }
    }
}

/// Where a device specifier points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum DeviceSpec {
    Synthetic(String),
    Node(PathBuf),
}

impl DeviceSpec {
    pub(crate) fn parse(device: &str) -> Result<Self> {
        let device = device.trim();
        if device.is_empty() {
            return Err(OperatorNotice::source_unavailable("no capture device configured").into());
        }
        if let Some(name) = device.strip_prefix(SYNTHETIC_PREFIX) {
            return Ok(DeviceSpec::Synthetic(name.to_string()));
        }
        if device.contains("://") {
            return Err(OperatorNotice::source_unavailable(format!(
                "capture only supports local devices, got '{device}'"
            ))
            .into());
        }
        if device.chars().all(|c| c.is_ascii_digit()) {
            return Ok(DeviceSpec::Node(PathBuf::from(format!("/dev/video{device}"))));
        }
        Ok(DeviceSpec::Node(PathBuf::from(device)))
    }
}

/// Open capture device.
///
/// Uses V4L2 for real devices (feature: ingest-v4l2), with a synthetic
/// fallback for `stub://` specifiers.
pub struct CaptureSource {
    backend: Option<CaptureBackend>,
    device: String,
    frames_captured: u64,
}

enum CaptureBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "ingest-v4l2")]
    Device(DeviceCapture),
}

impl CaptureSource {
    /// Open the configured device. Fails with `SourceUnavailable` when the
    /// device is absent or cannot be configured.
    pub fn open(config: &CaptureConfig) -> Result<Self> {
        let backend = match DeviceSpec::parse(&config.device)? {
            DeviceSpec::Synthetic(name) => {
                CaptureBackend::Synthetic(SyntheticCamera::new(name, config))
            }
            #[cfg(feature = "ingest-v4l2")]
            DeviceSpec::Node(path) => CaptureBackend::Device(DeviceCapture::open(&path, config)?),
            #[cfg(not(feature = "ingest-v4l2"))]
            DeviceSpec::Node(path) => {
                return Err(OperatorNotice::source_unavailable(format!(
                    "could not access camera {}: capture requires the ingest-v4l2 feature",
                    path.display()
                ))
                .into())
            }
        };
        log::info!("CaptureSource: opened {}", config.device);
        Ok(Self {
            backend: Some(backend),
            device: config.device.clone(),
            frames_captured: 0,
        })
    }

    /// Read the next frame. `Ok(None)` marks the end of the stream; reading a
    /// released source also returns `Ok(None)`.
    pub fn read(&mut self) -> Result<Option<Frame>> {
        let frame = match self.backend.as_mut() {
            None => return Ok(None),
            Some(CaptureBackend::Synthetic(camera)) => camera.next_frame(),
            #[cfg(feature = "ingest-v4l2")]
            Some(CaptureBackend::Device(device)) => Some(device.next_frame()?),
        };
        if frame.is_some() {
            self.frames_captured += 1;
        }
        Ok(frame)
    }

    /// Release the device. Safe to call more than once.
    pub fn release(&mut self) {
        if self.backend.take().is_some() {
            log::info!(
                "CaptureSource: released {} after {} frames",
                self.device,
                self.frames_captured
            );
        }
    }

    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.frames_captured,
            device: self.device.clone(),
        }
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        self.release();
    }
}

/// Statistics for a capture source.
#[derive(Clone, Debug)]
pub struct CaptureStats {
    pub frames_captured: u64,
    pub device: String,
}

// ----------------------------------------------------------------------------
// Synthetic camera (stub://) for demos and tests
// ----------------------------------------------------------------------------

const SYNTHETIC_BACKGROUND: Rgb<u8> = Rgb([230, 230, 225]);
const SYNTHETIC_DISC: Rgb<u8> = Rgb([30, 35, 40]);
const SYNTHETIC_DISCS: u32 = 3;
const SYNTHETIC_SPEED_PX: u64 = 4;

/// Renders dark discs drifting across a light background, one per row, so
/// every frame holds exactly `SYNTHETIC_DISCS` separated objects.
struct SyntheticCamera {
    name: String,
    width: u32,
    height: u32,
    frame_limit: Option<u64>,
    frame_count: u64,
}

impl SyntheticCamera {
    fn new(name: String, config: &CaptureConfig) -> Self {
        Self {
            name,
            width: config.width.max(64),
            height: config.height.max(64),
            frame_limit: config.frame_limit,
            frame_count: 0,
        }
    }

    fn next_frame(&mut self) -> Option<Frame> {
        if self.frame_limit.is_some_and(|limit| self.frame_count >= limit) {
            log::info!("synthetic camera {} reached end of stream", self.name);
            return None;
        }
        self.frame_count += 1;
        Some(self.render())
    }

    fn render(&self) -> Frame {
        let mut frame = Frame::from_pixel(self.width, self.height, SYNTHETIC_BACKGROUND);
        let radius = self.disc_radius();
        let travel = (self.width - 2 * radius) as u64;
        for i in 0..SYNTHETIC_DISCS {
            let phase = i as u64 * travel / SYNTHETIC_DISCS as u64;
            let x = radius as u64 + (phase + self.frame_count * SYNTHETIC_SPEED_PX) % travel;
            let y = self.height * (i + 1) / (SYNTHETIC_DISCS + 1);
            draw_filled_circle_mut(&mut frame, (x as i32, y as i32), radius as i32, SYNTHETIC_DISC);
        }
        frame
    }

    fn disc_radius(&self) -> u32 {
        (self.height / 16).min(self.width / 8).max(4)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
