//! V4L2 capture device.
//!
//! Opens a local device node (e.g. /dev/video0), asks for RGB24 at the
//! configured size, and falls back to whatever the driver keeps if that is
//! refused. YUYV and MJPEG frames are normalized to RGB.

use std::path::Path;

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use super::capture::CaptureConfig;
use super::normalize::{normalize_to_rgb, PixelFormat};
use crate::frame::Frame;
use crate::OperatorNotice;

pub(crate) struct DeviceCapture {
    path: String,
    state: DeviceState,
    format: PixelFormat,
    active_width: u32,
    active_height: u32,
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl DeviceCapture {
    pub(crate) fn open(path: &Path, config: &CaptureConfig) -> Result<Self> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let display = path.display().to_string();
        let mut device = v4l::Device::with_path(path).map_err(|err| {
            OperatorNotice::source_unavailable(format!("could not access camera {display}: {err}"))
        })?;

        let mut format = device.format().context("read v4l2 format")?;
        format.width = config.width;
        format.height = config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!("DeviceCapture: failed to set format on {}: {}", display, err);
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        let pixel_format = match &format.fourcc.repr {
            b"RGB3" => PixelFormat::Rgb24,
            b"YUYV" => PixelFormat::Yuyv,
            b"MJPG" => PixelFormat::Mjpeg,
            other => {
                return Err(OperatorNotice::source_unavailable(format!(
                    "camera {} delivers unsupported pixel format {}",
                    display,
                    String::from_utf8_lossy(other)
                ))
                .into())
            }
        };

        if config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!("DeviceCapture: failed to set fps on {}: {}", display, err);
            }
        }

        let state = DeviceStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()
        .map_err(|err| OperatorNotice::source_unavailable(format!("{display}: {err:#}")))?;

        log::info!(
            "DeviceCapture: connected to {} ({}x{} {:?})",
            display,
            format.width,
            format.height,
            pixel_format
        );
        Ok(Self {
            path: display,
            state,
            format: pixel_format,
            active_width: format.width,
            active_height: format.height,
        })
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let (width, height, format) = (self.active_width, self.active_height, self.format);
        let frame = self.state.with_mut(|fields| -> Result<Frame> {
            let (buf, meta) = fields.stream.next().context("capture v4l2 frame")?;
            let used = match meta.bytesused as usize {
                0 => buf.len(),
                n => n.min(buf.len()),
            };
            normalize_to_rgb(&buf[..used], width, height, format)
        });

        if let Err(err) = &frame {
            log::warn!("DeviceCapture: read failed on {}: {:#}", self.path, err);
        }
        frame
    }
}
