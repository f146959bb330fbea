use anyhow::{anyhow, Result};
use image::ImageFormat;

use crate::frame::Frame;
use crate::OperatorNotice;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PixelFormat {
    Rgb24,
    Yuyv,
    Mjpeg,
}

pub(crate) fn normalize_to_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Frame> {
    let rgb = match format {
        PixelFormat::Rgb24 => {
            let expected = plane_len(width, height, 3)?;
            if pixels.len() < expected {
                return Err(OperatorNotice::malformed_frame(format!(
                    "RGB frame length mismatch: expected {}, got {}",
                    expected,
                    pixels.len()
                ))
                .into());
            }
            pixels[..expected].to_vec()
        }
        PixelFormat::Yuyv => yuyv_to_rgb(pixels, width, height)?,
        PixelFormat::Mjpeg => {
            let decoded = image::load_from_memory_with_format(pixels, ImageFormat::Jpeg)
                .map_err(|err| {
                    OperatorNotice::malformed_frame(format!("undecodable MJPEG frame: {err}"))
                })?;
            return Ok(decoded.to_rgb8());
        }
    };

    Frame::from_raw(width, height, rgb)
        .ok_or_else(|| OperatorNotice::malformed_frame("frame buffer too small").into())
}

fn plane_len(width: u32, height: u32, bytes_per_pixel: u32) -> Result<usize> {
    width
        .checked_mul(height)
        .and_then(|v| v.checked_mul(bytes_per_pixel))
        .map(|v| v as usize)
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

fn yuyv_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let expected = plane_len(width, height, 2)?;
    if width % 2 != 0 || pixels.len() < expected {
        return Err(OperatorNotice::malformed_frame(format!(
            "YUYV frame length mismatch: expected {}, got {} (width {})",
            expected,
            pixels.len(),
            width
        ))
        .into());
    }

    let mut rgb = Vec::with_capacity(plane_len(width, height, 3)?);
    for chunk in pixels[..expected].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0], chunk[2]] {
            let y = y as f32;
            rgb.push(clamp_to_u8(y + 1.402_f32 * v));
            rgb.push(clamp_to_u8(y - 0.344_136_f32 * u - 0.714_136_f32 * v));
            rgb.push(clamp_to_u8(y + 1.772_f32 * u));
        }
    }
    Ok(rgb)
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
