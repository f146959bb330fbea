use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::{
    DetectionParameters, BLUR_SIZE_RANGE, DEFAULT_BLUR_SIZE, DEFAULT_MIN_AREA, DEFAULT_THRESHOLD,
    MIN_AREA_RANGE,
};
use crate::ingest::CaptureConfig;
use crate::render::Viewport;

const DEFAULT_DEVICE: &str = "0";
const DEFAULT_CAPTURE_WIDTH: u32 = 640;
const DEFAULT_CAPTURE_HEIGHT: u32 = 480;
const DEFAULT_CAPTURE_FPS: u32 = 30;
const DEFAULT_VIEWPORT_WIDTH: u32 = 800;
const DEFAULT_VIEWPORT_HEIGHT: u32 = 600;

#[derive(Debug, Deserialize, Default)]
struct CounterConfigFile {
    device: Option<String>,
    capture: Option<CaptureConfigFile>,
    detection: Option<DetectionConfigFile>,
    render: Option<RenderConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    min_area: Option<u32>,
    threshold: Option<u8>,
    blur_size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct RenderConfigFile {
    viewport_width: Option<u32>,
    viewport_height: Option<u32>,
    preview_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CounterConfig {
    pub capture: CaptureConfig,
    pub detection: DetectionSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionSettings {
    pub min_area: u32,
    pub threshold: u8,
    pub blur_size: u32,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub viewport: Viewport,
    pub preview_path: Option<PathBuf>,
}

impl CounterConfig {
    /// Defaults, then the file named by `OBJCOUNT_CONFIG`, then `OBJCOUNT_*`
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("OBJCOUNT_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CounterConfigFile) -> Self {
        let capture_file = file.capture.unwrap_or_default();
        let detection_file = file.detection.unwrap_or_default();
        let render_file = file.render.unwrap_or_default();

        let capture = CaptureConfig {
            device: file.device.unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
            width: capture_file.width.unwrap_or(DEFAULT_CAPTURE_WIDTH),
            height: capture_file.height.unwrap_or(DEFAULT_CAPTURE_HEIGHT),
            target_fps: capture_file.target_fps.unwrap_or(DEFAULT_CAPTURE_FPS),
            frame_limit: None,
        };
        let detection = DetectionSettings {
            min_area: detection_file.min_area.unwrap_or(DEFAULT_MIN_AREA),
            threshold: detection_file.threshold.unwrap_or(DEFAULT_THRESHOLD),
            blur_size: detection_file.blur_size.unwrap_or(DEFAULT_BLUR_SIZE),
        };
        let render = RenderSettings {
            viewport: Viewport::new(
                render_file.viewport_width.unwrap_or(DEFAULT_VIEWPORT_WIDTH),
                render_file.viewport_height.unwrap_or(DEFAULT_VIEWPORT_HEIGHT),
            ),
            preview_path: render_file.preview_path,
        };
        Self {
            capture,
            detection,
            render,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("OBJCOUNT_DEVICE") {
            if !device.trim().is_empty() {
                self.capture.device = device.trim().to_string();
            }
        }
        if let Some(width) = env_number("OBJCOUNT_CAPTURE_WIDTH")? {
            self.capture.width = width;
        }
        if let Some(height) = env_number("OBJCOUNT_CAPTURE_HEIGHT")? {
            self.capture.height = height;
        }
        if let Some(fps) = env_number("OBJCOUNT_TARGET_FPS")? {
            self.capture.target_fps = fps;
        }
        if let Some(min_area) = env_number("OBJCOUNT_MIN_AREA")? {
            self.detection.min_area = min_area;
        }
        if let Some(threshold) = env_number::<u8>("OBJCOUNT_THRESHOLD")? {
            self.detection.threshold = threshold;
        }
        if let Some(blur_size) = env_number("OBJCOUNT_BLUR_SIZE")? {
            self.detection.blur_size = blur_size;
        }
        if let Ok(path) = std::env::var("OBJCOUNT_PREVIEW_PATH") {
            if !path.trim().is_empty() {
                self.render.preview_path = Some(PathBuf::from(path));
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.capture.device.trim().is_empty() {
            return Err(anyhow!("device must not be empty"));
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(anyhow!("capture width and height must be greater than zero"));
        }
        if !MIN_AREA_RANGE.contains(&self.detection.min_area) {
            return Err(anyhow!(
                "detection.min_area must be within {}..={}",
                MIN_AREA_RANGE.start(),
                MIN_AREA_RANGE.end()
            ));
        }
        if !BLUR_SIZE_RANGE.contains(&self.detection.blur_size) {
            return Err(anyhow!(
                "detection.blur_size must be within {}..={}",
                BLUR_SIZE_RANGE.start(),
                BLUR_SIZE_RANGE.end()
            ));
        }
        if self.detection.blur_size % 2 == 0 {
            log::warn!(
                "blur size {} is even, using {}",
                self.detection.blur_size,
                self.detection.blur_size + 1
            );
            self.detection.blur_size += 1;
        }
        if self.render.viewport.width == 0 || self.render.viewport.height == 0 {
            return Err(anyhow!("viewport width and height must be greater than zero"));
        }
        Ok(())
    }

    pub fn parameters(&self) -> DetectionParameters {
        DetectionParameters::new(
            self.detection.min_area,
            self.detection.threshold,
            self.detection.blur_size,
        )
    }
}

fn read_config_file(path: &Path) -> Result<CounterConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_number<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{key} must be a non-negative integer")),
        _ => Ok(None),
    }
}
