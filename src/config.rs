// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::{FacingMode, StreamConstraints};
use crate::constants;
use crate::encoder::{EncodeOptions, parse_hex_color};
use crate::errors::{AppError, AppResult};
use crate::scanner::{ResultPolicy, ScanSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Name of the directory under the user's config dir
pub const APP_DIR: &str = "qrcam";

/// Config file name inside [`APP_DIR`]
pub const CONFIG_FILE: &str = "config.json";

/// Camera selection and capture size
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Device path to open (e.g. "/dev/video0"); first capture device if unset
    pub device: Option<String>,
    /// Requested capture width
    pub width: u32,
    /// Requested capture height
    pub height: u32,
    /// Facing reported for devices that cannot tell (V4L2 never can)
    pub facing_hint: Option<FacingMode>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device: None,
            width: constants::camera::DEFAULT_WIDTH,
            height: constants::camera::DEFAULT_HEIGHT,
            facing_hint: None,
        }
    }
}

/// QR image rendering
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    /// Edge length in pixels
    pub size: u32,
    /// Quiet zone in modules
    pub margin: u32,
    /// "#RRGGBB" or "#RRGGBBAA"
    pub dark_color: String,
    pub light_color: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            size: constants::encoder::SIZE,
            margin: constants::encoder::MARGIN,
            dark_color: constants::encoder::DARK_COLOR.to_string(),
            light_color: constants::encoder::LIGHT_COLOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stop after the first code, or keep scanning
    pub scan_policy: ResultPolicy,
    /// Detection loop period in milliseconds
    pub poll_interval_ms: u64,
    /// How long "copied" stays set, in milliseconds
    pub copy_reset_ms: u64,
    pub camera: CameraSettings,
    /// Frames larger than this are downscaled before detection
    pub detector_max_dimension: u32,
    pub encoder: EncoderSettings,
    /// Where downloaded images go; the user's downloads directory if unset
    pub download_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan_policy: ResultPolicy::default(), // Stop after the first code
            poll_interval_ms: constants::scan::POLL_INTERVAL.as_millis() as u64,
            copy_reset_ms: constants::scan::COPY_RESET_DELAY.as_millis() as u64,
            camera: CameraSettings::default(),
            detector_max_dimension: constants::detector::MAX_DIMENSION,
            encoder: EncoderSettings::default(),
            download_dir: None,
        }
    }
}

impl Config {
    /// `<config dir>/qrcam/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`; a missing or unreadable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                Self::default()
            }
        }
    }

    /// Save to the default location
    pub fn save(&self) -> AppResult<PathBuf> {
        let path = Self::default_path()
            .ok_or_else(|| AppError::Config("no config directory on this system".to_string()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Write pretty JSON to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "Config saved");
        Ok(())
    }

    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            policy: self.scan_policy,
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            copy_reset_delay: Duration::from_millis(self.copy_reset_ms),
            constraints: StreamConstraints {
                width: self.camera.width,
                height: self.camera.height,
                device: self.camera.device.clone(),
                ..StreamConstraints::default()
            },
        }
    }

    /// Rendering options; unparsable colors fall back to black on white
    pub fn encode_options(&self) -> EncodeOptions {
        let defaults = EncodeOptions::default();
        let color = |value: &str, fallback| {
            parse_hex_color(value).unwrap_or_else(|| {
                warn!(color = value, "Invalid color in config, using default");
                fallback
            })
        };

        EncodeOptions {
            size: self.encoder.size,
            margin: self.encoder.margin,
            dark: color(&self.encoder.dark_color, defaults.dark),
            light: color(&self.encoder.light_color, defaults.light),
        }
    }

    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(crate::storage::DirectoryDelivery::default_dir)
    }
}
