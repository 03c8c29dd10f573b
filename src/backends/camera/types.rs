// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backends

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Which physical camera a stream comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Facing the user (front/selfie camera)
    User,
    /// Facing away from the user (rear camera)
    Environment,
    /// Facing left of the user
    Left,
    /// Facing right of the user
    Right,
}

impl FacingMode {
    /// Parse a facing mode string ("user", "environment", "front", "back", ...)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" | "front" => Some(Self::User),
            "environment" | "back" | "rear" => Some(Self::Environment),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::User => write!(f, "user"),
            FacingMode::Environment => write!(f, "environment"),
            FacingMode::Left => write!(f, "left"),
            FacingMode::Right => write!(f, "right"),
        }
    }
}

/// How much data a preview sink has buffered
///
/// Mirrors the media element ready states. Ordering is meaningful:
/// detection only runs once a sink reaches `HaveEnoughData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum ReadyState {
    #[default]
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

impl ReadyState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::HaveMetadata,
            2 => Self::HaveCurrentData,
            3 => Self::HaveFutureData,
            4 => Self::HaveEnoughData,
            _ => Self::HaveNothing,
        }
    }
}

/// Settings a granted track reports about itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackSettings {
    /// Resolved facing mode, if the backend can tell
    pub facing_mode: Option<FacingMode>,
    pub width: u32,
    pub height: u32,
    /// Backend-specific device identifier
    pub device_id: Option<String>,
}

/// Pixel layouts frames can arrive in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// RGBA 8:8:8:8
    Rgba,
    /// Packed RGB 8:8:8
    Rgb24,
    /// Single luma channel
    Gray8,
    /// Packed YUV 4:2:2 (Y0 U Y1 V)
    Yuyv,
}

impl PixelFormat {
    /// Bytes per pixel (YUYV averages two)
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            Self::Rgba => 4,
            Self::Rgb24 => 3,
            Self::Gray8 => 1,
            Self::Yuyv => 2,
        }
    }

    /// Map a V4L2 FourCC string
    pub fn from_fourcc(fourcc: &str) -> Option<Self> {
        match fourcc {
            "YUYV" => Some(Self::Yuyv),
            "GREY" => Some(Self::Gray8),
            "RGB3" => Some(Self::Rgb24),
            "AB24" | "RGBA" => Some(Self::Rgba),
            _ => None,
        }
    }
}

/// A single video frame
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Bytes per row, may include padding
    pub stride: u32,
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a tightly packed frame (stride = width * bytes per pixel)
    pub fn packed(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            format,
            stride: width * format.bytes_per_pixel(),
            captured_at: Instant::now(),
        }
    }

    /// Build an RGBA frame from a decoded image
    pub fn from_rgba_image(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::packed(width, height, PixelFormat::Rgba, image.into_raw())
    }

    /// True when the buffer is large enough for the declared geometry
    pub fn is_complete(&self) -> bool {
        let row = (self.width * self.format.bytes_per_pixel()) as usize;
        if self.height == 0 || (self.stride as usize) < row {
            return false;
        }
        let needed = self.stride as usize * (self.height as usize - 1) + row;
        self.data.len() >= needed
    }
}

/// Camera device found during enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub name: String,
    /// Device path (e.g. /dev/video0)
    pub path: String,
    pub driver: String,
    pub bus_info: String,
}
