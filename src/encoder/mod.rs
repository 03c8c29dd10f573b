// SPDX-License-Identifier: GPL-3.0-only

//! QR code encoding
//!
//! [`QrEncoder`] builds the symbol matrix with the `qrcode` crate and renders
//! it into an RGBA raster with the `image` crate. The raster and its PNG data
//! URI come out of a single encode pass as an [`EncodedArtifact`].

pub mod session;

pub use session::{EncodingRequest, EncodingSession};

use crate::constants::encoder as defaults;
use crate::errors::EncodeError;
use base64::Engine as _;
use image::{ImageFormat, Rgba, RgbaImage};
use qrcode::types::QrError;
use qrcode::{Color, QrCode};
use std::io::Cursor;

/// Rendering parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Requested edge length in pixels
    pub size: u32,
    /// Quiet zone in modules
    pub margin: u32,
    /// Color of dark modules
    pub dark: Rgba<u8>,
    /// Color of light modules and the quiet zone
    pub light: Rgba<u8>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            size: defaults::SIZE,
            margin: defaults::MARGIN,
            dark: Rgba([0, 0, 0, 255]),
            light: Rgba([255, 255, 255, 255]),
        }
    }
}

/// Parse `#RRGGBB` or `#RRGGBBAA`
pub fn parse_hex_color(value: &str) -> Option<Rgba<u8>> {
    let hex = value.strip_prefix('#').unwrap_or(value);
    if !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        6 => Some(Rgba([channel(0)?, channel(2)?, channel(4)?, 255])),
        8 => Some(Rgba([channel(0)?, channel(2)?, channel(4)?, channel(6)?])),
        _ => None,
    }
}

/// Output of one encode pass
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedArtifact {
    /// Renderable bitmap
    pub raster: RgbaImage,
    /// `data:image/png;base64,...` of the same bitmap
    pub portable_payload: String,
}

/// Text to QR image
pub trait Encoder: Send + Sync {
    /// Encode `text` into a raster and its portable form
    fn encode(&self, text: &str, options: &EncodeOptions) -> Result<EncodedArtifact, EncodeError>;
}

/// Encoder backed by the `qrcode` crate (error correction level M)
#[derive(Debug, Clone, Default)]
pub struct QrEncoder;

impl QrEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder for QrEncoder {
    fn encode(&self, text: &str, options: &EncodeOptions) -> Result<EncodedArtifact, EncodeError> {
        let code = QrCode::new(text.as_bytes()).map_err(|e| match e {
            QrError::DataTooLong => EncodeError::DataTooLong,
            other => EncodeError::InvalidInput(other.to_string()),
        })?;

        let modules: Vec<bool> = code
            .to_colors()
            .into_iter()
            .map(|color| color == Color::Dark)
            .collect();
        let raster = render_modules(&modules, code.width() as u32, options);
        let portable_payload = to_png_data_uri(&raster)?;

        Ok(EncodedArtifact {
            raster,
            portable_payload,
        })
    }
}

/// Paint a square module matrix with a quiet zone
///
/// The scale is fractional so the image fills the requested size; when the
/// size cannot hold one pixel per module the fallback scale is used instead.
pub fn render_modules(modules: &[bool], width: u32, options: &EncodeOptions) -> RgbaImage {
    let total = (width + options.margin * 2) as f64;
    let scale = if options.size as f64 >= total {
        options.size as f64 / total
    } else {
        defaults::FALLBACK_SCALE
    };

    let symbol_size = (total * scale).floor() as u32;
    let scaled_margin = options.margin as f64 * scale;
    let inner_end = symbol_size as f64 - scaled_margin;

    RgbaImage::from_fn(symbol_size, symbol_size, |x, y| {
        let (px, py) = (x as f64, y as f64);
        if px < scaled_margin || py < scaled_margin || px >= inner_end || py >= inner_end {
            return options.light;
        }
        let col = (((px - scaled_margin) / scale).floor() as u32).min(width - 1);
        let row = (((py - scaled_margin) / scale).floor() as u32).min(width - 1);
        if modules[(row * width + col) as usize] {
            options.dark
        } else {
            options.light
        }
    })
}

/// Serialize a raster as a PNG data URI
pub fn to_png_data_uri(raster: &RgbaImage) -> Result<String, EncodeError> {
    let mut png = Vec::new();
    raster
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| EncodeError::Image(e.to_string()))?;

    let mut uri = String::from(defaults::PNG_DATA_URI_PREFIX);
    base64::engine::general_purpose::STANDARD.encode_string(&png, &mut uri);
    Ok(uri)
}
