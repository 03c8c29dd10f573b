// SPDX-License-Identifier: GPL-3.0-only

//! QR code detection task
//!
//! This module implements QR code detection using the rqrr crate.
//! It converts camera frames to grayscale and searches for QR codes,
//! returning their positions and decoded content.

use crate::backends::camera::format_converters::frame_to_luma;
use crate::backends::camera::types::CameraFrame;
use crate::constants::detector as defaults;
use crate::errors::DetectError;
use crate::frame_processor::FrameDetector;
use crate::frame_processor::types::{FrameRegion, QrDetection};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, trace};

/// QR code detector
///
/// Analyzes camera frames to detect and decode QR codes.
/// Optimized for real-time processing with frame downscaling.
#[derive(Debug, Clone)]
pub struct QrDetector {
    /// Maximum dimension for processing (frames are downscaled to this)
    max_dimension: u32,
}

impl Default for QrDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDetector {
    /// Create a new QR detector with default settings
    pub fn new() -> Self {
        Self {
            max_dimension: defaults::MAX_DIMENSION,
        }
    }

    /// Create a QR detector with custom max dimension
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }
}

#[async_trait]
impl FrameDetector for QrDetector {
    /// Runs in a blocking task to keep the async runtime responsive
    async fn detect(&self, frame: Arc<CameraFrame>) -> Result<Vec<QrDetection>, DetectError> {
        let max_dim = self.max_dimension;

        tokio::task::spawn_blocking(move || detect_sync(&frame, max_dim))
            .await
            .map_err(|e| DetectError::TaskFailed(e.to_string()))?
    }
}

/// Synchronous QR detection (runs in blocking task)
fn detect_sync(frame: &CameraFrame, max_dimension: u32) -> Result<Vec<QrDetection>, DetectError> {
    let start = std::time::Instant::now();

    let width = frame.width;
    let height = frame.height;

    let luma = frame_to_luma(frame).ok_or_else(|| {
        DetectError::UnsupportedFrame(format!(
            "{}x{} {:?} frame with {} bytes",
            width,
            height,
            frame.format,
            frame.data.len()
        ))
    })?;

    let (gray, proc_width, proc_height, scale) = if width > max_dimension || height > max_dimension
    {
        let scale = (width as f32 / max_dimension as f32).max(height as f32 / max_dimension as f32);
        let new_width = ((width as f32 / scale) as u32).max(1);
        let new_height = ((height as f32 / scale) as u32).max(1);
        let downscaled = downscale_luma(&luma, width, height, new_width, new_height);
        (downscaled, new_width, new_height, scale)
    } else {
        (luma, width, height, 1.0)
    };

    trace!(
        proc_width,
        proc_height,
        scale,
        conversion_ms = start.elapsed().as_millis(),
        "Prepared grayscale image for processing"
    );

    let row = proc_width as usize;
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        proc_width as usize,
        proc_height as usize,
        |x, y| gray[y * row + x],
    );
    let grids = prepared.detect_grids();

    let mut detections = Vec::with_capacity(grids.len());

    for grid in grids {
        let content = match grid.decode() {
            Ok((_meta, content)) => content,
            Err(e) => {
                debug!(error = %e, "Failed to decode QR code");
                continue;
            }
        };

        // Axis-aligned box around the four grid corners
        let xs = grid.bounds.iter().map(|p| p.x);
        let ys = grid.bounds.iter().map(|p| p.y);
        let min_x = xs.clone().min().unwrap_or(0).max(0) as f32;
        let max_x = xs.max().unwrap_or(0).min(proc_width as i32) as f32;
        let min_y = ys.clone().min().unwrap_or(0).max(0) as f32;
        let max_y = ys.max().unwrap_or(0).min(proc_height as i32) as f32;

        // Scale back to original frame coordinates
        let region = FrameRegion::from_pixels(
            (min_x * scale) as u32,
            (min_y * scale) as u32,
            ((max_x - min_x).max(0.0) * scale) as u32,
            ((max_y - min_y).max(0.0) * scale) as u32,
            width,
            height,
        );

        debug!(
            content = %content,
            x = region.x,
            y = region.y,
            width = region.width,
            height = region.height,
            "Detected QR code"
        );

        detections.push(QrDetection::new(region, content));
    }

    if !detections.is_empty() {
        debug!(
            count = detections.len(),
            total_ms = start.elapsed().as_millis(),
            "QR detection found codes"
        );
    }

    Ok(detections)
}

/// Downscale a luma plane using bilinear interpolation
fn downscale_luma(src: &[u8], src_width: u32, src_height: u32, dst_width: u32, dst_height: u32) -> Vec<u8> {
    let sw = src_width as usize;
    let sh = src_height as usize;

    let mut result = Vec::with_capacity((dst_width * dst_height) as usize);

    let x_ratio = src_width as f32 / dst_width as f32;
    let y_ratio = src_height as f32 / dst_height as f32;

    let get = |px: usize, py: usize| -> f32 { src.get(py * sw + px).copied().unwrap_or(0) as f32 };

    for y in 0..dst_height {
        for x in 0..dst_width {
            let src_x = x as f32 * x_ratio;
            let src_y = y as f32 * y_ratio;

            let x0 = (src_x as usize).min(sw - 1);
            let y0 = (src_y as usize).min(sh - 1);
            let x1 = (x0 + 1).min(sw - 1);
            let y1 = (y0 + 1).min(sh - 1);

            let x_frac = src_x - x0 as f32;
            let y_frac = src_y - y0 as f32;

            let value = get(x0, y0) * (1.0 - x_frac) * (1.0 - y_frac)
                + get(x1, y0) * x_frac * (1.0 - y_frac)
                + get(x0, y1) * (1.0 - x_frac) * y_frac
                + get(x1, y1) * x_frac * y_frac;

            result.push(value as u8);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::PixelFormat;
    use crate::encoder::{EncodeOptions, Encoder, QrEncoder};

    #[test]
    fn test_downscale_luma() {
        // 4x2 gradient
        let src: Vec<u8> = vec![0, 85, 170, 255, 0, 85, 170, 255];

        let result = downscale_luma(&src, 4, 2, 2, 1);
        assert_eq!(result.len(), 2);

        // First pixel samples around (0,0), second around (2,0)
        assert!(result[0] < 100);
        assert!(result[1] > 150);
    }

    #[test]
    fn test_blank_frame_has_no_codes() {
        let frame = CameraFrame::packed(64, 64, PixelFormat::Gray8, vec![255; 64 * 64]);
        let detections = detect_sync(&frame, 640).expect("detect");
        assert!(detections.is_empty());
    }

    #[test]
    fn test_truncated_frame_is_an_error() {
        let frame = CameraFrame::packed(64, 64, PixelFormat::Rgba, vec![0; 10]);
        assert!(matches!(
            detect_sync(&frame, 640),
            Err(DetectError::UnsupportedFrame(_))
        ));
    }

    #[test]
    fn test_decodes_generated_code() {
        let artifact = QrEncoder::new()
            .encode("https://example.com", &EncodeOptions::default())
            .expect("encode");

        // Paste onto a larger white sheet, as a printed code would be
        let mut sheet = image::RgbaImage::from_pixel(400, 400, image::Rgba([255, 255, 255, 255]));
        image::imageops::overlay(&mut sheet, &artifact.raster, 50, 50);
        let frame = CameraFrame::from_rgba_image(sheet);

        let detections = detect_sync(&frame, 640).expect("detect");
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].payload, "https://example.com");
        assert!(detections[0].bounds.x > 0.0);
        assert!(detections[0].bounds.width > 0.5);
    }
}
