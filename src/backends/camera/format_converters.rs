// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion utilities
//!
//! The detector only needs luminance, so every supported capture format is
//! reduced to a tightly packed 8-bit luma plane here. Row stride padding is
//! dropped along the way.

use super::types::{CameraFrame, PixelFormat};

/// BT.601 luma from 8-bit RGB
#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

/// Extract a `width * height` luma plane from any supported frame
///
/// Returns `None` when the buffer is shorter than the frame geometry claims.
pub fn frame_to_luma(frame: &CameraFrame) -> Option<Vec<u8>> {
    if !frame.is_complete() {
        return None;
    }

    let width = frame.width as usize;
    let height = frame.height as usize;
    let stride = frame.stride as usize;
    let mut out = Vec::with_capacity(width * height);

    for y in 0..height {
        let row = &frame.data[y * stride..];
        match frame.format {
            PixelFormat::Gray8 => out.extend_from_slice(&row[..width]),
            PixelFormat::Rgba => {
                out.extend(row[..width * 4].chunks_exact(4).map(|p| luma(p[0], p[1], p[2])))
            }
            PixelFormat::Rgb24 => {
                out.extend(row[..width * 3].chunks_exact(3).map(|p| luma(p[0], p[1], p[2])))
            }
            // YUYV: Y0 U Y1 V - every even byte is luma
            PixelFormat::Yuyv => out.extend(row[..width * 2].iter().step_by(2).copied()),
        }
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_rgba_luma_without_stride() {
        // 2x2 RGBA with 2 bytes of stride padding per row
        let data: Vec<u8> = vec![
            255, 255, 255, 255, // white
            0, 0, 0, 255, // black
            9, 9, // stride padding
            0, 0, 0, 255, // black
            255, 255, 255, 255, // white
            9, 9, // stride padding
        ];

        let frame = CameraFrame {
            width: 2,
            height: 2,
            data: Arc::from(data.as_slice()),
            format: PixelFormat::Rgba,
            stride: 10,
            captured_at: Instant::now(),
        };

        let luma = frame_to_luma(&frame).expect("complete frame");
        assert_eq!(luma, vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_yuyv_luma_takes_even_bytes() {
        let frame = CameraFrame::packed(2, 1, PixelFormat::Yuyv, vec![10, 128, 200, 128]);
        assert_eq!(frame_to_luma(&frame), Some(vec![10, 200]));
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let frame = CameraFrame::packed(4, 4, PixelFormat::Gray8, vec![0; 4]);
        assert_eq!(frame_to_luma(&frame), None);
    }
}
