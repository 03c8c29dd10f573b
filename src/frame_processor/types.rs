// SPDX-License-Identifier: MPL-2.0

//! Core types for frame processing results

use serde::Serialize;

/// A rectangular region within a frame
///
/// Coordinates are normalized (0.0 to 1.0) relative to the frame dimensions.
/// This allows easy transformation to screen coordinates regardless of
/// the actual frame size or display scaling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRegion {
    /// Left edge (0.0 = left of frame, 1.0 = right of frame)
    pub x: f32,
    /// Top edge (0.0 = top of frame, 1.0 = bottom of frame)
    pub y: f32,
    /// Width as fraction of frame width
    pub width: f32,
    /// Height as fraction of frame height
    pub height: f32,
}

impl FrameRegion {
    /// Create a frame region from pixel coordinates
    pub fn from_pixels(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        let fw = frame_width.max(1) as f32;
        let fh = frame_height.max(1) as f32;
        Self {
            x: x as f32 / fw,
            y: y as f32 / fh,
            width: width as f32 / fw,
            height: height as f32 / fh,
        }
    }

    /// Horizontally flipped region, for overlays drawn on a mirrored preview
    pub fn mirrored(&self) -> Self {
        Self {
            x: (1.0 - self.x - self.width).max(0.0),
            ..self.clone()
        }
    }
}

/// One decoded QR code found in a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QrDetection {
    /// Decoded text
    pub payload: String,
    /// Where the code sits in the frame
    pub bounds: FrameRegion,
}

impl QrDetection {
    pub fn new(bounds: FrameRegion, payload: String) -> Self {
        Self { payload, bounds }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_from_pixels() {
        let region = FrameRegion::from_pixels(160, 120, 320, 240, 640, 480);
        assert_eq!(region.x, 0.25);
        assert_eq!(region.y, 0.25);
        assert_eq!(region.width, 0.5);
        assert_eq!(region.height, 0.5);
    }

    #[test]
    fn test_region_mirrored() {
        let region = FrameRegion {
            x: 0.1,
            y: 0.2,
            width: 0.3,
            height: 0.3,
        };
        let flipped = region.mirrored();
        assert!((flipped.x - 0.6).abs() < 1e-6);
        assert_eq!(flipped.y, region.y);
    }
}
