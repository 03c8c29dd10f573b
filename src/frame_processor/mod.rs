// SPDX-License-Identifier: MPL-2.0

//! Frame processor module for async frame analysis
//!
//! The scanner talks to QR detection through [`FrameDetector`]. Whether a
//! detector exists at all is decided once, by [`probe_detector`], when a
//! scanning session is built.

pub mod tasks;
pub mod types;

pub use tasks::qr_detector;
pub use types::{FrameRegion, QrDetection};

use crate::backends::camera::types::CameraFrame;
use crate::constants::detector as defaults;
use crate::errors::DetectError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Finds and decodes QR codes in a frame
#[async_trait]
pub trait FrameDetector: Send + Sync {
    /// Detect codes in `frame`; an empty list means nothing was found
    async fn detect(&self, frame: Arc<CameraFrame>) -> Result<Vec<QrDetection>, DetectError>;
}

/// Probe for a usable QR detector
///
/// The decoder itself is compiled in, so the probe only rejects a working
/// resolution too small to hold a version 1 symbol. `None` makes the
/// scanner fail fast with `CapabilityUnsupported` instead of polling.
pub fn probe_detector(max_dimension: u32) -> Option<Arc<dyn FrameDetector>> {
    if max_dimension < defaults::MIN_DIMENSION {
        warn!(
            max_dimension,
            min = defaults::MIN_DIMENSION,
            "Detector resolution too small for any QR code"
        );
        return None;
    }

    let detector: Arc<dyn FrameDetector> =
        Arc::new(tasks::QrDetector::with_max_dimension(max_dimension));
    Some(detector)
}
