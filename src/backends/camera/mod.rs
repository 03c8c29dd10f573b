// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │  ScanningSession    │  ← owns at most one granted stream
//! └──────────┬──────────┘
//!            │ request_video_stream()
//!            ▼
//! ┌─────────────────────┐
//! │  CameraCapability   │  ← common interface
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!   ┌──────┐  ┌──────────┐
//!   │ V4L2 │  │ FileCamera│
//!   └──────┘  └──────────┘
//! ```

pub mod file_source;
pub mod format_converters;
pub mod frame_loop;
pub mod stream;
pub mod types;
#[cfg(target_os = "linux")]
pub mod v4l2;

pub use stream::{FrameSlot, VideoStream, VideoTrack};
pub use types::*;

use crate::constants::camera as defaults;
use crate::errors::CameraError;
use async_trait::async_trait;

/// What a caller asks of the camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    /// Preferred facing mode; backends that cannot choose ignore it
    pub facing_mode: Option<FacingMode>,
    /// Audio is never requested by the scanner
    pub audio: bool,
    /// Ideal capture width
    pub width: u32,
    /// Ideal capture height
    pub height: u32,
    /// Explicit device to open instead of the backend's pick
    pub device: Option<String>,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            facing_mode: Some(FacingMode::Environment),
            audio: false,
            width: defaults::DEFAULT_WIDTH,
            height: defaults::DEFAULT_HEIGHT,
            device: None,
        }
    }
}

/// Platform camera access
///
/// A granted [`VideoStream`] is exclusively owned by the caller; dropping it
/// or calling [`VideoStream::stop_all_tracks`] releases the device.
#[async_trait]
pub trait CameraCapability: Send + Sync {
    /// Request a live video stream
    ///
    /// # Returns
    /// * `Ok(VideoStream)` - Stream granted and producing (or about to produce) frames
    /// * `Err(CameraError::PermissionDenied)` - Access refused
    /// * `Err(CameraError)` - No device, device busy, or backend failure
    async fn request_video_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<VideoStream, CameraError>;

    /// Human readable backend name for logs
    fn name(&self) -> &str;
}
