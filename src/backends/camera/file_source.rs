// SPDX-License-Identifier: GPL-3.0-only

//! Still image camera
//!
//! Replays an image file as a live video stream. Handy for scanning a saved
//! screenshot or photo of a QR code, and for exercising the scanner without
//! camera hardware.

use super::frame_loop::{CaptureLoopController, LoopAction};
use super::stream::{FrameSlot, VideoStream, VideoTrack};
use super::types::{CameraFrame, FacingMode, ReadyState, TrackSettings};
use super::{CameraCapability, StreamConstraints};
use crate::constants::camera as defaults;
use crate::errors::CameraError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Camera backed by a single image file
#[derive(Debug, Clone)]
pub struct FileCamera {
    path: PathBuf,
    facing_mode: Option<FacingMode>,
    frame_period: Duration,
}

impl FileCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            facing_mode: None,
            frame_period: Duration::from_millis(1000 / defaults::FILE_SOURCE_FPS),
        }
    }

    /// Facing mode the stream reports (none by default)
    pub fn with_facing_mode(mut self, facing_mode: Option<FacingMode>) -> Self {
        self.facing_mode = facing_mode;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Load an image file as an RGBA frame
pub fn load_image_as_frame(path: &Path) -> Result<CameraFrame, CameraError> {
    let image = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) => CameraError::from(io),
        other => CameraError::FormatNotSupported(other.to_string()),
    })?;
    Ok(CameraFrame::from_rgba_image(image.to_rgba8()))
}

#[async_trait]
impl CameraCapability for FileCamera {
    async fn request_video_stream(
        &self,
        _constraints: &StreamConstraints,
    ) -> Result<VideoStream, CameraError> {
        let path = self.path.clone();
        let frame = tokio::task::spawn_blocking(move || load_image_as_frame(&path))
            .await
            .map_err(|e| CameraError::Backend(e.to_string()))??;

        info!(
            path = %self.path.display(),
            width = frame.width,
            height = frame.height,
            "Opened image file as camera"
        );

        let settings = TrackSettings {
            facing_mode: self.facing_mode,
            width: frame.width,
            height: frame.height,
            device_id: Some(self.path.display().to_string()),
        };

        let slot = FrameSlot::new();
        slot.set_ready_state(ReadyState::HaveMetadata);

        let producer_slot = slot.clone();
        let producer = CaptureLoopController::start_periodic(
            "file-source",
            self.frame_period,
            move || {
                if !producer_slot.is_live() {
                    return LoopAction::Stop;
                }
                // Fresh timestamp per replayed frame
                let mut next = frame.clone();
                next.captured_at = std::time::Instant::now();
                producer_slot.publish(next);
                LoopAction::Continue
            },
        );

        debug!(path = %self.path.display(), "File source producer started");

        let label = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());

        Ok(VideoStream::new(vec![VideoTrack::new(
            label,
            settings,
            slot,
            Some(producer),
        )]))
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let camera = FileCamera::new("/nonexistent/qrcam/image.png");
        let err = camera
            .request_video_stream(&StreamConstraints::default())
            .await
            .expect_err("missing file");
        assert!(matches!(err, CameraError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_image_is_replayed_until_stopped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("frame.png");
        image::RgbaImage::from_pixel(8, 6, image::Rgba([255, 255, 255, 255]))
            .save(&path)
            .expect("save png");

        let camera = FileCamera::new(&path).with_facing_mode(Some(FacingMode::Environment));
        let mut stream = camera
            .request_video_stream(&StreamConstraints::default())
            .await
            .expect("stream");

        let track = &stream.video_tracks()[0];
        assert_eq!(track.settings().width, 8);
        assert_eq!(track.settings().facing_mode, Some(FacingMode::Environment));

        let slot = stream.frame_source().expect("live slot");
        for _ in 0..100 {
            if slot.frames_published() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(slot.ready_state(), ReadyState::HaveEnoughData);

        assert_eq!(stream.stop_all_tracks(), 1);
        assert!(!slot.is_live());
        assert!(slot.latest().is_none());
    }
}
