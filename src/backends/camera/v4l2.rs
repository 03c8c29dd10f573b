// SPDX-License-Identifier: GPL-3.0-only

//! Direct V4L2 capture
//!
//! Opens a `/dev/video*` node with the v4l crate, negotiates a pixel format
//! and streams frames from a dedicated capture thread into the track's
//! [`FrameSlot`]. The device stays open exactly as long as the thread runs.

use super::frame_loop::CaptureLoopController;
use super::stream::{FrameSlot, VideoStream, VideoTrack};
use super::types::{CameraDevice, CameraFrame, FacingMode, PixelFormat, ReadyState, TrackSettings};
use super::{CameraCapability, StreamConstraints};
use crate::constants::camera as defaults;
use crate::errors::CameraError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

/// Formats we can consume, in order of preference
const PREFERRED_FOURCCS: [&[u8; 4]; 4] = [b"YUYV", b"MJPG", b"GREY", b"RGB3"];

/// Enumerate V4L2 video capture devices
pub fn enumerate_cameras() -> Vec<CameraDevice> {
    let mut cameras = Vec::new();

    for node in v4l::context::enum_devices() {
        let path = node.path().to_string_lossy().to_string();
        let Ok(dev) = Device::with_path(node.path()) else {
            debug!(path = %path, "Skipping device that cannot be opened");
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };

        // Metadata nodes share the driver but cannot capture video
        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            continue;
        }

        cameras.push(CameraDevice {
            name: caps.card,
            path,
            driver: caps.driver,
            bus_info: caps.bus,
        });
    }

    cameras.sort_by(|a, b| a.path.cmp(&b.path));
    cameras
}

/// V4L2 camera capability
#[derive(Debug, Clone, Default)]
pub struct V4l2Camera {
    /// Reported facing mode; V4L2 has no notion of it
    facing_hint: Option<FacingMode>,
}

impl V4l2Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Facing mode to report for opened devices
    pub fn with_facing_hint(mut self, facing_hint: Option<FacingMode>) -> Self {
        self.facing_hint = facing_hint;
        self
    }
}

#[async_trait]
impl CameraCapability for V4l2Camera {
    async fn request_video_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<VideoStream, CameraError> {
        let device_path = match &constraints.device {
            Some(path) => path.clone(),
            None => {
                let cameras = tokio::task::spawn_blocking(enumerate_cameras)
                    .await
                    .map_err(|e| CameraError::Backend(e.to_string()))?;
                cameras
                    .into_iter()
                    .next()
                    .map(|camera| camera.path)
                    .ok_or_else(|| CameraError::NotFound("no V4L2 capture devices".to_string()))?
            }
        };

        if constraints.facing_mode.is_some() && self.facing_hint.is_none() {
            debug!(
                requested = ?constraints.facing_mode,
                "V4L2 cannot select by facing mode, using device order"
            );
        }

        let slot = FrameSlot::new();
        let (ready_tx, ready_rx) = oneshot::channel();

        let thread_slot = slot.clone();
        let thread_path = device_path.clone();
        let (width, height) = (constraints.width, constraints.height);
        let mut producer = CaptureLoopController::spawn("v4l2-capture", move |stop| {
            capture_loop(&thread_path, width, height, thread_slot, ready_tx, stop);
        });

        let negotiated = match ready_rx.await {
            Ok(Ok(format)) => format,
            Ok(Err(e)) => {
                producer.join();
                return Err(e);
            }
            Err(_) => {
                producer.join();
                return Err(CameraError::Backend(
                    "capture thread exited before reporting".to_string(),
                ));
            }
        };

        info!(
            device = %device_path,
            width = negotiated.width,
            height = negotiated.height,
            fourcc = %negotiated.fourcc,
            "V4L2 stream granted"
        );

        let settings = TrackSettings {
            facing_mode: self.facing_hint,
            width: negotiated.width,
            height: negotiated.height,
            device_id: Some(device_path.clone()),
        };

        Ok(VideoStream::new(vec![VideoTrack::new(
            device_path,
            settings,
            slot,
            Some(producer),
        )]))
    }

    fn name(&self) -> &str {
        "v4l2"
    }
}

/// Format the device agreed to
#[derive(Debug, Clone)]
struct Negotiated {
    width: u32,
    height: u32,
    stride: u32,
    fourcc: String,
}

/// Open the device and pick the first preferred format it offers
fn open_device(path: &str, width: u32, height: u32) -> Result<(Device, Negotiated), CameraError> {
    let dev = Device::with_path(path)?;

    let offered: Vec<FourCC> = dev
        .enum_formats()?
        .into_iter()
        .map(|description| description.fourcc)
        .collect();

    let fourcc = PREFERRED_FOURCCS
        .iter()
        .map(|code| FourCC::new(code))
        .find(|fourcc| offered.contains(fourcc))
        .ok_or_else(|| {
            CameraError::FormatNotSupported(format!("{} offers no YUYV/MJPG/GREY/RGB3", path))
        })?;

    let actual = dev.set_format(&Format::new(width, height, fourcc))?;
    let fourcc = actual
        .fourcc
        .str()
        .map(str::to_string)
        .map_err(|e| CameraError::Backend(e.to_string()))?;

    Ok((
        dev,
        Negotiated {
            width: actual.width,
            height: actual.height,
            stride: actual.stride,
            fourcc,
        },
    ))
}

/// Turn a raw buffer into a frame
fn decode_buffer(buf: &[u8], format: &Negotiated, captured_at: Instant) -> Option<CameraFrame> {
    if format.fourcc == "MJPG" {
        let image = image::load_from_memory_with_format(buf, image::ImageFormat::Jpeg).ok()?;
        let mut frame = CameraFrame::from_rgba_image(image.to_rgba8());
        frame.captured_at = captured_at;
        return Some(frame);
    }

    let pixel_format = PixelFormat::from_fourcc(&format.fourcc)?;
    let stride = if format.stride > 0 {
        format.stride
    } else {
        format.width * pixel_format.bytes_per_pixel()
    };

    let frame = CameraFrame {
        width: format.width,
        height: format.height,
        data: std::sync::Arc::from(buf),
        format: pixel_format,
        stride,
        captured_at,
    };
    frame.is_complete().then_some(frame)
}

/// Main capture loop running in the producer thread
fn capture_loop(
    path: &str,
    width: u32,
    height: u32,
    slot: FrameSlot,
    ready: oneshot::Sender<Result<Negotiated, CameraError>>,
    stop: &AtomicBool,
) {
    static FRAME_COUNTER: AtomicU64 = AtomicU64::new(0);

    let (dev, format) = match open_device(path, width, height) {
        Ok(opened) => opened,
        Err(e) => {
            warn!(device = path, error = %e, "Failed to open V4L2 device");
            let _ = ready.send(Err(e));
            return;
        }
    };

    let mut stream = match Stream::with_buffers(&dev, Type::VideoCapture, defaults::V4L2_BUFFER_COUNT)
    {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(CameraError::from(e)));
            return;
        }
    };

    stream.set_timeout(defaults::V4L2_DEQUEUE_TIMEOUT);

    slot.set_ready_state(ReadyState::HaveMetadata);
    if ready.send(Ok(format.clone())).is_err() {
        // Requester went away before the grant arrived
        return;
    }

    while !stop.load(Ordering::SeqCst) && slot.is_live() {
        let (buf, meta) = match stream.next() {
            Ok(frame) => frame,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                debug!(device = path, "No frame within dequeue timeout");
                continue;
            }
            Err(e) => {
                warn!(error = %e, "Failed to capture frame");
                std::thread::sleep(std::time::Duration::from_millis(10));
                continue;
            }
        };

        let frame_num = FRAME_COUNTER.fetch_add(1, Ordering::Relaxed);
        let used = (meta.bytesused as usize).min(buf.len());
        let used = if used == 0 { buf.len() } else { used };

        match decode_buffer(&buf[..used], &format, Instant::now()) {
            Some(frame) => {
                slot.publish(frame);
                if frame_num % 120 == 0 {
                    debug!(frame = frame_num, sequence = meta.sequence, "Frame captured");
                }
            }
            None => {
                if frame_num % 30 == 0 {
                    error!(frame = frame_num, size = used, fourcc = %format.fourcc, "Dropping undecodable frame");
                }
            }
        }
    }

    debug!(device = path, "V4L2 capture loop ended");
}
