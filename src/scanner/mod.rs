// SPDX-License-Identifier: GPL-3.0-only

//! Camera scanning session
//!
//! A [`ScanningSession`] owns at most one granted camera stream and at most
//! one running detection loop. State lives behind a plain mutex that is only
//! held for short, synchronous sections. Every asynchronous continuation
//! (camera grant, detection result, copy reset) carries the generation or
//! epoch it was started under and is dropped if that is no longer current.
//!
//! ```text
//!            start()                grant
//!   Idle ──────────────► Requesting ───────► Active
//!    ▲                    │    │               │
//!    │ start()   denied / │    │ stop()        │ stop() / single-shot result
//!    │           no device│    ▼               ▼
//!  Failed ◄───────────────┘  Stopped ◄─────────┘
//! ```

pub mod detection_loop;
pub mod preview;
pub mod state;

pub use detection_loop::DetectionLoopHandle;
pub use preview::VideoSink;
pub use state::{ClipboardCopyState, ResultPolicy, ScanResult, ScanSnapshot, ScanState};

use crate::backends::camera::frame_loop::LoopAction;
use crate::backends::camera::{CameraCapability, FacingMode, StreamConstraints, VideoStream};
use crate::backends::clipboard::ClipboardCapability;
use crate::constants::scan as defaults;
use crate::errors::ScanError;
use crate::frame_processor::{FrameDetector, QrDetection};
use chrono::Utc;
use detection_loop::DetectionTarget;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Tunables for a scanning session
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    pub policy: ResultPolicy,
    pub poll_interval: Duration,
    pub copy_reset_delay: Duration,
    pub constraints: StreamConstraints,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            policy: ResultPolicy::default(),
            poll_interval: defaults::POLL_INTERVAL,
            copy_reset_delay: defaults::COPY_RESET_DELAY,
            constraints: StreamConstraints::default(),
        }
    }
}

/// A granted stream plus how it is shown
#[derive(Debug)]
pub struct CameraSession {
    pub stream: VideoStream,
    pub mirrored: bool,
}

/// User-facing and unknown cameras are shown mirrored
pub fn should_mirror(facing_mode: Option<FacingMode>) -> bool {
    facing_mode != Some(FacingMode::Environment)
}

/// Drop a stopped stream on the blocking pool when inside a runtime
///
/// Dropping joins the producer threads, which may sit in a device read for
/// up to a dequeue timeout.
fn release_in_background<T: Send + 'static>(resource: T) {
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn_blocking(move || drop(resource));
        }
        Err(_) => drop(resource),
    }
}

#[derive(Default)]
struct Inner {
    generation: u64,
    state: ScanState,
    camera: Option<CameraSession>,
    detection: Option<DetectionLoopHandle>,
    result: Option<ScanResult>,
    copy: ClipboardCopyState,
    copy_epoch: u64,
    copy_reset: Option<JoinHandle<()>>,
}

impl Inner {
    fn snapshot(&self) -> ScanSnapshot {
        ScanSnapshot {
            state: self.state.clone(),
            mirrored: self.camera.as_ref().is_some_and(|c| c.mirrored),
            result: self.result.clone(),
            copy: self.copy,
        }
    }

    /// Forget the copied flag and any pending reset
    fn invalidate_copy(&mut self) {
        self.copy_epoch += 1;
        self.copy.copied = false;
        if let Some(reset) = self.copy_reset.take() {
            reset.abort();
        }
    }
}

struct Shared {
    id: Uuid,
    camera: Arc<dyn CameraCapability>,
    detector: Option<Arc<dyn FrameDetector>>,
    clipboard: Arc<dyn ClipboardCapability>,
    settings: ScanSettings,
    sink: VideoSink,
    inner: Mutex<Inner>,
    snapshots: watch::Sender<ScanSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        self.snapshots.send_replace(inner.snapshot());
    }

    /// Cancel the loop, stop every track, detach the sink, clear the handle
    fn teardown(&self, inner: &mut Inner) {
        inner.generation += 1;

        if let Some(detection) = inner.detection.take() {
            detection.cancel();
        }

        let mut released = 0;
        if let Some(camera) = inner.camera.as_mut() {
            released = camera.stream.stop_all_tracks();
        }
        self.sink.detach();
        let camera = inner.camera.take();

        if inner.state.is_running() {
            inner.state = ScanState::Stopped;
        }

        if let Some(camera) = camera {
            info!(session = %self.id, tracks = released, "Camera released");
            release_in_background(camera);
        }
    }

    async fn acquire(self: Arc<Self>, generation: u64) {
        debug!(
            session = %self.id,
            backend = self.camera.name(),
            generation,
            "Requesting camera"
        );
        let granted = self
            .camera
            .request_video_stream(&self.settings.constraints)
            .await;

        let mut inner = self.lock();
        if inner.generation != generation || inner.state != ScanState::Requesting {
            if let Ok(mut stream) = granted {
                let released = stream.stop_all_tracks();
                debug!(
                    session = %self.id,
                    generation,
                    tracks = released,
                    "Released stream granted after stop"
                );
                release_in_background(stream);
            }
            return;
        }

        match granted {
            Ok(stream) => self.activate(&mut inner, generation, stream),
            Err(e) => {
                warn!(session = %self.id, error = %e, "Camera request failed");
                inner.state = ScanState::Failed(ScanError::from(e));
            }
        }
        self.publish(&inner);
    }

    fn activate(self: &Arc<Self>, inner: &mut Inner, generation: u64, mut stream: VideoStream) {
        let (Some(source), Some(detector)) = (stream.frame_source(), self.detector.clone()) else {
            stream.stop_all_tracks();
            release_in_background(stream);
            inner.state = ScanState::Failed(ScanError::DeviceUnavailable(
                "granted stream has no live video track".to_string(),
            ));
            return;
        };

        let facing_mode = stream
            .video_tracks()
            .first()
            .and_then(|track| track.settings().facing_mode);
        let mirrored = should_mirror(facing_mode);

        self.sink.attach(source);
        self.sink.set_mirrored(mirrored);

        let detection = DetectionLoopHandle::spawn(
            generation,
            self.sink.clone(),
            detector,
            self.settings.poll_interval,
            Arc::clone(self),
        );

        info!(
            session = %self.id,
            stream = %stream.id(),
            facing = ?facing_mode,
            mirrored,
            policy = %self.settings.policy,
            "Scanning started"
        );

        inner.camera = Some(CameraSession { stream, mirrored });
        inner.detection = Some(detection);
        inner.state = ScanState::Active;
    }

    fn schedule_copy_reset(self: &Arc<Self>, inner: &mut Inner, epoch: u64) {
        let shared = Arc::clone(self);
        let delay = self.settings.copy_reset_delay;
        inner.copy_reset = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut inner = shared.lock();
            if inner.copy_epoch == epoch {
                inner.copy.copied = false;
                inner.copy_reset = None;
                shared.publish(&inner);
            }
        }));
    }
}

impl DetectionTarget for Shared {
    fn is_current(&self, generation: u64) -> bool {
        let inner = self.lock();
        inner.generation == generation && inner.state == ScanState::Active
    }

    fn on_detection(&self, generation: u64, detection: QrDetection) -> LoopAction {
        let mut inner = self.lock();
        if inner.generation != generation || inner.state != ScanState::Active {
            debug!(session = %self.id, generation, "Discarding late detection");
            return LoopAction::Stop;
        }

        let policy = self.settings.policy;
        let unchanged = inner
            .result
            .as_ref()
            .is_some_and(|current| current.payload == detection.payload);
        if policy == ResultPolicy::Continuous && unchanged {
            return LoopAction::Continue;
        }

        let mirrored = inner.camera.as_ref().is_some_and(|c| c.mirrored);
        let bounds = if mirrored {
            detection.bounds.mirrored()
        } else {
            detection.bounds
        };

        info!(
            session = %self.id,
            payload_len = detection.payload.len(),
            "QR code detected"
        );

        inner.result = Some(ScanResult {
            payload: detection.payload,
            observed_at: Utc::now(),
            bounds: Some(bounds),
        });
        inner.invalidate_copy();

        let action = match policy {
            ResultPolicy::SingleShot => {
                self.teardown(&mut inner);
                LoopAction::Stop
            }
            ResultPolicy::Continuous => LoopAction::Continue,
        };
        self.publish(&inner);
        action
    }
}

/// Camera scanning session
///
/// Must be used from within a tokio runtime. Dropping the session runs the
/// same teardown as [`ScanningSession::stop`].
pub struct ScanningSession {
    shared: Arc<Shared>,
}

impl ScanningSession {
    /// Create an idle session
    ///
    /// `detector` is the result of probing for QR support once; `None` makes
    /// every `start()` fail with [`ScanError::CapabilityUnsupported`].
    pub fn new(
        camera: Arc<dyn CameraCapability>,
        detector: Option<Arc<dyn FrameDetector>>,
        clipboard: Arc<dyn ClipboardCapability>,
        settings: ScanSettings,
    ) -> Self {
        let (snapshots, _) = watch::channel(ScanSnapshot::default());
        let id = Uuid::new_v4();
        debug!(session = %id, detector = detector.is_some(), "Scanning session created");

        Self {
            shared: Arc::new(Shared {
                id,
                camera,
                detector,
                clipboard,
                settings,
                sink: VideoSink::new(),
                inner: Mutex::new(Inner::default()),
                snapshots,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.shared.settings
    }

    /// Begin acquiring the camera
    ///
    /// No-op while Requesting or Active. Clears the previous result and
    /// error. The grant is handled in the background; watch
    /// [`subscribe`](Self::subscribe) for the outcome.
    pub fn start(&self) {
        let shared = &self.shared;
        let generation = {
            let mut inner = shared.lock();
            if inner.state.is_running() {
                debug!(session = %shared.id, state = %inner.state, "Scan already running");
                return;
            }

            inner.generation += 1;
            inner.result = None;
            inner.invalidate_copy();

            if shared.detector.is_none() {
                warn!(session = %shared.id, "No QR detector available");
                inner.state = ScanState::Failed(ScanError::CapabilityUnsupported);
                shared.publish(&inner);
                return;
            }

            inner.state = ScanState::Requesting;
            shared.publish(&inner);
            inner.generation
        };

        tokio::spawn(Arc::clone(shared).acquire(generation));
    }

    /// Release the camera and end detection. Idempotent.
    ///
    /// Active and Requesting become Stopped; Failed and Idle are kept.
    pub fn stop(&self) {
        let mut inner = self.shared.lock();
        self.shared.teardown(&mut inner);
        self.shared.publish(&inner);
    }

    /// Copy the current result to the clipboard
    ///
    /// Returns whether `copied` was set. The flag resets after the copy
    /// reset delay unless another copy or a new result comes first. A
    /// failed write clears a flag left by an earlier copy.
    pub async fn copy(&self) -> bool {
        let shared = &self.shared;
        let (payload, epoch) = {
            let mut inner = shared.lock();
            let Some(payload) = inner.result.as_ref().map(|r| r.payload.clone()) else {
                return false;
            };
            inner.copy_epoch += 1;
            (payload, inner.copy_epoch)
        };

        if let Err(e) = shared.clipboard.write_text(&payload).await {
            warn!(session = %shared.id, error = %e, "Failed to copy QR result");
            let mut inner = shared.lock();
            if inner.copy_epoch == epoch && inner.copy.copied {
                inner.invalidate_copy();
                shared.publish(&inner);
            }
            return false;
        }

        let mut inner = shared.lock();
        if inner.copy_epoch != epoch {
            debug!(session = %shared.id, "Copy superseded");
            return false;
        }
        if let Some(reset) = inner.copy_reset.take() {
            reset.abort();
        }
        inner.copy.copied = true;
        shared.schedule_copy_reset(&mut inner, epoch);
        shared.publish(&inner);
        true
    }

    /// Observe every change
    pub fn subscribe(&self) -> watch::Receiver<ScanSnapshot> {
        self.shared.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> ScanSnapshot {
        self.shared.lock().snapshot()
    }

    pub fn state(&self) -> ScanState {
        self.shared.lock().state.clone()
    }

    pub fn result(&self) -> Option<ScanResult> {
        self.shared.lock().result.clone()
    }

    pub fn copy_state(&self) -> ClipboardCopyState {
        self.shared.lock().copy
    }

    pub fn is_mirrored(&self) -> bool {
        self.shared.lock().camera.as_ref().is_some_and(|c| c.mirrored)
    }

    /// Sink the live stream is attached to
    pub fn preview(&self) -> VideoSink {
        self.shared.sink.clone()
    }

    /// Wait until a result shows up or the session stops running
    ///
    /// Returns `None` if the session is (or becomes) inactive without a
    /// result; check [`state`](Self::state) for the reason.
    pub async fn wait_for_result(&self) -> Option<ScanResult> {
        let mut rx = self.subscribe();
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if let Some(result) = &snapshot.result {
                    return Some(result.clone());
                }
                if !snapshot.state.is_running() {
                    return None;
                }
            }
            rx.changed().await.ok()?;
        }
    }
}

impl Drop for ScanningSession {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        self.shared.teardown(&mut inner);
        if let Some(reset) = inner.copy_reset.take() {
            reset.abort();
        }
        self.shared.publish(&inner);
        debug!(session = %self.shared.id, "Scanning session dropped");
    }
}

impl std::fmt::Debug for ScanningSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanningSession")
            .field("id", &self.shared.id)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirroring_rule() {
        assert!(!should_mirror(Some(FacingMode::Environment)));
        assert!(should_mirror(Some(FacingMode::User)));
        assert!(should_mirror(Some(FacingMode::Left)));
        assert!(should_mirror(None));
    }
}
