// SPDX-License-Identifier: GPL-3.0-only

//! Granted video streams and their tracks
//!
//! A [`VideoStream`] is what a camera backend hands out on a successful
//! request. Each [`VideoTrack`] owns the producer feeding it (usually a
//! capture thread) and a [`FrameSlot`] holding the latest frame. Stopping a
//! track signals the producer and closes the slot; a closed slot ignores
//! further frames. The producer thread is joined when the track is dropped.

use super::frame_loop::CaptureLoopController;
use super::types::{CameraFrame, ReadyState, TrackSettings};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;
use uuid::Uuid;

/// Latest-frame mailbox shared between a producer and its consumers
#[derive(Debug, Clone)]
pub struct FrameSlot {
    inner: Arc<SlotInner>,
}

#[derive(Debug)]
struct SlotInner {
    frame: Mutex<Option<Arc<CameraFrame>>>,
    ready: AtomicU8,
    live: AtomicBool,
    published: AtomicU64,
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSlot {
    /// Create a live, empty slot
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SlotInner {
                frame: Mutex::new(None),
                ready: AtomicU8::new(ReadyState::HaveNothing as u8),
                live: AtomicBool::new(true),
                published: AtomicU64::new(0),
            }),
        }
    }

    /// Store a new frame; live sources have enough data once a frame exists
    pub fn publish(&self, frame: CameraFrame) {
        if !self.is_live() {
            return;
        }
        *self
            .inner
            .frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(frame));
        self.inner.published.fetch_add(1, Ordering::Relaxed);
        self.inner
            .ready
            .store(ReadyState::HaveEnoughData as u8, Ordering::Release);
    }

    /// Override the ready state (format negotiated, stalled source, ...)
    pub fn set_ready_state(&self, state: ReadyState) {
        if self.is_live() {
            self.inner.ready.store(state as u8, Ordering::Release);
        }
    }

    pub fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.inner.ready.load(Ordering::Acquire))
    }

    /// Latest frame, if any
    pub fn latest(&self) -> Option<Arc<CameraFrame>> {
        self.inner
            .frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of frames published so far
    pub fn frames_published(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }

    pub fn is_live(&self) -> bool {
        self.inner.live.load(Ordering::Acquire)
    }

    /// End the slot: drop the frame and refuse further publishes
    pub fn close(&self) {
        self.inner.live.store(false, Ordering::Release);
        self.inner
            .ready
            .store(ReadyState::HaveNothing as u8, Ordering::Release);
        *self
            .inner
            .frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// One video track of a granted stream
pub struct VideoTrack {
    label: String,
    settings: TrackSettings,
    slot: FrameSlot,
    producer: Option<CaptureLoopController>,
}

impl VideoTrack {
    /// Create a track fed by `producer` (if any) through `slot`
    pub fn new(
        label: impl Into<String>,
        settings: TrackSettings,
        slot: FrameSlot,
        producer: Option<CaptureLoopController>,
    ) -> Self {
        Self {
            label: label.into(),
            settings,
            slot,
            producer,
        }
    }

    /// Settings the backend resolved for this track
    pub fn settings(&self) -> &TrackSettings {
        &self.settings
    }

    pub fn slot(&self) -> &FrameSlot {
        &self.slot
    }

    pub fn is_live(&self) -> bool {
        self.slot.is_live()
    }

    /// Signal the producer and close the slot. Safe to call repeatedly.
    ///
    /// Never blocks on the producer thread.
    pub fn stop(&mut self) {
        if let Some(producer) = &self.producer {
            producer.request_stop();
        }
        if self.slot.is_live() {
            debug!(track = %self.label, "Stopping video track");
            self.slot.close();
        }
    }
}

impl Drop for VideoTrack {
    fn drop(&mut self) {
        self.stop();
        if let Some(mut producer) = self.producer.take() {
            producer.join();
        }
    }
}

impl std::fmt::Debug for VideoTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoTrack")
            .field("label", &self.label)
            .field("settings", &self.settings)
            .field("live", &self.is_live())
            .finish()
    }
}

/// A stream granted by a camera backend
#[derive(Debug)]
pub struct VideoStream {
    id: Uuid,
    tracks: Vec<VideoTrack>,
}

impl VideoStream {
    pub fn new(tracks: Vec<VideoTrack>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tracks,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn video_tracks(&self) -> &[VideoTrack] {
        &self.tracks
    }

    /// Slot of the first live track, used as the preview source
    pub fn frame_source(&self) -> Option<FrameSlot> {
        self.tracks
            .iter()
            .find(|track| track.is_live())
            .map(|track| track.slot.clone())
    }

    /// True while at least one track is live
    pub fn is_live(&self) -> bool {
        self.tracks.iter().any(VideoTrack::is_live)
    }

    /// Stop every track. Returns how many were still live.
    pub fn stop_all_tracks(&mut self) -> usize {
        let mut stopped = 0;
        for track in &mut self.tracks {
            if track.is_live() {
                stopped += 1;
            }
            track.stop();
        }
        stopped
    }
}
