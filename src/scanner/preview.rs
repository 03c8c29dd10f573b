// SPDX-License-Identifier: GPL-3.0-only

//! Preview sink a granted stream is attached to

use crate::backends::camera::{CameraFrame, FrameSlot, ReadyState};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct SinkInner {
    source: Option<FrameSlot>,
    mirrored: bool,
}

/// Where the live preview comes from
///
/// Cloning gives another handle to the same sink, so a front end can keep
/// one for rendering while the session attaches and detaches streams.
#[derive(Debug, Clone, Default)]
pub struct VideoSink {
    inner: Arc<Mutex<SinkInner>>,
}

impl VideoSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SinkInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn attach(&self, source: FrameSlot) {
        self.lock().source = Some(source);
    }

    pub fn detach(&self) {
        let mut inner = self.lock();
        inner.source = None;
        inner.mirrored = false;
    }

    /// `HaveNothing` while detached
    pub fn ready_state(&self) -> ReadyState {
        self.lock()
            .source
            .as_ref()
            .map(FrameSlot::ready_state)
            .unwrap_or_default()
    }

    pub fn current_frame(&self) -> Option<Arc<CameraFrame>> {
        self.lock().source.as_ref().and_then(FrameSlot::latest)
    }

    /// Flip the preview horizontally (user-facing cameras)
    pub fn set_mirrored(&self, mirrored: bool) {
        self.lock().mirrored = mirrored;
    }

    pub fn is_mirrored(&self) -> bool {
        self.lock().mirrored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::PixelFormat;

    #[test]
    fn test_detached_sink_has_nothing() {
        let sink = VideoSink::new();
        assert_eq!(sink.ready_state(), ReadyState::HaveNothing);
        assert!(sink.current_frame().is_none());
    }

    #[test]
    fn test_attach_follows_slot() {
        let sink = VideoSink::new();
        let slot = FrameSlot::new();
        sink.attach(slot.clone());
        sink.set_mirrored(true);
        assert_eq!(sink.ready_state(), ReadyState::HaveNothing);

        slot.publish(CameraFrame::packed(2, 2, PixelFormat::Gray8, vec![0; 4]));
        assert_eq!(sink.ready_state(), ReadyState::HaveEnoughData);
        assert!(sink.current_frame().is_some());

        sink.detach();
        assert!(sink.current_frame().is_none());
        assert!(slot.latest().is_some());
        assert!(!sink.is_mirrored());
        assert_eq!(sink.ready_state(), ReadyState::HaveNothing);
    }
}
