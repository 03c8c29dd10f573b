// SPDX-License-Identifier: GPL-3.0-only

//! Recurring QR probe against the preview sink
//!
//! The loop ticks every poll interval, skips ticks the runtime could not
//! service in time, and awaits each detection before waiting for the next
//! tick, so two detections never run at once. Results go to a
//! [`DetectionTarget`] together with the generation the loop was started
//! under; the target drops anything from an older generation.

use super::preview::VideoSink;
use crate::backends::camera::ReadyState;
use crate::backends::camera::frame_loop::LoopAction;
use crate::frame_processor::{FrameDetector, QrDetection};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

/// Receiver of detection results
pub(crate) trait DetectionTarget: Send + Sync + 'static {
    /// Whether `generation` is still the one the session is running
    fn is_current(&self, generation: u64) -> bool;

    /// Handle the first code found on a tick
    fn on_detection(&self, generation: u64, detection: QrDetection) -> LoopAction;
}

/// Running detection loop, 1:1 with an active camera session
#[derive(Debug)]
pub struct DetectionLoopHandle {
    generation: u64,
    task: JoinHandle<()>,
}

impl DetectionLoopHandle {
    pub(crate) fn spawn<T: DetectionTarget>(
        generation: u64,
        sink: VideoSink,
        detector: Arc<dyn FrameDetector>,
        period: Duration,
        target: Arc<T>,
    ) -> Self {
        let task = tokio::spawn(run(generation, sink, detector, period, target));
        Self { generation, task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Abort the loop; an in-flight detection is dropped with it
    pub fn cancel(self) {
        debug!(generation = self.generation, "Cancelling detection loop");
        self.task.abort();
    }
}

async fn run<T: DetectionTarget>(
    generation: u64,
    sink: VideoSink,
    detector: Arc<dyn FrameDetector>,
    period: Duration,
    target: Arc<T>,
) {
    let period = period.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    debug!(generation, period_ms = period.as_millis() as u64, "Detection loop started");

    loop {
        ticker.tick().await;

        if !target.is_current(generation) {
            break;
        }

        let ready = sink.ready_state();
        if ready < ReadyState::HaveEnoughData {
            trace!(generation, ?ready, "Preview not ready, skipping tick");
            continue;
        }
        let Some(frame) = sink.current_frame() else {
            continue;
        };

        let detections = match detector.detect(frame).await {
            Ok(detections) => detections,
            Err(e) => {
                warn!(generation, error = %e, "QR detection failed");
                continue;
            }
        };

        let Some(first) = detections.into_iter().next() else {
            continue;
        };

        if target.on_detection(generation, first) == LoopAction::Stop {
            break;
        }
    }

    debug!(generation, "Detection loop finished");
}
