// SPDX-License-Identifier: GPL-3.0-only
//! Producer threads feeding video tracks
//!
//! Every backend produces frames on a dedicated OS thread. A
//! [`CaptureLoopController`] owns that thread and the flag telling it to
//! quit, so a [`VideoTrack`](super::VideoTrack) can release its producer
//! without knowing which backend spawned it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest uninterrupted sleep of a periodic producer
const STOP_POLL_SLICE: Duration = Duration::from_millis(10);

/// Returned by loop callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Keep going
    Continue,
    /// End the loop
    Stop,
}

/// Handle to a producer thread
///
/// Dropping the controller stops the thread and waits for it.
pub struct CaptureLoopController {
    name: String,
    quit: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureLoopController {
    /// Run `body` on a new thread
    ///
    /// The body owns its loop and must return once the flag it is handed
    /// becomes true. Backends use this when the loop state borrows from a
    /// resource opened on the thread itself (a device and its mapped buffers).
    pub fn spawn<F>(name: &str, body: F) -> Self
    where
        F: FnOnce(&AtomicBool) + Send + 'static,
    {
        let quit = Arc::new(AtomicBool::new(false));
        let thread_quit = Arc::clone(&quit);
        let thread_name = name.to_string();

        info!(name, "Starting producer thread");

        let thread = thread::spawn(move || {
            body(&thread_quit);
            debug!(name = %thread_name, "Producer thread exiting");
        });

        Self {
            name: name.to_string(),
            quit,
            thread: Some(thread),
        }
    }

    /// Call `tick` once per `period` until it returns [`LoopAction::Stop`]
    /// or the controller is stopped
    pub fn start_periodic<F>(name: &str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        Self::spawn(name, move |quit: &AtomicBool| {
            while !quit.load(Ordering::SeqCst) {
                if tick() == LoopAction::Stop {
                    return;
                }
                if !sleep_unless_quit(period, quit) {
                    return;
                }
            }
        })
    }

    /// True until the thread has returned
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Ask the thread to quit without waiting for it
    pub fn request_stop(&self) {
        self.quit.store(true, Ordering::SeqCst);
    }

    /// Ask the thread to quit and wait for it. Idempotent.
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread without asking it to quit
    pub fn join(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        if thread.join().is_err() {
            warn!(name = %self.name, "Producer thread panicked");
        } else {
            debug!(name = %self.name, "Producer thread joined");
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sleep for `period` in short slices; false if asked to quit meanwhile
fn sleep_unless_quit(period: Duration, quit: &AtomicBool) -> bool {
    let mut remaining = period;
    while !remaining.is_zero() {
        if quit.load(Ordering::SeqCst) {
            return false;
        }
        let slice = remaining.min(STOP_POLL_SLICE);
        thread::sleep(slice);
        remaining -= slice;
    }
    !quit.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_periodic_ends_on_stop_action() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&ticks);

        let mut producer =
            CaptureLoopController::start_periodic("three-ticks", Duration::ZERO, move || {
                if counter.fetch_add(1, Ordering::SeqCst) == 2 {
                    LoopAction::Stop
                } else {
                    LoopAction::Continue
                }
            });

        producer.join();
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(!producer.is_running());
    }

    #[test]
    fn test_long_period_stops_promptly() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&ticks);

        let mut producer =
            CaptureLoopController::start_periodic("slow", Duration::from_secs(60), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                LoopAction::Continue
            });

        thread::sleep(Duration::from_millis(30));
        let started = std::time::Instant::now();
        producer.stop();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        producer.stop();
    }

    #[test]
    fn test_request_stop_does_not_wait() {
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let mut producer = CaptureLoopController::spawn("blocked", move |quit| {
            // Stands in for a device read that has not returned yet
            let _ = release_rx.recv();
            assert!(quit.load(Ordering::SeqCst));
        });

        producer.request_stop();
        assert!(producer.is_running());

        release_tx.send(()).unwrap();
        producer.join();
        assert!(!producer.is_running());
    }

    #[test]
    fn test_drop_stops_spawned_body() {
        let exited = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&exited);

        let producer = CaptureLoopController::spawn("body", move |quit| {
            while !quit.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
            flag.store(true, Ordering::SeqCst);
        });
        assert!(producer.is_running());

        drop(producer);
        assert!(exited.load(Ordering::SeqCst));
    }
}
