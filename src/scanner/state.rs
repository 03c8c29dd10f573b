// SPDX-License-Identifier: GPL-3.0-only

//! Observable scanning session state

use crate::errors::ScanError;
use crate::frame_processor::FrameRegion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a scanning session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanState {
    /// Never started
    #[default]
    Idle,
    /// Waiting for the camera to be granted
    Requesting,
    /// Camera live, detection loop running
    Active,
    /// Stopped by the user or after a single-shot result
    Stopped,
    /// Acquisition failed; `start()` retries
    Failed(ScanError),
}

impl ScanState {
    /// Requesting or Active: the session holds or is about to hold the camera
    pub fn is_running(&self) -> bool {
        matches!(self, ScanState::Requesting | ScanState::Active)
    }

    pub fn error(&self) -> Option<&ScanError> {
        match self {
            ScanState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanState::Idle => write!(f, "idle"),
            ScanState::Requesting => write!(f, "requesting"),
            ScanState::Active => write!(f, "active"),
            ScanState::Stopped => write!(f, "stopped"),
            ScanState::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// A decoded QR payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub payload: String,
    pub observed_at: DateTime<Utc>,
    /// Where the code was seen, in preview coordinates (already flipped when
    /// the preview is mirrored)
    pub bounds: Option<FrameRegion>,
}

/// Whether the current result was just copied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ClipboardCopyState {
    pub copied: bool,
}

/// What happens after a code is found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultPolicy {
    /// Report the first code and release the camera
    #[default]
    SingleShot,
    /// Keep scanning, replacing the result whenever a different code shows up
    Continuous,
}

impl std::fmt::Display for ResultPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultPolicy::SingleShot => write!(f, "single-shot"),
            ResultPolicy::Continuous => write!(f, "continuous"),
        }
    }
}

/// Everything a front end needs to render the scanner
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanSnapshot {
    pub state: ScanState,
    pub mirrored: bool,
    pub result: Option<ScanResult>,
    pub copy: ClipboardCopyState,
}
