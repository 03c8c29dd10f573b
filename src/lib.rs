// SPDX-License-Identifier: MPL-2.0

//! qrcam - QR code generation and live camera scanning
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`encoder`]: Text to QR image, and the session holding the latest image
//! - [`scanner`]: Camera scanning session, detection loop and preview sink
//! - [`backends`]: Camera and clipboard access
//! - [`frame_processor`]: QR detection on camera frames
//! - [`config`]: User configuration handling
//! - [`storage`]: Saving generated images to disk
//!
//! # Example
//!
//! ```ignore
//! let session = ScanningSession::new(camera, probe_detector(640), clipboard, ScanSettings::default());
//! session.start();
//! if let Some(result) = session.wait_for_result().await {
//!     println!("{}", result.payload);
//! }
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod encoder;
pub mod errors;
pub mod frame_processor;
pub mod scanner;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use encoder::{EncodedArtifact, EncodingSession, QrEncoder};
pub use errors::{AppError, AppResult, ScanError};
pub use frame_processor::QrDetection;
pub use scanner::{ScanResult, ScanSettings, ScanSnapshot, ScanState, ScanningSession};
