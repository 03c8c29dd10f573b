// SPDX-License-Identifier: GPL-3.0-only

//! Text to QR image session
//!
//! Every [`EncodingSession::generate`] call is an [`EncodingRequest`] with a
//! fresh sequence number. Encoding runs on the blocking pool; when it
//! finishes, the result is applied only if no newer request was made in the
//! meantime.

use super::{EncodeOptions, EncodedArtifact, Encoder};
use crate::constants::encoder::DOWNLOAD_FILE_NAME;
use crate::storage::FileDelivery;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// One generate call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingRequest {
    pub text: String,
    pub sequence: u64,
}

#[derive(Debug, Default)]
struct EncodingState {
    request: Option<EncodingRequest>,
    artifact: Option<Arc<EncodedArtifact>>,
}

/// Holds the latest text and the artifact rendered from it
pub struct EncodingSession {
    encoder: Arc<dyn Encoder>,
    options: EncodeOptions,
    next_sequence: AtomicU64,
    state: Mutex<EncodingState>,
}

impl EncodingSession {
    pub fn new(encoder: Arc<dyn Encoder>, options: EncodeOptions) -> Self {
        Self {
            encoder,
            options,
            next_sequence: AtomicU64::new(0),
            state: Mutex::new(EncodingState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EncodingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Render `text` and make it the current artifact
    ///
    /// Empty text clears the artifact. Returns `None` when the text is empty,
    /// the encoder failed, or a newer request superseded this one.
    pub async fn generate(&self, text: impl Into<String>) -> Option<Arc<EncodedArtifact>> {
        let text = text.into();
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let request = EncodingRequest {
            text: text.clone(),
            sequence,
        };
        self.lock().request = Some(request);

        if text.is_empty() {
            self.apply(sequence, None);
            return None;
        }

        let encoder = Arc::clone(&self.encoder);
        let options = self.options;
        let input_len = text.len();
        let encoded = tokio::task::spawn_blocking(move || encoder.encode(&text, &options)).await;

        let artifact = match encoded {
            Ok(Ok(artifact)) => Some(Arc::new(artifact)),
            Ok(Err(e)) => {
                warn!(sequence, input_len, error = %e, "QR encoding failed");
                None
            }
            Err(e) => {
                warn!(sequence, error = %e, "QR encoding task failed");
                None
            }
        };

        if self.apply(sequence, artifact.clone()) {
            artifact
        } else {
            None
        }
    }

    /// Store `artifact` if `sequence` is still the latest request
    fn apply(&self, sequence: u64, artifact: Option<Arc<EncodedArtifact>>) -> bool {
        let mut state = self.lock();
        let latest = state.request.as_ref().map(|r| r.sequence);
        if latest != Some(sequence) {
            debug!(sequence, ?latest, "Discarding superseded encoding result");
            return false;
        }
        state.artifact = artifact;
        true
    }

    /// Current artifact, if any
    pub fn current(&self) -> Option<Arc<EncodedArtifact>> {
        self.lock().artifact.clone()
    }

    /// Text of the latest request
    pub fn text(&self) -> String {
        self.lock()
            .request
            .as_ref()
            .map(|r| r.text.clone())
            .unwrap_or_default()
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Hand the current image to `delivery` as `qrcode.png`
    ///
    /// Failures are logged and not retried. Returns where the file went.
    pub async fn download(&self, delivery: &dyn FileDelivery) -> Option<PathBuf> {
        let Some(artifact) = self.current() else {
            debug!("Nothing to download");
            return None;
        };

        match delivery
            .deliver(DOWNLOAD_FILE_NAME, &artifact.portable_payload)
            .await
        {
            Ok(path) => {
                info!(path = %path.display(), "QR code saved");
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "Failed to save QR code");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{DeliveryError, EncodeError};
    use async_trait::async_trait;
    use image::RgbaImage;
    use std::time::Duration;

    /// Encodes anything, sleeping for texts starting with "slow"
    struct FakeEncoder;

    impl Encoder for FakeEncoder {
        fn encode(&self, text: &str, _: &EncodeOptions) -> Result<EncodedArtifact, EncodeError> {
            if text.starts_with("slow") {
                std::thread::sleep(Duration::from_millis(200));
            }
            if text == "too long" {
                return Err(EncodeError::DataTooLong);
            }
            Ok(EncodedArtifact {
                raster: RgbaImage::new(1, 1),
                portable_payload: format!("data:image/png;base64,{}", text),
            })
        }
    }

    struct RecordingDelivery {
        delivered: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl FileDelivery for RecordingDelivery {
        async fn deliver(&self, file_name: &str, data_uri: &str) -> Result<PathBuf, DeliveryError> {
            if self.fail {
                return Err(DeliveryError::Io("disk full".into()));
            }
            self.delivered
                .lock()
                .unwrap()
                .push((file_name.to_string(), data_uri.to_string()));
            Ok(PathBuf::from(file_name))
        }
    }

    fn session() -> EncodingSession {
        EncodingSession::new(Arc::new(FakeEncoder), EncodeOptions::default())
    }

    #[tokio::test]
    async fn test_empty_text_clears_artifact() {
        let session = session();
        assert!(session.generate("hello").await.is_some());
        assert!(session.current().is_some());

        assert!(session.generate("").await.is_none());
        assert!(session.current().is_none());
        assert_eq!(session.text(), "");
    }

    #[tokio::test]
    async fn test_encoder_failure_clears_previous() {
        let session = session();
        session.generate("hello").await;
        assert!(session.generate("too long").await.is_none());
        assert!(session.current().is_none());
    }

    #[tokio::test]
    async fn test_last_request_wins() {
        let session = session();
        let (slow, fast) = tokio::join!(session.generate("slow first"), session.generate("second"));

        assert!(slow.is_none());
        assert!(fast.is_some());
        let current = session.current().unwrap();
        assert!(current.portable_payload.ends_with("second"));
        assert_eq!(session.text(), "second");
    }

    #[tokio::test]
    async fn test_download_delivers_portable_payload() {
        let session = session();
        let delivery = RecordingDelivery {
            delivered: Mutex::new(Vec::new()),
            fail: false,
        };

        assert!(session.download(&delivery).await.is_none());

        session.generate("hello").await;
        let path = session.download(&delivery).await;
        assert_eq!(path, Some(PathBuf::from("qrcode.png")));

        let delivered = delivery.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].1, "data:image/png;base64,hello");
    }

    #[tokio::test]
    async fn test_download_failure_is_reported() {
        let session = session();
        session.generate("hello").await;
        let delivery = RecordingDelivery {
            delivered: Mutex::new(Vec::new()),
            fail: true,
        };
        assert!(session.download(&delivery).await.is_none());
        // Artifact survives a failed download
        assert!(session.current().is_some());
    }
}
