// SPDX-License-Identifier: GPL-3.0-only

//! Clipboard access

use crate::errors::ClipboardError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Write-only clipboard capability
#[async_trait]
pub trait ClipboardCapability: Send + Sync {
    /// Replace the clipboard text
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// System clipboard through arboard
///
/// The arboard handle is created on first use and kept alive afterwards: on
/// X11 the clipboard contents are served by the process that owns them, so
/// dropping the handle right after a write would drop the text too.
#[derive(Default, Clone)]
pub struct SystemClipboard {
    inner: Arc<Mutex<Option<arboard::Clipboard>>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClipboardCapability for SystemClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let inner = Arc::clone(&self.inner);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
            if guard.is_none() {
                let clipboard = arboard::Clipboard::new()
                    .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
                *guard = Some(clipboard);
            }

            let Some(clipboard) = guard.as_mut() else {
                return Err(ClipboardError::Unavailable("no clipboard handle".to_string()));
            };

            debug!(text_length = text.len(), "Writing text to system clipboard");
            clipboard
                .set_text(text)
                .map_err(|e| ClipboardError::WriteFailed(e.to_string()))
        })
        .await
        .map_err(|e| ClipboardError::WriteFailed(e.to_string()))?
    }
}

impl std::fmt::Debug for SystemClipboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let open = self
            .inner
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false);
        f.debug_struct("SystemClipboard").field("open", &open).finish()
    }
}
