// SPDX-License-Identifier: MPL-2.0

//! Storage utilities for delivering generated images as files

use crate::errors::DeliveryError;
use async_trait::async_trait;
use base64::Engine as _;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Upper bound on `name (n).ext` attempts
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Somewhere a data URI can be saved to as a named file
#[async_trait]
pub trait FileDelivery: Send + Sync {
    /// Save `data_uri` under `file_name`, returning the path actually written
    async fn deliver(&self, file_name: &str, data_uri: &str) -> Result<PathBuf, DeliveryError>;
}

/// Writes files into a directory, never overwriting existing ones
#[derive(Debug, Clone)]
pub struct DirectoryDelivery {
    dir: PathBuf,
}

impl DirectoryDelivery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The user's downloads directory, or the current directory
    pub fn default_dir() -> PathBuf {
        dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Default for DirectoryDelivery {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

#[async_trait]
impl FileDelivery for DirectoryDelivery {
    async fn deliver(&self, file_name: &str, data_uri: &str) -> Result<PathBuf, DeliveryError> {
        let bytes = decode_data_uri(data_uri)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self.dir.join(numbered_name(file_name, attempt));
            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            let mut file = match file {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            file.write_all(&bytes).await?;
            file.flush().await?;
            debug!(path = %path.display(), bytes = bytes.len(), "Wrote file");
            return Ok(path);
        }

        Err(DeliveryError::Io(format!(
            "no free file name for {} in {}",
            file_name,
            self.dir.display()
        )))
    }
}

/// Decode a `data:<mime>;base64,<payload>` URI
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, DeliveryError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or(DeliveryError::InvalidDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(DeliveryError::InvalidDataUri)?;
    if !header.ends_with(";base64") {
        return Err(DeliveryError::InvalidDataUri);
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|_| DeliveryError::InvalidDataUri)
}

/// `qrcode.png`, `qrcode (1).png`, `qrcode (2).png`, ...
fn numbered_name(file_name: &str, n: u32) -> String {
    if n == 0 {
        return file_name.to_string();
    }
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, n, ext),
        _ => format!("{} ({})", file_name, n),
    }
}
