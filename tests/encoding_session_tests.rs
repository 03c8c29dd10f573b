// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for QR generation and download

use qrcam::encoder::{EncodeOptions, EncodingSession, QrEncoder};
use qrcam::storage::DirectoryDelivery;
use std::sync::Arc;

fn session() -> EncodingSession {
    EncodingSession::new(Arc::new(QrEncoder::new()), EncodeOptions::default())
}

#[tokio::test]
async fn test_generate_then_download_png() {
    let dir = tempfile::tempdir().unwrap();
    let delivery = DirectoryDelivery::new(dir.path());
    let session = session();

    let artifact = session
        .generate("https://example.com")
        .await
        .expect("artifact");
    assert_eq!(artifact.raster.dimensions(), (300, 300));

    let path = session.download(&delivery).await.expect("saved");
    assert_eq!(path, dir.path().join("qrcode.png"));

    // The saved file is the same image as the raster
    let saved = image::open(&path).unwrap().to_rgba8();
    assert_eq!(saved, artifact.raster);
}

#[tokio::test]
async fn test_repeated_download_gets_numbered_name() {
    let dir = tempfile::tempdir().unwrap();
    let delivery = DirectoryDelivery::new(dir.path());
    let session = session();
    session.generate("hello").await;

    let first = session.download(&delivery).await.unwrap();
    let second = session.download(&delivery).await.unwrap();

    assert_eq!(first.file_name().unwrap(), "qrcode.png");
    assert_eq!(second.file_name().unwrap(), "qrcode (1).png");
}

#[tokio::test]
async fn test_nothing_to_download_after_clearing() {
    let dir = tempfile::tempdir().unwrap();
    let delivery = DirectoryDelivery::new(dir.path());
    let session = session();

    session.generate("hello").await;
    session.generate("").await;

    assert!(session.current().is_none());
    assert!(session.download(&delivery).await.is_none());
    assert!(!dir.path().join("qrcode.png").exists());
}

#[tokio::test]
async fn test_text_too_long_for_any_version() {
    let session = session();
    session.generate("hello").await;

    let huge = "0123456789abcdef".repeat(300);
    assert!(session.generate(huge.clone()).await.is_none());
    assert!(session.current().is_none());
    assert_eq!(session.text(), huge);
}
