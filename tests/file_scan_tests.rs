// SPDX-License-Identifier: GPL-3.0-only

//! End-to-end scan of a generated QR image through the file camera

use async_trait::async_trait;
use qrcam::backends::camera::FacingMode;
use qrcam::backends::camera::file_source::FileCamera;
use qrcam::backends::clipboard::ClipboardCapability;
use qrcam::encoder::{EncodeOptions, Encoder, QrEncoder};
use qrcam::errors::ClipboardError;
use qrcam::frame_processor::probe_detector;
use qrcam::scanner::{ScanSettings, ScanState, ScanningSession};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct MemoryClipboard {
    text: Mutex<Option<String>>,
}

#[async_trait]
impl ClipboardCapability for MemoryClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        *self.text.lock().unwrap() = Some(text.to_string());
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scan_generated_code_from_image_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photo.png");

    let artifact = QrEncoder::new()
        .encode("WIFI:S:qrcam;T:WPA;P:secret;;", &EncodeOptions::default())
        .unwrap();
    let mut photo = image::RgbaImage::from_pixel(640, 480, image::Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut photo, &artifact.raster, 170, 90);
    photo.save(&path).unwrap();

    let clipboard = Arc::new(MemoryClipboard::default());
    let settings = ScanSettings {
        poll_interval: Duration::from_millis(20),
        ..ScanSettings::default()
    };
    let session = ScanningSession::new(
        Arc::new(FileCamera::new(&path).with_facing_mode(Some(FacingMode::Environment))),
        probe_detector(640),
        clipboard.clone(),
        settings,
    );

    session.start();
    let result = tokio::time::timeout(Duration::from_secs(10), session.wait_for_result())
        .await
        .expect("scan timed out")
        .expect("result");

    assert_eq!(result.payload, "WIFI:S:qrcam;T:WPA;P:secret;;");
    assert_eq!(session.state(), ScanState::Stopped);

    let bounds = result.bounds.expect("bounds");
    assert!(bounds.x > 0.2 && bounds.x < 0.4, "x = {}", bounds.x);

    assert!(session.copy().await);
    assert_eq!(
        clipboard.text.lock().unwrap().as_deref(),
        Some("WIFI:S:qrcam;T:WPA;P:secret;;")
    );
}

#[tokio::test]
async fn test_unreadable_image_fails_scan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"not a png").unwrap();

    let session = ScanningSession::new(
        Arc::new(FileCamera::new(&path)),
        probe_detector(640),
        Arc::new(MemoryClipboard::default()),
        ScanSettings::default(),
    );

    session.start();
    assert!(session.wait_for_result().await.is_none());
    assert!(matches!(
        session.state(),
        ScanState::Failed(qrcam::ScanError::DeviceUnavailable(_))
    ));
}
