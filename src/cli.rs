// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Generating QR code images
//! - Scanning QR codes from a camera or an image file
//! - Listing available cameras
//! - Showing and writing the configuration

use qrcam::backends::camera::file_source::FileCamera;
use qrcam::backends::camera::{CameraCapability, FacingMode};
use qrcam::backends::clipboard::SystemClipboard;
use qrcam::config::Config;
use qrcam::encoder::{EncodingSession, QrEncoder};
use qrcam::errors::{AppError, AppResult};
use qrcam::frame_processor::probe_detector;
use qrcam::scanner::{ResultPolicy, ScanResult, ScanningSession};
use qrcam::storage::DirectoryDelivery;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Options for `qrcam scan`
#[derive(Debug, Clone, Default)]
pub struct ScanArgs {
    pub device: Option<String>,
    pub image: Option<PathBuf>,
    pub continuous: bool,
    pub copy: bool,
    pub json: bool,
    pub timeout: Option<u64>,
}

/// Encode `text` and save it as `qrcode.png`
pub async fn generate(
    config: &Config,
    text: String,
    output_dir: Option<PathBuf>,
    size: Option<u32>,
    margin: Option<u32>,
) -> AppResult<()> {
    if text.is_empty() {
        return Err(AppError::Other("Nothing to encode".to_string()));
    }

    let mut options = config.encode_options();
    if let Some(size) = size {
        options.size = size;
    }
    if let Some(margin) = margin {
        options.margin = margin;
    }

    let session = EncodingSession::new(Arc::new(QrEncoder::new()), options);
    let artifact = session
        .generate(text)
        .await
        .ok_or_else(|| AppError::Other("Could not encode text as a QR code".to_string()))?;

    let delivery = DirectoryDelivery::new(output_dir.unwrap_or_else(|| config.download_dir()));
    let path = session
        .download(&delivery)
        .await
        .ok_or_else(|| AppError::Storage(format!("Could not save to {}", delivery.dir().display())))?;

    println!(
        "Saved {}x{} QR code to {}",
        artifact.raster.width(),
        artifact.raster.height(),
        path.display()
    );
    Ok(())
}

/// Scan codes until one is found (or forever with `--continuous`)
pub async fn scan(config: &Config, args: ScanArgs) -> AppResult<()> {
    let mut settings = config.scan_settings();
    if args.continuous {
        settings.policy = ResultPolicy::Continuous;
    }
    if args.device.is_some() {
        settings.constraints.device = args.device.clone();
    }
    let copy_wait = settings.copy_reset_delay;

    let camera = select_camera(config, &args)?;
    let session = ScanningSession::new(
        camera,
        probe_detector(config.detector_max_dimension),
        Arc::new(SystemClipboard::new()),
        settings,
    );

    let deadline = args
        .timeout
        .map(|secs| Instant::now() + Duration::from_secs(secs));

    session.start();

    let outcome = match session.settings().policy {
        ResultPolicy::SingleShot => scan_once(&session, &args, deadline, copy_wait).await,
        ResultPolicy::Continuous => scan_continuous(&session, &args, deadline).await,
    };

    session.stop();
    outcome
}

async fn scan_once(
    session: &ScanningSession,
    args: &ScanArgs,
    deadline: Option<Instant>,
    copy_wait: Duration,
) -> AppResult<()> {
    let waited = tokio::select! {
        result = session.wait_for_result() => result,
        _ = sleep_until(deadline) => {
            return Err(AppError::Other("Timed out waiting for a QR code".to_string()));
        }
        _ = tokio::signal::ctrl_c() => return Ok(()),
    };

    let Some(result) = waited else {
        return Err(stopped_without_result(session));
    };

    print_result(&result, args.json)?;

    if args.copy && session.copy().await {
        eprintln!("Copied to clipboard");
        // Keep the clipboard owner alive while the confirmation is shown
        tokio::time::sleep(copy_wait).await;
    }
    Ok(())
}

async fn scan_continuous(
    session: &ScanningSession,
    args: &ScanArgs,
    deadline: Option<Instant>,
) -> AppResult<()> {
    let mut updates = session.subscribe();
    let mut last_seen: Option<ScanResult> = None;

    loop {
        let (state, result) = {
            let snapshot = updates.borrow_and_update();
            (snapshot.state.clone(), snapshot.result.clone())
        };

        if let Some(result) = result.filter(|r| last_seen.as_ref() != Some(r)) {
            print_result(&result, args.json)?;
            if args.copy && session.copy().await {
                eprintln!("Copied to clipboard");
            }
            last_seen = Some(result);
        }

        if !state.is_running() {
            return match state.error() {
                Some(err) => Err(err.clone().into()),
                None => Ok(()),
            };
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            _ = sleep_until(deadline) => return Ok(()),
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

/// List capture devices
pub fn list_cameras() -> AppResult<()> {
    #[cfg(target_os = "linux")]
    {
        let cameras = qrcam::backends::camera::v4l2::enumerate_cameras();
        if cameras.is_empty() {
            println!("No cameras found.");
            return Ok(());
        }

        println!("Available cameras:");
        println!();
        for (index, camera) in cameras.iter().enumerate() {
            println!("  [{}] {}", index, camera.name);
            println!("      Path:   {}", camera.path);
            println!("      Driver: {}", camera.driver);
            if !camera.bus_info.is_empty() {
                println!("      Bus:    {}", camera.bus_info);
            }
            println!();
        }
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    {
        println!("Camera enumeration is only available on Linux.");
        Ok(())
    }
}

/// Print the effective config, optionally writing it to disk
pub fn show_config(config: &Config, init: bool) -> AppResult<()> {
    if init {
        let path = config.save()?;
        println!("Wrote {}", path.display());
    } else if let Some(path) = Config::default_path() {
        println!("# {}", path.display());
    }

    let json = serde_json::to_string_pretty(config).map_err(|e| AppError::Config(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

fn select_camera(config: &Config, args: &ScanArgs) -> AppResult<Arc<dyn CameraCapability>> {
    if let Some(image) = &args.image {
        let facing = config.camera.facing_hint.or(Some(FacingMode::Environment));
        return Ok(Arc::new(FileCamera::new(image).with_facing_mode(facing)));
    }

    #[cfg(target_os = "linux")]
    {
        use qrcam::backends::camera::v4l2::V4l2Camera;
        Ok(Arc::new(
            V4l2Camera::new().with_facing_hint(config.camera.facing_hint),
        ))
    }

    #[cfg(not(target_os = "linux"))]
    {
        Err(AppError::Other(
            "No camera backend on this platform, use --image".to_string(),
        ))
    }
}

fn stopped_without_result(session: &ScanningSession) -> AppError {
    match session.state().error() {
        Some(err) => err.clone().into(),
        None => AppError::Other("Scan stopped before a QR code was found".to_string()),
    }
}

fn print_result(result: &ScanResult, json: bool) -> AppResult<()> {
    if json {
        let line = serde_json::to_string(result).map_err(|e| AppError::Other(e.to_string()))?;
        println!("{}", line);
    } else {
        println!("{}", result.payload);
    }
    Ok(())
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
