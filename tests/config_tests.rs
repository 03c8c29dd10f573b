// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use qrcam::Config;
use qrcam::backends::camera::FacingMode;
use qrcam::scanner::ResultPolicy;
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.scan_policy, ResultPolicy::SingleShot);
    assert_eq!(config.poll_interval_ms, 100);
    assert_eq!(config.copy_reset_ms, 2000);
    assert_eq!(config.encoder.size, 300);
    assert_eq!(config.encoder.margin, 2);
    assert!(config.camera.device.is_none());
}

#[test]
fn test_config_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.scan_policy = ResultPolicy::Continuous;
    config.camera.device = Some("/dev/video2".to_string());
    config.camera.facing_hint = Some(FacingMode::User);
    config.encoder.dark_color = "#112233".to_string();

    config.save_to(&path).unwrap();
    assert_eq!(Config::load_from(&path), config);
}

#[test]
fn test_missing_or_invalid_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    assert_eq!(Config::load_from(&missing), Config::default());

    let invalid = dir.path().join("invalid.json");
    std::fs::write(&invalid, "{ not json").unwrap();
    assert_eq!(Config::load_from(&invalid), Config::default());
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{ "scan_policy": "continuous", "camera": { "facing_hint": "environment" } }"#,
    )
    .unwrap();

    let config = Config::load_from(&path);
    assert_eq!(config.scan_policy, ResultPolicy::Continuous);
    assert_eq!(config.camera.facing_hint, Some(FacingMode::Environment));
    assert_eq!(config.camera.width, 1280);
    assert_eq!(config.poll_interval_ms, 100);
}

#[test]
fn test_scan_settings_from_config() {
    let mut config = Config::default();
    config.poll_interval_ms = 0;
    config.camera.device = Some("/dev/video1".to_string());

    let settings = config.scan_settings();
    assert_eq!(settings.poll_interval, Duration::from_millis(1));
    assert_eq!(settings.copy_reset_delay, Duration::from_millis(2000));
    assert_eq!(settings.constraints.device.as_deref(), Some("/dev/video1"));
    assert_eq!(settings.constraints.facing_mode, Some(FacingMode::Environment));
    assert!(!settings.constraints.audio);
}

#[test]
fn test_encode_options_fall_back_on_bad_colors() {
    let mut config = Config::default();
    config.encoder.dark_color = "#102030".to_string();
    config.encoder.light_color = "white".to_string();

    let options = config.encode_options();
    assert_eq!(options.dark.0, [0x10, 0x20, 0x30, 0xFF]);
    assert_eq!(options.light.0, [0xFF, 0xFF, 0xFF, 0xFF]);
}
