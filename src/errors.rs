// SPDX-License-Identifier: MPL-2.0

//! Error types for qrcam
//!
//! Every failure the sessions can hit is caught at the boundary of the
//! operation that started it and folded into session state or a log line.
//! These types are what gets stored or logged.

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Top-level error used by the command line front end
#[derive(Debug, Clone)]
pub enum AppError {
    /// Scanning session failures
    Scan(ScanError),
    /// QR encoding failures
    Encode(EncodeError),
    /// Artifact delivery failures
    Delivery(DeliveryError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Why a scanning session ended up in the `Failed` state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// No QR detector exists on this platform; retrying will not help
    CapabilityUnsupported,
    /// The user or the system refused camera access
    PermissionDenied(String),
    /// No camera, camera busy, or it vanished while opening
    DeviceUnavailable(String),
}

/// Errors reported by camera backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// Access to the device was refused
    PermissionDenied(String),
    /// No matching camera device
    NotFound(String),
    /// Device is in use by another process
    Busy,
    /// Device does not support any usable format
    FormatNotSupported(String),
    /// Backend error
    Backend(String),
}

/// Failure of the external QR encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Payload does not fit into any QR version
    DataTooLong,
    /// Encoder rejected the input
    InvalidInput(String),
    /// Raster could not be serialized to PNG
    Image(String),
}

/// A single detection tick failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    /// Frame layout could not be read
    UnsupportedFrame(String),
    /// Detector task died
    TaskFailed(String),
    /// Detector reported an error
    Backend(String),
}

/// Clipboard write failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    /// No clipboard available (headless session, no display server)
    Unavailable(String),
    /// The write itself failed
    WriteFailed(String),
}

/// File delivery failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// Payload is not a base64 data URI
    InvalidDataUri,
    /// Writing the file failed
    Io(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Scan(e) => write!(f, "Scan error: {}", e),
            AppError::Encode(e) => write!(f, "Encode error: {}", e),
            AppError::Delivery(e) => write!(f, "Delivery error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::CapabilityUnsupported => write!(
                f,
                "QR code scanning is not supported in this environment"
            ),
            ScanError::PermissionDenied(msg) => write!(
                f,
                "Unable to access camera, please ensure camera permissions are granted ({})",
                msg
            ),
            ScanError::DeviceUnavailable(msg) => write!(f, "Camera unavailable: {}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            CameraError::NotFound(msg) => write!(f, "No camera found: {}", msg),
            CameraError::Busy => write!(f, "Camera is busy"),
            CameraError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            CameraError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::DataTooLong => write!(f, "Text is too long for a QR code"),
            EncodeError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            EncodeError::Image(msg) => write!(f, "Image encoding failed: {}", msg),
        }
    }
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectError::UnsupportedFrame(msg) => write!(f, "Unsupported frame: {}", msg),
            DetectError::TaskFailed(msg) => write!(f, "Detection task failed: {}", msg),
            DetectError::Backend(msg) => write!(f, "Detector error: {}", msg),
        }
    }
}

impl fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipboardError::Unavailable(msg) => write!(f, "Clipboard unavailable: {}", msg),
            ClipboardError::WriteFailed(msg) => write!(f, "Clipboard write failed: {}", msg),
        }
    }
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::InvalidDataUri => write!(f, "Payload is not a base64 data URI"),
            DeliveryError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for ScanError {}
impl std::error::Error for CameraError {}
impl std::error::Error for EncodeError {}
impl std::error::Error for DetectError {}
impl std::error::Error for ClipboardError {}
impl std::error::Error for DeliveryError {}

impl From<CameraError> for ScanError {
    fn from(err: CameraError) -> Self {
        match err {
            CameraError::PermissionDenied(msg) => ScanError::PermissionDenied(msg),
            other => ScanError::DeviceUnavailable(other.to_string()),
        }
    }
}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        AppError::Scan(err)
    }
}

impl From<EncodeError> for AppError {
    fn from(err: EncodeError) -> Self {
        AppError::Encode(err)
    }
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        AppError::Delivery(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for DeliveryError {
    fn from(err: std::io::Error) -> Self {
        DeliveryError::Io(err.to_string())
    }
}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => CameraError::PermissionDenied(err.to_string()),
            std::io::ErrorKind::NotFound => CameraError::NotFound(err.to_string()),
            std::io::ErrorKind::ResourceBusy => CameraError::Busy,
            _ => CameraError::Backend(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_error_maps_to_scan_error() {
        assert_eq!(
            ScanError::from(CameraError::PermissionDenied("denied".into())),
            ScanError::PermissionDenied("denied".into())
        );
        assert!(matches!(
            ScanError::from(CameraError::Busy),
            ScanError::DeviceUnavailable(_)
        ));
        assert!(matches!(
            ScanError::from(CameraError::NotFound("none".into())),
            ScanError::DeviceUnavailable(_)
        ));
    }

    #[test]
    fn test_io_error_kinds() {
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(matches!(
            CameraError::from(denied),
            CameraError::PermissionDenied(_)
        ));

        let busy = std::io::Error::from(std::io::ErrorKind::ResourceBusy);
        assert_eq!(CameraError::from(busy), CameraError::Busy);
    }

    #[test]
    fn test_unsupported_message_is_distinct() {
        let unsupported = ScanError::CapabilityUnsupported.to_string();
        let denied = ScanError::PermissionDenied("x".into()).to_string();
        assert_ne!(unsupported, denied);
        assert!(unsupported.contains("not supported"));
    }
}
