// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Scanning session timing
pub mod scan {
    use std::time::Duration;

    /// Detection loop polling period
    pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

    /// How long the "copied" confirmation stays visible
    pub const COPY_RESET_DELAY: Duration = Duration::from_millis(2000);
}

/// QR encoder defaults
pub mod encoder {
    /// Edge length of the rendered square, in pixels
    pub const SIZE: u32 = 300;

    /// Quiet zone around the symbol, in modules
    pub const MARGIN: u32 = 2;

    /// Scale used when the requested size is too small for the symbol
    pub const FALLBACK_SCALE: f64 = 4.0;

    /// Foreground (dark modules)
    pub const DARK_COLOR: &str = "#000000";

    /// Background (light modules and quiet zone)
    pub const LIGHT_COLOR: &str = "#FFFFFF";

    /// Prefix of the portable payload
    pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

    /// Name the downloaded artifact is delivered under
    pub const DOWNLOAD_FILE_NAME: &str = "qrcode.png";
}

/// Camera defaults
pub mod camera {
    /// Requested capture width
    pub const DEFAULT_WIDTH: u32 = 1280;

    /// Requested capture height
    pub const DEFAULT_HEIGHT: u32 = 720;

    /// Number of mmap buffers for V4L2 streaming
    pub const V4L2_BUFFER_COUNT: u32 = 4;

    /// Longest wait for a V4L2 buffer before the capture thread re-checks
    /// whether it was asked to quit
    pub const V4L2_DEQUEUE_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(200);

    /// Frame rate a still image is replayed at
    pub const FILE_SOURCE_FPS: u64 = 15;
}

/// Detector defaults
pub mod detector {
    /// Frames are downscaled so neither side exceeds this
    pub const MAX_DIMENSION: u32 = 640;

    /// Edge length of the smallest QR symbol (version 1) in modules
    pub const MIN_DIMENSION: u32 = 21;
}
