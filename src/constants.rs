// SPDX-License-Identifier: GPL-3.0-only

//! Platform-defined codes shared by the backends and the metadata tables

/// Output pixel format codes reported by the stream configuration map
pub mod image_format {
    /// Compressed still image
    pub const JPEG: i32 = 0x100;
    /// Flexible 4:2:0 YUV, the continuous preview format
    pub const YUV_420_888: i32 = 0x23;
    /// Opaque format used by display surfaces
    pub const PRIVATE: i32 = 0x22;
    /// Single-channel raw Bayer data
    pub const RAW_SENSOR: i32 = 0x20;
    /// Legacy semi-planar YUV
    pub const NV21: i32 = 0x11;
}

/// Lens facing codes from the camera characteristics
pub mod lens_facing {
    pub const FRONT: i32 = 0;
    pub const BACK: i32 = 1;
    pub const EXTERNAL: i32 = 2;
}

/// Auto-exposure mode codes
pub mod ae_mode {
    pub const OFF: i32 = 0;
    pub const ON: i32 = 1;
    pub const ON_AUTO_FLASH: i32 = 2;
    pub const ON_ALWAYS_FLASH: i32 = 3;
    pub const ON_AUTO_FLASH_REDEYE: i32 = 4;
    pub const ON_EXTERNAL_FLASH: i32 = 5;
    pub const ON_LOW_LIGHT_BOOST_BRIGHTNESS_PRIORITY: i32 = 6;
}

/// Auto-white-balance mode codes
pub mod awb_mode {
    pub const OFF: i32 = 0;
    pub const AUTO: i32 = 1;
    pub const INCANDESCENT: i32 = 2;
    pub const FLUORESCENT: i32 = 3;
    pub const WARM_FLUORESCENT: i32 = 4;
    pub const DAYLIGHT: i32 = 5;
    pub const CLOUDY_DAYLIGHT: i32 = 6;
    pub const TWILIGHT: i32 = 7;
    pub const SHADE: i32 = 8;
}

/// Colour correction mode codes
pub mod color_correction_mode {
    pub const TRANSFORM_MATRIX: i32 = 0;
    pub const FAST: i32 = 1;
    pub const HIGH_QUALITY: i32 = 2;
}

/// Scene mode codes
pub mod scene_mode {
    pub const DISABLED: i32 = 0;
    pub const FACE_PRIORITY: i32 = 1;
    pub const ACTION: i32 = 2;
    pub const PORTRAIT: i32 = 3;
    pub const LANDSCAPE: i32 = 4;
    pub const NIGHT: i32 = 5;
    pub const NIGHT_PORTRAIT: i32 = 6;
    pub const THEATRE: i32 = 7;
    pub const BEACH: i32 = 8;
    pub const SNOW: i32 = 9;
    pub const SUNSET: i32 = 10;
    pub const STEADYPHOTO: i32 = 11;
    pub const FIREWORKS: i32 = 12;
    pub const SPORTS: i32 = 13;
    pub const PARTY: i32 = 14;
    pub const CANDLELIGHT: i32 = 15;
    pub const BARCODE: i32 = 16;
    /// Deprecated, never reported by current devices
    pub const HIGH_SPEED_VIDEO: i32 = 17;
    pub const HDR: i32 = 18;
}

/// Video stabilisation mode codes
pub mod video_stabilization_mode {
    pub const OFF: i32 = 0;
    pub const ON: i32 = 1;
    pub const PREVIEW_STABILIZATION: i32 = 2;
}

/// Device error codes delivered with the error callback.
///
/// These are surfaced to callers as-is and never interpreted.
pub mod device_error {
    pub const CAMERA_IN_USE: i32 = 1;
    pub const MAX_CAMERAS_IN_USE: i32 = 2;
    pub const CAMERA_DISABLED: i32 = 3;
    pub const CAMERA_DEVICE: i32 = 4;
    pub const CAMERA_SERVICE: i32 = 5;
}

/// Defaults for the capture pipeline
pub mod pipeline {
    /// Buffers held by the still-capture reader
    pub const STILL_CAPTURE_MAX_IMAGES: u32 = 1;
    /// Frame period of the simulated backend (~30 fps)
    pub const SIMULATED_FRAME_INTERVAL_MS: u64 = 33;
    /// Name of the camera callback worker thread
    pub const CALLBACK_EXECUTOR_NAME: &str = "camera-callbacks";
}

/// Permission identifier for camera access
pub const CAMERA_PERMISSION: &str = "android.permission.CAMERA";

/// Application version string (from git)
pub fn app_version() -> &'static str {
    env!("GIT_VERSION")
}
