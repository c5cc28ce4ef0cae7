// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::constants::{image_format, lens_facing};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Platform-assigned camera identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraId(String);

impl CameraId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CameraId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CameraId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Physical orientation of a camera relative to the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LensFacing {
    /// Same side as the screen
    Front,
    /// Opposite side of the screen
    #[default]
    Back,
    /// Detachable or USB camera
    External,
}

impl LensFacing {
    /// Map the platform facing code, `None` for codes this build does not know
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            lens_facing::FRONT => Some(LensFacing::Front),
            lens_facing::BACK => Some(LensFacing::Back),
            lens_facing::EXTERNAL => Some(LensFacing::External),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            LensFacing::Front => lens_facing::FRONT,
            LensFacing::Back => lens_facing::BACK,
            LensFacing::External => lens_facing::EXTERNAL,
        }
    }
}

impl std::fmt::Display for LensFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LensFacing::Front => write!(f, "front"),
            LensFacing::Back => write!(f, "rear"),
            LensFacing::External => write!(f, "external"),
        }
    }
}

/// One entry of a camera enumeration
///
/// A read-only snapshot: a new enumeration produces new identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraIdentity {
    pub id: CameraId,
    /// `None` when the platform does not report a (known) facing
    pub facing: Option<LensFacing>,
}

impl CameraIdentity {
    pub fn new(id: impl Into<CameraId>, facing: Option<LensFacing>) -> Self {
        Self {
            id: id.into(),
            facing,
        }
    }
}

impl From<String> for CameraId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Output resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0,
        height: 0,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel count, widened so large sensors cannot overflow
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Output pixel format code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageFormat(pub i32);

impl ImageFormat {
    pub const JPEG: ImageFormat = ImageFormat(image_format::JPEG);
    pub const YUV_420_888: ImageFormat = ImageFormat(image_format::YUV_420_888);
    pub const PRIVATE: ImageFormat = ImageFormat(image_format::PRIVATE);
    pub const RAW_SENSOR: ImageFormat = ImageFormat(image_format::RAW_SENSOR);
    pub const NV21: ImageFormat = ImageFormat(image_format::NV21);

    pub fn code(&self) -> i32 {
        self.0
    }

    /// Human-readable name for known formats
    pub fn name(&self) -> Option<&'static str> {
        match self.0 {
            image_format::JPEG => Some("JPEG"),
            image_format::YUV_420_888 => Some("YUV_420_888"),
            image_format::PRIVATE => Some("PRIVATE"),
            image_format::RAW_SENSOR => Some("RAW_SENSOR"),
            image_format::NV21 => Some("NV21"),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:x}", self.0),
        }
    }
}

/// Supported output streams of a camera, in platform order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfigurationMap {
    streams: Vec<StreamConfiguration>,
}

/// Sizes offered for one output format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfiguration {
    pub format: ImageFormat,
    pub sizes: Vec<Size>,
}

impl StreamConfigurationMap {
    pub fn new(streams: Vec<StreamConfiguration>) -> Self {
        Self { streams }
    }

    /// Supported output formats, first occurrence order
    pub fn output_formats(&self) -> Vec<ImageFormat> {
        let mut formats: Vec<ImageFormat> = Vec::with_capacity(self.streams.len());
        for stream in &self.streams {
            if !formats.contains(&stream.format) {
                formats.push(stream.format);
            }
        }
        formats
    }

    /// Supported output sizes for `format`, empty when the format is absent
    pub fn output_sizes(&self, format: ImageFormat) -> Vec<Size> {
        self.streams
            .iter()
            .filter(|s| s.format == format)
            .flat_map(|s| s.sizes.iter().copied())
            .collect()
    }

    pub fn streams(&self) -> &[StreamConfiguration] {
        &self.streams
    }
}

/// Static properties of a camera
#[derive(Debug, Clone, Default)]
pub struct CameraCharacteristics {
    /// Raw lens facing code
    pub lens_facing: Option<i32>,
    /// Stream configuration map, absent on some devices
    pub stream_configuration_map: Option<StreamConfigurationMap>,
}

/// Opaque identifier of a surface frames can be delivered into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// A surface a capture session can output into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSurface {
    pub id: SurfaceId,
    pub size: Size,
    pub format: ImageFormat,
}

/// What a session output is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputRole {
    /// Continuous preview rendered by the UI
    Preview,
    /// Still photo buffer
    StillCapture,
}

impl std::fmt::Display for OutputRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputRole::Preview => write!(f, "preview"),
            OutputRole::StillCapture => write!(f, "still-capture"),
        }
    }
}

/// Named outputs of a capture session
///
/// Targets are always addressed by role. `iter` yields them in the order
/// they are handed to the platform: preview first, still capture second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTargets {
    pub preview: OutputSurface,
    pub still_capture: OutputSurface,
}

impl SessionTargets {
    pub fn new(preview: OutputSurface, still_capture: OutputSurface) -> Self {
        Self {
            preview,
            still_capture,
        }
    }

    pub fn get(&self, role: OutputRole) -> &OutputSurface {
        match role {
            OutputRole::Preview => &self.preview,
            OutputRole::StillCapture => &self.still_capture,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (OutputRole, &OutputSurface)> {
        [
            (OutputRole::Preview, &self.preview),
            (OutputRole::StillCapture, &self.still_capture),
        ]
        .into_iter()
    }

    pub fn contains(&self, surface: SurfaceId) -> bool {
        self.preview.id == surface || self.still_capture.id == surface
    }
}

/// Request template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTemplate {
    Preview,
    StillCapture,
}

/// A capture instruction against one or more session outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub template: RequestTemplate,
    pub targets: Vec<SurfaceId>,
}

impl CaptureRequest {
    pub fn new(template: RequestTemplate) -> Self {
        Self {
            template,
            targets: Vec::new(),
        }
    }

    pub fn with_target(mut self, surface: SurfaceId) -> Self {
        if !self.targets.contains(&surface) {
            self.targets.push(surface);
        }
        self
    }
}

/// Keys of per-frame result fields read by the metadata extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKey {
    /// Exposure time in nanoseconds
    SensorExposureTime,
    /// ISO sensitivity
    SensorSensitivity,
    ControlAeMode,
    ControlAwbMode,
    ColorCorrectionMode,
    ControlSceneMode,
    ControlVideoStabilizationMode,
}

/// The platform's report of one completed frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureResult {
    pub frame_number: u64,
    values: HashMap<ResultKey, i64>,
}

impl CaptureResult {
    pub fn new(frame_number: u64) -> Self {
        Self {
            frame_number,
            values: HashMap::new(),
        }
    }

    pub fn set(&mut self, key: ResultKey, value: i64) {
        self.values.insert(key, value);
    }

    pub fn with(mut self, key: ResultKey, value: i64) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: ResultKey) -> Option<i64> {
        self.values.get(&key).copied()
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Camera id not known to the platform
    DeviceNotFound(String),
    /// Camera already opened by this or a higher-priority client
    DeviceBusy(String),
    /// Handle or session used after it was closed
    Closed(String),
    /// Request targets a surface the session was not configured with
    InvalidTarget(SurfaceId),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::DeviceNotFound(id) => write!(f, "Camera not found: {}", id),
            BackendError::DeviceBusy(id) => write!(f, "Camera is busy: {}", id),
            BackendError::Closed(what) => write!(f, "Already closed: {}", what),
            BackendError::InvalidTarget(surface) => {
                write!(f, "Request target not part of the session: {}", surface)
            }
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lens_facing_codes() {
        assert_eq!(LensFacing::from_code(1), Some(LensFacing::Back));
        assert_eq!(LensFacing::from_code(0), Some(LensFacing::Front));
        assert_eq!(LensFacing::from_code(2), Some(LensFacing::External));
        assert_eq!(LensFacing::from_code(7), None);
        assert_eq!(LensFacing::Back.code(), 1);
    }

    #[test]
    fn test_stream_map_lookup() {
        let map = StreamConfigurationMap::new(vec![
            StreamConfiguration {
                format: ImageFormat::YUV_420_888,
                sizes: vec![Size::new(640, 480), Size::new(1920, 1080)],
            },
            StreamConfiguration {
                format: ImageFormat::JPEG,
                sizes: vec![Size::new(4032, 3024)],
            },
        ]);

        assert_eq!(
            map.output_formats(),
            vec![ImageFormat::YUV_420_888, ImageFormat::JPEG]
        );
        assert_eq!(map.output_sizes(ImageFormat::JPEG), vec![Size::new(4032, 3024)]);
        assert!(map.output_sizes(ImageFormat::RAW_SENSOR).is_empty());
    }

    #[test]
    fn test_session_targets_order() {
        let preview = OutputSurface {
            id: SurfaceId(1),
            size: Size::new(1920, 1080),
            format: ImageFormat::PRIVATE,
        };
        let still = OutputSurface {
            id: SurfaceId(2),
            size: Size::new(1920, 1080),
            format: ImageFormat::JPEG,
        };
        let targets = SessionTargets::new(preview, still);

        let roles: Vec<OutputRole> = targets.iter().map(|(role, _)| role).collect();
        assert_eq!(roles, vec![OutputRole::Preview, OutputRole::StillCapture]);
        assert_eq!(targets.get(OutputRole::StillCapture).id, SurfaceId(2));
        assert!(targets.contains(SurfaceId(1)));
        assert!(!targets.contains(SurfaceId(3)));
    }

    #[test]
    fn test_image_format_display() {
        assert_eq!(ImageFormat::JPEG.to_string(), "JPEG");
        assert_eq!(ImageFormat(0x99).to_string(), "0x99");
    }
}
