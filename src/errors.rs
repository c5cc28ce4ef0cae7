// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the rear camera application

use crate::backends::camera::types::{BackendError, ImageFormat, LensFacing};
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Camera discovery and device errors
    Camera(CameraError),
    /// Capture session errors
    Session(SessionError),
    /// Runtime permission errors
    Permission(PermissionError),
    /// Platform camera service errors
    Backend(BackendError),
    /// Configuration errors
    Config(String),
}

/// Camera-specific errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// Enumeration returned nothing usable for this facing
    NoCameraWithFacing(LensFacing),
    /// Enumeration itself failed
    EnumerationFailed(String),
    /// Operation needs an opened camera
    NotOpened,
    /// Camera lacks a required output format or has none at all
    CapabilityUnsupported(Vec<ImageFormat>),
    /// Camera disconnected during operation
    Disconnected(String),
    /// Platform reported a device error code
    DeviceError { id: String, code: i32 },
}

/// Capture session errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Operation needs a configured session
    NotConfigured,
    /// Platform rejected the output configuration or the preview request
    ConfigureFailed,
}

/// Runtime permission errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// User declined the camera permission
    Denied,
    /// User declined and asked not to be asked again
    PermanentlyDenied,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Session(e) => write!(f, "Session error: {}", e),
            AppError::Permission(e) => write!(f, "Permission error: {}", e),
            AppError::Backend(e) => write!(f, "Backend error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::NoCameraWithFacing(facing) => write!(f, "No {} camera found", facing),
            CameraError::EnumerationFailed(msg) => write!(f, "Camera enumeration failed: {}", msg),
            CameraError::NotOpened => write!(f, "Camera not opened"),
            CameraError::CapabilityUnsupported(missing) if missing.is_empty() => {
                write!(f, "Camera capabilities unknown")
            }
            CameraError::CapabilityUnsupported(missing) => {
                let names: Vec<String> = missing.iter().map(|format| format.to_string()).collect();
                write!(f, "Unsupported output formats: {}", names.join(", "))
            }
            CameraError::Disconnected(id) => write!(f, "Camera {} disconnected", id),
            CameraError::DeviceError { id, code } => {
                write!(f, "Camera {} reported error {}", id, code)
            }
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotConfigured => write!(f, "Capture session not configured"),
            SessionError::ConfigureFailed => write!(f, "Capture session configuration failed"),
        }
    }
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionError::Denied => write!(f, "Camera permission denied"),
            PermissionError::PermanentlyDenied => {
                write!(f, "Camera permission permanently denied")
            }
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}
impl std::error::Error for SessionError {}
impl std::error::Error for PermissionError {}

// Conversions from sub-errors to AppError
impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<PermissionError> for AppError {
    fn from(err: PermissionError) -> Self {
        AppError::Permission(err)
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Backend(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
