// SPDX-License-Identifier: GPL-3.0-only

//! Output format and size negotiation
//!
//! A camera without a stream configuration map, or whose characteristics
//! cannot be read, reports no formats and no sizes. Callers treat that as
//! "unsupported" and stop the acquisition pipeline; it is never an error.

use super::CameraBackend;
use super::types::{CameraId, ImageFormat, Size, StreamConfigurationMap};
use tracing::{debug, info, warn};

fn stream_map(backend: &dyn CameraBackend, id: &CameraId) -> Option<StreamConfigurationMap> {
    match backend.camera_characteristics(id) {
        Ok(characteristics) => {
            if characteristics.stream_configuration_map.is_none() {
                debug!(camera_id = %id, "Camera reports no stream configuration map");
            }
            characteristics.stream_configuration_map
        }
        Err(e) => {
            warn!(camera_id = %id, error = %e, "Failed to read camera characteristics");
            None
        }
    }
}

/// Supported output pixel formats of a camera
pub fn supported_output_formats(backend: &dyn CameraBackend, id: &CameraId) -> Vec<ImageFormat> {
    stream_map(backend, id)
        .map(|map| map.output_formats())
        .unwrap_or_default()
}

/// Supported output sizes of a camera for one format
pub fn supported_output_sizes(
    backend: &dyn CameraBackend,
    id: &CameraId,
    format: ImageFormat,
) -> Vec<Size> {
    stream_map(backend, id)
        .map(|map| map.output_sizes(format))
        .unwrap_or_default()
}

/// Size with the largest pixel area; the first one wins on ties
pub fn max_area_size(sizes: &[Size]) -> Option<Size> {
    // Iterator::max_by_key keeps the last maximum, so fold explicitly
    sizes.iter().copied().fold(None, |best, size| match best {
        Some(b) if b.area() >= size.area() => Some(b),
        _ => Some(size),
    })
}

/// Formats and sizes of one camera, queried on demand
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputCapabilities {
    formats: Vec<ImageFormat>,
    sizes: Vec<(ImageFormat, Vec<Size>)>,
}

impl OutputCapabilities {
    pub fn query(backend: &dyn CameraBackend, id: &CameraId) -> Self {
        let Some(map) = stream_map(backend, id) else {
            return Self::default();
        };
        let formats = map.output_formats();
        let sizes = formats
            .iter()
            .map(|format| (*format, map.output_sizes(*format)))
            .collect();
        Self { formats, sizes }
    }

    pub fn formats(&self) -> &[ImageFormat] {
        &self.formats
    }

    pub fn sizes(&self, format: ImageFormat) -> &[Size] {
        self.sizes
            .iter()
            .find(|(f, _)| *f == format)
            .map(|(_, sizes)| sizes.as_slice())
            .unwrap_or(&[])
    }

    pub fn supports(&self, format: ImageFormat) -> bool {
        self.formats.contains(&format)
    }

    pub fn max_area(&self, format: ImageFormat) -> Option<Size> {
        max_area_size(self.sizes(format))
    }

    /// No formats at all: the platform gave us nothing to work with
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

/// Outcome of checking a camera against the pipeline's needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityCheck {
    /// All required formats present and the preview format has sizes
    Supported,
    /// Capability sets came back empty
    Unknown,
    /// These required formats are missing
    Missing(Vec<ImageFormat>),
}

impl CapabilityCheck {
    pub fn is_supported(&self) -> bool {
        matches!(self, CapabilityCheck::Supported)
    }
}

/// Formats a camera must offer before the preview pipeline starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRequirements {
    /// Every one of these must be a supported output format
    pub required_formats: Vec<ImageFormat>,
    /// Format whose size list sizes the preview surface
    pub preview_format: ImageFormat,
}

impl Default for CapabilityRequirements {
    fn default() -> Self {
        Self {
            required_formats: vec![ImageFormat::JPEG, ImageFormat::YUV_420_888],
            preview_format: ImageFormat::YUV_420_888,
        }
    }
}

impl CapabilityRequirements {
    pub fn check(&self, capabilities: &OutputCapabilities) -> CapabilityCheck {
        if capabilities.is_empty() || capabilities.sizes(self.preview_format).is_empty() {
            return CapabilityCheck::Unknown;
        }

        let missing: Vec<ImageFormat> = self
            .required_formats
            .iter()
            .copied()
            .filter(|format| !capabilities.supports(*format))
            .collect();

        if missing.is_empty() {
            CapabilityCheck::Supported
        } else {
            CapabilityCheck::Missing(missing)
        }
    }

    /// Query the backend and check in one step
    pub fn check_camera(&self, backend: &dyn CameraBackend, id: &CameraId) -> CapabilityCheck {
        let capabilities = OutputCapabilities::query(backend, id);
        let check = self.check(&capabilities);
        match &check {
            CapabilityCheck::Supported => {
                info!(camera_id = %id, formats = ?capabilities.formats(), "Required output formats supported");
            }
            CapabilityCheck::Unknown => {
                warn!(camera_id = %id, "Camera capabilities unknown, halting preview pipeline");
            }
            CapabilityCheck::Missing(missing) => {
                warn!(camera_id = %id, missing = ?missing, "Required output formats unsupported, halting preview pipeline");
            }
        }
        check
    }
}
