// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::simulated::SimulatedCamera;
use crate::backends::camera::{CapabilityRequirements, ImageFormat, LensFacing};
use crate::constants::pipeline;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name under the user config directory
const CONFIG_DIR: &str = "rearcam";
const CONFIG_FILE: &str = "config.json";

/// Settings of the in-process camera service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Frame period of the periodic frame driver
    pub frame_interval_ms: u64,
    /// Cameras the service reports, in enumeration order
    pub cameras: Vec<SimulatedCamera>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            frame_interval_ms: pipeline::SIMULATED_FRAME_INTERVAL_MS,
            cameras: SimulatedCamera::default_set(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which camera to preview
    pub lens_facing: LensFacing,
    /// Output formats a camera must support before the preview starts
    pub required_formats: Vec<ImageFormat>,
    /// Format whose largest size sizes the preview surface
    pub preview_format: ImageFormat,
    /// Format of the still-capture reader
    pub still_capture_format: ImageFormat,
    /// Simulated camera service
    pub simulation: SimulationSettings,
}

impl Default for Config {
    fn default() -> Self {
        let requirements = CapabilityRequirements::default();
        Self {
            lens_facing: LensFacing::Back,
            required_formats: requirements.required_formats,
            preview_format: requirements.preview_format,
            still_capture_format: ImageFormat::JPEG,
            simulation: SimulationSettings::default(),
        }
    }
}

impl Config {
    /// `<config dir>/rearcam/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location, defaults when there is none
    pub fn load() -> AppResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No user config directory, using default configuration");
                Ok(Self::default())
            }
        }
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Save to the default location
    pub fn save(&self) -> AppResult<PathBuf> {
        let path = Self::default_path()
            .ok_or_else(|| AppError::Config("no user config directory".to_string()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Write pretty-printed JSON to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Capability requirements for the device lifecycle
    pub fn requirements(&self) -> CapabilityRequirements {
        CapabilityRequirements {
            required_formats: self.required_formats.clone(),
            preview_format: self.preview_format,
        }
    }
}
