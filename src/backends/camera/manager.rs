// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend manager
//!
//! The manager provides:
//! - Camera enumeration as fresh snapshots
//! - Selection by lens facing
//! - Open requests wired to the shared callback executor

use super::capabilities::{CapabilityRequirements, OutputCapabilities};
use super::device::DeviceLifecycle;
use super::executor::CallbackExecutor;
use super::selection::select_by_facing;
use super::types::*;
use super::CameraBackend;
use crate::app::state::PresentationState;
use crate::constants::pipeline;
use crate::errors::{AppResult, CameraError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Camera backend manager
///
/// Cheap to clone; clones share the backend and the callback executor.
#[derive(Clone)]
pub struct CameraBackendManager {
    backend: Arc<dyn CameraBackend>,
    executor: CallbackExecutor,
    requirements: CapabilityRequirements,
}

impl CameraBackendManager {
    /// Create a manager with its own callback executor
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        requirements: CapabilityRequirements,
    ) -> std::io::Result<Self> {
        let executor = CallbackExecutor::new(pipeline::CALLBACK_EXECUTOR_NAME)?;
        Ok(Self::with_executor(backend, executor, requirements))
    }

    pub fn with_executor(
        backend: Arc<dyn CameraBackend>,
        executor: CallbackExecutor,
        requirements: CapabilityRequirements,
    ) -> Self {
        info!(executor = %executor.name(), "Creating camera backend manager");
        Self {
            backend,
            executor,
            requirements,
        }
    }

    pub fn backend(&self) -> &Arc<dyn CameraBackend> {
        &self.backend
    }

    pub fn executor(&self) -> &CallbackExecutor {
        &self.executor
    }

    pub fn requirements(&self) -> &CapabilityRequirements {
        &self.requirements
    }

    /// Enumerate the cameras available right now.
    ///
    /// A camera whose characteristics cannot be read is listed without a
    /// facing.
    pub fn enumerate_cameras(&self) -> AppResult<Vec<CameraIdentity>> {
        let ids = self
            .backend
            .camera_id_list()
            .map_err(|e| CameraError::EnumerationFailed(e.to_string()))?;

        let cameras: Vec<CameraIdentity> = ids
            .into_iter()
            .map(|id| {
                let facing = match self.backend.camera_characteristics(&id) {
                    Ok(characteristics) => characteristics.lens_facing.and_then(LensFacing::from_code),
                    Err(e) => {
                        warn!(camera_id = %id, error = %e, "Failed to read camera characteristics");
                        None
                    }
                };
                CameraIdentity::new(id, facing)
            })
            .collect();

        debug!(count = cameras.len(), "Enumerated cameras");
        Ok(cameras)
    }

    /// First camera with `facing` in a fresh enumeration
    pub fn select_camera(&self, facing: LensFacing) -> AppResult<CameraIdentity> {
        let cameras = self.enumerate_cameras()?;
        Ok(select_by_facing(&cameras, facing)?.clone())
    }

    /// Supported formats and sizes of one camera
    pub fn capabilities(&self, id: &CameraId) -> OutputCapabilities {
        OutputCapabilities::query(self.backend.as_ref(), id)
    }

    /// Issue an open request; the returned lifecycle reports the outcome
    pub fn open(
        &self,
        camera: &CameraIdentity,
        presentation: PresentationState,
    ) -> AppResult<Arc<DeviceLifecycle>> {
        let lifecycle = DeviceLifecycle::new(
            camera.id.clone(),
            Arc::clone(&self.backend),
            self.requirements.clone(),
            presentation,
        );
        lifecycle.open(&self.executor)?;
        Ok(lifecycle)
    }

    /// Buffer surface for still captures
    pub fn create_still_reader(&self, size: Size, format: ImageFormat) -> AppResult<OutputSurface> {
        Ok(self
            .backend
            .create_image_reader(size, format, pipeline::STILL_CAPTURE_MAX_IMAGES)?)
    }

    /// Stop the callback executor after the callbacks already queued
    pub fn shutdown(&self) {
        info!("Shutting down camera backend manager");
        self.executor.shutdown();
    }
}
