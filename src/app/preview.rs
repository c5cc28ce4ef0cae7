// SPDX-License-Identifier: GPL-3.0-only

//! Preview controller
//!
//! Wires the permission flow, the camera device and the capture session to
//! the UI's rendering surface:
//!
//! 1. `start` checks the permission (or waits for `on_permission_result`)
//! 2. the rear camera is selected and opened; the device lifecycle raises
//!    `surface_ready` once the required formats are confirmed
//! 3. the UI builds a surface sized by `optimal_surface_size` and reports it
//!    through `on_surface_created`, which configures the capture session
//! 4. the session starts the repeating preview request and frame metadata
//!    flows into the presentation state

use crate::app::permissions::{PermissionFlow, PermissionGate, PermissionStatus};
use crate::app::state::{PresentationState, PresentationView};
use crate::backends::camera::{
    CameraBackendManager, CapabilityCheck, CaptureCallback, DeviceLifecycle, DeviceState,
    ImageFormat, LensFacing, OutputSurface, SessionLifecycle, SessionState, SessionTargets, Size,
};
use crate::constants::CAMERA_PERMISSION;
use crate::errors::{AppResult, CameraError, PermissionError, SessionError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Camera choice and output formats of the preview pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSettings {
    pub lens_facing: LensFacing,
    pub still_capture_format: ImageFormat,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            lens_facing: LensFacing::Back,
            still_capture_format: ImageFormat::JPEG,
        }
    }
}

#[derive(Default)]
struct ControllerInner {
    device: Option<Arc<DeviceLifecycle>>,
    session: Option<Arc<SessionLifecycle>>,
}

/// Drives one preview from permission check to running session
pub struct PreviewController {
    manager: CameraBackendManager,
    presentation: PresentationState,
    permissions: PermissionFlow,
    settings: PreviewSettings,
    inner: Mutex<ControllerInner>,
}

impl PreviewController {
    pub fn new(
        manager: CameraBackendManager,
        gate: Arc<dyn PermissionGate>,
        settings: PreviewSettings,
    ) -> Self {
        let presentation = PresentationState::new();
        Self {
            permissions: PermissionFlow::new(gate, presentation.clone()),
            manager,
            presentation,
            settings,
            inner: Mutex::new(ControllerInner::default()),
        }
    }

    /// Read-only view for the UI
    pub fn view(&self) -> PresentationView {
        self.presentation.subscribe()
    }

    pub fn permissions(&self) -> &PermissionFlow {
        &self.permissions
    }

    pub fn manager(&self) -> &CameraBackendManager {
        &self.manager
    }

    /// Check the permission and open the camera if it is already granted
    pub fn start(&self) -> AppResult<()> {
        if self.permissions.start() == Some(PermissionStatus::Granted) {
            self.acquire_camera()?;
        }
        Ok(())
    }

    /// Answer from the platform permission request
    pub fn on_permission_result(&self, granted: bool) -> AppResult<PermissionStatus> {
        let status = self
            .permissions
            .on_permission_result(CAMERA_PERMISSION, granted);
        if status == PermissionStatus::Granted {
            self.acquire_camera()?;
        }
        Ok(status)
    }

    /// Select the configured camera and issue the open request.
    ///
    /// Needs the permission granted. Reuses the current device unless it has
    /// already been released.
    pub fn acquire_camera(&self) -> AppResult<Arc<DeviceLifecycle>> {
        match self.presentation.flags().permission {
            Some(PermissionStatus::Granted) => {}
            Some(PermissionStatus::PermanentlyDenied) => {
                return Err(PermissionError::PermanentlyDenied.into());
            }
            _ => return Err(PermissionError::Denied.into()),
        }

        let current = self.lock().device.clone();
        if let Some(device) = current {
            if !device.state().is_final() && device.state() != DeviceState::Closing {
                debug!(camera_id = %device.camera_id(), "Camera already acquired");
                return Ok(device);
            }
        }

        let camera = self.manager.select_camera(self.settings.lens_facing)?;
        let device = self.manager.open(&camera, self.presentation.clone())?;
        self.lock().device = Some(Arc::clone(&device));
        Ok(device)
    }

    /// Largest output size of the preview format, zero without a device
    pub fn optimal_surface_size(&self) -> Size {
        let preview_format = self.manager.requirements().preview_format;
        self.lock()
            .device
            .as_ref()
            .and_then(|device| device.capabilities())
            .and_then(|capabilities| capabilities.max_area(preview_format))
            .unwrap_or(Size::ZERO)
    }

    /// The UI created its rendering surface: configure the capture session.
    ///
    /// Refused unless the camera is open and passed the capability check;
    /// nothing is allocated or submitted for a halted camera.
    pub fn on_surface_created(&self, surface: OutputSurface) -> AppResult<Arc<SessionLifecycle>> {
        let lifecycle = self.lock().device.clone().ok_or(CameraError::NotOpened)?;
        let camera_id = lifecycle.camera_id().to_string();
        match lifecycle.state() {
            DeviceState::Disconnected => return Err(CameraError::Disconnected(camera_id).into()),
            DeviceState::Errored(code) => {
                return Err(CameraError::DeviceError { id: camera_id, code }.into());
            }
            _ => {}
        }
        match lifecycle.capability_check() {
            Some(CapabilityCheck::Supported) => {}
            Some(CapabilityCheck::Missing(missing)) => {
                warn!(camera_id = %camera_id, missing = ?missing, "Surface refused, camera lacks required formats");
                return Err(CameraError::CapabilityUnsupported(missing).into());
            }
            Some(CapabilityCheck::Unknown) => {
                warn!(camera_id = %camera_id, "Surface refused, camera capabilities unknown");
                return Err(CameraError::CapabilityUnsupported(Vec::new()).into());
            }
            None => return Err(CameraError::NotOpened.into()),
        }
        let device = lifecycle.device().ok_or(CameraError::NotOpened)?;

        info!(surface = %surface.id, size = %surface.size, "Preview surface created");

        let still = self
            .manager
            .create_still_reader(surface.size, self.settings.still_capture_format)?;
        let targets = SessionTargets::new(surface, still);

        let previous = self.lock().session.take();
        if let Some(previous) = previous {
            previous.close();
        }

        let session = SessionLifecycle::configure(
            device.as_ref(),
            targets,
            self.presentation.clone(),
            self.manager.executor(),
        )?;
        self.lock().session = Some(Arc::clone(&session));
        Ok(session)
    }

    pub fn on_surface_changed(&self, size: Size) {
        debug!(size = %size, "Preview surface changed");
    }

    /// The rendering surface is gone: stop the session
    pub fn on_surface_destroyed(&self) {
        info!("Preview surface destroyed");
        let session = self.lock().session.take();
        if let Some(session) = session {
            session.close();
        }
    }

    /// One-shot still capture into the still-capture reader
    pub fn capture_still(&self, callback: Arc<dyn CaptureCallback>) -> AppResult<i32> {
        let session = self
            .lock()
            .session
            .clone()
            .ok_or(SessionError::NotConfigured)?;
        session.capture_still(callback)
    }

    pub fn device_state(&self) -> Option<DeviceState> {
        self.lock().device.as_ref().map(|device| device.state())
    }

    /// Capability check of the opened camera, `None` until it opened
    pub fn capability_check(&self) -> Option<CapabilityCheck> {
        self.lock()
            .device
            .as_ref()
            .and_then(|device| device.capability_check())
    }

    pub fn session_state(&self) -> Option<SessionState> {
        self.lock().session.as_ref().map(|session| session.state())
    }

    /// Close the session and the device
    pub fn shutdown(&self) {
        let (session, device) = {
            let mut inner = self.lock();
            (inner.session.take(), inner.device.take())
        };
        if let Some(session) = session {
            session.close();
        }
        if let Some(device) = device {
            device.close();
        }
        info!("Preview controller shut down");
    }

    fn lock(&self) -> MutexGuard<'_, ControllerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
