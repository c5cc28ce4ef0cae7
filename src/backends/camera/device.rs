// SPDX-License-Identifier: GPL-3.0-only

//! Device lifecycle of one camera handle
//!
//! ```text
//! Requesting ──▶ Opened ──┬──▶ Closing ──▶ Closed
//!                         ├──▶ Disconnected
//!                         └──▶ Errored(code)
//! ```
//!
//! The handle is dropped from the lifecycle before a new state is published,
//! so an observer that sees anything other than `Opened` never finds a
//! handle in [`DeviceLifecycle::device`]. Disconnected and errored devices
//! are closed right away and never reopened.

use super::capabilities::{CapabilityCheck, CapabilityRequirements, OutputCapabilities};
use super::executor::CallbackExecutor;
use super::types::{BackendResult, CameraId};
use super::{CameraBackend, CameraDevice, DeviceStateCallback};
use crate::app::state::PresentationState;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Observable state of the camera handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Open issued, waiting for the platform
    Requesting,
    /// Handle available
    Opened,
    /// Close requested, waiting for the platform to confirm
    Closing,
    /// Platform took the camera away
    Disconnected,
    /// Platform reported a device error; the code is passed through as is
    Errored(i32),
    /// Handle released
    Closed,
}

impl DeviceState {
    /// No further transitions will happen
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            DeviceState::Disconnected | DeviceState::Errored(_) | DeviceState::Closed
        )
    }
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceState::Requesting => write!(f, "requesting"),
            DeviceState::Opened => write!(f, "opened"),
            DeviceState::Closing => write!(f, "closing"),
            DeviceState::Disconnected => write!(f, "disconnected"),
            DeviceState::Errored(code) => write!(f, "error {}", code),
            DeviceState::Closed => write!(f, "closed"),
        }
    }
}

struct DeviceInner {
    device: Option<Arc<dyn CameraDevice>>,
    capabilities: Option<OutputCapabilities>,
    check: Option<CapabilityCheck>,
    close_requested: bool,
}

/// State callback of one open request
///
/// Only locked from the callback executor or the owning controller, so the
/// mutex is never contended.
pub struct DeviceLifecycle {
    camera_id: CameraId,
    backend: Arc<dyn CameraBackend>,
    requirements: CapabilityRequirements,
    presentation: PresentationState,
    inner: Mutex<DeviceInner>,
    state: watch::Sender<DeviceState>,
}

impl std::fmt::Debug for DeviceLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLifecycle")
            .field("camera_id", &self.camera_id)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl DeviceLifecycle {
    pub fn new(
        camera_id: CameraId,
        backend: Arc<dyn CameraBackend>,
        requirements: CapabilityRequirements,
        presentation: PresentationState,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(DeviceState::Requesting);
        Arc::new(Self {
            camera_id,
            backend,
            requirements,
            presentation,
            inner: Mutex::new(DeviceInner {
                device: None,
                capabilities: None,
                check: None,
                close_requested: false,
            }),
            state,
        })
    }

    /// Issue the open request; callbacks arrive on `executor`
    pub fn open(self: &Arc<Self>, executor: &CallbackExecutor) -> BackendResult<()> {
        info!(camera_id = %self.camera_id, "Opening camera");
        let callback: Arc<dyn DeviceStateCallback> = self.clone();
        if let Err(e) = self.backend.open_camera(&self.camera_id, callback, executor) {
            warn!(camera_id = %self.camera_id, error = %e, "Camera open refused");
            self.transition(DeviceState::Closed);
            return Err(e);
        }
        Ok(())
    }

    /// Request the handle be released
    ///
    /// A handle still in flight is closed as soon as it arrives.
    pub fn close(&self) {
        let device = {
            let mut inner = self.lock();
            if inner.close_requested {
                return;
            }
            inner.close_requested = true;
            inner.device.take()
        };

        let current = self.state();
        if !matches!(current, DeviceState::Requesting | DeviceState::Opened) {
            debug!(camera_id = %self.camera_id, state = %current, "Close ignored, device already released");
            return;
        }

        self.transition(DeviceState::Closing);
        self.presentation.set_surface_ready(false);
        if let Some(device) = device {
            device.close();
        }
    }

    pub fn camera_id(&self) -> &CameraId {
        &self.camera_id
    }

    /// The handle, only while `Opened`
    pub fn device(&self) -> Option<Arc<dyn CameraDevice>> {
        self.lock().device.clone()
    }

    /// Output capabilities queried when the camera opened
    pub fn capabilities(&self) -> Option<OutputCapabilities> {
        self.lock().capabilities.clone()
    }

    /// Outcome of the capability check, once the camera opened.
    ///
    /// Set no later than `surface_ready` is raised for a supported camera.
    pub fn capability_check(&self) -> Option<CapabilityCheck> {
        self.lock().check.clone()
    }

    pub fn state(&self) -> DeviceState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<DeviceState> {
        self.state.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DeviceInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, next: DeviceState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!(camera_id = %self.camera_id, from = %previous, to = %next, "Camera device state changed");
        }
    }

    /// Take the handle out and close it, then publish `next`
    fn release(&self, next: DeviceState) {
        let device = self.lock().device.take();
        self.transition(next);
        self.presentation.set_surface_ready(false);
        if let Some(device) = device {
            device.close();
        }
    }
}

impl DeviceStateCallback for DeviceLifecycle {
    fn on_opened(&self, device: Arc<dyn CameraDevice>) {
        {
            let mut inner = self.lock();
            if inner.close_requested {
                drop(inner);
                debug!(camera_id = %self.camera_id, "Camera opened after close was requested, closing it");
                device.close();
                return;
            }
            inner.device = Some(device);
            // Published under the lock so a racing close() always lands after it
            self.transition(DeviceState::Opened);
        }

        let capabilities = OutputCapabilities::query(self.backend.as_ref(), &self.camera_id);
        let check = self.requirements.check(&capabilities);
        match &check {
            CapabilityCheck::Supported => {}
            CapabilityCheck::Unknown => {
                warn!(camera_id = %self.camera_id, "Camera output capabilities unknown, preview halted");
            }
            CapabilityCheck::Missing(missing) => {
                warn!(camera_id = %self.camera_id, missing = ?missing, "Camera lacks required output formats, preview halted");
            }
        }

        let mut inner = self.lock();
        inner.capabilities = Some(capabilities);
        inner.check = Some(check.clone());
        if inner.close_requested {
            debug!(camera_id = %self.camera_id, "Camera closed during capability check");
            return;
        }
        if check.is_supported() {
            info!(camera_id = %self.camera_id, "Camera ready, surface can be built");
            self.presentation.set_surface_ready(true);
        }
    }

    fn on_disconnected(&self, id: &CameraId) {
        warn!(camera_id = %id, "Camera disconnected");
        self.release(DeviceState::Disconnected);
    }

    fn on_error(&self, id: &CameraId, error: i32) {
        warn!(camera_id = %id, error_code = error, "Camera device error");
        self.release(DeviceState::Errored(error));
    }

    fn on_closed(&self, id: &CameraId) {
        self.lock().device = None;
        // Disconnected and Errored keep the cause visible to observers
        if matches!(self.state(), DeviceState::Closing | DeviceState::Opened) {
            self.transition(DeviceState::Closed);
            self.presentation.set_surface_ready(false);
        } else {
            debug!(camera_id = %id, state = %self.state(), "Camera closed");
        }
    }
}
