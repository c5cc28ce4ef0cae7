// SPDX-License-Identifier: GPL-3.0-only
// Camera backend with trait-based abstraction over the platform camera service

//! Camera backend abstraction
//!
//! The platform camera service is asynchronous and callback driven: opening a
//! camera and configuring a session return immediately, and the outcome is
//! delivered later through callback objects on the [`CallbackExecutor`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │   PreviewController  │  ← permission, surface and session wiring
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │ CameraBackendManager │  ← enumeration, selection, open
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐      ┌──────────────────────────────┐
//! │  CameraBackend trait │ ───▶ │ DeviceLifecycle              │
//! └──────────┬───────────┘      │ SessionLifecycle             │
//!            │                  │ MetadataPublisher (callbacks)│
//!            ▼                  └──────────────────────────────┘
//!      ┌───────────┐
//!      │ Simulated │  ← in-process implementation
//!      └───────────┘
//! ```

pub mod capabilities;
pub mod device;
pub mod executor;
pub mod manager;
pub mod metadata;
pub mod repeating;
pub mod selection;
pub mod session;
pub mod simulated;
pub mod types;

pub use capabilities::{CapabilityCheck, CapabilityRequirements, OutputCapabilities};
pub use device::{DeviceLifecycle, DeviceState};
pub use executor::CallbackExecutor;
pub use manager::CameraBackendManager;
pub use metadata::{FrameMetadata, MetadataPublisher};
pub use session::{SessionLifecycle, SessionState};
pub use types::*;

use std::sync::Arc;

/// Platform camera service
///
/// Implementations must deliver every callback through the executor passed
/// to `open_camera` / `create_capture_session`, never inline from the call.
pub trait CameraBackend: Send + Sync {
    /// Identifiers of the cameras currently available, in platform order
    fn camera_id_list(&self) -> BackendResult<Vec<CameraId>>;

    /// Static properties of one camera
    fn camera_characteristics(&self, id: &CameraId) -> BackendResult<CameraCharacteristics>;

    /// Ask the platform to open a camera.
    ///
    /// `Ok` only means the request was accepted; the outcome arrives as
    /// `on_opened`, `on_disconnected` or `on_error` on `callback`.
    fn open_camera(
        &self,
        id: &CameraId,
        callback: Arc<dyn DeviceStateCallback>,
        executor: &CallbackExecutor,
    ) -> BackendResult<()>;

    /// Allocate a memory buffer surface (used for still capture)
    fn create_image_reader(
        &self,
        size: Size,
        format: ImageFormat,
        max_images: u32,
    ) -> BackendResult<OutputSurface>;
}

/// An opened camera
pub trait CameraDevice: Send + Sync {
    fn id(&self) -> &CameraId;

    /// Configure a capture session; the outcome arrives on the config's
    /// callback. Any previous session of this device is closed.
    fn create_capture_session(&self, config: SessionConfiguration) -> BackendResult<()>;

    /// Release the camera; `on_closed` follows on the device callback
    fn close(&self);
}

/// A configured capture session
pub trait CaptureSession: Send + Sync {
    /// Install `request` as the repeating request, replacing any previous
    /// one. Returns the platform sequence id.
    fn set_repeating_request(
        &self,
        request: CaptureRequest,
        callback: Arc<dyn CaptureCallback>,
    ) -> BackendResult<i32>;

    /// Submit a one-shot request. Returns the platform sequence id.
    fn capture(&self, request: CaptureRequest, callback: Arc<dyn CaptureCallback>)
    -> BackendResult<i32>;

    /// Tear the session down, ending the repeating request
    fn close(&self);
}

/// Everything needed to configure a capture session
pub struct SessionConfiguration {
    pub targets: SessionTargets,
    pub callback: Arc<dyn SessionStateCallback>,
    pub executor: CallbackExecutor,
}

/// Device state events, one method per transition
pub trait DeviceStateCallback: Send + Sync {
    fn on_opened(&self, device: Arc<dyn CameraDevice>);
    fn on_disconnected(&self, id: &CameraId);
    fn on_error(&self, id: &CameraId, error: i32);
    fn on_closed(&self, id: &CameraId);
}

/// Session state events
pub trait SessionStateCallback: Send + Sync {
    fn on_configured(&self, session: Arc<dyn CaptureSession>);
    fn on_configure_failed(&self);
    /// Session torn down by the platform or by its device closing
    fn on_closed(&self) {}
}

/// Per-request completion events
pub trait CaptureCallback: Send + Sync {
    fn on_capture_completed(&self, request: &CaptureRequest, result: &CaptureResult);
}
