// SPDX-License-Identifier: GPL-3.0-only

//! In-process camera service
//!
//! Implements [`CameraBackend`] without hardware. Cameras, their stream
//! maps and their per-frame values are plain data (and can come from the
//! configuration file). Frames are produced either on demand with
//! [`SimulatedBackend::tick`] or by a [`RepeatingLoop`] per session.
//!
//! Faults can be injected with [`SimulatedBackend::disconnect`] and
//! [`SimulatedBackend::raise_error`]. Every submitted request is recorded
//! and available from [`SimulatedBackend::submitted_requests`].

use super::executor::CallbackExecutor;
use super::repeating::{LoopAction, RepeatingLoop};
use super::types::*;
use super::{
    CameraBackend, CameraDevice, CaptureCallback, CaptureSession, DeviceStateCallback,
    SessionConfiguration, SessionStateCallback,
};
use crate::constants::{
    ae_mode, awb_mode, color_correction_mode, lens_facing, scene_mode, video_stabilization_mode,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Values reported for every simulated frame; `None` leaves the key out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedFrame {
    pub sensitivity: Option<i64>,
    pub exposure_time_ns: Option<i64>,
    pub ae_mode: Option<i64>,
    pub awb_mode: Option<i64>,
    pub color_correction_mode: Option<i64>,
    pub scene_mode: Option<i64>,
    pub video_stabilization_mode: Option<i64>,
}

impl Default for SimulatedFrame {
    fn default() -> Self {
        Self {
            sensitivity: Some(800),
            exposure_time_ns: Some(16_666_666),
            ae_mode: Some(ae_mode::ON as i64),
            awb_mode: Some(awb_mode::AUTO as i64),
            color_correction_mode: Some(color_correction_mode::FAST as i64),
            scene_mode: Some(scene_mode::DISABLED as i64),
            video_stabilization_mode: Some(video_stabilization_mode::OFF as i64),
        }
    }
}

impl SimulatedFrame {
    fn to_result(&self, frame_number: u64) -> CaptureResult {
        let fields = [
            (ResultKey::SensorSensitivity, self.sensitivity),
            (ResultKey::SensorExposureTime, self.exposure_time_ns),
            (ResultKey::ControlAeMode, self.ae_mode),
            (ResultKey::ControlAwbMode, self.awb_mode),
            (ResultKey::ColorCorrectionMode, self.color_correction_mode),
            (ResultKey::ControlSceneMode, self.scene_mode),
            (
                ResultKey::ControlVideoStabilizationMode,
                self.video_stabilization_mode,
            ),
        ];
        let mut result = CaptureResult::new(frame_number);
        for (key, value) in fields {
            if let Some(value) = value {
                result.set(key, value);
            }
        }
        result
    }
}

/// One simulated camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedCamera {
    pub id: CameraId,
    /// Raw facing code, `None` when the camera reports none
    pub lens_facing: Option<i32>,
    /// `None` models a camera without a stream configuration map
    pub streams: Option<Vec<StreamConfiguration>>,
    /// Device error code delivered instead of a successful open
    #[serde(default)]
    pub open_error: Option<i32>,
    /// Reject every session configuration
    #[serde(default)]
    pub fail_session_configure: bool,
    #[serde(default)]
    pub frame: SimulatedFrame,
}

impl SimulatedCamera {
    /// Camera with a typical phone sensor stream map
    pub fn new(id: &str, facing: LensFacing) -> Self {
        Self {
            id: CameraId::new(id),
            lens_facing: Some(facing.code()),
            streams: Some(default_streams()),
            open_error: None,
            fail_session_configure: false,
            frame: SimulatedFrame::default(),
        }
    }

    pub fn with_facing_code(mut self, code: Option<i32>) -> Self {
        self.lens_facing = code;
        self
    }

    pub fn without_stream_map(mut self) -> Self {
        self.streams = None;
        self
    }

    pub fn with_streams(mut self, streams: Vec<StreamConfiguration>) -> Self {
        self.streams = Some(streams);
        self
    }

    pub fn with_open_error(mut self, code: i32) -> Self {
        self.open_error = Some(code);
        self
    }

    pub fn with_failing_session(mut self) -> Self {
        self.fail_session_configure = true;
        self
    }

    pub fn with_frame(mut self, frame: SimulatedFrame) -> Self {
        self.frame = frame;
        self
    }

    /// A front and a rear camera, front first as many phones list them
    pub fn default_set() -> Vec<SimulatedCamera> {
        vec![
            SimulatedCamera::new("1", LensFacing::Front),
            SimulatedCamera::new("0", LensFacing::Back),
        ]
    }

    fn characteristics(&self) -> CameraCharacteristics {
        CameraCharacteristics {
            lens_facing: self.lens_facing,
            stream_configuration_map: self.streams.clone().map(StreamConfigurationMap::new),
        }
    }
}

fn default_streams() -> Vec<StreamConfiguration> {
    vec![
        StreamConfiguration {
            format: ImageFormat::YUV_420_888,
            sizes: vec![
                Size::new(640, 480),
                Size::new(1280, 720),
                Size::new(1920, 1080),
                Size::new(4032, 3024),
            ],
        },
        StreamConfiguration {
            format: ImageFormat::JPEG,
            sizes: vec![Size::new(4032, 3024), Size::new(1920, 1080)],
        },
        StreamConfiguration {
            format: ImageFormat::PRIVATE,
            sizes: vec![Size::new(1920, 1080), Size::new(1280, 720)],
        },
    ]
}

/// How frames of a repeating request are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDriver {
    /// Only on [`SimulatedBackend::tick`]
    Manual,
    /// Continuously, one frame per interval
    Periodic(Duration),
}

/// Whether a request was installed as repeating or captured once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    Repeating,
    OneShot,
}

/// Record of one request handed to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedRequest {
    pub camera_id: CameraId,
    pub kind: SubmissionKind,
    pub sequence_id: i32,
    pub request: CaptureRequest,
}

#[derive(Default)]
struct Registry {
    devices: Vec<Weak<SimulatedDevice>>,
    sessions: Vec<Weak<SimulatedSession>>,
    readers: Vec<OutputSurface>,
    submitted: Vec<SubmittedRequest>,
    next_surface: u64,
    next_sequence: i32,
}

type SharedRegistry = Arc<Mutex<Registry>>;

fn lock_registry(registry: &SharedRegistry) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Camera service backed by [`SimulatedCamera`] descriptions
#[derive(Clone)]
pub struct SimulatedBackend {
    cameras: Arc<Vec<SimulatedCamera>>,
    driver: FrameDriver,
    registry: SharedRegistry,
}

impl SimulatedBackend {
    /// Backend delivering frames on [`tick`](Self::tick) only
    pub fn new(cameras: Vec<SimulatedCamera>) -> Self {
        Self::with_driver(cameras, FrameDriver::Manual)
    }

    pub fn with_driver(cameras: Vec<SimulatedCamera>, driver: FrameDriver) -> Self {
        Self {
            cameras: Arc::new(cameras),
            driver,
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    pub fn cameras(&self) -> &[SimulatedCamera] {
        &self.cameras
    }

    /// Stand-in for the UI's rendering surface
    pub fn create_preview_surface(&self, size: Size) -> OutputSurface {
        let id = allocate_surface(&self.registry);
        debug!(surface = %id, size = %size, "Created preview surface");
        OutputSurface {
            id,
            size,
            format: ImageFormat::PRIVATE,
        }
    }

    /// Deliver one frame for every active repeating request.
    ///
    /// Returns how many sessions produced a frame.
    pub fn tick(&self) -> usize {
        let sessions: Vec<Arc<SimulatedSession>> = {
            let mut registry = lock_registry(&self.registry);
            registry.sessions.retain(|s| s.strong_count() > 0);
            registry.sessions.iter().filter_map(Weak::upgrade).collect()
        };
        sessions.iter().filter(|s| s.deliver_frame()).count()
    }

    /// Platform takes the camera away; returns false if it was not open
    pub fn disconnect(&self, id: &CameraId) -> bool {
        match self.open_device(id) {
            Some(device) => {
                info!(camera_id = %id, "Simulating camera disconnect");
                device.fail(DeviceFault::Disconnected);
                true
            }
            None => false,
        }
    }

    /// Platform reports a device error; returns false if it was not open
    pub fn raise_error(&self, id: &CameraId, code: i32) -> bool {
        match self.open_device(id) {
            Some(device) => {
                info!(camera_id = %id, error_code = code, "Simulating camera error");
                device.fail(DeviceFault::Error(code));
                true
            }
            None => false,
        }
    }

    /// Every request submitted so far, in submission order
    pub fn submitted_requests(&self) -> Vec<SubmittedRequest> {
        lock_registry(&self.registry).submitted.clone()
    }

    /// Image readers created so far
    pub fn image_readers(&self) -> Vec<OutputSurface> {
        lock_registry(&self.registry).readers.clone()
    }

    /// Devices currently open
    pub fn open_device_count(&self) -> usize {
        let registry = lock_registry(&self.registry);
        registry
            .devices
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|d| d.is_open())
            .count()
    }

    fn open_device(&self, id: &CameraId) -> Option<Arc<SimulatedDevice>> {
        let registry = lock_registry(&self.registry);
        registry
            .devices
            .iter()
            .filter_map(Weak::upgrade)
            .find(|d| d.id == *id && d.is_open())
    }

    fn camera(&self, id: &CameraId) -> BackendResult<&SimulatedCamera> {
        self.cameras
            .iter()
            .find(|c| c.id == *id)
            .ok_or_else(|| BackendError::DeviceNotFound(id.to_string()))
    }
}

fn allocate_surface(registry: &SharedRegistry) -> SurfaceId {
    let mut registry = lock_registry(registry);
    registry.next_surface += 1;
    SurfaceId(registry.next_surface)
}

impl CameraBackend for SimulatedBackend {
    fn camera_id_list(&self) -> BackendResult<Vec<CameraId>> {
        Ok(self.cameras.iter().map(|c| c.id.clone()).collect())
    }

    fn camera_characteristics(&self, id: &CameraId) -> BackendResult<CameraCharacteristics> {
        Ok(self.camera(id)?.characteristics())
    }

    fn open_camera(
        &self,
        id: &CameraId,
        callback: Arc<dyn DeviceStateCallback>,
        executor: &CallbackExecutor,
    ) -> BackendResult<()> {
        let camera = self.camera(id)?.clone();
        if self.open_device(id).is_some() {
            return Err(BackendError::DeviceBusy(id.to_string()));
        }

        let open_error = camera.open_error;
        let device = Arc::new(SimulatedDevice {
            id: id.clone(),
            camera,
            driver: self.driver,
            registry: Arc::clone(&self.registry),
            callback: Arc::clone(&callback),
            executor: executor.clone(),
            state: Mutex::new(DeviceSlot {
                status: if open_error.is_some() {
                    DeviceStatus::Closed
                } else {
                    DeviceStatus::Open
                },
                session: None,
            }),
        });

        let accepted = match open_error {
            Some(code) => {
                let id = id.clone();
                executor.execute(move || callback.on_error(&id, code))
            }
            None => {
                lock_registry(&self.registry)
                    .devices
                    .push(Arc::downgrade(&device));
                executor.execute(move || callback.on_opened(device))
            }
        };
        if !accepted {
            return Err(BackendError::Other("callback executor stopped".to_string()));
        }
        debug!(camera_id = %id, "Open request accepted");
        Ok(())
    }

    fn create_image_reader(
        &self,
        size: Size,
        format: ImageFormat,
        max_images: u32,
    ) -> BackendResult<OutputSurface> {
        if max_images == 0 {
            return Err(BackendError::Other(
                "image reader needs at least one image".to_string(),
            ));
        }
        let surface = OutputSurface {
            id: allocate_surface(&self.registry),
            size,
            format,
        };
        lock_registry(&self.registry).readers.push(surface);
        debug!(surface = %surface.id, size = %size, format = %format, max_images, "Created image reader");
        Ok(surface)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceStatus {
    Open,
    Disconnected,
    Errored,
    Closed,
}

enum DeviceFault {
    Disconnected,
    Error(i32),
}

struct DeviceSlot {
    status: DeviceStatus,
    session: Option<Arc<SimulatedSession>>,
}

struct SimulatedDevice {
    id: CameraId,
    camera: SimulatedCamera,
    driver: FrameDriver,
    registry: SharedRegistry,
    callback: Arc<dyn DeviceStateCallback>,
    executor: CallbackExecutor,
    state: Mutex<DeviceSlot>,
}

impl SimulatedDevice {
    fn lock(&self) -> MutexGuard<'_, DeviceSlot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_open(&self) -> bool {
        self.lock().status == DeviceStatus::Open
    }

    fn fail(&self, fault: DeviceFault) {
        let session = {
            let mut slot = self.lock();
            if slot.status != DeviceStatus::Open {
                return;
            }
            slot.status = match fault {
                DeviceFault::Disconnected => DeviceStatus::Disconnected,
                DeviceFault::Error(_) => DeviceStatus::Errored,
            };
            slot.session.take()
        };
        if let Some(session) = session {
            session.close();
        }

        let callback = Arc::clone(&self.callback);
        let id = self.id.clone();
        self.executor.execute(move || match fault {
            DeviceFault::Disconnected => callback.on_disconnected(&id),
            DeviceFault::Error(code) => callback.on_error(&id, code),
        });
    }
}

impl CameraDevice for SimulatedDevice {
    fn id(&self) -> &CameraId {
        &self.id
    }

    fn create_capture_session(&self, config: SessionConfiguration) -> BackendResult<()> {
        let previous = {
            let slot = self.lock();
            if slot.status != DeviceStatus::Open {
                return Err(BackendError::Closed(format!("camera {}", self.id)));
            }
            slot.session.clone()
        };
        if let Some(previous) = previous {
            previous.close();
        }

        let fail = self.camera.fail_session_configure;
        let session = Arc::new(SimulatedSession {
            camera_id: self.id.clone(),
            targets: config.targets,
            frame: self.camera.frame.clone(),
            registry: Arc::clone(&self.registry),
            callback: Arc::clone(&config.callback),
            executor: config.executor.clone(),
            state: Mutex::new(SessionSlot {
                closed: fail,
                repeating: None,
                frame_number: 0,
                frame_loop: None,
            }),
        });

        let callback = config.callback;
        let accepted = if fail {
            config.executor.execute(move || callback.on_configure_failed())
        } else {
            self.lock().session = Some(Arc::clone(&session));
            lock_registry(&self.registry)
                .sessions
                .push(Arc::downgrade(&session));
            if let FrameDriver::Periodic(interval) = self.driver {
                session.start_frame_loop(interval)?;
            }
            let configured: Arc<dyn CaptureSession> = session;
            config
                .executor
                .execute(move || callback.on_configured(configured))
        };
        if !accepted {
            return Err(BackendError::Other("callback executor stopped".to_string()));
        }
        Ok(())
    }

    fn close(&self) {
        let session = {
            let mut slot = self.lock();
            if slot.status == DeviceStatus::Closed {
                return;
            }
            slot.status = DeviceStatus::Closed;
            slot.session.take()
        };
        if let Some(session) = session {
            session.close();
        }

        debug!(camera_id = %self.id, "Closing simulated camera");
        let callback = Arc::clone(&self.callback);
        let id = self.id.clone();
        self.executor.execute(move || callback.on_closed(&id));
    }
}

type RepeatingRequest = (CaptureRequest, Arc<dyn CaptureCallback>);

struct SessionSlot {
    closed: bool,
    repeating: Option<RepeatingRequest>,
    frame_number: u64,
    frame_loop: Option<RepeatingLoop>,
}

struct SimulatedSession {
    camera_id: CameraId,
    targets: SessionTargets,
    frame: SimulatedFrame,
    registry: SharedRegistry,
    callback: Arc<dyn SessionStateCallback>,
    executor: CallbackExecutor,
    state: Mutex<SessionSlot>,
}

impl SimulatedSession {
    fn lock(&self) -> MutexGuard<'_, SessionSlot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_frame_loop(self: &Arc<Self>, interval: Duration) -> BackendResult<()> {
        let session = Arc::downgrade(self);
        let name = format!("sim-frames-{}", self.camera_id);
        let frame_loop = RepeatingLoop::start(&name, interval, move || match session.upgrade() {
            Some(session) if !session.is_closed() => {
                session.deliver_frame();
                LoopAction::Continue
            }
            _ => LoopAction::Stop,
        })
        .map_err(|e| BackendError::Other(format!("failed to start frame loop: {}", e)))?;
        self.lock().frame_loop = Some(frame_loop);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Post one completed frame for the repeating request, if any
    fn deliver_frame(&self) -> bool {
        let (request, callback, result) = {
            let mut slot = self.lock();
            if slot.closed {
                return false;
            }
            let Some((request, callback)) = slot.repeating.clone() else {
                return false;
            };
            slot.frame_number += 1;
            (request, callback, self.frame.to_result(slot.frame_number))
        };
        self.executor
            .execute(move || callback.on_capture_completed(&request, &result))
    }

    fn validate(&self, request: &CaptureRequest) -> BackendResult<()> {
        if self.is_closed() {
            return Err(BackendError::Closed(format!("session of camera {}", self.camera_id)));
        }
        if request.targets.is_empty() {
            return Err(BackendError::Other("request has no targets".to_string()));
        }
        if let Some(target) = request.targets.iter().find(|t| !self.targets.contains(**t)) {
            return Err(BackendError::InvalidTarget(*target));
        }
        Ok(())
    }

    fn record(&self, kind: SubmissionKind, request: &CaptureRequest) -> i32 {
        let mut registry = lock_registry(&self.registry);
        registry.next_sequence += 1;
        let sequence_id = registry.next_sequence;
        registry.submitted.push(SubmittedRequest {
            camera_id: self.camera_id.clone(),
            kind,
            sequence_id,
            request: request.clone(),
        });
        sequence_id
    }
}

impl CaptureSession for SimulatedSession {
    fn set_repeating_request(
        &self,
        request: CaptureRequest,
        callback: Arc<dyn CaptureCallback>,
    ) -> BackendResult<i32> {
        self.validate(&request)?;
        let sequence_id = self.record(SubmissionKind::Repeating, &request);
        self.lock().repeating = Some((request, callback));
        debug!(camera_id = %self.camera_id, sequence_id, "Repeating request installed");
        Ok(sequence_id)
    }

    fn capture(
        &self,
        request: CaptureRequest,
        callback: Arc<dyn CaptureCallback>,
    ) -> BackendResult<i32> {
        self.validate(&request)?;
        let sequence_id = self.record(SubmissionKind::OneShot, &request);
        let result = {
            let mut slot = self.lock();
            slot.frame_number += 1;
            self.frame.to_result(slot.frame_number)
        };
        if !self
            .executor
            .execute(move || callback.on_capture_completed(&request, &result))
        {
            warn!(camera_id = %self.camera_id, sequence_id, "Capture result dropped");
        }
        Ok(sequence_id)
    }

    fn close(&self) {
        let frame_loop = {
            let mut slot = self.lock();
            if slot.closed {
                return;
            }
            slot.closed = true;
            slot.repeating = None;
            slot.frame_loop.take()
        };
        if let Some(mut frame_loop) = frame_loop {
            frame_loop.stop();
        }

        debug!(camera_id = %self.camera_id, "Simulated session closed");
        let callback = Arc::clone(&self.callback);
        self.executor.execute(move || callback.on_closed());
    }
}

/// Describe the facing code the way `list` prints it
pub fn facing_label(code: Option<i32>) -> &'static str {
    match code {
        Some(lens_facing::FRONT) => "front",
        Some(lens_facing::BACK) => "rear",
        Some(lens_facing::EXTERNAL) => "external",
        Some(_) => "unknown",
        None => "unreported",
    }
}
