// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the preview pipeline against the simulated backend

use rearcam::app::permissions::{DialogChoice, PermissionGate, PermissionStatus};
use rearcam::errors::{AppError, CameraError, PermissionError};
use rearcam::app::preview::{PreviewController, PreviewSettings};
use rearcam::backends::camera::simulated::{
    SimulatedBackend, SimulatedCamera, SimulatedFrame, SubmissionKind,
};
use rearcam::backends::camera::{
    CameraBackendManager, CameraId, CapabilityCheck, CapabilityRequirements, DeviceState,
    ImageFormat, LensFacing, MetadataPublisher, RequestTemplate, SessionState, Size,
    StreamConfiguration,
};
use rearcam::constants::device_error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
struct TestGate {
    granted: AtomicBool,
    rationale: AtomicBool,
    requests: AtomicUsize,
    settings_opened: AtomicUsize,
}

impl PermissionGate for TestGate {
    fn is_granted(&self, _permission: &str) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    fn should_show_rationale(&self, _permission: &str) -> bool {
        self.rationale.load(Ordering::SeqCst)
    }

    fn request(&self, _permission: &str) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    fn open_app_settings(&self) {
        self.settings_opened.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    backend: SimulatedBackend,
    gate: Arc<TestGate>,
    controller: PreviewController,
}

impl Harness {
    fn new(cameras: Vec<SimulatedCamera>, granted: bool) -> Self {
        let backend = SimulatedBackend::new(cameras);
        let manager = CameraBackendManager::new(
            Arc::new(backend.clone()),
            CapabilityRequirements::default(),
        )
        .unwrap();
        let gate = Arc::new(TestGate::default());
        gate.granted.store(granted, Ordering::SeqCst);
        let controller = PreviewController::new(manager, gate.clone(), PreviewSettings::default());
        Self {
            backend,
            gate,
            controller,
        }
    }

    fn flush(&self) {
        self.controller.manager().executor().flush();
    }

    /// Permission granted, camera open, surface created, session configured
    fn run_to_preview(&self) {
        self.controller.start().unwrap();
        self.flush();
        assert!(self.controller.view().flags().surface_ready);

        let size = self.controller.optimal_surface_size();
        let surface = self.backend.create_preview_surface(size);
        self.controller.on_surface_created(surface).unwrap();
        self.flush();
    }
}

#[test]
fn test_full_pipeline_publishes_metadata() {
    let harness = Harness::new(SimulatedCamera::default_set(), true);
    harness.run_to_preview();
    let view = harness.controller.view();

    assert_eq!(harness.controller.session_state(), Some(SessionState::Configured));
    assert!(view.flags().preview_active);

    assert_eq!(harness.backend.tick(), 1);
    harness.flush();

    let metadata = view.metadata();
    assert_eq!(metadata.iso, "800");
    assert_eq!(metadata.exposure_time, "16666666");
    assert_eq!(metadata.auto_exposure_mode, "ON");
    assert_eq!(metadata.auto_white_balance_mode, "AUTO");
    assert_eq!(metadata.color_correction_mode, "FAST");
    assert_eq!(metadata.scene_mode, "DISABLED");
    assert_eq!(metadata.video_stabilization_mode, "OFF");
}

#[test]
fn test_rear_camera_is_opened() {
    let harness = Harness::new(SimulatedCamera::default_set(), true);
    harness.controller.start().unwrap();
    let device = harness.controller.acquire_camera().unwrap();
    assert_eq!(device.camera_id(), &CameraId::new("0"));
}

#[test]
fn test_acquire_refused_while_permanently_denied() {
    let harness = Harness::new(SimulatedCamera::default_set(), false);
    harness.controller.start().unwrap();
    harness.controller.on_permission_result(false).unwrap();

    assert_eq!(
        harness.controller.acquire_camera().unwrap_err(),
        AppError::Permission(PermissionError::PermanentlyDenied)
    );
    assert_eq!(harness.backend.open_device_count(), 0);
}

#[test]
fn test_single_repeating_request_targets_preview_only() {
    let harness = Harness::new(SimulatedCamera::default_set(), true);
    harness.run_to_preview();

    let submitted = harness.backend.submitted_requests();
    assert_eq!(submitted.len(), 1, "Exactly one request after configure");
    assert_eq!(submitted[0].kind, SubmissionKind::Repeating);
    assert_eq!(submitted[0].request.template, RequestTemplate::Preview);
    assert_eq!(submitted[0].request.targets.len(), 1);

    let readers = harness.backend.image_readers();
    assert_eq!(readers.len(), 1);
    assert!(
        !submitted[0].request.targets.contains(&readers[0].id),
        "Still-capture reader must not be a preview target"
    );
}

#[test]
fn test_denied_permission_shows_dialog_without_camera() {
    let harness = Harness::new(SimulatedCamera::default_set(), false);
    harness.gate.rationale.store(true, Ordering::SeqCst);

    harness.controller.start().unwrap();
    assert_eq!(harness.gate.requests.load(Ordering::SeqCst), 1);

    let status = harness.controller.on_permission_result(false).unwrap();
    assert_eq!(status, PermissionStatus::Denied);
    assert_eq!(harness.controller.device_state(), None);

    let dialogs = harness.controller.permissions().dialogs();
    assert_eq!(dialogs.len(), 1);
    harness
        .controller
        .permissions()
        .on_dialog_choice(&dialogs[0], DialogChoice::Ok);
    assert_eq!(harness.gate.requests.load(Ordering::SeqCst), 2);

    let status = harness.controller.on_permission_result(true).unwrap();
    assert_eq!(status, PermissionStatus::Granted);
    harness.flush();
    assert_eq!(harness.controller.device_state(), Some(DeviceState::Opened));
}

#[test]
fn test_no_rear_camera_fails_selection() {
    let harness = Harness::new(vec![SimulatedCamera::new("1", LensFacing::Front)], true);
    assert!(harness.controller.start().is_err());
    assert_eq!(harness.controller.device_state(), None);
}

#[test]
fn test_missing_stream_map_halts_pipeline() {
    let harness = Harness::new(
        vec![SimulatedCamera::new("0", LensFacing::Back).without_stream_map()],
        true,
    );
    harness.controller.start().unwrap();
    harness.flush();

    assert_eq!(harness.controller.device_state(), Some(DeviceState::Opened));
    assert_eq!(
        harness.controller.capability_check(),
        Some(CapabilityCheck::Unknown)
    );
    assert!(!harness.controller.view().flags().surface_ready);
    assert_eq!(harness.controller.optimal_surface_size(), Size::ZERO);

    let surface = harness.backend.create_preview_surface(Size::new(640, 480));
    assert_eq!(
        harness.controller.on_surface_created(surface).unwrap_err(),
        AppError::Camera(CameraError::CapabilityUnsupported(Vec::new()))
    );
    harness.flush();
    assert_eq!(harness.controller.session_state(), None);
    assert!(harness.backend.image_readers().is_empty());
    assert!(harness.backend.submitted_requests().is_empty());
    assert!(!harness.controller.view().flags().preview_active);
}

#[test]
fn test_missing_jpeg_refuses_surface() {
    let camera = SimulatedCamera::new("0", LensFacing::Back).with_streams(vec![StreamConfiguration {
        format: ImageFormat::YUV_420_888,
        sizes: vec![Size::new(1920, 1080)],
    }]);
    let harness = Harness::new(vec![camera], true);
    harness.controller.start().unwrap();
    harness.flush();

    assert_eq!(
        harness.controller.capability_check(),
        Some(CapabilityCheck::Missing(vec![ImageFormat::JPEG]))
    );
    assert!(!harness.controller.view().flags().surface_ready);

    let size = harness.controller.optimal_surface_size();
    let surface = harness.backend.create_preview_surface(size);
    assert_eq!(
        harness.controller.on_surface_created(surface).unwrap_err(),
        AppError::Camera(CameraError::CapabilityUnsupported(vec![ImageFormat::JPEG]))
    );
    harness.flush();

    assert_eq!(harness.controller.session_state(), None);
    assert!(harness.backend.image_readers().is_empty());
    assert!(harness.backend.submitted_requests().is_empty(), "Halted camera submits nothing");
    assert!(!harness.controller.view().flags().preview_active);
}

#[test]
fn test_disconnect_stops_preview_without_reopen() {
    let harness = Harness::new(SimulatedCamera::default_set(), true);
    harness.run_to_preview();

    harness.backend.disconnect(&CameraId::new("0"));
    harness.flush();

    let flags = harness.controller.view().flags();
    assert_eq!(
        harness.controller.device_state(),
        Some(DeviceState::Disconnected)
    );
    assert!(!flags.surface_ready);
    assert!(!flags.preview_active);
    assert_eq!(harness.backend.open_device_count(), 0, "No reopen after disconnect");
    assert_eq!(harness.backend.tick(), 0);
}

#[test]
fn test_device_error_code_surfaced() {
    let harness = Harness::new(SimulatedCamera::default_set(), true);
    harness.run_to_preview();

    harness
        .backend
        .raise_error(&CameraId::new("0"), device_error::CAMERA_SERVICE);
    harness.flush();

    assert_eq!(
        harness.controller.device_state(),
        Some(DeviceState::Errored(device_error::CAMERA_SERVICE))
    );
    assert!(!harness.controller.view().flags().preview_active);
}

#[test]
fn test_configure_failure_leaves_preview_inactive() {
    let harness = Harness::new(
        vec![SimulatedCamera::new("0", LensFacing::Back).with_failing_session()],
        true,
    );
    harness.run_to_preview();

    assert_eq!(
        harness.controller.session_state(),
        Some(SessionState::ConfigureFailed)
    );
    assert!(harness.backend.submitted_requests().is_empty());
    assert!(!harness.controller.view().flags().preview_active);
}

#[test]
fn test_surface_destroyed_closes_session() {
    let harness = Harness::new(SimulatedCamera::default_set(), true);
    harness.run_to_preview();

    harness.controller.on_surface_destroyed();
    harness.flush();

    assert!(!harness.controller.view().flags().preview_active);
    assert_eq!(harness.controller.session_state(), None);
    assert_eq!(harness.backend.tick(), 0);
    // Device stays open for a new surface
    assert_eq!(harness.controller.device_state(), Some(DeviceState::Opened));
}

#[test]
fn test_still_capture_is_one_shot() {
    let harness = Harness::new(SimulatedCamera::default_set(), true);
    harness.run_to_preview();

    let view = harness.controller.view();
    let callback = Arc::new(MetadataPublisher::new(rearcam::app::PresentationState::new()));
    harness.controller.capture_still(callback).unwrap();
    harness.flush();

    let submitted = harness.backend.submitted_requests();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[1].kind, SubmissionKind::OneShot);
    assert_eq!(submitted[1].request.template, RequestTemplate::StillCapture);
    assert!(view.flags().preview_active, "Preview keeps running");
}

#[test]
fn test_unknown_frame_codes_render_error() {
    let frame = SimulatedFrame {
        ae_mode: Some(42),
        scene_mode: None,
        sensitivity: None,
        ..SimulatedFrame::default()
    };
    let harness = Harness::new(
        vec![SimulatedCamera::new("0", LensFacing::Back).with_frame(frame)],
        true,
    );
    harness.run_to_preview();
    harness.backend.tick();
    harness.flush();

    let metadata = harness.controller.view().metadata();
    assert_eq!(metadata.auto_exposure_mode, "ERROR");
    assert_eq!(metadata.scene_mode, "ERROR");
    assert_eq!(metadata.iso, "null");
    assert_eq!(metadata.auto_white_balance_mode, "AUTO");
}

#[test]
fn test_shutdown_releases_camera() {
    let harness = Harness::new(SimulatedCamera::default_set(), true);
    harness.run_to_preview();

    harness.controller.shutdown();
    harness.flush();

    assert_eq!(harness.backend.open_device_count(), 0);
    assert!(!harness.controller.view().flags().preview_active);
    assert!(!harness.controller.view().flags().surface_ready);
}
