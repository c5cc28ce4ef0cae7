// SPDX-License-Identifier: GPL-3.0-only

//! Capture session lifecycle
//!
//! A session is configured once with its [`SessionTargets`]. When the
//! platform confirms the configuration, exactly one repeating preview
//! request is installed, aimed at the preview target alone, with the
//! [`MetadataPublisher`] receiving every completed frame. A failed
//! configuration submits nothing and is not retried. A session that refuses
//! the repeating request is closed and reported as `ConfigureFailed`.

use super::executor::CallbackExecutor;
use super::metadata::MetadataPublisher;
use super::types::{BackendResult, CaptureRequest, OutputRole, RequestTemplate, SessionTargets};
use super::{CameraDevice, CaptureCallback, CaptureSession, SessionConfiguration, SessionStateCallback};
use crate::app::state::PresentationState;
use crate::errors::{AppResult, SessionError};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Observable state of one capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Configuring,
    Configured,
    ConfigureFailed,
    /// Torn down by us, by the device closing or by the platform
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Configuring => write!(f, "configuring"),
            SessionState::Configured => write!(f, "configured"),
            SessionState::ConfigureFailed => write!(f, "configure failed"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Default)]
struct SessionInner {
    session: Option<Arc<dyn CaptureSession>>,
    repeating_sequence: Option<i32>,
}

/// State callback of one session configuration
pub struct SessionLifecycle {
    targets: SessionTargets,
    presentation: PresentationState,
    publisher: Arc<MetadataPublisher>,
    inner: Mutex<SessionInner>,
    state: watch::Sender<SessionState>,
}

impl std::fmt::Debug for SessionLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLifecycle")
            .field("targets", &self.targets)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionLifecycle {
    /// Ask `device` for a session with `targets`; callbacks arrive on
    /// `executor`
    pub fn configure(
        device: &dyn CameraDevice,
        targets: SessionTargets,
        presentation: PresentationState,
        executor: &CallbackExecutor,
    ) -> BackendResult<Arc<Self>> {
        let (state, _) = watch::channel(SessionState::Configuring);
        let lifecycle = Arc::new(Self {
            targets,
            publisher: Arc::new(MetadataPublisher::new(presentation.clone())),
            presentation,
            inner: Mutex::new(SessionInner::default()),
            state,
        });

        info!(
            camera_id = %device.id(),
            preview = %targets.preview.id,
            still_capture = %targets.still_capture.id,
            "Configuring capture session"
        );

        let config = SessionConfiguration {
            targets,
            callback: lifecycle.clone(),
            executor: executor.clone(),
        };
        if let Err(e) = device.create_capture_session(config) {
            warn!(camera_id = %device.id(), error = %e, "Capture session request refused");
            lifecycle.transition(SessionState::ConfigureFailed);
            return Err(e);
        }
        Ok(lifecycle)
    }

    pub fn targets(&self) -> &SessionTargets {
        &self.targets
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Sequence id of the installed repeating request
    pub fn repeating_sequence(&self) -> Option<i32> {
        self.lock().repeating_sequence
    }

    /// Submit a one-shot still capture into the still-capture target.
    ///
    /// Independent of the repeating preview request.
    pub fn capture_still(&self, callback: Arc<dyn CaptureCallback>) -> AppResult<i32> {
        let session = match (self.state(), self.lock().session.clone()) {
            (SessionState::Configured, Some(session)) => session,
            (SessionState::ConfigureFailed, _) => return Err(SessionError::ConfigureFailed.into()),
            _ => return Err(SessionError::NotConfigured.into()),
        };

        let target = self.targets.get(OutputRole::StillCapture);
        let request = CaptureRequest::new(RequestTemplate::StillCapture).with_target(target.id);
        let sequence = session.capture(request, callback)?;
        info!(sequence, target = %target.id, "Still capture submitted");
        Ok(sequence)
    }

    /// Tear the session down, ending the repeating request
    pub fn close(&self) {
        let session = {
            let mut inner = self.lock();
            inner.repeating_sequence = None;
            inner.session.take()
        };
        self.presentation.set_preview_active(false);
        if let Some(session) = session {
            session.close();
        }
        if self.state() != SessionState::ConfigureFailed {
            self.transition(SessionState::Closed);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!(from = %previous, to = %next, "Capture session state changed");
        }
    }
}

impl SessionStateCallback for SessionLifecycle {
    fn on_configured(&self, session: Arc<dyn CaptureSession>) {
        if self.state() != SessionState::Configuring {
            debug!(state = %self.state(), "Session configured after teardown, closing it");
            session.close();
            return;
        }

        let preview = self.targets.get(OutputRole::Preview);
        let request = CaptureRequest::new(RequestTemplate::Preview).with_target(preview.id);
        let callback: Arc<dyn CaptureCallback> = self.publisher.clone();
        let sequence = match session.set_repeating_request(request, callback) {
            Ok(sequence) => sequence,
            Err(e) => {
                warn!(error = %e, "Failed to start repeating preview request, closing session");
                session.close();
                self.transition(SessionState::ConfigureFailed);
                return;
            }
        };

        {
            let mut inner = self.lock();
            inner.session = Some(session);
            inner.repeating_sequence = Some(sequence);
        }
        self.transition(SessionState::Configured);
        info!(sequence, target = %preview.id, "Repeating preview request started");
        self.presentation.set_preview_active(true);
    }

    fn on_configure_failed(&self) {
        warn!("Capture session configuration failed");
        self.transition(SessionState::ConfigureFailed);
    }

    fn on_closed(&self) {
        {
            let mut inner = self.lock();
            inner.session = None;
            inner.repeating_sequence = None;
        }
        self.presentation.set_preview_active(false);
        if self.state() != SessionState::ConfigureFailed {
            self.transition(SessionState::Closed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::simulated::{SimulatedBackend, SimulatedCamera, SubmissionKind};
    use crate::backends::camera::types::{CameraId, ImageFormat, LensFacing, Size};
    use crate::backends::camera::{CameraBackend, DeviceLifecycle, CapabilityRequirements};
    use crate::backends::camera::types::BackendError;
    use crate::errors::AppError;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Fixture {
        backend: SimulatedBackend,
        executor: CallbackExecutor,
        presentation: PresentationState,
        device: Arc<DeviceLifecycle>,
        targets: SessionTargets,
    }

    fn fixture(camera: SimulatedCamera) -> Fixture {
        let backend = SimulatedBackend::new(vec![camera]);
        let executor = CallbackExecutor::new("session-test").unwrap();
        let presentation = PresentationState::new();
        let device = DeviceLifecycle::new(
            CameraId::new("0"),
            Arc::new(backend.clone()),
            CapabilityRequirements::default(),
            presentation.clone(),
        );
        device.open(&executor).unwrap();
        executor.flush();

        let size = Size::new(1920, 1080);
        let preview = backend.create_preview_surface(size);
        let still = backend
            .create_image_reader(size, ImageFormat::JPEG, 1)
            .unwrap();

        Fixture {
            backend,
            executor,
            presentation,
            device,
            targets: SessionTargets::new(preview, still),
        }
    }

    fn configure(f: &Fixture) -> Arc<SessionLifecycle> {
        let device = f.device.device().unwrap();
        let session = SessionLifecycle::configure(
            device.as_ref(),
            f.targets,
            f.presentation.clone(),
            &f.executor,
        )
        .unwrap();
        f.executor.flush();
        session
    }

    #[test]
    fn test_configured_submits_single_preview_request() {
        let f = fixture(SimulatedCamera::new("0", LensFacing::Back));
        let session = configure(&f);

        assert_eq!(session.state(), SessionState::Configured);
        assert!(f.presentation.flags().preview_active);

        let submitted = f.backend.submitted_requests();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].kind, SubmissionKind::Repeating);
        assert_eq!(submitted[0].request.template, RequestTemplate::Preview);
        assert_eq!(submitted[0].request.targets, vec![f.targets.preview.id]);
        assert_eq!(session.repeating_sequence(), Some(submitted[0].sequence_id));
    }

    #[test]
    fn test_configure_failure_submits_nothing() {
        let f = fixture(SimulatedCamera::new("0", LensFacing::Back).with_failing_session());
        let session = configure(&f);

        assert_eq!(session.state(), SessionState::ConfigureFailed);
        assert!(f.backend.submitted_requests().is_empty());
        assert!(!f.presentation.flags().preview_active);
        assert_eq!(
            session
                .capture_still(Arc::new(MetadataPublisher::new(f.presentation.clone())))
                .unwrap_err(),
            AppError::Session(SessionError::ConfigureFailed)
        );
    }

    /// Device whose sessions configure fine but refuse every request
    struct RefusingDevice {
        id: CameraId,
        session_closed: Arc<AtomicBool>,
    }

    struct RefusingSession {
        closed: Arc<AtomicBool>,
    }

    impl CameraDevice for RefusingDevice {
        fn id(&self) -> &CameraId {
            &self.id
        }

        fn create_capture_session(&self, config: SessionConfiguration) -> BackendResult<()> {
            let session: Arc<dyn CaptureSession> = Arc::new(RefusingSession {
                closed: self.session_closed.clone(),
            });
            let callback = config.callback;
            assert!(config.executor.execute(move || callback.on_configured(session)));
            Ok(())
        }

        fn close(&self) {}
    }

    impl CaptureSession for RefusingSession {
        fn set_repeating_request(
            &self,
            _request: CaptureRequest,
            _callback: Arc<dyn CaptureCallback>,
        ) -> BackendResult<i32> {
            Err(BackendError::Closed("session".into()))
        }

        fn capture(
            &self,
            _request: CaptureRequest,
            _callback: Arc<dyn CaptureCallback>,
        ) -> BackendResult<i32> {
            Err(BackendError::Closed("session".into()))
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_refused_repeating_request_is_not_configured() {
        let f = fixture(SimulatedCamera::new("0", LensFacing::Back));
        let device = RefusingDevice {
            id: CameraId::new("0"),
            session_closed: Arc::new(AtomicBool::new(false)),
        };

        let session =
            SessionLifecycle::configure(&device, f.targets, f.presentation.clone(), &f.executor)
                .unwrap();
        f.executor.flush();

        assert_eq!(session.state(), SessionState::ConfigureFailed);
        assert_eq!(session.repeating_sequence(), None);
        assert!(!f.presentation.flags().preview_active);
        assert!(device.session_closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_frames_reach_presentation() {
        let f = fixture(SimulatedCamera::new("0", LensFacing::Back));
        let _session = configure(&f);
        let view = f.presentation.subscribe();

        assert_eq!(f.backend.tick(), 1);
        f.executor.flush();

        let metadata = view.metadata();
        assert_eq!(metadata.iso, "800");
        assert_eq!(metadata.auto_exposure_mode, "ON");
    }

    #[test]
    fn test_capture_still_targets_still_output_only() {
        let f = fixture(SimulatedCamera::new("0", LensFacing::Back));
        let session = configure(&f);

        let callback = Arc::new(MetadataPublisher::new(f.presentation.clone()));
        session.capture_still(callback).unwrap();
        f.executor.flush();

        let submitted = f.backend.submitted_requests();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[1].kind, SubmissionKind::OneShot);
        assert_eq!(submitted[1].request.template, RequestTemplate::StillCapture);
        assert_eq!(submitted[1].request.targets, vec![f.targets.still_capture.id]);
    }

    #[test]
    fn test_close_lowers_preview_active() {
        let f = fixture(SimulatedCamera::new("0", LensFacing::Back));
        let session = configure(&f);

        session.close();
        f.executor.flush();

        assert_eq!(session.state(), SessionState::Closed);
        assert!(!f.presentation.flags().preview_active);
        assert_eq!(f.backend.tick(), 0);

        let err = session
            .capture_still(Arc::new(MetadataPublisher::new(f.presentation.clone())))
            .unwrap_err();
        assert_eq!(err, AppError::Session(SessionError::NotConfigured));
    }

    #[test]
    fn test_device_disconnect_closes_session() {
        let f = fixture(SimulatedCamera::new("0", LensFacing::Back));
        let session = configure(&f);

        f.backend.disconnect(&CameraId::new("0"));
        f.executor.flush();

        assert_eq!(session.state(), SessionState::Closed);
        assert!(!f.presentation.flags().preview_active);
    }
}
