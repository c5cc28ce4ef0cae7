// SPDX-License-Identifier: GPL-3.0-only

//! Presentation state observed by the UI
//!
//! Camera components publish into [`PresentationState`]; the UI holds a
//! [`PresentationView`] and only ever reads snapshots. Every flag has one
//! writer:
//!
//! | field            | writer                              |
//! |------------------|-------------------------------------|
//! | `permission`     | `PreviewController` (permission flow) |
//! | `surface_ready`  | `DeviceLifecycle`                   |
//! | `preview_active` | `SessionLifecycle`                  |
//! | metadata         | `MetadataPublisher`                 |

use crate::app::permissions::PermissionStatus;
pub use crate::backends::camera::metadata::FrameMetadata;
use std::sync::Arc;
use tokio::sync::watch;

/// Flags gating the UI phases
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresentationFlags {
    /// `None` until the permission has been checked
    pub permission: Option<PermissionStatus>,
    /// Camera opened with the required formats: the UI may build the
    /// rendering surface
    pub surface_ready: bool,
    /// Repeating preview request running
    pub preview_active: bool,
}

impl PresentationFlags {
    pub fn permission_granted(&self) -> bool {
        self.permission == Some(PermissionStatus::Granted)
    }
}

/// Writer side of the observable state
#[derive(Clone)]
pub struct PresentationState {
    flags: Arc<watch::Sender<PresentationFlags>>,
    metadata: Arc<watch::Sender<FrameMetadata>>,
}

impl Default for PresentationState {
    fn default() -> Self {
        Self::new()
    }
}

impl PresentationState {
    pub fn new() -> Self {
        let (flags, _) = watch::channel(PresentationFlags::default());
        let (metadata, _) = watch::channel(FrameMetadata::default());
        Self {
            flags: Arc::new(flags),
            metadata: Arc::new(metadata),
        }
    }

    /// New read-only view
    pub fn subscribe(&self) -> PresentationView {
        PresentationView {
            flags: self.flags.subscribe(),
            metadata: self.metadata.subscribe(),
        }
    }

    pub fn set_permission(&self, status: PermissionStatus) {
        self.flags.send_if_modified(|flags| {
            let changed = flags.permission != Some(status);
            flags.permission = Some(status);
            changed
        });
    }

    pub fn set_surface_ready(&self, ready: bool) {
        self.flags.send_if_modified(|flags| {
            let changed = flags.surface_ready != ready;
            flags.surface_ready = ready;
            changed
        });
    }

    pub fn set_preview_active(&self, active: bool) {
        self.flags.send_if_modified(|flags| {
            let changed = flags.preview_active != active;
            flags.preview_active = active;
            changed
        });
    }

    /// Replace the metadata snapshot as a whole
    pub fn publish_metadata(&self, metadata: FrameMetadata) {
        self.metadata.send_replace(metadata);
    }

    pub fn flags(&self) -> PresentationFlags {
        *self.flags.borrow()
    }
}

impl std::fmt::Debug for PresentationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentationState")
            .field("flags", &*self.flags.borrow())
            .finish()
    }
}

/// Read side of the observable state
#[derive(Debug, Clone)]
pub struct PresentationView {
    flags: watch::Receiver<PresentationFlags>,
    metadata: watch::Receiver<FrameMetadata>,
}

impl PresentationView {
    pub fn flags(&self) -> PresentationFlags {
        *self.flags.borrow()
    }

    /// Copy of the latest metadata snapshot
    pub fn metadata(&self) -> FrameMetadata {
        self.metadata.borrow().clone()
    }

    /// Wait for the next metadata snapshot and mark it seen.
    ///
    /// Returns `None` once every writer is gone.
    pub async fn next_metadata(&mut self) -> Option<FrameMetadata> {
        self.metadata.changed().await.ok()?;
        Some(self.metadata.borrow_and_update().clone())
    }

    /// Wait for the next flags change and mark it seen
    pub async fn next_flags(&mut self) -> Option<PresentationFlags> {
        self.flags.changed().await.ok()?;
        Some(*self.flags.borrow_and_update())
    }
}
