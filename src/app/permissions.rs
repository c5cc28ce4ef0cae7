// SPDX-License-Identifier: GPL-3.0-only

//! Runtime camera permission flow
//!
//! The platform permission system sits behind [`PermissionGate`]. A denied
//! request leaves the permission in a pending list; the UI shows one dialog
//! per pending permission and routes the user's answer back through
//! [`PermissionFlow::on_dialog_choice`].

use crate::app::state::PresentationState;
use crate::constants::CAMERA_PERMISSION;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Outcome of a permission check or request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionStatus {
    Granted,
    /// Declined, the platform still lets us ask again
    Denied,
    /// Declined with "don't ask again"; only the settings screen can grant it
    PermanentlyDenied,
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::PermanentlyDenied => write!(f, "permanently denied"),
        }
    }
}

/// Platform permission system
pub trait PermissionGate: Send + Sync {
    fn is_granted(&self, permission: &str) -> bool;

    /// Whether the platform would still show its own request prompt.
    /// `false` after a denial means the denial is permanent.
    fn should_show_rationale(&self, permission: &str) -> bool;

    /// Launch the platform request; the answer comes back through
    /// [`PermissionFlow::on_permission_result`]
    fn request(&self, permission: &str);

    /// Open this application's settings page
    fn open_app_settings(&self);
}

/// Dialog text for one permission
pub trait PermissionText: Send + Sync {
    fn title(&self) -> &str;
    fn description(&self, permanently_declined: bool) -> &str;
}

/// Texts for the camera permission dialog
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraPermissionText;

impl PermissionText for CameraPermissionText {
    fn title(&self) -> &str {
        "CAMERA PERMISSION WARNING !"
    }

    fn description(&self, permanently_declined: bool) -> &str {
        if permanently_declined {
            "It seems you permanently declined the access of your camera device. \
             This application cannot run properly without it. \
             Please go to your application settings and grant the camera permission, thanks !"
        } else {
            "This application obviously needs camera permission, please grant it !"
        }
    }
}

/// A dialog the UI should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDialog {
    pub permission: String,
    pub title: String,
    pub description: String,
    pub permanently_declined: bool,
}

/// Button pressed on a permission dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogChoice {
    Ok,
    No,
}

/// Tracks the camera permission and the dialogs explaining it
pub struct PermissionFlow {
    gate: Arc<dyn PermissionGate>,
    text: Box<dyn PermissionText>,
    presentation: PresentationState,
    pending: Mutex<Vec<String>>,
}

impl PermissionFlow {
    pub fn new(gate: Arc<dyn PermissionGate>, presentation: PresentationState) -> Self {
        Self::with_text(gate, Box::new(CameraPermissionText), presentation)
    }

    pub fn with_text(
        gate: Arc<dyn PermissionGate>,
        text: Box<dyn PermissionText>,
        presentation: PresentationState,
    ) -> Self {
        Self {
            gate,
            text,
            presentation,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Check the camera permission, launching the platform request when it
    /// is missing.
    ///
    /// Returns `Some(Granted)` when already granted, `None` while the
    /// request is outstanding.
    pub fn start(&self) -> Option<PermissionStatus> {
        if self.gate.is_granted(CAMERA_PERMISSION) {
            info!(permission = CAMERA_PERMISSION, "Permission already granted");
            self.presentation.set_permission(PermissionStatus::Granted);
            return Some(PermissionStatus::Granted);
        }

        debug!(permission = CAMERA_PERMISSION, "Requesting permission");
        self.gate.request(CAMERA_PERMISSION);
        None
    }

    /// Answer from the platform request
    pub fn on_permission_result(&self, permission: &str, granted: bool) -> PermissionStatus {
        let status = if granted {
            PermissionStatus::Granted
        } else if self.gate.should_show_rationale(permission) {
            PermissionStatus::Denied
        } else {
            PermissionStatus::PermanentlyDenied
        };

        {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            if granted {
                pending.retain(|p| p != permission);
            } else if !pending.iter().any(|p| p == permission) {
                pending.push(permission.to_string());
            }
        }

        if granted {
            info!(permission, "Permission granted");
        } else {
            warn!(permission, status = %status, "Permission not granted");
        }
        self.presentation.set_permission(status);
        status
    }

    /// Re-read the platform state, e.g. when returning from the settings page
    pub fn refresh(&self) -> bool {
        if !self.gate.is_granted(CAMERA_PERMISSION) {
            return false;
        }
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|p| p != CAMERA_PERMISSION);
        self.presentation.set_permission(PermissionStatus::Granted);
        true
    }

    pub fn dismiss_dialog(&self, permission: &str) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|p| p != permission);
    }

    /// Dialogs for every pending permission, in the order they were denied
    pub fn dialogs(&self) -> Vec<PermissionDialog> {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending
            .iter()
            .map(|permission| {
                let permanently_declined = !self.gate.should_show_rationale(permission);
                PermissionDialog {
                    permission: permission.clone(),
                    title: self.text.title().to_string(),
                    description: self.text.description(permanently_declined).to_string(),
                    permanently_declined,
                }
            })
            .collect()
    }

    /// Route a dialog button press
    ///
    /// OK re-requests the permission, or opens the settings page when the
    /// denial is permanent. NO only dismisses.
    pub fn on_dialog_choice(&self, dialog: &PermissionDialog, choice: DialogChoice) {
        match choice {
            DialogChoice::Ok if dialog.permanently_declined => {
                info!(permission = %dialog.permission, "Opening application settings");
                self.gate.open_app_settings();
            }
            DialogChoice::Ok => {
                self.dismiss_dialog(&dialog.permission);
                debug!(permission = %dialog.permission, "Requesting permission again");
                self.gate.request(&dialog.permission);
            }
            DialogChoice::No => {
                debug!(permission = %dialog.permission, "Permission dialog dismissed");
                self.dismiss_dialog(&dialog.permission);
            }
        }
    }
}
