// SPDX-License-Identifier: GPL-3.0-only

//! Application layer of the rear camera preview
//!
//! # Architecture
//!
//! - `permissions`: Camera permission check, request and explanation dialogs
//! - `preview`: Controller wiring permission, device, session and surface
//! - `state`: Observable presentation state (flags and frame metadata)
//!
//! # Main Types
//!
//! - `PreviewController`: Drives one preview from permission to session
//! - `PresentationView`: Read-only snapshots for the UI

pub mod permissions;
pub mod preview;
pub mod state;

pub use permissions::{PermissionFlow, PermissionGate, PermissionStatus};
pub use preview::{PreviewController, PreviewSettings};
pub use state::{PresentationFlags, PresentationState, PresentationView};
