// SPDX-License-Identifier: GPL-3.0-only

//! Camera selection by lens facing

use super::types::{CameraIdentity, LensFacing};
use crate::errors::CameraError;
use tracing::{debug, info};

/// First camera facing away from the screen
pub fn select_rear_camera(cameras: &[CameraIdentity]) -> Result<&CameraIdentity, CameraError> {
    select_by_facing(cameras, LensFacing::Back)
}

/// First camera whose facing equals `facing`, in enumeration order.
///
/// Cameras with an unknown facing never match.
pub fn select_by_facing(
    cameras: &[CameraIdentity],
    facing: LensFacing,
) -> Result<&CameraIdentity, CameraError> {
    match cameras.iter().find(|c| c.facing == Some(facing)) {
        Some(camera) => {
            info!(camera_id = %camera.id, facing = %facing, "Selected camera");
            Ok(camera)
        }
        None => {
            debug!(count = cameras.len(), facing = %facing, "No camera with requested facing");
            Err(CameraError::NoCameraWithFacing(facing))
        }
    }
}
