// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Running the preview pipeline and printing live capture metadata

use rearcam::app::permissions::{PermissionGate, PermissionStatus};
use rearcam::app::preview::{PreviewController, PreviewSettings};
use rearcam::app::state::{FrameMetadata, PresentationView};
use rearcam::backends::camera::simulated::{FrameDriver, SimulatedBackend, facing_label};
use rearcam::backends::camera::{CameraBackend, CameraBackendManager, OutputCapabilities};
use rearcam::config::Config;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// How long to wait for the camera to open before giving up
const OPEN_TIMEOUT: Duration = Duration::from_secs(5);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// List all available cameras
pub fn list_cameras(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let backend = SimulatedBackend::new(config.simulation.cameras.clone());
    let ids = backend.camera_id_list()?;

    if ids.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for id in &ids {
        let characteristics = backend.camera_characteristics(id)?;
        println!("  [{}] {}", id, facing_label(characteristics.lens_facing));

        let capabilities = OutputCapabilities::query(&backend, id);
        if capabilities.is_empty() {
            println!("      Formats: unknown (no stream configuration map)");
        } else {
            let formats: Vec<String> = capabilities
                .formats()
                .iter()
                .map(|format| format.to_string())
                .collect();
            println!("      Formats: {}", formats.join(", "));
            if let Some(size) = capabilities.max_area(config.preview_format) {
                println!("      Largest {} size: {}", config.preview_format, size);
            }
        }
        println!();
    }

    Ok(())
}

/// Permission gate answering from a command-line flag
///
/// Never pre-granted, so every run goes through the request path.
struct FlagPermissionGate {
    granted: bool,
    requests: AtomicUsize,
}

impl PermissionGate for FlagPermissionGate {
    fn is_granted(&self, _permission: &str) -> bool {
        false
    }

    fn should_show_rationale(&self, _permission: &str) -> bool {
        true
    }

    fn request(&self, permission: &str) {
        let attempt = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        info!(permission, attempt, "Permission requested");
    }

    fn open_app_settings(&self) {
        println!("Grant the camera permission in the application settings.");
    }
}

/// Run the preview pipeline against the simulated camera service
pub fn run_preview(
    config: &Config,
    frames: Option<usize>,
    deny_permission: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let interval = Duration::from_millis(config.simulation.frame_interval_ms.max(1));
    let backend = SimulatedBackend::with_driver(
        config.simulation.cameras.clone(),
        FrameDriver::Periodic(interval),
    );
    let manager = CameraBackendManager::new(Arc::new(backend.clone()), config.requirements())?;
    let gate = Arc::new(FlagPermissionGate {
        granted: !deny_permission,
        requests: AtomicUsize::new(0),
    });
    let controller = PreviewController::new(
        manager.clone(),
        gate.clone(),
        PreviewSettings {
            lens_facing: config.lens_facing,
            still_capture_format: config.still_capture_format,
        },
    );

    controller.start()?;
    if controller.view().flags().permission.is_none() {
        let status = controller.on_permission_result(gate.granted)?;
        if status != PermissionStatus::Granted {
            for dialog in controller.permissions().dialogs() {
                println!("{}", dialog.title);
                println!("{}", dialog.description);
            }
            manager.shutdown();
            return Ok(());
        }
    }

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async {
        let mut view = controller.view();
        if !wait_for_surface_ready(&controller, &view).await {
            return Ok(());
        }

        let size = controller.optimal_surface_size();
        let surface = backend.create_preview_surface(size);
        controller.on_surface_created(surface)?;
        controller.on_surface_changed(size);

        println!("Previewing camera at {} (press Ctrl+C to stop)", size);
        print_metadata_loop(&mut view, frames).await;
        Ok::<(), Box<dyn std::error::Error>>(())
    });

    controller.on_surface_destroyed();
    controller.shutdown();
    manager.executor().flush();
    manager.shutdown();
    result
}

async fn wait_for_surface_ready(controller: &PreviewController, view: &PresentationView) -> bool {
    let waited = tokio::time::timeout(OPEN_TIMEOUT, async {
        loop {
            if view.flags().surface_ready {
                return true;
            }
            // Opened without the required formats, or already released
            let halted = controller
                .capability_check()
                .is_some_and(|check| !check.is_supported());
            let released = controller
                .device_state()
                .is_none_or(|state| state.is_final());
            if halted || released {
                return false;
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    })
    .await;

    match waited {
        Ok(true) => true,
        Ok(false) => {
            let state = controller
                .device_state()
                .map(|state| state.to_string())
                .unwrap_or_else(|| "none".to_string());
            println!("Camera not usable (state: {})", state);
            if let Some(check) = controller.capability_check() {
                println!("Capability check: {:?}", check);
            }
            false
        }
        Err(_) => {
            warn!("Timed out waiting for the camera to open");
            println!("Camera did not become ready");
            false
        }
    }
}

async fn print_metadata_loop(view: &mut PresentationView, frames: Option<usize>) {
    let mut printed = 0usize;
    loop {
        tokio::select! {
            metadata = view.next_metadata() => {
                let Some(metadata) = metadata else {
                    break;
                };
                print_metadata(&metadata);
                printed += 1;
                if frames.is_some_and(|limit| printed >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("Stopping preview...");
                break;
            }
        }
    }
}

fn print_metadata(metadata: &FrameMetadata) {
    println!();
    for (label, value) in metadata.rows() {
        println!("  {:<28} {}", label, value);
    }
}
