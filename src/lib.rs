// SPDX-License-Identifier: GPL-3.0-only

//! rearcam - Rear camera preview with live capture metadata
//!
//! This library provides the core of a camera preview application: it
//! checks the camera permission, opens the first rear-facing camera,
//! negotiates output formats and sizes, runs a repeating preview request and
//! publishes per-frame capture metadata as display strings.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Permission flow, preview controller and presentation state
//! - [`backends`]: Camera service abstraction and the simulated backend
//! - [`config`]: User configuration handling
//! - [`errors`]: Error types
//!
//! # Example
//!
//! ```ignore
//! // Print metadata of ten preview frames:
//! // rearcam preview --frames 10
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types
pub use app::{PresentationView, PreviewController};
pub use backends::camera::FrameMetadata;
pub use config::Config;
pub use errors::{AppError, AppResult};
