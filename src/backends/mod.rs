// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for camera capture
//!
//! The platform camera service is reached only through the traits in
//! [`camera`]; the in-process [`camera::simulated`] backend implements them
//! for the command line and the tests.

pub mod camera;
