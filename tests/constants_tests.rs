// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use rearcam::backends::camera::metadata::{
    AE_MODE, AWB_MODE, COLOR_CORRECTION_MODE, SCENE_MODE, UNKNOWN_CODE, VIDEO_STABILIZATION_MODE,
};
use rearcam::constants::{ae_mode, awb_mode, image_format, lens_facing, pipeline, scene_mode};

#[test]
fn test_format_codes_distinct() {
    let codes = [
        image_format::JPEG,
        image_format::YUV_420_888,
        image_format::PRIVATE,
        image_format::RAW_SENSOR,
        image_format::NV21,
    ];
    for (i, a) in codes.iter().enumerate() {
        for b in &codes[i + 1..] {
            assert_ne!(a, b, "Image format codes must be distinct");
        }
    }
}

#[test]
fn test_lens_facing_codes() {
    assert_eq!(lens_facing::FRONT, 0);
    assert_eq!(lens_facing::BACK, 1);
    assert_eq!(lens_facing::EXTERNAL, 2);
}

#[test]
fn test_every_named_mode_has_label() {
    for code in ae_mode::OFF..=ae_mode::ON_LOW_LIGHT_BOOST_BRIGHTNESS_PRIORITY {
        assert_ne!(AE_MODE.label(Some(code as i64)), UNKNOWN_CODE);
    }
    for code in awb_mode::OFF..=awb_mode::SHADE {
        assert_ne!(AWB_MODE.label(Some(code as i64)), UNKNOWN_CODE);
    }
    for code in 0..=2 {
        assert_ne!(COLOR_CORRECTION_MODE.label(Some(code)), UNKNOWN_CODE);
        assert_ne!(VIDEO_STABILIZATION_MODE.label(Some(code)), UNKNOWN_CODE);
    }
}

#[test]
fn test_high_speed_video_scene_unmapped() {
    assert_eq!(
        SCENE_MODE.label(Some(scene_mode::HIGH_SPEED_VIDEO as i64)),
        UNKNOWN_CODE
    );
    assert_eq!(SCENE_MODE.label(Some(scene_mode::HDR as i64)), "HDR");
}

#[test]
fn test_still_reader_holds_one_image() {
    assert_eq!(pipeline::STILL_CAPTURE_MAX_IMAGES, 1);
}

#[test]
fn test_app_version_set() {
    assert!(!rearcam::constants::app_version().is_empty());
}
