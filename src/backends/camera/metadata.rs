// SPDX-License-Identifier: GPL-3.0-only

//! Per-frame capture metadata
//!
//! Completed capture results carry platform-defined integer codes. This
//! module turns the fields shown by the UI into display strings and
//! publishes them as one snapshot per frame.

use super::CaptureCallback;
use super::types::{CaptureRequest, CaptureResult, ResultKey};
use crate::app::state::PresentationState;
use crate::constants::{ae_mode, awb_mode, color_correction_mode, scene_mode, video_stabilization_mode};
use tracing::debug;

/// Shown for numeric fields the result does not carry
pub const ABSENT: &str = "null";

/// Shown for enumerated codes missing from their table.
///
/// Devices report vendor and newer-platform codes, so this is expected
/// output rather than a failure.
pub const UNKNOWN_CODE: &str = "ERROR";

/// Explicit code-to-label mapping for one enumerated result field
#[derive(Debug)]
pub struct ModeTable {
    pub name: &'static str,
    pub entries: &'static [(i32, &'static str)],
}

impl ModeTable {
    /// Label for `code`; unknown and missing codes map to [`UNKNOWN_CODE`]
    pub fn label(&self, code: Option<i64>) -> &'static str {
        code.and_then(|c| self.entries.iter().find(|(k, _)| i64::from(*k) == c))
            .map(|(_, label)| *label)
            .unwrap_or(UNKNOWN_CODE)
    }
}

pub static AE_MODE: ModeTable = ModeTable {
    name: "AUTO EXPOSURE MODE",
    entries: &[
        (ae_mode::OFF, "OFF"),
        (ae_mode::ON, "ON"),
        (ae_mode::ON_AUTO_FLASH, "ON AUTO FLASH"),
        (ae_mode::ON_ALWAYS_FLASH, "ON ALWAYS FLASH"),
        (ae_mode::ON_EXTERNAL_FLASH, "ON EXTERNAL FLASH"),
        (ae_mode::ON_AUTO_FLASH_REDEYE, "ON AUTO FLASH RED EYE"),
        (
            ae_mode::ON_LOW_LIGHT_BOOST_BRIGHTNESS_PRIORITY,
            "ON LOW LIGHT BOOST BRIGHTNESS PRIORITY",
        ),
    ],
};

pub static AWB_MODE: ModeTable = ModeTable {
    name: "AUTO WHITE BALANCE",
    entries: &[
        (awb_mode::OFF, "OFF"),
        (awb_mode::AUTO, "AUTO"),
        (awb_mode::SHADE, "SHADE"),
        (awb_mode::DAYLIGHT, "DAYLIGHT"),
        (awb_mode::TWILIGHT, "TWILIGHT"),
        (awb_mode::CLOUDY_DAYLIGHT, "CLOUDY DAYLIGHT"),
        (awb_mode::FLUORESCENT, "FLUORESCENT"),
        (awb_mode::INCANDESCENT, "INCANDESCENT"),
        (awb_mode::WARM_FLUORESCENT, "WARM FLUORESCENT"),
    ],
};

pub static COLOR_CORRECTION_MODE: ModeTable = ModeTable {
    name: "COLOR CORRECTION MODE",
    entries: &[
        (color_correction_mode::FAST, "FAST"),
        (color_correction_mode::HIGH_QUALITY, "HIGH QUALITY"),
        (color_correction_mode::TRANSFORM_MATRIX, "TRANSFORM MATRIX"),
    ],
};

// HIGH_SPEED_VIDEO is not mapped and reads as UNKNOWN_CODE
pub static SCENE_MODE: ModeTable = ModeTable {
    name: "SCENE MODE",
    entries: &[
        (scene_mode::HDR, "HDR"),
        (scene_mode::SNOW, "SNOW"),
        (scene_mode::BEACH, "BEACH"),
        (scene_mode::NIGHT, "NIGHT"),
        (scene_mode::PARTY, "PARTY"),
        (scene_mode::ACTION, "ACTION"),
        (scene_mode::BARCODE, "BARCODE"),
        (scene_mode::CANDLELIGHT, "CANDLELIGHT"),
        (scene_mode::DISABLED, "DISABLED"),
        (scene_mode::FACE_PRIORITY, "FACE PRIORITY"),
        (scene_mode::FIREWORKS, "FIREWORKS"),
        (scene_mode::LANDSCAPE, "LANDSCAPE"),
        (scene_mode::NIGHT_PORTRAIT, "NIGHT PORTRAIT"),
        (scene_mode::PORTRAIT, "PORTRAIT"),
        (scene_mode::SPORTS, "SPORTS"),
        (scene_mode::STEADYPHOTO, "STEADY PHOTO"),
        (scene_mode::SUNSET, "SUNSET"),
        (scene_mode::THEATRE, "THEATRE"),
    ],
};

pub static VIDEO_STABILIZATION_MODE: ModeTable = ModeTable {
    name: "VIDEO STABILIZATION MODE",
    entries: &[
        (video_stabilization_mode::OFF, "OFF"),
        (video_stabilization_mode::ON, "ON"),
        (
            video_stabilization_mode::PREVIEW_STABILIZATION,
            "PREVIEW STABILIZATION",
        ),
    ],
};

/// Display-ready metadata of the most recent frame
///
/// Empty strings until the first frame completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameMetadata {
    pub iso: String,
    pub exposure_time: String,
    pub auto_exposure_mode: String,
    pub auto_white_balance_mode: String,
    pub color_correction_mode: String,
    pub scene_mode: String,
    pub video_stabilization_mode: String,
}

impl FrameMetadata {
    /// Labelled rows in the order the preview screen shows them
    pub fn rows(&self) -> [(&'static str, &str); 7] {
        [
            ("ISO", self.iso.as_str()),
            ("EXPOSURE TIME", self.exposure_time.as_str()),
            (AE_MODE.name, self.auto_exposure_mode.as_str()),
            (AWB_MODE.name, self.auto_white_balance_mode.as_str()),
            (VIDEO_STABILIZATION_MODE.name, self.video_stabilization_mode.as_str()),
            (COLOR_CORRECTION_MODE.name, self.color_correction_mode.as_str()),
            (SCENE_MODE.name, self.scene_mode.as_str()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        *self == FrameMetadata::default()
    }
}

fn numeric(result: &CaptureResult, key: ResultKey) -> String {
    result
        .get(key)
        .map(|v| v.to_string())
        .unwrap_or_else(|| ABSENT.to_string())
}

/// Read the displayed fields of one completed frame
pub fn extract_frame_metadata(result: &CaptureResult) -> FrameMetadata {
    FrameMetadata {
        iso: numeric(result, ResultKey::SensorSensitivity),
        exposure_time: numeric(result, ResultKey::SensorExposureTime),
        auto_exposure_mode: AE_MODE.label(result.get(ResultKey::ControlAeMode)).to_string(),
        auto_white_balance_mode: AWB_MODE
            .label(result.get(ResultKey::ControlAwbMode))
            .to_string(),
        color_correction_mode: COLOR_CORRECTION_MODE
            .label(result.get(ResultKey::ColorCorrectionMode))
            .to_string(),
        scene_mode: SCENE_MODE
            .label(result.get(ResultKey::ControlSceneMode))
            .to_string(),
        video_stabilization_mode: VIDEO_STABILIZATION_MODE
            .label(result.get(ResultKey::ControlVideoStabilizationMode))
            .to_string(),
    }
}

/// Capture callback of the repeating preview request
///
/// Extracts every completed frame and replaces the published snapshot in
/// one step, so readers never see fields from two different frames.
pub struct MetadataPublisher {
    presentation: PresentationState,
}

impl MetadataPublisher {
    pub fn new(presentation: PresentationState) -> Self {
        Self { presentation }
    }
}

impl CaptureCallback for MetadataPublisher {
    fn on_capture_completed(&self, _request: &CaptureRequest, result: &CaptureResult) {
        let metadata = extract_frame_metadata(result);
        debug!(
            frame = result.frame_number,
            iso = %metadata.iso,
            exposure_time = %metadata.exposure_time,
            ae_mode = %metadata.auto_exposure_mode,
            awb_mode = %metadata.auto_white_balance_mode,
            color_correction = %metadata.color_correction_mode,
            scene_mode = %metadata.scene_mode,
            stabilization = %metadata.video_stabilization_mode,
            "Preview metadata"
        );
        self.presentation.publish_metadata(metadata);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::RequestTemplate;

    fn full_result() -> CaptureResult {
        CaptureResult::new(1)
            .with(ResultKey::SensorSensitivity, 800)
            .with(ResultKey::SensorExposureTime, 16_666_666)
            .with(ResultKey::ControlAeMode, ae_mode::ON as i64)
            .with(ResultKey::ControlAwbMode, awb_mode::AUTO as i64)
            .with(ResultKey::ColorCorrectionMode, color_correction_mode::FAST as i64)
            .with(ResultKey::ControlSceneMode, scene_mode::DISABLED as i64)
            .with(ResultKey::ControlVideoStabilizationMode, video_stabilization_mode::OFF as i64)
    }

    #[test]
    fn test_extract_full_result() {
        let metadata = extract_frame_metadata(&full_result());

        assert_eq!(metadata.iso, "800");
        assert_eq!(metadata.exposure_time, "16666666");
        assert_eq!(metadata.auto_exposure_mode, "ON");
        assert_eq!(metadata.auto_white_balance_mode, "AUTO");
        assert_eq!(metadata.color_correction_mode, "FAST");
        assert_eq!(metadata.scene_mode, "DISABLED");
        assert_eq!(metadata.video_stabilization_mode, "OFF");
    }

    #[test]
    fn test_unknown_code_maps_to_error_label() {
        let result = full_result()
            .with(ResultKey::ControlAwbMode, 99)
            .with(ResultKey::ControlSceneMode, scene_mode::HIGH_SPEED_VIDEO as i64);
        let metadata = extract_frame_metadata(&result);

        assert_eq!(metadata.auto_white_balance_mode, UNKNOWN_CODE);
        assert_eq!(metadata.scene_mode, UNKNOWN_CODE);
        // Remaining fields unaffected
        assert_eq!(metadata.auto_exposure_mode, "ON");
        assert_eq!(metadata.video_stabilization_mode, "OFF");
    }

    #[test]
    fn test_missing_fields() {
        let metadata = extract_frame_metadata(&CaptureResult::new(3));

        assert_eq!(metadata.iso, ABSENT);
        assert_eq!(metadata.exposure_time, ABSENT);
        assert_eq!(metadata.auto_exposure_mode, UNKNOWN_CODE);
        assert_ne!(metadata.iso, "0");
    }

    #[test]
    fn test_tables_have_unique_codes() {
        for table in [&AE_MODE, &AWB_MODE, &COLOR_CORRECTION_MODE, &SCENE_MODE, &VIDEO_STABILIZATION_MODE] {
            let mut codes: Vec<i32> = table.entries.iter().map(|(c, _)| *c).collect();
            codes.sort_unstable();
            codes.dedup();
            assert_eq!(codes.len(), table.entries.len(), "Duplicate code in {}", table.name);
        }
    }

    #[test]
    fn test_rows_order() {
        let metadata = extract_frame_metadata(&full_result());
        let labels: Vec<&str> = metadata.rows().iter().map(|(label, _)| *label).collect();
        assert_eq!(
            labels,
            vec![
                "ISO",
                "EXPOSURE TIME",
                "AUTO EXPOSURE MODE",
                "AUTO WHITE BALANCE",
                "VIDEO STABILIZATION MODE",
                "COLOR CORRECTION MODE",
                "SCENE MODE",
            ]
        );
    }

    #[test]
    fn test_publisher_replaces_snapshot() {
        let presentation = PresentationState::new();
        let view = presentation.subscribe();
        let publisher = MetadataPublisher::new(presentation);
        let request = CaptureRequest::new(RequestTemplate::Preview);

        publisher.on_capture_completed(&request, &full_result());
        assert_eq!(view.metadata().iso, "800");

        let next = full_result().with(ResultKey::SensorSensitivity, 1600);
        publisher.on_capture_completed(&request, &next);
        assert_eq!(view.metadata().iso, "1600");
        assert_eq!(view.metadata().scene_mode, "DISABLED");
    }
}
