//! Value mapping from raw widget samples to backend commands
//!
//! Values are not clamped here, even though the backend documents 1..=99 for
//! zoom, focus and iris speeds. Non-finite inputs are refused, since they
//! would round to an arbitrary speed.

use crate::{round_half_up, throttle, CameraId, OutboundCommand, Sample, SampleKind};
use thiserror::Error;

/// Errors that can occur while mapping a sample
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapError {
    #[error("Expected a {expected:?} sample, got {got:?}")]
    UnexpectedSample { expected: SampleKind, got: SampleKind },

    #[error("Non-finite {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },
}

/// Pan and tilt speeds for a joystick deflection
pub fn pan_tilt_values(angle: f64, magnitude: f64, sensitivity: f64) -> (i64, i64) {
    let scale =
        (magnitude / throttle::JOYSTICK_HALF_RANGE) * sensitivity * throttle::JOYSTICK_GAIN;
    let pan = round_half_up(angle.cos() * scale + throttle::CENTER);
    let tilt = round_half_up(angle.sin() * scale + throttle::CENTER);
    (pan, tilt)
}

/// Relative speed for a slider position
pub fn scalar_value(value: i64, sensitivity: f64) -> i64 {
    round_half_up(throttle::CENTER + (sensitivity - throttle::SENSITIVITY_OFFSET) * value as f64)
}

fn finite(what: &'static str, value: f64) -> Result<f64, MapError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MapError::NonFinite { what, value })
    }
}

fn expect_vector(sample: &Sample) -> Result<(f64, f64), MapError> {
    match *sample {
        Sample::Vector { angle, magnitude } => {
            Ok((finite("angle", angle)?, finite("magnitude", magnitude)?))
        }
        Sample::Scalar(_) => Err(MapError::UnexpectedSample {
            expected: SampleKind::Vector,
            got: SampleKind::Scalar,
        }),
    }
}

fn expect_scalar(sample: &Sample) -> Result<i64, MapError> {
    match *sample {
        Sample::Scalar(value) => Ok(value),
        Sample::Vector { .. } => Err(MapError::UnexpectedSample {
            expected: SampleKind::Scalar,
            got: SampleKind::Vector,
        }),
    }
}

/// `camera/{id}/move?moveType=relative&pan=..&tilt=..&panSpeed=0&tiltSpeed=0`
pub fn move_command(
    camera: CameraId,
    sample: &Sample,
    sensitivity: f64,
) -> Result<OutboundCommand, MapError> {
    let (angle, magnitude) = expect_vector(sample)?;
    let sensitivity = finite("sensitivity", sensitivity)?;
    let (pan, tilt) = pan_tilt_values(angle, magnitude, sensitivity);

    Ok(OutboundCommand::new(format!("camera/{}/move", camera))
        .param("moveType", "relative")
        .param("pan", pan)
        .param("tilt", tilt)
        .param("panSpeed", 0)
        .param("tiltSpeed", 0))
}

/// `camera/{id}/zoom?zoomType=relative&zoom=..`
pub fn zoom_command(
    camera: CameraId,
    sample: &Sample,
    sensitivity: f64,
) -> Result<OutboundCommand, MapError> {
    let zoom = scalar_value(expect_scalar(sample)?, finite("sensitivity", sensitivity)?);

    Ok(OutboundCommand::new(format!("camera/{}/zoom", camera))
        .param("zoomType", "relative")
        .param("zoom", zoom))
}

/// `camera/{id}/focus?autoFocusOn=false&speed=..`
pub fn focus_command(
    camera: CameraId,
    sample: &Sample,
    sensitivity: f64,
) -> Result<OutboundCommand, MapError> {
    let speed = scalar_value(expect_scalar(sample)?, finite("sensitivity", sensitivity)?);

    Ok(OutboundCommand::new(format!("camera/{}/focus", camera))
        .param("autoFocusOn", false)
        .param("speed", speed))
}

/// `camera/{id}/iris?autoIrisOn=false&speed=..`
pub fn iris_command(
    camera: CameraId,
    sample: &Sample,
    sensitivity: f64,
) -> Result<OutboundCommand, MapError> {
    let speed = scalar_value(expect_scalar(sample)?, finite("sensitivity", sensitivity)?);

    Ok(OutboundCommand::new(format!("camera/{}/iris", camera))
        .param("autoIrisOn", false)
        .param("speed", speed))
}

pub fn auto_focus_command(camera: CameraId, on: bool) -> OutboundCommand {
    OutboundCommand::new(format!("camera/{}/focus", camera)).param("autoFocusOn", on)
}

pub fn auto_iris_command(camera: CameraId, on: bool) -> OutboundCommand {
    OutboundCommand::new(format!("camera/{}/iris", camera)).param("autoIrisOn", on)
}

/// Ask the backend to store the camera's current position as a preset
pub fn create_preset_command(camera: CameraId, tags: &str) -> OutboundCommand {
    OutboundCommand::new("presets/createpreset")
        .param("camera", camera)
        .param("tags", tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_zoom_is_not_clamped() {
        // 50 + (5 - 0.1) * 80 = 442
        let cmd = zoom_command(CameraId(1), &Sample::scalar(80), 5.0).unwrap();
        assert_eq!(cmd.to_string(), "camera/1/zoom?zoomType=relative&zoom=442");
        assert!(442 > throttle::BACKEND_MAX);
    }

    #[test]
    fn test_scalar_rest_is_center() {
        assert_eq!(scalar_value(0, 5.0), 50);
        assert_eq!(scalar_value(0, 1.0), 50);
        assert_eq!(scalar_value(-3, 5.0), 35);
    }

    #[test]
    fn test_focus_and_iris_shapes() {
        let focus = focus_command(CameraId(2), &Sample::scalar(4), 5.0).unwrap();
        assert_eq!(
            focus.to_string(),
            "camera/2/focus?autoFocusOn=false&speed=70"
        );

        let iris = iris_command(CameraId(2), &Sample::scalar(-4), 5.0).unwrap();
        assert_eq!(iris.to_string(), "camera/2/iris?autoIrisOn=false&speed=30");
    }

    #[test]
    fn test_move_full_right() {
        // angle 0: pan = 1 * 2 * 7 * 5 + 50 = 120, tilt = 50
        let cmd = move_command(CameraId(4), &Sample::vector(0.0, 1.0), 7.0).unwrap();
        assert_eq!(
            cmd.to_string(),
            "camera/4/move?moveType=relative&pan=120&tilt=50&panSpeed=0&tiltSpeed=0"
        );
    }

    #[test]
    fn test_move_directions() {
        assert_eq!(pan_tilt_values(FRAC_PI_2, 0.5, 1.0), (50, 55));
        assert_eq!(pan_tilt_values(PI, 0.5, 1.0), (45, 50));
        assert_eq!(pan_tilt_values(1.3, 0.0, 7.0), (50, 50));
    }

    #[test]
    fn test_toggle_and_preset_shapes() {
        assert_eq!(
            auto_focus_command(CameraId(1), true).to_string(),
            "camera/1/focus?autoFocusOn=true"
        );
        assert_eq!(
            auto_iris_command(CameraId(1), false).to_string(),
            "camera/1/iris?autoIrisOn=false"
        );
        assert_eq!(
            create_preset_command(CameraId(3), "stage").to_string(),
            "presets/createpreset?camera=3&tags=stage"
        );
    }

    #[test]
    fn test_wrong_sample_shape() {
        let result = zoom_command(CameraId(1), &Sample::vector(0.0, 1.0), 5.0);
        assert!(matches!(result, Err(MapError::UnexpectedSample { .. })));

        let result = move_command(CameraId(1), &Sample::scalar(3), 5.0);
        assert!(matches!(result, Err(MapError::UnexpectedSample { .. })));
    }

    #[test]
    fn test_non_finite_inputs_are_refused() {
        let result = move_command(CameraId(1), &Sample::vector(f64::NAN, 1.0), 7.0);
        assert!(matches!(
            result,
            Err(MapError::NonFinite { what: "angle", .. })
        ));

        let result = move_command(CameraId(1), &Sample::vector(f64::INFINITY, 1.0), 7.0);
        assert!(matches!(
            result,
            Err(MapError::NonFinite { what: "angle", .. })
        ));

        let result = move_command(CameraId(1), &Sample::vector(0.0, 1.0), f64::NAN);
        assert!(matches!(
            result,
            Err(MapError::NonFinite { what: "sensitivity", .. })
        ));

        let result = zoom_command(CameraId(1), &Sample::scalar(80), f64::NEG_INFINITY);
        assert!(matches!(
            result,
            Err(MapError::NonFinite { what: "sensitivity", .. })
        ));
    }
}
