//! PTZ Panel Shared Types
//!
//! This crate provides the channel and sample types, the per-channel dispatch
//! state machine, the value-mapping functions and the request codec shared by
//! the control panel and its tests.

pub mod codec;
pub mod mapping;
pub mod state_machine;

use std::fmt;

/// Throttle and mapping parameters for the panel
pub mod throttle {
    /// Minimum spacing between two commands on the same channel
    pub const DISPATCH_INTERVAL_MS: u64 = 130;

    /// Neutral output value for every axis (relative moves are centred on 50)
    pub const CENTER: f64 = 50.0;

    /// Joystick magnitude that maps to a full-scale deflection
    pub const JOYSTICK_HALF_RANGE: f64 = 0.5;

    /// Gain applied to the joystick sensitivity
    pub const JOYSTICK_GAIN: f64 = 5.0;

    /// Offset subtracted from slider sensitivities before scaling
    pub const SENSITIVITY_OFFSET: f64 = 0.1;

    /// Upper end of the range the backend accepts for zoom/focus/iris speeds
    pub const BACKEND_MAX: i64 = 99;

    /// Largest slider deflection accepted from the panel, in either direction
    pub const SLIDER_LIMIT: i64 = 99;
}

/// Round half up, the way browser `Math.round` does (-2.5 -> -2)
pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

/// Identifier of a camera known to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CameraId(pub u32);

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One independently rate-limited controllable axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelId {
    PanTilt,
    Zoom,
    Focus,
    Iris,
}

impl ChannelId {
    pub const ALL: [ChannelId; 4] = [
        ChannelId::PanTilt,
        ChannelId::Zoom,
        ChannelId::Focus,
        ChannelId::Iris,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelId::PanTilt => "pan_tilt",
            ChannelId::Zoom => "zoom",
            ChannelId::Focus => "focus",
            ChannelId::Iris => "iris",
        }
    }

    /// Parse a channel name as typed by an operator
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "pan_tilt" | "pantilt" | "move" | "joystick" => Some(ChannelId::PanTilt),
            "zoom" => Some(ChannelId::Zoom),
            "focus" => Some(ChannelId::Focus),
            "iris" => Some(ChannelId::Iris),
            _ => None,
        }
    }

    /// The settings key holding this channel's sensitivity multiplier
    pub fn sensitivity_key(&self) -> SettingKey {
        match self {
            ChannelId::PanTilt => SettingKey::Joystick,
            ChannelId::Zoom => SettingKey::Zoom,
            ChannelId::Focus => SettingKey::Focus,
            ChannelId::Iris => SettingKey::Iris,
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted sensitivity settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    Zoom,
    Iris,
    Focus,
    Joystick,
}

impl SettingKey {
    pub const ALL: [SettingKey; 4] = [
        SettingKey::Zoom,
        SettingKey::Iris,
        SettingKey::Focus,
        SettingKey::Joystick,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Zoom => "zoom",
            SettingKey::Iris => "iris",
            SettingKey::Focus => "focus",
            SettingKey::Joystick => "joystick",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        SettingKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(name))
    }

    /// Value applied when nothing has been stored yet
    pub fn default_value(&self) -> f64 {
        match self {
            SettingKey::Zoom | SettingKey::Iris | SettingKey::Focus => 5.0,
            SettingKey::Joystick => 7.0,
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a sample, used to check widget wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Vector,
    Scalar,
}

/// A raw input observation for one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// Joystick deflection: direction in radians, magnitude in 0..1
    Vector { angle: f64, magnitude: f64 },
    /// Slider position
    Scalar(i64),
}

impl Sample {
    pub fn vector(angle: f64, magnitude: f64) -> Self {
        Sample::Vector { angle, magnitude }
    }

    pub fn scalar(value: i64) -> Self {
        Sample::Scalar(value)
    }

    pub fn kind(&self) -> SampleKind {
        match self {
            Sample::Vector { .. } => SampleKind::Vector,
            Sample::Scalar(_) => SampleKind::Scalar,
        }
    }

    /// Midpoint of two scalar samples, rounded half up. `None` for vectors.
    pub fn midpoint(&self, other: &Sample) -> Option<Sample> {
        match (self, other) {
            (Sample::Scalar(a), Sample::Scalar(b)) => {
                // floor((a + b + 1) / 2) is round-half-up of the exact midpoint
                let sum = i128::from(*a) + i128::from(*b) + 1;
                Some(Sample::Scalar(sum.div_euclid(2) as i64))
            }
            _ => None,
        }
    }
}

/// A fully scaled request for the camera backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCommand {
    path: String,
    query: Vec<(String, String)>,
}

impl OutboundCommand {
    /// Create a command for the given path (no leading slash)
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    /// Append a query parameter, keeping insertion order
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Look up the first value for a query key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for OutboundCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&codec::encode_target(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up_matches_browser() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(441.6), 442);
        assert_eq!(round_half_up(-0.4), 0);
    }

    #[test]
    fn test_scalar_midpoint() {
        let mid = Sample::scalar(5).midpoint(&Sample::scalar(95));
        assert_eq!(mid, Some(Sample::scalar(50)));

        let mid = Sample::scalar(0).midpoint(&Sample::scalar(7));
        assert_eq!(mid, Some(Sample::scalar(4)));

        // Negative halves round towards positive infinity
        let mid = Sample::scalar(-3).midpoint(&Sample::scalar(0));
        assert_eq!(mid, Some(Sample::scalar(-1)));
    }

    #[test]
    fn test_midpoint_of_extremes_does_not_overflow() {
        let max = Sample::scalar(i64::MAX);
        assert_eq!(max.midpoint(&max), Some(Sample::scalar(i64::MAX)));

        let min = Sample::scalar(i64::MIN);
        assert_eq!(min.midpoint(&min), Some(Sample::scalar(i64::MIN)));
        assert_eq!(min.midpoint(&max), Some(Sample::scalar(0)));
    }

    #[test]
    fn test_vector_has_no_midpoint() {
        let a = Sample::vector(0.0, 1.0);
        let b = Sample::vector(1.0, 1.0);
        assert_eq!(a.midpoint(&b), None);
        assert_eq!(a.midpoint(&Sample::scalar(1)), None);
    }

    #[test]
    fn test_channel_names() {
        for channel in ChannelId::ALL {
            assert_eq!(ChannelId::from_name(channel.as_str()), Some(channel));
        }
        assert_eq!(ChannelId::from_name("JOYSTICK"), Some(ChannelId::PanTilt));
        assert_eq!(ChannelId::from_name("gain"), None);
    }

    #[test]
    fn test_sensitivity_keys() {
        assert_eq!(ChannelId::PanTilt.sensitivity_key(), SettingKey::Joystick);
        assert_eq!(ChannelId::Iris.sensitivity_key(), SettingKey::Iris);
        assert_eq!(SettingKey::Joystick.default_value(), 7.0);
        assert_eq!(SettingKey::Focus.default_value(), 5.0);
        assert_eq!(SettingKey::from_name("Zoom"), Some(SettingKey::Zoom));
    }

    #[test]
    fn test_command_builder_keeps_order() {
        let cmd = OutboundCommand::new("camera/3/zoom")
            .param("zoomType", "relative")
            .param("zoom", 61);
        assert_eq!(cmd.path(), "camera/3/zoom");
        assert_eq!(cmd.get("zoom"), Some("61"));
        assert_eq!(cmd.query()[0].0, "zoomType");
        assert_eq!(cmd.to_string(), "camera/3/zoom?zoomType=relative&zoom=61");
    }
}
