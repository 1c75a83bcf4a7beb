//! Panel input protocol
//!
//! One widget event per line, whitespace separated:
//!
//! ```text
//! camera <id>
//! move <angle_rad> <magnitude>
//! zoom|focus|iris <value>          (-99..=99)
//! release <channel>
//! autofocus on|off
//! autoiris on|off
//! preset [tags]
//! sense [<zoom|iris|focus|joystick> <value> | reset]
//! ```
//!
//! Keywords are case-insensitive. Blank lines and `#` comments are skipped.

use ptz_shared::{throttle, CameraId, ChannelId, Sample, SettingKey};
use thiserror::Error;

/// A single widget event
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    SelectCamera(CameraId),
    Sample { channel: ChannelId, sample: Sample },
    Release(ChannelId),
    AutoFocus(bool),
    AutoIris(bool),
    CreatePreset { tags: String },
    SetSensitivity { key: SettingKey, value: f64 },
    ResetSettings,
    ShowSettings,
}

/// Errors that can occur while parsing an input line
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid {what}: {value:?}")]
    InvalidNumber { what: &'static str, value: String },

    #[error("Expected on/off, got {0:?}")]
    InvalidToggle(String),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    #[error("Unexpected trailing input: {0:?}")]
    TrailingInput(String),
}

/// Parse one line; `Ok(None)` for blank lines and comments
pub fn parse_line(line: &str) -> Result<Option<PanelEvent>, InputError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut args = line.split_whitespace();
    let Some(command) = args.next() else {
        return Ok(None);
    };

    let event = match command.to_ascii_lowercase().as_str() {
        "camera" => {
            let id = number::<u32>(args.next(), "camera id")?;
            PanelEvent::SelectCamera(CameraId(id))
        }
        "move" => {
            let angle = finite(args.next(), "angle")?;
            let magnitude = number::<f64>(args.next(), "magnitude")?;
            if !(0.0..=1.0).contains(&magnitude) {
                return Err(InputError::InvalidNumber {
                    what: "magnitude",
                    value: magnitude.to_string(),
                });
            }
            PanelEvent::Sample {
                channel: ChannelId::PanTilt,
                sample: Sample::vector(angle, magnitude),
            }
        }
        name @ ("zoom" | "focus" | "iris") => {
            let value = number::<i64>(args.next(), "slider value")?;
            if !(-throttle::SLIDER_LIMIT..=throttle::SLIDER_LIMIT).contains(&value) {
                return Err(InputError::InvalidNumber {
                    what: "slider value",
                    value: value.to_string(),
                });
            }
            let channel = ChannelId::from_name(name)
                .ok_or_else(|| InputError::UnknownChannel(name.to_string()))?;
            PanelEvent::Sample {
                channel,
                sample: Sample::scalar(value),
            }
        }
        "release" => {
            let name = args.next().ok_or(InputError::MissingArgument("channel"))?;
            let channel = ChannelId::from_name(name)
                .ok_or_else(|| InputError::UnknownChannel(name.to_string()))?;
            PanelEvent::Release(channel)
        }
        "autofocus" => PanelEvent::AutoFocus(toggle(args.next())?),
        "autoiris" => PanelEvent::AutoIris(toggle(args.next())?),
        "preset" => {
            let tags = args.collect::<Vec<_>>().join(" ");
            return Ok(Some(PanelEvent::CreatePreset { tags }));
        }
        "sense" => match args.next() {
            None => PanelEvent::ShowSettings,
            Some(arg) if arg.eq_ignore_ascii_case("reset") => PanelEvent::ResetSettings,
            Some(name) => {
                let key = SettingKey::from_name(name)
                    .ok_or_else(|| InputError::UnknownSetting(name.to_string()))?;
                let value = finite(args.next(), "sensitivity")?;
                PanelEvent::SetSensitivity { key, value }
            }
        },
        other => return Err(InputError::UnknownCommand(other.to_string())),
    };

    let rest: Vec<&str> = args.collect();
    if !rest.is_empty() {
        return Err(InputError::TrailingInput(rest.join(" ")));
    }

    Ok(Some(event))
}

fn number<T: std::str::FromStr>(arg: Option<&str>, what: &'static str) -> Result<T, InputError> {
    let arg = arg.ok_or(InputError::MissingArgument(what))?;
    arg.parse::<T>().map_err(|_| InputError::InvalidNumber {
        what,
        value: arg.to_string(),
    })
}

fn finite(arg: Option<&str>, what: &'static str) -> Result<f64, InputError> {
    let value = number::<f64>(arg, what)?;
    if !value.is_finite() {
        return Err(InputError::InvalidNumber {
            what,
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn toggle(arg: Option<&str>) -> Result<bool, InputError> {
    let arg = arg.ok_or(InputError::MissingArgument("on/off"))?;
    match arg.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(InputError::InvalidToggle(arg.to_string())),
    }
}
