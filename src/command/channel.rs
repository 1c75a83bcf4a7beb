//! Channel registry: which axes exist and how their samples become commands

use ptz_shared::mapping::{self, MapError};
use ptz_shared::state_machine::CoalescePolicy;
use ptz_shared::{CameraId, ChannelId, OutboundCommand, Sample};
use std::collections::HashMap;
use std::fmt;

/// Maps a sample and the channel's sensitivity to a backend command
pub type MapFn = fn(CameraId, &Sample, f64) -> Result<OutboundCommand, MapError>;

/// A controllable axis
#[derive(Clone)]
pub struct Channel {
    pub id: ChannelId,
    /// How samples inside one rate-limit window are merged
    pub policy: CoalescePolicy,
    /// Value sent on release to stop motion
    pub rest: Sample,
    pub map: MapFn,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("policy", &self.policy)
            .field("rest", &self.rest)
            .finish_non_exhaustive()
    }
}

impl Channel {
    /// Joystick channel: vectors overwrite, rest is zero deflection
    pub fn pan_tilt() -> Self {
        Self {
            id: ChannelId::PanTilt,
            policy: CoalescePolicy::Overwrite,
            rest: Sample::vector(0.0, 0.0),
            map: mapping::move_command,
        }
    }

    /// Slider channel: values are damped, rest is the slider centre
    pub fn slider(id: ChannelId, map: MapFn) -> Self {
        Self {
            id,
            policy: CoalescePolicy::Average,
            rest: Sample::scalar(0),
            map,
        }
    }
}

/// Channels known to the dispatcher, registered once at startup
#[derive(Debug, Clone, Default)]
pub struct ChannelRegistry {
    channels: HashMap<ChannelId, Channel>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four camera axes: joystick plus zoom, focus and iris sliders
    pub fn camera_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Channel::pan_tilt());
        registry.register(Channel::slider(ChannelId::Zoom, mapping::zoom_command));
        registry.register(Channel::slider(ChannelId::Focus, mapping::focus_command));
        registry.register(Channel::slider(ChannelId::Iris, mapping::iris_command));
        registry
    }

    /// Register a channel, replacing any previous definition with the same id
    pub fn register(&mut self, channel: Channel) -> &mut Self {
        self.channels.insert(channel.id, channel);
        self
    }

    pub fn get(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(&id)
    }

    pub fn contains(&self, id: ChannelId) -> bool {
        self.channels.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn into_channels(self) -> impl Iterator<Item = Channel> {
        self.channels.into_values()
    }
}
