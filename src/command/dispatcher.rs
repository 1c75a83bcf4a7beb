//! Rate-limited command dispatcher
//!
//! For each channel the first sample after a quiet period is sent at once and
//! opens a window of `interval`. Samples arriving inside the window are
//! coalesced; when the window closes a single trailing flush sends the
//! coalesced value if it differs from what was last sent. `release` bypasses
//! the window and always sends the channel's rest value.
//!
//! Every channel has its own lock; nothing on the dispatch path waits on
//! another channel or on settings persistence.

use super::channel::{Channel, ChannelRegistry};
use crate::settings::SettingsStore;
use crate::transport::CommandQueue;
use ptz_shared::mapping::MapError;
use ptz_shared::state_machine::{DispatchState, StateError, SubmitOutcome};
use ptz_shared::{throttle, CameraId, ChannelId, Sample};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Wiring errors surfaced to the caller
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Channel {0} is not registered")]
    UnregisteredChannel(ChannelId),

    #[error("Channel {channel}: {source}")]
    State {
        channel: ChannelId,
        #[source]
        source: StateError,
    },

    #[error("Channel {channel}: {source}")]
    Map {
        channel: ChannelId,
        #[source]
        source: MapError,
    },
}

/// Registry entry: the channel, its throttle state and its timer
struct ChannelSlot {
    channel: Channel,
    state: DispatchState,
    /// Camera given with the most recent submit or release
    camera: Option<CameraId>,
    /// Scheduled trailing flush, present only while pending
    timer: Option<JoinHandle<()>>,
}

struct Inner {
    /// Fixed at construction; only the slots themselves are mutable
    slots: HashMap<ChannelId, Mutex<ChannelSlot>>,
    settings: Arc<SettingsStore>,
    outbox: CommandQueue,
    interval: Duration,
}

/// Turns high-frequency widget samples into at most one command per channel
/// per interval
#[derive(Clone)]
pub struct RateLimitedDispatcher {
    inner: Arc<Inner>,
}

impl RateLimitedDispatcher {
    /// Create a dispatcher with the default 130 ms interval
    pub fn new(
        registry: ChannelRegistry,
        settings: Arc<SettingsStore>,
        outbox: CommandQueue,
    ) -> Self {
        Self::with_interval(
            registry,
            settings,
            outbox,
            Duration::from_millis(throttle::DISPATCH_INTERVAL_MS),
        )
    }

    pub fn with_interval(
        registry: ChannelRegistry,
        settings: Arc<SettingsStore>,
        outbox: CommandQueue,
        interval: Duration,
    ) -> Self {
        let slots = registry
            .into_channels()
            .map(|channel| {
                let slot = ChannelSlot {
                    state: DispatchState::new(channel.policy, channel.rest),
                    channel,
                    camera: None,
                    timer: None,
                };
                (slot.channel.id, Mutex::new(slot))
            })
            .collect();

        Self {
            inner: Arc::new(Inner {
                slots,
                settings,
                outbox,
                interval,
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Feed one raw widget sample for `channel`, routed to `camera`
    pub async fn submit(
        &self,
        camera: CameraId,
        channel: ChannelId,
        sample: Sample,
    ) -> Result<(), DispatchError> {
        let mut slot = self.inner.slot(channel)?.lock().await;

        let outcome = slot.state.submit(sample).map_err(|source| {
            error!("[DISPATCH] Rejected sample for {}: {}", channel, source);
            DispatchError::State { channel, source }
        })?;
        slot.camera = Some(camera);

        match outcome {
            SubmitOutcome::Leading { send } => {
                self.schedule_trailing(&mut slot);
                if let Some(value) = send {
                    self.inner.emit(&slot.channel, camera, value).await?;
                }
            }
            SubmitOutcome::Coalesced => {
                debug!(
                    "[DISPATCH] {} coalesced -> {:?}",
                    channel,
                    slot.state.current()
                );
            }
        }

        Ok(())
    }

    /// Return `channel` to rest on `camera`, sending immediately even while a
    /// trailing flush is pending
    pub async fn release(&self, camera: CameraId, channel: ChannelId) -> Result<(), DispatchError> {
        let mut slot = self.inner.slot(channel)?.lock().await;

        slot.camera = Some(camera);
        let rest = slot.state.release();
        debug!("[DISPATCH] {} released", channel);
        self.inner.emit(&slot.channel, camera, rest).await
    }

    /// Cancel every scheduled trailing flush and deliver its value now
    pub async fn shutdown(&self) {
        for slot in self.inner.slots.values() {
            let mut slot = slot.lock().await;
            let Some(timer) = slot.timer.take() else {
                continue;
            };
            timer.abort();

            if let Err(e) = self.inner.complete_trailing(&mut slot).await {
                warn!("[DISPATCH] Final flush for {} failed: {}", slot.channel.id, e);
            }
        }
    }

    /// Whether a trailing flush is scheduled for `channel`
    pub async fn is_pending(&self, channel: ChannelId) -> Option<bool> {
        let slot = self.inner.slots.get(&channel)?.lock().await;
        Some(slot.state.is_pending())
    }

    /// Latest (possibly coalesced) value of `channel`
    pub async fn current_value(&self, channel: ChannelId) -> Option<Sample> {
        let slot = self.inner.slots.get(&channel)?.lock().await;
        slot.state.current()
    }

    /// Only called on the idle -> pending edge, so at most one timer exists
    /// per channel.
    fn schedule_trailing(&self, slot: &mut ChannelSlot) {
        let inner = Arc::clone(&self.inner);
        let channel = slot.channel.id;

        slot.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.interval).await;

            let Some(slot) = inner.slots.get(&channel) else {
                return;
            };
            let mut slot = slot.lock().await;
            slot.timer = None;

            if let Err(e) = inner.complete_trailing(&mut slot).await {
                error!("[DISPATCH] Trailing flush for {} failed: {}", channel, e);
            }
        }));
    }
}

impl Inner {
    fn slot(&self, channel: ChannelId) -> Result<&Mutex<ChannelSlot>, DispatchError> {
        self.slots.get(&channel).ok_or_else(|| {
            error!("[DISPATCH] No channel registered for {}", channel);
            DispatchError::UnregisteredChannel(channel)
        })
    }

    async fn complete_trailing(&self, slot: &mut ChannelSlot) -> Result<(), DispatchError> {
        let channel = slot.channel.id;
        let value = slot
            .state
            .complete_trailing()
            .map_err(|source| DispatchError::State { channel, source })?;

        match (value, slot.camera) {
            (Some(value), Some(camera)) => self.emit(&slot.channel, camera, value).await,
            _ => {
                debug!("[DISPATCH] {} trailing flush: unchanged", channel);
                Ok(())
            }
        }
    }

    /// Scale `value` and queue the resulting command
    async fn emit(
        &self,
        channel: &Channel,
        camera: CameraId,
        value: Sample,
    ) -> Result<(), DispatchError> {
        let sensitivity = self.settings.cached_sensitivity(channel.id).await;
        let command = (channel.map)(camera, &value, sensitivity).map_err(|source| {
            DispatchError::Map {
                channel: channel.id,
                source,
            }
        })?;

        debug!("[DISPATCH] {} -> {}", channel.id, command);
        self.outbox.push(command);
        Ok(())
    }
}
