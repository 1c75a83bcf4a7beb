//! Transport trait abstraction for the camera backend

use anyhow::Result;
use async_trait::async_trait;
use ptz_shared::OutboundCommand;

/// Delivers commands to the camera backend
///
/// Sending is fire-and-forget from the dispatcher's point of view: results
/// are only logged by the sender loop and never fed back.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Deliver one command
    async fn send(&self, command: &OutboundCommand) -> Result<()>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
