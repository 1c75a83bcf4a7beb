//! Outbound command queue and the sender loop that drains it

use crate::transport::traits::CommandTransport;
use ptz_shared::OutboundCommand;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Receiving half of the outbound queue
pub type CommandReceiver = mpsc::UnboundedReceiver<OutboundCommand>;

/// Producer handle for outbound commands; pushing never waits
#[derive(Debug, Clone)]
pub struct CommandQueue {
    tx: mpsc::UnboundedSender<OutboundCommand>,
}

impl CommandQueue {
    /// Enqueue a command for delivery
    pub fn push(&self, command: OutboundCommand) {
        if let Err(e) = self.tx.send(command) {
            warn!("[TRANSPORT] Sender loop gone, dropping {}", e.0);
        }
    }
}

/// Create a connected queue/receiver pair
pub fn command_queue() -> (CommandQueue, CommandReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommandQueue { tx }, rx)
}

/// Drain the queue, handing every command to the transport on its own task
///
/// Requests run concurrently and their outcome is only logged; nothing is
/// retried. Returns once every `CommandQueue` handle has been dropped.
pub async fn run_sender(mut rx: CommandReceiver, transport: Arc<dyn CommandTransport>) {
    info!("[TRANSPORT] Sender started ({})", transport.name());

    while let Some(command) = rx.recv().await {
        let transport = transport.clone();
        tokio::spawn(async move {
            match transport.send(&command).await {
                Ok(()) => debug!("[TRANSPORT] Sent {}", command),
                Err(e) => warn!("[TRANSPORT] Failed to send {}: {}", command, e),
            }
        });
    }

    info!("[TRANSPORT] Sender stopped");
}
