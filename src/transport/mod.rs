//! Outbound delivery of camera commands
//!
//! This module handles:
//! - The transport trait and its HTTP implementation
//! - The outbound queue between the dispatcher and the transport
//! - The sender loop that drains the queue without waiting on responses

pub mod http;
pub mod queue;
pub mod traits;

pub use http::{HttpConfig, HttpTransport};
pub use queue::{command_queue, run_sender, CommandQueue, CommandReceiver};
pub use traits::CommandTransport;
