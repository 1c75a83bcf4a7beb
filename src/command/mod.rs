//! Rate-limited command dispatch
//!
//! This module handles:
//! - Registering the controllable channels and their mapping functions
//! - Throttling and coalescing widget samples per channel
//! - Returning axes to rest on release

mod channel;
mod dispatcher;

pub use channel::{Channel, ChannelRegistry, MapFn};
pub use dispatcher::{DispatchError, RateLimitedDispatcher};
