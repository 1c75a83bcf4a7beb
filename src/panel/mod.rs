//! Operator-facing side of the panel
//!
//! This module handles:
//! - Parsing widget events from the line protocol
//! - Per-client sessions with their own camera selection
//! - Serving clients over TCP and from stdin

mod input;
mod session;

pub use input::{parse_line, InputError, PanelEvent};
pub use session::{run_lines, serve, PanelContext, PanelSession};
