//! Request codec for the camera backend
//!
//! Commands travel as plain HTTP/1.1 GET requests:
//! ```text
//! GET /{path}?{k1}={v1}&{k2}={v2} HTTP/1.1\r\n
//! Host: {host}\r\n
//! Connection: close\r\n
//! \r\n
//! ```
//!
//! Query values are percent-encoded; keys are emitted as-is.

use crate::OutboundCommand;
use thiserror::Error;

/// Maximum response head we are willing to buffer before giving up
pub const MAX_STATUS_LINE: usize = 8 * 1024;

/// Errors that can occur while reading a backend response
#[derive(Error, Debug, PartialEq)]
pub enum CodecError {
    #[error("Status line too long: {0} bytes (max: {MAX_STATUS_LINE})")]
    StatusLineTooLong(usize),

    #[error("Malformed status line: {0:?}")]
    MalformedStatusLine(String),
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~')
}

/// Percent-encode a query value
pub fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for &b in value.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

/// Encode a command as a request target without the leading slash
pub fn encode_target(command: &OutboundCommand) -> String {
    let mut target = command.path().to_string();

    for (i, (key, value)) in command.query().iter().enumerate() {
        target.push(if i == 0 { '?' } else { '&' });
        target.push_str(key);
        target.push('=');
        target.push_str(&encode_component(value));
    }

    target
}

/// Encode a complete GET request for the given host
pub fn encode_request(command: &OutboundCommand, host: &str) -> String {
    format!(
        "GET /{} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        encode_target(command),
        host
    )
}

/// Extract the status code from the start of a response
///
/// Returns:
/// - `Ok(Some(code))` once a full status line is buffered
/// - `Ok(None)` if more data is needed
/// - `Err(_)` if the response can never yield a status line
pub fn decode_status(buf: &[u8]) -> Result<Option<u16>, CodecError> {
    let end = match buf.windows(2).position(|w| w == b"\r\n") {
        Some(end) => end,
        None if buf.len() > MAX_STATUS_LINE => {
            return Err(CodecError::StatusLineTooLong(buf.len()));
        }
        None => return Ok(None),
    };

    let line = String::from_utf8_lossy(&buf[..end]);
    let mut parts = line.split_whitespace();

    match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/") => code
            .parse::<u16>()
            .map(Some)
            .map_err(|_| CodecError::MalformedStatusLine(line.to_string())),
        _ => Err(CodecError::MalformedStatusLine(line.to_string())),
    }
}
