// ABOUTME: SSH server address parsing for config values.
// ABOUTME: Accepts "host", "host:port", "[ipv6]:port"; the port defaults to 22.

use crate::types::{HostPort, HostPortError};

pub const DEFAULT_SSH_PORT: u16 = 22;

/// Parse an SSH server address, defaulting the port when it is omitted.
pub fn parse_server_addr(s: &str) -> Result<HostPort, HostPortError> {
    let s = s.trim();
    match HostPort::parse(s) {
        Err(HostPortError::MissingPort(_)) if !s.starts_with('[') => {
            HostPort::new(s, DEFAULT_SSH_PORT)
        }
        Err(HostPortError::MissingPort(_)) => {
            HostPort::new(s.trim_start_matches('[').trim_end_matches(']'), DEFAULT_SSH_PORT)
        }
        other => other,
    }
}
