// ABOUTME: Observable lifecycle state of a single tunnel.
// ABOUTME: Idle -> Connecting -> Listening -> Reconnecting ... -> Closed.

use std::fmt;
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    /// Created, not started.
    Idle,
    /// Dialing and authenticating against the SSH server.
    Connecting,
    /// Local listener bound and accepting connections.
    Listening { local_addr: SocketAddr },
    /// Transport lost; waiting out the backoff before the next attempt.
    Reconnecting { attempt: u32 },
    /// Stopped for good. All resources released.
    Closed,
}

impl TunnelState {
    pub fn is_listening(&self) -> bool {
        matches!(self, TunnelState::Listening { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TunnelState::Closed)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            TunnelState::Listening { local_addr } => Some(*local_addr),
            _ => None,
        }
    }
}

impl fmt::Display for TunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelState::Idle => write!(f, "idle"),
            TunnelState::Connecting => write!(f, "connecting"),
            TunnelState::Listening { local_addr } => write!(f, "listening on {local_addr}"),
            TunnelState::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
            TunnelState::Closed => write!(f, "closed"),
        }
    }
}
