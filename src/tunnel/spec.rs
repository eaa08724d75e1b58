// ABOUTME: Declarative description of one forward and the tuning shared by all tunnels.
// ABOUTME: TunnelSpec is immutable; TunnelOptions carries timeouts, keepalives, and backoff.

use super::backoff::ReconnectConfig;
use crate::ssh::{AuthConfig, SessionConfig};
use crate::types::HostPort;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// One local -> remote forward through an SSH server.
#[derive(Debug, Clone)]
pub struct TunnelSpec {
    /// Where the local listener binds.
    pub local: HostPort,
    /// SSH server that carries the forwarded channels.
    pub server: HostPort,
    /// Address the SSH server connects to on our behalf.
    pub remote: HostPort,
    /// Credentials, shared with other tunnels using the same identity.
    pub auth: Arc<AuthConfig>,
}

impl TunnelSpec {
    pub fn new(local: HostPort, server: HostPort, remote: HostPort, auth: Arc<AuthConfig>) -> Self {
        Self {
            local,
            server,
            remote,
            auth,
        }
    }
}

impl fmt::Display for TunnelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} via {}", self.local, self.remote, self.server)
    }
}

/// Tuning applied to every tunnel owned by a manager.
#[derive(Debug, Clone)]
pub struct TunnelOptions {
    pub connect_timeout: Duration,
    pub keepalive_interval: Option<Duration>,
    pub keepalive_max: usize,
    pub channel_open_timeout: Duration,
    /// Bound on the polite SSH disconnect during shutdown.
    pub disconnect_timeout: Duration,
    pub reconnect: ReconnectConfig,
}

impl Default for TunnelOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            keepalive_interval: Some(Duration::from_secs(15)),
            keepalive_max: 3,
            channel_open_timeout: Duration::from_secs(10),
            disconnect_timeout: Duration::from_secs(2),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl TunnelOptions {
    pub(crate) fn session_config(&self, spec: &TunnelSpec) -> SessionConfig {
        SessionConfig::new(spec.server.clone(), Arc::clone(&spec.auth))
            .connect_timeout(self.connect_timeout)
            .keepalive(self.keepalive_interval, self.keepalive_max)
            .channel_open_timeout(self.channel_open_timeout)
    }
}
