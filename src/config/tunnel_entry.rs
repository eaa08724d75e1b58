// ABOUTME: One entry of the `tunnels` list in k8tunnel.yml.
// ABOUTME: Short form "local=remote" or a detailed map with an optional server override.

use super::server::parse_server_addr;
use crate::types::HostPort;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelEntry {
    pub local: HostPort,
    pub remote: HostPort,
    /// Overrides the top-level `server` for this tunnel only.
    pub server: Option<HostPort>,
}

impl TunnelEntry {
    pub fn new(local: HostPort, remote: HostPort) -> Self {
        Self {
            local,
            remote,
            server: None,
        }
    }

    /// Parse the short `local=remote` form.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (local, remote) = s
            .split_once('=')
            .ok_or_else(|| format!("tunnel '{s}' must look like local_host:port=remote_host:port"))?;
        let local = HostPort::parse(local).map_err(|e| format!("local address: {e}"))?;
        let remote = HostPort::parse(remote).map_err(|e| format!("remote address: {e}"))?;
        Ok(Self::new(local, remote))
    }
}

impl fmt::Display for TunnelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.local, self.remote)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Short(String),
    Detailed {
        local: HostPort,
        remote: HostPort,
        #[serde(default)]
        server: Option<String>,
    },
}

impl<'de> Deserialize<'de> for TunnelEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match RawEntry::deserialize(deserializer)? {
            RawEntry::Short(s) => TunnelEntry::parse(&s).map_err(serde::de::Error::custom),
            RawEntry::Detailed {
                local,
                remote,
                server,
            } => {
                let server = server
                    .map(|s| parse_server_addr(&s))
                    .transpose()
                    .map_err(serde::de::Error::custom)?;
                Ok(TunnelEntry {
                    local,
                    remote,
                    server,
                })
            }
        }
    }
}
