// ABOUTME: Validated "host:port" network address.
// ABOUTME: Used for local bind, SSH server, and remote target addresses.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostPortError {
    #[error("address cannot be empty")]
    Empty,

    #[error("address '{0}' is missing a port (expected host:port)")]
    MissingPort(String),

    #[error("address '{0}' has an empty host")]
    EmptyHost(String),

    #[error("invalid port in address '{addr}': {port}")]
    InvalidPort { addr: String, port: String },

    #[error("unterminated IPv6 literal in address '{0}'")]
    UnterminatedBracket(String),
}

/// A host (name or IP literal) paired with a TCP port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPort {
    host: String,
    port: u16,
}

impl HostPort {
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, HostPortError> {
        let host = host.into();
        if host.is_empty() {
            return Err(HostPortError::EmptyHost(format!(":{port}")));
        }
        Ok(Self { host, port })
    }

    /// `127.0.0.1:port`.
    pub fn loopback(port: u16) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port,
        }
    }

    /// Parse `host:port` or `[ipv6]:port`.
    pub fn parse(value: &str) -> Result<Self, HostPortError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(HostPortError::Empty);
        }

        let (host, port) = if let Some(rest) = value.strip_prefix('[') {
            let close = rest
                .find(']')
                .ok_or_else(|| HostPortError::UnterminatedBracket(value.to_string()))?;
            let host = &rest[..close];
            let port = rest[close + 1..]
                .strip_prefix(':')
                .ok_or_else(|| HostPortError::MissingPort(value.to_string()))?;
            (host, port)
        } else {
            let colon = value
                .rfind(':')
                .ok_or_else(|| HostPortError::MissingPort(value.to_string()))?;
            (&value[..colon], &value[colon + 1..])
        };

        if host.is_empty() {
            return Err(HostPortError::EmptyHost(value.to_string()));
        }

        let port = port.parse::<u16>().map_err(|_| HostPortError::InvalidPort {
            addr: value.to_string(),
            port: port.to_string(),
        })?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for HostPort {
    type Err = HostPortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for HostPort {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        HostPort::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_ipv4_and_hostname() {
        let addr = HostPort::parse("127.0.0.1:6443").unwrap();
        assert_eq!(addr.host(), "127.0.0.1");
        assert_eq!(addr.port(), 6443);

        let addr = HostPort::parse("bastion.example.com:22").unwrap();
        assert_eq!(addr.host(), "bastion.example.com");
        assert_eq!(addr.port(), 22);
    }

    #[test]
    fn parses_bracketed_ipv6() {
        let addr = HostPort::parse("[::1]:443").unwrap();
        assert_eq!(addr.host(), "::1");
        assert_eq!(addr.to_string(), "[::1]:443");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let addr = HostPort::parse("  10.0.0.1:22\n").unwrap();
        assert_eq!(addr.to_string(), "10.0.0.1:22");
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert_eq!(HostPort::parse(""), Err(HostPortError::Empty));
        assert!(matches!(
            HostPort::parse("localhost"),
            Err(HostPortError::MissingPort(_))
        ));
        assert!(matches!(
            HostPort::parse(":22"),
            Err(HostPortError::EmptyHost(_))
        ));
        assert!(matches!(
            HostPort::parse("host:99999"),
            Err(HostPortError::InvalidPort { .. })
        ));
        assert!(matches!(
            HostPort::parse("host:ssh"),
            Err(HostPortError::InvalidPort { .. })
        ));
        assert!(matches!(
            HostPort::parse("[::1:22"),
            Err(HostPortError::UnterminatedBracket(_))
        ));
        assert!(matches!(
            HostPort::parse("[::1]"),
            Err(HostPortError::MissingPort(_))
        ));
    }

    #[test]
    fn deserializes_from_string() {
        let addr: HostPort = serde_yaml::from_str("\"127.0.0.1:443\"").unwrap();
        assert_eq!(addr, HostPort::new("127.0.0.1", 443).unwrap());

        let err = serde_yaml::from_str::<HostPort>("\"nope\"").unwrap_err();
        assert!(err.to_string().contains("missing a port"));
    }

    proptest! {
        #[test]
        fn any_port_on_a_hostname_is_accepted(host in "[a-z][a-z0-9-]{0,20}(\\.[a-z]{2,6})?", port: u16) {
            let parsed = HostPort::parse(&format!("{host}:{port}")).unwrap();
            prop_assert_eq!(parsed.host(), host.as_str());
            prop_assert_eq!(parsed.port(), port);
        }
    }
}
