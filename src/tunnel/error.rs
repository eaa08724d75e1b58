// ABOUTME: Error types for tunnel lifecycle operations.
// ABOUTME: Maps every failure onto configuration/authentication/transport/forwarding kinds.

use crate::ssh;
use crate::types::HostPort;

/// Errors that can occur while starting, running, or stopping tunnels.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// SSH dial, handshake, authentication, or channel failure.
    #[error(transparent)]
    Ssh(#[from] ssh::Error),

    /// The local listener could not be bound.
    #[error("failed to bind local address {addr}: {source}")]
    Bind {
        addr: HostPort,
        #[source]
        source: std::io::Error,
    },

    /// A forwarded connection's byte pipe failed.
    #[error("forwarding {peer} -> {target} failed: {source}")]
    Forward {
        peer: std::net::SocketAddr,
        target: HostPort,
        #[source]
        source: std::io::Error,
    },

    /// The tunnel was told to stop before it finished starting.
    #[error("tunnel stopped before it started listening")]
    Stopped,

    /// The tunnel worker went away without reporting a startup result.
    #[error("tunnel worker exited unexpectedly")]
    WorkerExited,

    /// `launch` was called on a manager that was already launched.
    #[error("tunnels were already launched")]
    AlreadyLaunched,

    /// `launch` was called after `close`.
    #[error("tunnel manager is closed")]
    Closed,
}

/// Failure categories, deciding whether a failure is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad address, unparseable key, unusable bind address. Not retried.
    Configuration,
    /// Rejected credentials or host fingerprint mismatch. Not retried.
    Authentication,
    /// Dial failure, timeout, dropped session. Retried with backoff.
    Transport,
    /// A single forwarded connection failed. Local to that connection.
    Forwarding,
    /// Manager/tunnel lifecycle misuse or shutdown.
    Lifecycle,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Ssh(e) if e.is_authentication() => ErrorKind::Authentication,
            Error::Ssh(e) if e.is_configuration() => ErrorKind::Configuration,
            Error::Ssh(ssh::Error::ChannelOpen { .. })
            | Error::Ssh(ssh::Error::ChannelOpenTimeout { .. }) => ErrorKind::Forwarding,
            Error::Ssh(_) => ErrorKind::Transport,
            Error::Bind { .. } => ErrorKind::Configuration,
            Error::Forward { .. } => ErrorKind::Forwarding,
            Error::Stopped | Error::WorkerExited | Error::AlreadyLaunched | Error::Closed => {
                ErrorKind::Lifecycle
            }
        }
    }

    /// Fatal errors end a tunnel's first start attempt for good.
    pub fn is_fatal(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Transport | ErrorKind::Forwarding)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> HostPort {
        HostPort::parse("127.0.0.1:443").unwrap()
    }

    #[test]
    fn bind_failures_are_fatal_configuration_errors() {
        let err = Error::Bind {
            addr: addr(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.is_fatal());
        assert!(err.to_string().contains("127.0.0.1:443"));
    }

    #[test]
    fn host_key_mismatch_is_fatal_authentication_error() {
        let err = Error::from(ssh::Error::HostKeyMismatch {
            expected: "SHA256:a".into(),
            actual: "SHA256:b".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(err.is_fatal());
    }

    #[test]
    fn dial_failures_are_transient() {
        let err = Error::from(ssh::Error::Connection {
            addr: "bastion:22".into(),
            reason: "connection refused".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(!err.is_fatal());

        let err = Error::from(ssh::Error::ConnectTimeout {
            addr: "bastion:22".into(),
            timeout: std::time::Duration::from_secs(1),
        });
        assert!(!err.is_fatal());
    }

    #[test]
    fn channel_failures_are_forwarding_errors() {
        let err = Error::from(ssh::Error::ChannelOpen {
            target: "127.0.0.1:6443".into(),
            reason: "administratively prohibited".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Forwarding);
    }

    #[test]
    fn lifecycle_errors_are_fatal() {
        assert_eq!(Error::Stopped.kind(), ErrorKind::Lifecycle);
        assert!(Error::AlreadyLaunched.is_fatal());
    }
}
