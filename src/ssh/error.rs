// ABOUTME: SSH-specific error types.
// ABOUTME: Covers dialing, authentication, host key verification, and channel failures.

use super::fingerprint::FingerprintError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("connection to {addr} failed: {reason}")]
    Connection { addr: String, reason: String },

    #[error("connection to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("authentication failed for user '{0}': server rejected the key")]
    AuthenticationFailed(String),

    #[error("host key mismatch: expected {expected}, server presented {actual}")]
    HostKeyMismatch { expected: String, actual: String },

    #[error("username cannot be empty")]
    EmptyUsername,

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("invalid host fingerprint: {0}")]
    InvalidFingerprint(#[from] FingerprintError),

    #[error("failed to open forwarded channel to {target}: {reason}")]
    ChannelOpen { target: String, reason: String },

    #[error("opening forwarded channel to {target} timed out after {timeout:?}")]
    ChannelOpenTimeout { target: String, timeout: Duration },

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("SSH key error: {0}")]
    Key(#[from] russh::keys::Error),
}

impl Error {
    /// Credentials and identity problems will not fix themselves on retry.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            Error::AuthenticationFailed(_) | Error::HostKeyMismatch { .. }
        )
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::EmptyUsername | Error::InvalidKey(_) | Error::InvalidFingerprint(_) | Error::Key(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_identity_failures_as_authentication() {
        assert!(Error::AuthenticationFailed("ubuntu".into()).is_authentication());
        assert!(
            Error::HostKeyMismatch {
                expected: "SHA256:a".into(),
                actual: "SHA256:b".into(),
            }
            .is_authentication()
        );
        assert!(
            !Error::Connection {
                addr: "bastion:22".into(),
                reason: "refused".into(),
            }
            .is_authentication()
        );
    }

    #[test]
    fn classifies_bad_material_as_configuration() {
        assert!(Error::EmptyUsername.is_configuration());
        assert!(Error::InvalidKey("garbage".into()).is_configuration());
        assert!(Error::InvalidFingerprint(FingerprintError::Empty).is_configuration());
        assert!(
            !Error::ChannelOpen {
                target: "10.0.0.5:6443".into(),
                reason: "refused".into(),
            }
            .is_configuration()
        );
    }
}
