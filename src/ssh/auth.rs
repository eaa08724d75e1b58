// ABOUTME: Resolved SSH client authentication material.
// ABOUTME: Username, parsed private key, and the expected host fingerprint.

use super::error::{Error, Result};
use super::fingerprint::HostFingerprint;
use russh::keys::{PrivateKey, decode_secret_key};
use std::fmt;
use std::sync::Arc;

/// Credentials shared by every tunnel that talks to the same SSH server identity.
#[derive(Clone)]
pub struct AuthConfig {
    username: String,
    private_key: Arc<PrivateKey>,
    host_fingerprint: HostFingerprint,
}

impl AuthConfig {
    pub fn new(
        username: impl Into<String>,
        private_key: PrivateKey,
        host_fingerprint: HostFingerprint,
    ) -> Result<Self> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(Error::EmptyUsername);
        }

        Ok(Self {
            username,
            private_key: Arc::new(private_key),
            host_fingerprint,
        })
    }

    /// Build from PEM/OpenSSH key text and a fingerprint string.
    pub fn from_openssh(
        username: impl Into<String>,
        private_key: &str,
        passphrase: Option<&str>,
        host_fingerprint: &str,
    ) -> Result<Self> {
        let key = decode_secret_key(private_key, passphrase)
            .map_err(|e| Error::InvalidKey(e.to_string()))?;
        let fingerprint = HostFingerprint::parse(host_fingerprint)?;
        Self::new(username, key, fingerprint)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn private_key(&self) -> Arc<PrivateKey> {
        Arc::clone(&self.private_key)
    }

    pub fn host_fingerprint(&self) -> &HostFingerprint {
        &self.host_fingerprint
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("private_key", &"<redacted>")
            .field("host_fingerprint", &self.host_fingerprint)
            .finish()
    }
}
