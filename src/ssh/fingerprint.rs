// ABOUTME: Fixed host key fingerprints for server identity verification.
// ABOUTME: Supports OpenSSH SHA256 and legacy colon-separated MD5 formats.

use md5::{Digest, Md5};
use russh::keys::ssh_key::{HashAlg, PublicKey};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("host fingerprint cannot be empty")]
    Empty,

    #[error("SHA256 fingerprint has no digest after the prefix")]
    EmptyDigest,

    #[error("unrecognised host fingerprint format: '{0}' (expected SHA256:<base64> or MD5 hex pairs)")]
    UnknownFormat(String),
}

/// The expected digest of the SSH server's public host key.
///
/// Verification is an exact comparison against this value; no known_hosts
/// store or certificate chain is consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostFingerprint {
    /// `SHA256:<unpadded base64>` as printed by `ssh-keygen -l`.
    Sha256(String),
    /// Legacy MD5 digest, stored as lowercase colon-separated hex pairs.
    Md5(String),
}

impl HostFingerprint {
    pub fn parse(value: &str) -> Result<Self, FingerprintError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(FingerprintError::Empty);
        }

        if let Some(digest) = value.strip_prefix("SHA256:") {
            if digest.is_empty() {
                return Err(FingerprintError::EmptyDigest);
            }
            return Ok(Self::Sha256(value.to_string()));
        }

        let hex = value
            .strip_prefix("MD5:")
            .or_else(|| value.strip_prefix("md5:"))
            .unwrap_or(value);
        if is_md5_hex_pairs(hex) {
            return Ok(Self::Md5(hex.to_ascii_lowercase()));
        }

        Err(FingerprintError::UnknownFormat(value.to_string()))
    }

    /// SHA256 fingerprint of a key, in OpenSSH notation.
    pub fn sha256_of(key: &PublicKey) -> Self {
        Self::Sha256(key.fingerprint(HashAlg::Sha256).to_string())
    }

    /// MD5 fingerprint of a key's wire encoding.
    pub fn md5_of(key: &PublicKey) -> Option<Self> {
        let blob = key.to_bytes().ok()?;
        let digest = Md5::digest(&blob);
        let hex = digest
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":");
        Some(Self::Md5(hex))
    }

    /// Fingerprint of `key` computed in the same format as `self`.
    pub fn compute_for(&self, key: &PublicKey) -> Option<Self> {
        match self {
            Self::Sha256(_) => Some(Self::sha256_of(key)),
            Self::Md5(_) => Self::md5_of(key),
        }
    }

    pub fn matches(&self, key: &PublicKey) -> bool {
        self.compute_for(key).as_ref() == Some(self)
    }
}

impl fmt::Display for HostFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256(s) => write!(f, "{s}"),
            Self::Md5(s) => write!(f, "MD5:{s}"),
        }
    }
}

fn is_md5_hex_pairs(value: &str) -> bool {
    let pairs: Vec<&str> = value.split(':').collect();
    pairs.len() == 16
        && pairs
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()))
}
