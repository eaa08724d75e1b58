// ABOUTME: SSH client module for the bastion connection.
// ABOUTME: Public-key auth with fixed-fingerprint host verification and direct-tcpip channels.

mod auth;
mod client;
mod error;
mod fingerprint;

pub use auth::AuthConfig;
pub use client::{Session, SessionConfig};
pub use error::{Error, Result};
pub use fingerprint::{FingerprintError, HostFingerprint};
