// ABOUTME: Application-wide error types for k8tunnel.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read {path}: {source}")]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Ssh(#[from] crate::ssh::Error),

    #[error(transparent)]
    Tunnel(#[from] crate::tunnel::Error),

    #[error("all {0} tunnel(s) failed to start")]
    AllTunnelsFailed(usize),
}

impl Error {
    /// Whether this error means the configuration itself must be fixed.
    pub fn is_configuration(&self) -> bool {
        match self {
            Error::ConfigNotFound(_)
            | Error::MissingEnvVar(_)
            | Error::InvalidConfig(_)
            | Error::ReadSource { .. }
            | Error::Yaml(_) => true,
            Error::Ssh(e) => e.is_configuration(),
            Error::Tunnel(e) => e.kind() == crate::tunnel::ErrorKind::Configuration,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
