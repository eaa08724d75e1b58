// ABOUTME: Config values that come from a literal, an environment variable, or a file.
// ABOUTME: File paths resolve relative to the directory holding the config file.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ValueSource {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
    FromFile {
        file: PathBuf,
    },
}

impl ValueSource {
    pub fn literal(value: impl Into<String>) -> Self {
        ValueSource::Literal(value.into())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        ValueSource::FromFile { file: path.into() }
    }

    /// Resolve to the raw value, unmodified.
    pub fn resolve_raw(&self, base_dir: &Path) -> Result<String> {
        match self {
            ValueSource::Literal(s) => Ok(s.clone()),
            ValueSource::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
            ValueSource::FromFile { file } => {
                let path = base_dir.join(file);
                std::fs::read_to_string(&path).map_err(|source| Error::ReadSource { path, source })
            }
        }
    }

    /// Resolve and trim surrounding whitespace (trailing newlines in files).
    pub fn resolve(&self, base_dir: &Path) -> Result<String> {
        self.resolve_raw(base_dir).map(|s| s.trim().to_string())
    }

    /// Short description for `check` output, never the secret itself.
    pub fn describe(&self) -> String {
        match self {
            ValueSource::Literal(_) => "literal".to_string(),
            ValueSource::FromEnv { var, .. } => format!("env ${var}"),
            ValueSource::FromFile { file } => format!("file {}", file.display()),
        }
    }
}
