// ABOUTME: Configuration types and parsing for k8tunnel.yml.
// ABOUTME: Handles YAML parsing, value sources, and resolution into tunnel specs.

mod deserialize;
mod init;
mod server;
mod tunnel_entry;
mod value_source;

pub use init::init_config;
pub use server::{DEFAULT_SSH_PORT, parse_server_addr};
pub use tunnel_entry::TunnelEntry;
pub use value_source::ValueSource;

use crate::error::{Error, Result};
use crate::ssh::AuthConfig;
use crate::tunnel::{ReconnectConfig, TunnelOptions, TunnelSpec};
use crate::types::HostPort;
use deserialize::deserialize_tunnels;
use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "k8tunnel.yml";
pub const CONFIG_FILENAME_ALT: &str = "k8tunnel.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".k8tunnel/config.yml";

pub const DEFAULT_USER: &str = "ubuntu";
pub const DEFAULT_SERVER_FILE: &str = "tunnel-server-url";
pub const DEFAULT_PRIVATE_KEY_FILE: &str = "authorized-ssh-private-key";
pub const DEFAULT_FINGERPRINT_FILE: &str = "host-md5-fingerprint";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_server")]
    pub server: ValueSource,

    #[serde(default = "default_user")]
    pub user: ValueSource,

    #[serde(default = "default_private_key")]
    pub private_key: ValueSource,

    #[serde(default)]
    pub private_key_passphrase: Option<ValueSource>,

    #[serde(default = "default_host_fingerprint")]
    pub host_fingerprint: ValueSource,

    #[serde(default = "default_tunnels", deserialize_with = "deserialize_tunnels")]
    pub tunnels: NonEmpty<TunnelEntry>,

    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    #[serde(default = "default_keepalive_interval", with = "humantime_serde")]
    pub keepalive_interval: Option<Duration>,

    #[serde(default = "default_keepalive_max")]
    pub keepalive_max: usize,

    #[serde(default = "default_channel_open_timeout", with = "humantime_serde")]
    pub channel_open_timeout: Duration,

    #[serde(default = "default_disconnect_timeout", with = "humantime_serde")]
    pub disconnect_timeout: Duration,

    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

fn default_server() -> ValueSource {
    ValueSource::file(DEFAULT_SERVER_FILE)
}

fn default_user() -> ValueSource {
    ValueSource::literal(DEFAULT_USER)
}

fn default_private_key() -> ValueSource {
    ValueSource::file(DEFAULT_PRIVATE_KEY_FILE)
}

fn default_host_fingerprint() -> ValueSource {
    ValueSource::file(DEFAULT_FINGERPRINT_FILE)
}

fn default_tunnels() -> NonEmpty<TunnelEntry> {
    let forward = |port| TunnelEntry::new(HostPort::loopback(port), HostPort::loopback(port));
    NonEmpty::from((forward(443), vec![forward(6443)]))
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_keepalive_interval() -> Option<Duration> {
    Some(Duration::from_secs(15))
}

fn default_keepalive_max() -> usize {
    3
}

fn default_channel_open_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_disconnect_timeout() -> Duration {
    Duration::from_secs(2)
}

impl Default for Config {
    /// Credentials in three files in the working directory; HTTPS and the
    /// Kubernetes API forwarded to the same ports on the server side.
    fn default() -> Self {
        Config {
            server: default_server(),
            user: default_user(),
            private_key: default_private_key(),
            private_key_passphrase: None,
            host_fingerprint: default_host_fingerprint(),
            tunnels: default_tunnels(),
            connect_timeout: default_connect_timeout(),
            keepalive_interval: default_keepalive_interval(),
            keepalive_max: default_keepalive_max(),
            channel_open_timeout: default_channel_open_timeout(),
            disconnect_timeout: default_disconnect_timeout(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Everything the tunnel manager needs, with secrets loaded and validated.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub auth: Arc<AuthConfig>,
    pub tunnels: NonEmpty<TunnelSpec>,
    pub options: TunnelOptions,
}

/// A config together with the directory its file sources are relative to.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    /// Config file that was read, `None` when running on built-in defaults.
    pub path: Option<PathBuf>,
    pub base_dir: PathBuf,
}

impl LoadedConfig {
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.config.resolve(&self.base_dir)
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// First config file present in `dir`, if any.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        [CONFIG_FILENAME, CONFIG_FILENAME_ALT, CONFIG_FILENAME_DIR]
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        match Self::find(dir) {
            Some(path) => Self::load(&path),
            None => Err(Error::ConfigNotFound(dir.to_path_buf())),
        }
    }

    /// Load an explicit file, or discover one in `dir`, or fall back to
    /// the built-in defaults rooted at `dir`.
    pub fn load_or_default(explicit: Option<&Path>, dir: &Path) -> Result<LoadedConfig> {
        let path = match explicit {
            Some(path) if !path.exists() => return Err(Error::ConfigNotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::find(dir),
        };

        match path {
            Some(path) => {
                let config = Self::load(&path)?;
                let base_dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| dir.to_path_buf());
                tracing::debug!("loaded configuration from {}", path.display());
                Ok(LoadedConfig {
                    config,
                    path: Some(path),
                    base_dir,
                })
            }
            None => {
                tracing::info!(
                    "no configuration file in {}, using built-in defaults",
                    dir.display()
                );
                Ok(LoadedConfig {
                    config: Config::default(),
                    path: None,
                    base_dir: dir.to_path_buf(),
                })
            }
        }
    }

    /// Tunables shared by every tunnel.
    pub fn tunnel_options(&self) -> TunnelOptions {
        TunnelOptions {
            connect_timeout: self.connect_timeout,
            keepalive_interval: self.keepalive_interval,
            keepalive_max: self.keepalive_max,
            channel_open_timeout: self.channel_open_timeout,
            disconnect_timeout: self.disconnect_timeout,
            reconnect: self.reconnect.clone(),
        }
    }

    /// Read every value source and build the tunnel specs.
    pub fn resolve(&self, base_dir: &Path) -> Result<ResolvedConfig> {
        let server_text = self.server.resolve(base_dir)?;
        let server = parse_server_addr(&server_text)
            .map_err(|e| Error::InvalidConfig(format!("server: {e}")))?;

        let user = self.user.resolve(base_dir)?;
        let key = self.private_key.resolve_raw(base_dir)?;
        let passphrase = self
            .private_key_passphrase
            .as_ref()
            .map(|p| p.resolve_raw(base_dir))
            .transpose()?;
        let fingerprint = self.host_fingerprint.resolve(base_dir)?;

        let auth = Arc::new(AuthConfig::from_openssh(
            user,
            &key,
            passphrase.as_deref(),
            &fingerprint,
        )?);

        let tunnels = self.tunnels.clone().map(|entry| {
            TunnelSpec::new(
                entry.local,
                entry.server.unwrap_or_else(|| server.clone()),
                entry.remote,
                Arc::clone(&auth),
            )
        });

        Ok(ResolvedConfig {
            auth,
            tunnels,
            options: self.tunnel_options(),
        })
    }
}
