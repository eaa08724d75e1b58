// ABOUTME: Config scaffolding for new deployments.
// ABOUTME: Creates a commented k8tunnel.yml template.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::{
    CONFIG_FILENAME, Config, DEFAULT_FINGERPRINT_FILE, DEFAULT_PRIVATE_KEY_FILE,
    DEFAULT_SERVER_FILE, DEFAULT_USER,
};

/// Write a template config into `dir`. Returns the path written.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let yaml = generate_template_yaml();
    // The template must stay loadable.
    Config::from_yaml(&yaml)?;
    std::fs::write(&config_path, yaml)?;

    Ok(config_path)
}

fn generate_template_yaml() -> String {
    format!(
        r#"# SSH server carrying the tunnels, as host[:port] (port defaults to 22).
# Every value below accepts a literal, {{ env: VAR, default: ... }} or {{ file: path }}.
# File paths are relative to this file.
server: {{ file: {DEFAULT_SERVER_FILE} }}
user: {DEFAULT_USER}
private_key: {{ file: {DEFAULT_PRIVATE_KEY_FILE} }}
# private_key_passphrase: {{ env: K8TUNNEL_KEY_PASSPHRASE }}

# SHA256:... as printed by ssh-keygen -lf, or a legacy MD5 aa:bb:... fingerprint.
host_fingerprint: {{ file: {DEFAULT_FINGERPRINT_FILE} }}

# local=remote, or a map with local/remote and an optional per-tunnel server.
tunnels:
  - 127.0.0.1:443=127.0.0.1:443
  - local: 127.0.0.1:6443
    remote: 127.0.0.1:6443

# connect_timeout: 15s
# keepalive_interval: 15s
# keepalive_max: 3
# channel_open_timeout: 10s
# disconnect_timeout: 2s
# reconnect:
#   initial_delay: 1s
#   max_delay: 30s
#   multiplier: 2.0
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValueSource;

    #[test]
    fn template_round_trips_to_defaults() {
        let config = Config::from_yaml(&generate_template_yaml()).unwrap();
        let defaults = Config::default();
        assert_eq!(config.server, defaults.server);
        assert_eq!(config.user, ValueSource::literal("ubuntu"));
        assert_eq!(config.tunnels, defaults.tunnels);
        assert!(config.private_key_passphrase.is_none());
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), false).unwrap();

        let err = init_config(dir.path(), false).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));

        let path = init_config(dir.path(), true).unwrap();
        assert_eq!(path, dir.path().join(CONFIG_FILENAME));
    }
}
