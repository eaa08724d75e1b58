// ABOUTME: Check command implementation.
// ABOUTME: Resolves the configuration and lists tunnels without connecting anywhere.

use k8tunnel::config::LoadedConfig;
use k8tunnel::error::Result;
use k8tunnel::output::Output;

pub fn check(loaded: LoadedConfig, output: &Output) -> Result<()> {
    let resolved = loaded.resolve()?;

    match &loaded.path {
        Some(path) => output.progress(&format!("Config: {}", path.display())),
        None => output.progress("Config: built-in defaults"),
    }
    output.progress(&format!(
        "User: {} (key from {})",
        resolved.auth.username(),
        loaded.config.private_key.describe()
    ));
    output.progress(&format!(
        "Host fingerprint: {}",
        resolved.auth.host_fingerprint()
    ));
    for spec in &resolved.tunnels {
        output.progress(&format!("  {spec}"));
    }

    output.success(&format!(
        "Configuration OK: {} tunnel(s)",
        resolved.tunnels.len()
    ));
    Ok(())
}
