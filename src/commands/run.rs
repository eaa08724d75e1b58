// ABOUTME: Run command implementation.
// ABOUTME: Launches every tunnel, waits for SIGINT/SIGTERM, then closes them exactly once.

use k8tunnel::config::LoadedConfig;
use k8tunnel::error::{Error, Result};
use k8tunnel::output::Output;
use k8tunnel::tunnel::{LaunchError, SshTunnelsManager};
use std::io;
use tokio::signal;

/// Start all configured tunnels and keep them running until a signal.
pub async fn run(loaded: LoadedConfig, output: &Output) -> Result<()> {
    let resolved = loaded.resolve()?;
    let mut shutdown = ShutdownSignal::install()?;

    let manager = SshTunnelsManager::with_options(resolved.tunnels, resolved.options);
    output.progress(&format!("Starting {} tunnel(s)...", manager.len()));

    let launched = tokio::select! {
        launched = manager.launch() => Some(launched),
        _ = shutdown.recv() => None,
    };

    let result = match launched {
        None => Ok(()),
        Some(Err(e)) => Err(e.into()),
        Some(Ok(failures)) => {
            report_launch(&manager, &failures, output);
            if all_failed_fatally(&manager, &failures) {
                Err(Error::AllTunnelsFailed(failures.len()))
            } else {
                shutdown.recv().await;
                Ok(())
            }
        }
    };

    output.progress("Closing tunnels...");
    let diagnostics = manager.close().await;
    for warning in diagnostics.warnings() {
        output.warning(&warning.message);
    }
    if result.is_ok() {
        output.success("All tunnels closed");
    }
    result
}

fn report_launch(manager: &SshTunnelsManager, failures: &[LaunchError], output: &Output) {
    for failure in failures {
        if failure.error.is_fatal() {
            output.error(&failure.to_string());
        } else {
            output.warning(&format!("{failure} (retrying in the background)"));
        }
    }

    for tunnel in manager.tunnels() {
        if let Some(addr) = tunnel.local_addr() {
            let spec = tunnel.spec();
            output.forwarding(addr, &spec.remote.to_string(), &spec.server.to_string());
        }
    }
}

fn all_failed_fatally(manager: &SshTunnelsManager, failures: &[LaunchError]) -> bool {
    failures.len() == manager.len() && failures.iter().all(|f| f.error.is_fatal())
}

/// SIGINT (Ctrl+C) or, on Unix, SIGTERM.
struct ShutdownSignal {
    #[cfg(unix)]
    terminate: signal::unix::Signal,
}

impl ShutdownSignal {
    fn install() -> io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: signal::unix::signal(signal::unix::SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::warn!("failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = self.terminate.recv();
        #[cfg(not(unix))]
        let terminate = std::future::pending::<Option<()>>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
            _ = terminate => tracing::info!("received SIGTERM, shutting down"),
        }
    }
}
