// ABOUTME: Owns a set of tunnels: concurrent launch with aggregated startup errors,
// ABOUTME: and one coordinated, idempotent shutdown.

use super::error::{Error, Result};
use super::spec::{TunnelOptions, TunnelSpec};
use super::ssh_tunnel::SshTunnel;
use super::state::TunnelState;
use crate::diagnostics::{Diagnostics, Warning};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A tunnel that did not reach `Listening` on its first attempt.
#[derive(Debug)]
pub struct LaunchError {
    pub index: usize,
    pub spec: TunnelSpec,
    pub error: Error,
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tunnel {} ({}): {}", self.index, self.spec, self.error)
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Runs every tunnel on its own worker and shuts them all down together.
pub struct SshTunnelsManager {
    tunnels: Vec<SshTunnel>,
    options: Arc<TunnelOptions>,
    shutdown: CancellationToken,
    launched: AtomicBool,
    workers: Mutex<Vec<JoinHandle<Vec<Warning>>>>,
}

impl SshTunnelsManager {
    pub fn new(specs: impl IntoIterator<Item = TunnelSpec>) -> Self {
        Self::with_options(specs, TunnelOptions::default())
    }

    pub fn with_options(specs: impl IntoIterator<Item = TunnelSpec>, options: TunnelOptions) -> Self {
        let tunnels = specs
            .into_iter()
            .enumerate()
            .map(|(index, spec)| SshTunnel::new(index, spec))
            .collect();
        Self {
            tunnels,
            options: Arc::new(options),
            shutdown: CancellationToken::new(),
            launched: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn tunnels(&self) -> &[SshTunnel] {
        &self.tunnels
    }

    pub fn len(&self) -> usize {
        self.tunnels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tunnels.is_empty()
    }

    pub fn options(&self) -> &TunnelOptions {
        &self.options
    }

    /// Snapshot of every tunnel's state, in configuration order.
    pub fn states(&self) -> Vec<TunnelState> {
        self.tunnels.iter().map(SshTunnel::state).collect()
    }

    /// Start all tunnels concurrently and wait for each first attempt.
    ///
    /// Returns one entry per tunnel whose first attempt failed. Tunnels
    /// that started keep running and reconnect on their own. Fatal
    /// failures leave their tunnel `Closed`; transient ones are reported
    /// and the tunnel keeps retrying in the background.
    ///
    /// Fails with `AlreadyLaunched` on a second call and `Closed` after
    /// `close`.
    pub async fn launch(&self) -> Result<Vec<LaunchError>> {
        if self.launched.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyLaunched);
        }

        let receivers = {
            let mut workers = self.workers.lock().await;
            // close() takes this lock after cancelling, so no worker can be
            // spawned behind its back.
            if self.shutdown.is_cancelled() {
                return Err(Error::Closed);
            }

            tracing::info!("launching {} tunnel(s)", self.tunnels.len());
            let mut receivers = Vec::with_capacity(self.tunnels.len());
            for tunnel in &self.tunnels {
                let (tx, rx) = oneshot::channel();
                workers.push(tunnel.spawn(
                    Arc::clone(&self.options),
                    self.shutdown.child_token(),
                    tx,
                ));
                receivers.push(rx);
            }
            receivers
        };

        let outcomes = futures::future::join_all(receivers).await;

        let failures: Vec<LaunchError> = self
            .tunnels
            .iter()
            .zip(outcomes)
            .filter_map(|(tunnel, outcome)| {
                let error = match outcome {
                    Ok(Ok(_)) => return None,
                    Ok(Err(e)) => e,
                    Err(_) => Error::WorkerExited,
                };
                Some(LaunchError {
                    index: tunnel.index(),
                    spec: tunnel.spec().clone(),
                    error,
                })
            })
            .collect();

        if failures.is_empty() {
            tracing::info!("all tunnels listening");
        } else {
            tracing::warn!(
                "{} of {} tunnel(s) failed to start",
                failures.len(),
                self.tunnels.len()
            );
        }
        Ok(failures)
    }

    /// Stop every tunnel and wait until all of them have released their
    /// resources. Safe to call repeatedly and concurrently with `launch`.
    pub async fn close(&self) -> Diagnostics {
        self.shutdown.cancel();

        let mut diagnostics = Diagnostics::default();
        let mut workers = self.workers.lock().await;
        for worker in workers.drain(..) {
            match worker.await {
                Ok(warnings) => warnings.into_iter().for_each(|w| diagnostics.warn(w)),
                Err(e) if e.is_panic() => {
                    diagnostics.warn(Warning::worker_panicked(format!(
                        "tunnel worker panicked: {e}"
                    )));
                }
                Err(_) => {}
            }
        }
        drop(workers);

        for tunnel in &self.tunnels {
            tunnel.mark_closed();
        }
        tracing::debug!("all tunnels closed");
        diagnostics
    }
}

impl fmt::Debug for SshTunnelsManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshTunnelsManager")
            .field("tunnels", &self.tunnels)
            .field("launched", &self.launched.load(Ordering::SeqCst))
            .field("closed", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl Drop for SshTunnelsManager {
    fn drop(&mut self) {
        // Workers still observe the token and tear themselves down.
        self.shutdown.cancel();
    }
}
