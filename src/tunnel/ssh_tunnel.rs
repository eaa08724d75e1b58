// ABOUTME: Lifecycle of a single forward: connect, listen, accept, forward, reconnect.
// ABOUTME: Each tunnel runs on its own worker task and publishes its state via a watch channel.

use super::backoff::ExponentialBackoff;
use super::error::{Error, Result};
use super::forward::{PipeStats, forward_connection};
use super::spec::{TunnelOptions, TunnelSpec};
use super::state::TunnelState;
use crate::diagnostics::Warning;
use crate::ssh::Session;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Pause after a failed accept so descriptor exhaustion doesn't spin the loop.
const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(100);

/// Outcome of a tunnel's first connection attempt.
pub(crate) type StartupResult = Result<SocketAddr>;

/// Handle to one tunnel owned by the manager.
#[derive(Debug)]
pub struct SshTunnel {
    index: usize,
    spec: Arc<TunnelSpec>,
    state: Arc<watch::Sender<TunnelState>>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl SshTunnel {
    pub(crate) fn new(index: usize, spec: TunnelSpec) -> Self {
        let (state, _) = watch::channel(TunnelState::Idle);
        Self {
            index,
            spec: Arc::new(spec),
            state: Arc::new(state),
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn spec(&self) -> &TunnelSpec {
        &self.spec
    }

    pub fn state(&self) -> TunnelState {
        *self.state.borrow()
    }

    /// Watch state transitions. Intermediate states may be coalesced.
    pub fn subscribe(&self) -> watch::Receiver<TunnelState> {
        self.state.subscribe()
    }

    /// Address the listener is bound to while `Listening`.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.state().local_addr()
    }

    /// Most recent failure seen by this tunnel, for status reporting.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    pub(crate) fn mark_closed(&self) {
        self.state.send_replace(TunnelState::Closed);
    }

    /// Start the worker. `startup` receives the outcome of the first attempt.
    pub(crate) fn spawn(
        &self,
        options: Arc<TunnelOptions>,
        stop: CancellationToken,
        startup: oneshot::Sender<StartupResult>,
    ) -> JoinHandle<Vec<Warning>> {
        let span = tracing::info_span!(
            "tunnel",
            index = self.index,
            local = %self.spec.local,
            remote = %self.spec.remote,
        );
        let worker = TunnelWorker {
            spec: Arc::clone(&self.spec),
            options,
            state: Arc::clone(&self.state),
            last_error: Arc::clone(&self.last_error),
            stop,
        };
        tokio::spawn(worker.run(startup).instrument(span))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServeExit {
    Stopped,
    TransportLost,
}

/// The task that owns a tunnel's session, listener, and connections.
struct TunnelWorker {
    spec: Arc<TunnelSpec>,
    options: Arc<TunnelOptions>,
    state: Arc<watch::Sender<TunnelState>>,
    last_error: Arc<Mutex<Option<String>>>,
    stop: CancellationToken,
}

impl TunnelWorker {
    async fn run(self, startup: oneshot::Sender<StartupResult>) -> Vec<Warning> {
        let mut startup = Some(startup);
        let mut backoff = ExponentialBackoff::new(self.options.reconnect.clone());
        let mut warnings = Vec::new();

        loop {
            self.set_state(TunnelState::Connecting);

            let attempt = tokio::select! {
                _ = self.stop.cancelled() => break,
                attempt = self.establish() => attempt,
            };

            match attempt {
                Ok((session, listener, local_addr)) => {
                    backoff.reset();
                    self.set_state(TunnelState::Listening { local_addr });
                    match startup.take() {
                        Some(tx) => {
                            tracing::info!("listening on {}", local_addr);
                            let _ = tx.send(Ok(local_addr));
                        }
                        None => tracing::info!("reconnected, listening on {}", local_addr),
                    }

                    if self.serve(session, listener, &mut warnings).await == ServeExit::Stopped {
                        break;
                    }

                    tracing::warn!("SSH transport to {} lost", self.spec.server);
                    self.record_error("SSH transport lost".to_string());
                }
                Err(e) => {
                    self.record_error(e.to_string());
                    match startup.take() {
                        Some(tx) => {
                            let fatal = e.is_fatal();
                            if fatal {
                                tracing::error!("tunnel failed to start: {}", e);
                            } else {
                                tracing::warn!("first connection attempt failed, will retry: {}", e);
                            }
                            let _ = tx.send(Err(e));
                            if fatal {
                                break;
                            }
                        }
                        None => tracing::warn!("reconnect attempt failed: {}", e),
                    }
                }
            }

            let delay = backoff.next_delay();
            self.set_state(TunnelState::Reconnecting {
                attempt: backoff.attempt(),
            });
            tracing::debug!("next connection attempt in {:?}", delay);

            tokio::select! {
                _ = self.stop.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if let Some(tx) = startup.take() {
            let _ = tx.send(Err(Error::Stopped));
        }
        self.set_state(TunnelState::Closed);
        tracing::debug!("tunnel closed");
        warnings
    }

    /// Connecting: SSH handshake first, then the local listener.
    async fn establish(&self) -> Result<(Session, TcpListener, SocketAddr)> {
        let session = Session::connect(self.options.session_config(&self.spec)).await?;

        let local = &self.spec.local;
        let bound = match TcpListener::bind((local.host(), local.port())).await {
            Ok(listener) => listener.local_addr().map(|addr| (listener, addr)),
            Err(e) => Err(e),
        };

        match bound {
            Ok((listener, addr)) => Ok((session, listener, addr)),
            Err(source) => {
                let _ = tokio::time::timeout(self.options.disconnect_timeout, session.disconnect())
                    .await;
                Err(Error::Bind {
                    addr: local.clone(),
                    source,
                })
            }
        }
    }

    /// Listening: accept until stopped or the transport drops, then release
    /// the listener, the forwarded connections, and the session.
    async fn serve(
        &self,
        session: Session,
        listener: TcpListener,
        warnings: &mut Vec<Warning>,
    ) -> ServeExit {
        let session = Arc::new(session);
        let connection_stop = self.stop.child_token();
        let mut connections: JoinSet<Result<PipeStats>> = JoinSet::new();

        let exit = {
            let lost = session.closed();
            tokio::pin!(lost);

            loop {
                tokio::select! {
                    _ = self.stop.cancelled() => break ServeExit::Stopped,
                    _ = &mut lost => break ServeExit::TransportLost,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            tracing::debug!("accepted connection from {}", peer);
                            connections.spawn(
                                forward_connection(
                                    stream,
                                    peer,
                                    Arc::clone(&session),
                                    self.spec.remote.clone(),
                                    connection_stop.clone(),
                                )
                                .in_current_span(),
                            );
                        }
                        Err(e) => {
                            tracing::warn!("accept failed: {}", e);
                            if let Some(exit) =
                                interruptible_pause(&self.stop, &mut lost, ACCEPT_ERROR_DELAY).await
                            {
                                break exit;
                            }
                        }
                    },
                    Some(finished) = connections.join_next(), if !connections.is_empty() => {
                        log_connection(finished);
                    }
                }
            }
        };

        drop(listener);
        connection_stop.cancel();

        let drain = async {
            while let Some(finished) = connections.join_next().await {
                log_connection(finished);
            }
        };
        if tokio::time::timeout(self.options.disconnect_timeout, drain)
            .await
            .is_err()
        {
            let pending = connections.len();
            connections.shutdown().await;
            warnings.push(Warning::connection_drain(format!(
                "tunnel {}: aborted {} forwarded connection(s) that did not finish",
                self.spec, pending
            )));
        }

        if exit == ServeExit::Stopped {
            match tokio::time::timeout(self.options.disconnect_timeout, session.disconnect()).await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warnings.push(Warning::ssh_disconnect(format!(
                    "tunnel {}: disconnect from {} failed: {}",
                    self.spec, self.spec.server, e
                ))),
                Err(_) => warnings.push(Warning::ssh_disconnect(format!(
                    "tunnel {}: disconnect from {} timed out",
                    self.spec, self.spec.server
                ))),
            }
        }

        exit
    }

    fn set_state(&self, state: TunnelState) {
        self.state.send_replace(state);
    }

    fn record_error(&self, message: String) {
        *self.last_error.lock() = Some(message);
    }
}

/// Sleep for `delay` unless the tunnel is stopped or the transport drops first.
async fn interruptible_pause(
    stop: &CancellationToken,
    lost: impl Future<Output = ()>,
    delay: Duration,
) -> Option<ServeExit> {
    tokio::select! {
        _ = stop.cancelled() => Some(ServeExit::Stopped),
        _ = lost => Some(ServeExit::TransportLost),
        _ = tokio::time::sleep(delay) => None,
    }
}

fn log_connection(finished: std::result::Result<Result<PipeStats>, JoinError>) {
    match finished {
        Ok(Ok(stats)) => tracing::debug!(
            "connection closed ({} bytes sent, {} bytes received)",
            stats.to_remote,
            stats.to_local
        ),
        Ok(Err(e)) => tracing::debug!("forwarded connection failed: {}", e),
        Err(e) if e.is_panic() => tracing::warn!("connection task panicked: {}", e),
        Err(_) => {}
    }
}
