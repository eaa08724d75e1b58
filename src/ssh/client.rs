// ABOUTME: SSH session management using russh.
// ABOUTME: Handles dialing, fingerprint verification, key auth, and forwarded channels.

use super::auth::AuthConfig;
use super::error::{Error, Result};
use super::fingerprint::HostFingerprint;
use crate::types::HostPort;
use russh::client::{self, Config, DisconnectReason, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, ssh_key};
use russh::{Channel, Disconnect};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How often `Session::closed` re-checks the handle in case the
/// disconnect callback never fires.
const CLOSED_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Configuration for establishing an SSH session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// SSH server to dial.
    pub server: HostPort,
    /// Credentials and expected host identity.
    pub auth: Arc<AuthConfig>,
    /// Upper bound for dial + handshake + authentication.
    pub connect_timeout: Duration,
    /// Interval between keepalive requests (None disables keepalives).
    pub keepalive_interval: Option<Duration>,
    /// Unanswered keepalives tolerated before the transport is declared dead.
    pub keepalive_max: usize,
    /// Upper bound for a single forwarded-channel open request.
    pub channel_open_timeout: Duration,
}

impl SessionConfig {
    pub fn new(server: HostPort, auth: Arc<AuthConfig>) -> Self {
        Self {
            server,
            auth,
            connect_timeout: Duration::from_secs(15),
            keepalive_interval: Some(Duration::from_secs(15)),
            keepalive_max: 3,
            channel_open_timeout: Duration::from_secs(10),
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn keepalive(mut self, interval: Option<Duration>, max: usize) -> Self {
        self.keepalive_interval = interval;
        self.keepalive_max = max;
        self
    }

    pub fn channel_open_timeout(mut self, timeout: Duration) -> Self {
        self.channel_open_timeout = timeout;
        self
    }
}

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    server: String,
    expected: HostFingerprint,
    lost: CancellationToken,
}

impl client::Handler for SshHandler {
    type Error = Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool> {
        if self.expected.matches(server_public_key) {
            tracing::debug!("host key for {} matches {}", self.server, self.expected);
            return Ok(true);
        }

        let actual = self
            .expected
            .compute_for(server_public_key)
            .unwrap_or_else(|| HostFingerprint::sha256_of(server_public_key));
        tracing::error!(
            "host key mismatch for {}: expected {}, got {}",
            self.server,
            self.expected,
            actual
        );
        Err(Error::HostKeyMismatch {
            expected: self.expected.to_string(),
            actual: actual.to_string(),
        })
    }

    async fn disconnected(&mut self, reason: DisconnectReason<Self::Error>) -> Result<()> {
        self.lost.cancel();
        match reason {
            DisconnectReason::ReceivedDisconnect(_) => {
                tracing::debug!("{} sent disconnect", self.server);
                Ok(())
            }
            DisconnectReason::Error(e) => {
                tracing::debug!("transport to {} failed: {}", self.server, e);
                Err(e)
            }
        }
    }
}

/// An authenticated SSH session to one server.
pub struct Session {
    server: HostPort,
    handle: Handle<SshHandler>,
    lost: CancellationToken,
    channel_open_timeout: Duration,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("server", &self.server)
            .field("handle", &"<russh::Handle>")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Session {
    /// Dial, verify the host key, and authenticate, all bounded by
    /// `connect_timeout`.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let addr = config.server.to_string();
        let timeout = config.connect_timeout;
        match tokio::time::timeout(timeout, Self::connect_inner(config)).await {
            Ok(result) => result,
            Err(_) => Err(Error::ConnectTimeout { addr, timeout }),
        }
    }

    async fn connect_inner(config: SessionConfig) -> Result<Self> {
        let russh_config = Config {
            inactivity_timeout: None,
            keepalive_interval: config.keepalive_interval,
            keepalive_max: config.keepalive_max,
            ..Default::default()
        };

        let lost = CancellationToken::new();
        let handler = SshHandler {
            server: config.server.to_string(),
            expected: config.auth.host_fingerprint().clone(),
            lost: lost.clone(),
        };

        let addr = config.server.to_string();
        let mut handle = client::connect(
            Arc::new(russh_config),
            (config.server.host(), config.server.port()),
            handler,
        )
        .await
        .map_err(|e| match e {
            Error::HostKeyMismatch { .. } => e,
            other => Error::Connection {
                addr: addr.clone(),
                reason: other.to_string(),
            },
        })?;

        Self::authenticate(&mut handle, &config.auth).await?;
        tracing::debug!("authenticated to {} as {}", addr, config.auth.username());

        Ok(Self {
            server: config.server,
            handle,
            lost,
            channel_open_timeout: config.channel_open_timeout,
        })
    }

    async fn authenticate(handle: &mut Handle<SshHandler>, auth: &AuthConfig) -> Result<()> {
        let hash_alg = handle
            .best_supported_rsa_hash()
            .await
            .map_err(Error::Protocol)?
            .flatten();

        let result = handle
            .authenticate_publickey(
                auth.username(),
                PrivateKeyWithHashAlg::new(auth.private_key(), hash_alg),
            )
            .await
            .map_err(Error::Protocol)?;

        if result.success() {
            Ok(())
        } else {
            Err(Error::AuthenticationFailed(auth.username().to_string()))
        }
    }

    /// Open a forwarded-TCP (direct-tcpip) channel to `target`.
    pub async fn open_direct_tcpip(
        &self,
        target: &HostPort,
        originator: SocketAddr,
    ) -> Result<Channel<Msg>> {
        let open = self.handle.channel_open_direct_tcpip(
            target.host(),
            u32::from(target.port()),
            originator.ip().to_string(),
            u32::from(originator.port()),
        );

        match tokio::time::timeout(self.channel_open_timeout, open).await {
            Ok(Ok(channel)) => Ok(channel),
            Ok(Err(e)) => Err(Error::ChannelOpen {
                target: target.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(Error::ChannelOpenTimeout {
                target: target.to_string(),
                timeout: self.channel_open_timeout,
            }),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lost.is_cancelled() || self.handle.is_closed()
    }

    /// Resolves once the transport is gone (remote close, keepalive
    /// failure, or I/O error).
    pub async fn closed(&self) {
        let mut ticker = tokio::time::interval(CLOSED_POLL_INTERVAL);
        loop {
            tokio::select! {
                _ = self.lost.cancelled() => return,
                _ = ticker.tick() => {
                    if self.handle.is_closed() {
                        return;
                    }
                }
            }
        }
    }

    /// Disconnect the session. A session whose transport is already gone
    /// is treated as disconnected.
    pub async fn disconnect(&self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }

        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(Error::Protocol)?;
        Ok(())
    }
}
