// ABOUTME: Per-connection forwarding through an SSH direct-tcpip channel.
// ABOUTME: Pipes bytes both ways and propagates half-close (EOF) in each direction.

use super::error::{Error, Result};
use crate::ssh::Session;
use crate::types::HostPort;
use russh::ChannelMsg;
use russh::client::Msg;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

const PIPE_BUFFER_SIZE: usize = 64 * 1024;

/// Byte counts for one forwarded connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipeStats {
    pub to_remote: u64,
    pub to_local: u64,
}

/// Forward one accepted local connection to `target` through `session`.
///
/// Returns when both directions have seen EOF, either side closes or
/// errors, or `stop` fires. Both ends are closed on return.
pub(crate) async fn forward_connection(
    mut local: TcpStream,
    peer: SocketAddr,
    session: Arc<Session>,
    target: HostPort,
    stop: CancellationToken,
) -> Result<PipeStats> {
    let _ = local.set_nodelay(true);

    let channel = tokio::select! {
        _ = stop.cancelled() => return Ok(PipeStats::default()),
        channel = session.open_direct_tcpip(&target, peer) => channel?,
    };
    tracing::debug!("opened channel {} -> {}", peer, target);

    pipe(&mut local, channel, &stop)
        .await
        .map_err(|source| Error::Forward {
            peer,
            target,
            source,
        })
}

async fn pipe(
    local: &mut TcpStream,
    mut channel: russh::Channel<Msg>,
    stop: &CancellationToken,
) -> io::Result<PipeStats> {
    let mut stats = PipeStats::default();
    let mut local_eof = false;
    let mut remote_eof = false;
    let mut buf = vec![0u8; PIPE_BUFFER_SIZE];

    let result = loop {
        tokio::select! {
            _ = stop.cancelled() => break Ok(()),

            // Local -> SSH channel
            r = local.read(&mut buf), if !local_eof => {
                match r {
                    Ok(0) => {
                        local_eof = true;
                        let _ = channel.eof().await;
                        if remote_eof {
                            break Ok(());
                        }
                    }
                    Ok(n) => {
                        if let Err(e) = channel.data(&buf[..n]).await {
                            break Err(io::Error::new(io::ErrorKind::BrokenPipe, e.to_string()));
                        }
                        stats.to_remote += n as u64;
                    }
                    Err(e) => break Err(e),
                }
            }

            // SSH channel -> local
            msg = channel.wait() => {
                match msg {
                    Some(ChannelMsg::Data { ref data }) => {
                        if let Err(e) = local.write_all(data).await {
                            break Err(e);
                        }
                        stats.to_local += data.len() as u64;
                    }
                    Some(ChannelMsg::Eof) => {
                        remote_eof = true;
                        let _ = local.shutdown().await;
                        if local_eof {
                            break Ok(());
                        }
                    }
                    Some(ChannelMsg::Close) | None => break Ok(()),
                    Some(_) => {}
                }
            }
        }
    };

    let _ = channel.close().await;
    result.map(|()| stats)
}
