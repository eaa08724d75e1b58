// ABOUTME: TCP relay placed between a tunnel and the test SSH server.
// ABOUTME: Can cut every relayed connection or go silent while keeping sockets open.

use k8tunnel::types::HostPort;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

/// Forwards loopback TCP to `target` until told otherwise.
pub struct TcpRelay {
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    controls: Arc<Mutex<Controls>>,
    shutdown: CancellationToken,
}

/// Tokens handed to each relayed connection. Replaced after use so
/// connections made afterwards behave normally.
struct Controls {
    sever: CancellationToken,
    stall: CancellationToken,
}

impl Controls {
    fn fresh(shutdown: &CancellationToken) -> Self {
        Self {
            sever: shutdown.child_token(),
            stall: CancellationToken::new(),
        }
    }
}

impl TcpRelay {
    pub async fn start(target: SocketAddr) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();
        let controls = Arc::new(Mutex::new(Controls::fresh(&shutdown)));

        tokio::spawn({
            let accepted = Arc::clone(&accepted);
            let controls = Arc::clone(&controls);
            let shutdown = shutdown.clone();
            async move {
                loop {
                    let inbound = tokio::select! {
                        _ = shutdown.cancelled() => return,
                        result = listener.accept() => match result {
                            Ok((stream, _)) => stream,
                            Err(_) => return,
                        },
                    };
                    accepted.fetch_add(1, Ordering::SeqCst);
                    let (sever, stall) = {
                        let controls = controls.lock();
                        (controls.sever.clone(), controls.stall.clone())
                    };
                    tokio::spawn(relay(inbound, target, sever, stall));
                }
            }
        });

        Self {
            addr,
            accepted,
            controls,
            shutdown,
        }
    }

    pub fn addr(&self) -> HostPort {
        HostPort::new(self.addr.ip().to_string(), self.addr.port()).unwrap()
    }

    /// Connections relayed so far.
    pub fn connections_accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Close both sockets of every current connection, as a network drop
    /// with a RST or FIN would.
    pub fn sever(&self) {
        let mut controls = self.controls.lock();
        controls.sever.cancel();
        *controls = Controls::fresh(&self.shutdown);
    }

    /// Stop moving bytes on every current connection but keep the sockets
    /// open, so only keepalives can notice.
    pub fn stall(&self) {
        let mut controls = self.controls.lock();
        controls.stall.cancel();
        *controls = Controls::fresh(&self.shutdown);
    }
}

impl Drop for TcpRelay {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn relay(
    mut inbound: TcpStream,
    target: SocketAddr,
    sever: CancellationToken,
    stall: CancellationToken,
) {
    let Ok(mut outbound) = TcpStream::connect(target).await else {
        return;
    };

    tokio::select! {
        _ = sever.cancelled() => return,
        _ = stall.cancelled() => {}
        _ = tokio::io::copy_bidirectional(&mut inbound, &mut outbound) => return,
    }

    // Stalled: hold both sockets without reading or writing.
    sever.cancelled().await;
    drop((inbound, outbound));
}
