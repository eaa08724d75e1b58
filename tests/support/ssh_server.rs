// ABOUTME: In-process russh server for tunnel integration tests.
// ABOUTME: Fixed host key, one authorised client key, and direct-tcpip bridged to real TCP.

use k8tunnel::ssh::AuthConfig;
use k8tunnel::types::HostPort;
use parking_lot::Mutex;
use russh::keys::ssh_key::PublicKey;
use russh::keys::{PrivateKey, decode_secret_key};
use russh::server::{Auth, Handler, Msg, Session};
use russh::Channel;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};

pub const HOST_KEY: &str = include_str!("../fixtures/host_key");
pub const CLIENT_KEY: &str = include_str!("../fixtures/client_key");
pub const CLIENT_KEY_PUB: &str = include_str!("../fixtures/client_key.pub");
pub const INTRUDER_KEY: &str = include_str!("../fixtures/intruder_key");

pub const HOST_SHA256: &str = "SHA256:uWKl3vauPMGWGLPH1F01yx21XmawMj0ldS0XZb6geVY";
pub const HOST_MD5: &str = "a5:42:d5:79:34:d3:c6:f7:7b:a6:29:a0:e3:ae:46:73";
pub const INTRUDER_SHA256: &str = "SHA256:7ISKqfb+66aSSv8Q4O6HQMC/jm8GC0Hr4Ou92xPHFrk";

pub const TEST_USER: &str = "tunnel";

/// Credentials the test server accepts.
pub fn client_auth() -> Arc<AuthConfig> {
    Arc::new(AuthConfig::from_openssh(TEST_USER, CLIENT_KEY, None, HOST_SHA256).unwrap())
}

/// Client credentials with a different expected host fingerprint.
pub fn client_auth_expecting(fingerprint: &str) -> Arc<AuthConfig> {
    Arc::new(AuthConfig::from_openssh(TEST_USER, CLIENT_KEY, None, fingerprint).unwrap())
}

/// A key the test server does not know.
pub fn intruder_auth() -> Arc<AuthConfig> {
    Arc::new(AuthConfig::from_openssh(TEST_USER, INTRUDER_KEY, None, HOST_SHA256).unwrap())
}

/// SSH server running on an ephemeral loopback port.
pub struct TestSshServer {
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    sessions: Arc<Mutex<JoinSet<()>>>,
    accept_loop: JoinHandle<()>,
}

impl TestSshServer {
    pub async fn start() -> Self {
        let host_key: PrivateKey = decode_secret_key(HOST_KEY, None).unwrap();
        let authorized = PublicKey::from_openssh(CLIENT_KEY_PUB.trim()).unwrap();

        let config = Arc::new(russh::server::Config {
            keys: vec![host_key],
            auth_rejection_time: Duration::from_millis(10),
            auth_rejection_time_initial: Some(Duration::ZERO),
            ..Default::default()
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let sessions = Arc::new(Mutex::new(JoinSet::new()));

        let accept_loop = tokio::spawn({
            let accepted = Arc::clone(&accepted);
            let sessions = Arc::clone(&sessions);
            async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        return;
                    };
                    accepted.fetch_add(1, Ordering::SeqCst);

                    let handler = ForwardingHandler {
                        authorized: authorized.clone(),
                    };
                    let config = Arc::clone(&config);
                    sessions.lock().spawn(async move {
                        if let Ok(session) = russh::server::run_stream(config, stream, handler).await
                        {
                            let _ = session.await;
                        }
                    });
                }
            }
        });

        Self {
            addr,
            accepted,
            sessions,
            accept_loop,
        }
    }

    pub fn addr(&self) -> HostPort {
        HostPort::new(self.addr.ip().to_string(), self.addr.port()).unwrap()
    }

    /// TCP connections accepted so far, including rejected handshakes.
    pub fn connections_accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for TestSshServer {
    fn drop(&mut self) {
        self.accept_loop.abort();
        self.sessions.lock().abort_all();
    }
}

struct ForwardingHandler {
    authorized: PublicKey,
}

impl Handler for ForwardingHandler {
    type Error = russh::Error;

    async fn auth_publickey(&mut self, user: &str, key: &PublicKey) -> Result<Auth, Self::Error> {
        if user == TEST_USER && key.key_data() == self.authorized.key_data() {
            return Ok(Auth::Accept);
        }
        Ok(Auth::Reject {
            proceed_with_methods: None,
            partial_success: false,
        })
    }

    async fn channel_open_direct_tcpip(
        &mut self,
        channel: Channel<Msg>,
        host_to_connect: &str,
        port_to_connect: u32,
        _originator_address: &str,
        _originator_port: u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        let target = format!("{host_to_connect}:{port_to_connect}");
        let Ok(mut tcp) = TcpStream::connect(&target).await else {
            return Ok(false);
        };

        tokio::spawn(async move {
            let mut stream = channel.into_stream();
            let _ = tokio::io::copy_bidirectional(&mut stream, &mut tcp).await;
        });
        Ok(true)
    }
}
