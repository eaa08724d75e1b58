// ABOUTME: Plain TCP services that tunnels forward to in tests.
// ABOUTME: An echo server, a fixed-reply server, and helpers for dead addresses.

use k8tunnel::types::HostPort;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

fn host_port(addr: SocketAddr) -> HostPort {
    HostPort::new(addr.ip().to_string(), addr.port()).unwrap()
}

/// Echoes every byte back and half-closes once the client does.
pub async fn spawn_echo() -> HostPort {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = stream.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
                let _ = writer.shutdown().await;
            });
        }
    });
    host_port(addr)
}

/// Writes `reply` to every connection, then closes it.
pub async fn spawn_reply(reply: &'static [u8]) -> HostPort {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = stream.write_all(reply).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    host_port(addr)
}

/// A loopback address nothing listens on.
pub async fn dead_address() -> HostPort {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    host_port(addr)
}

/// Accepts TCP but never speaks SSH, so handshakes hang.
pub async fn spawn_blackhole() -> HostPort {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    host_port(addr)
}

/// Send `payload` through `addr` and read until the far side closes.
pub async fn round_trip(addr: SocketAddr, payload: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(payload).await.unwrap();
    stream.shutdown().await.unwrap();
    let mut received = Vec::new();
    stream.read_to_end(&mut received).await.unwrap();
    received
}
