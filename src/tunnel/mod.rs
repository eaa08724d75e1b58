// ABOUTME: Tunnel engine: per-forward workers with reconnect, and the manager that owns them.
// ABOUTME: Launch waits for each tunnel's first attempt; close tears everything down once.

mod backoff;
mod error;
mod forward;
mod manager;
mod spec;
mod ssh_tunnel;
mod state;

pub use backoff::{ExponentialBackoff, ReconnectConfig};
pub use error::{Error, ErrorKind, Result};
pub use forward::PipeStats;
pub use manager::{LaunchError, SshTunnelsManager};
pub use spec::{TunnelOptions, TunnelSpec};
pub use ssh_tunnel::SshTunnel;
pub use state::TunnelState;
