// ABOUTME: Validated domain types shared across the crate.
// ABOUTME: Parsing happens once at the edge so the rest of the code works with checked values.

mod host_port;

pub use host_port::{HostPort, HostPortError};
