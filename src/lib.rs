// ABOUTME: Library root for k8tunnel - exposes the tunnel engine and its config.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod ssh;
pub mod tunnel;
pub mod types;
