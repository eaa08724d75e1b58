// ABOUTME: User-facing CLI messages for k8tunnel.
// ABOUTME: Plain text for humans, nothing but results in quiet mode, or JSON lines for scripts.

use serde::Serialize;
use std::net::SocketAddr;

/// How CLI feedback is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Progress, results and warnings as plain text
    Normal,
    /// Results and errors only
    Quiet,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(OutputMode::Normal),
            "quiet" => Ok(OutputMode::Quiet),
            "json" => Ok(OutputMode::Json),
            other => Err(format!("unknown output mode '{other}' (expected normal, quiet or json)")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// One JSON line. Tunnel fields are only present on `forwarding` events.
#[derive(Serialize)]
struct Event<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    local: Option<SocketAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    server: Option<String>,
}

impl<'a> Event<'a> {
    fn plain(event: &'a str, message: &'a str) -> Self {
        Self {
            event,
            message,
            local: None,
            remote: None,
            server: None,
        }
    }
}

pub struct Output {
    mode: OutputMode,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    /// Intermediate steps; only shown in normal mode.
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => emit(Stream::Stdout, &Event::plain("success", message)),
        }
    }

    /// A tunnel is accepting connections on `local`.
    pub fn forwarding(&self, local: SocketAddr, remote: &str, server: &str) {
        let message = format!("Forwarding {local} -> {remote} via {server}");
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => emit(
                Stream::Stdout,
                &Event {
                    local: Some(local),
                    remote: Some(remote.to_string()),
                    server: Some(server.to_string()),
                    ..Event::plain("forwarding", &message)
                },
            ),
        }
    }

    /// Something went wrong but the command carries on.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("Warning: {message}"),
            OutputMode::Quiet => {}
            OutputMode::Json => emit(Stream::Stderr, &Event::plain("warning", message)),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Error: {message}"),
            OutputMode::Json => emit(Stream::Stderr, &Event::plain("error", message)),
        }
    }
}

fn emit(stream: Stream, event: &Event<'_>) {
    let Ok(json) = serde_json::to_string(event) else {
        return;
    };
    match stream {
        Stream::Stdout => println!("{json}"),
        Stream::Stderr => eprintln!("{json}"),
    }
}
