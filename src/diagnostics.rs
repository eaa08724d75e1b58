// ABOUTME: Diagnostics accumulator for non-fatal problems during tunnel shutdown.
// ABOUTME: Close reports these as best-effort warnings instead of failing.

/// Collects non-fatal warnings while releasing tunnel resources.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during shutdown.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Create an SSH disconnect warning.
    pub fn ssh_disconnect(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SshDisconnect,
            message: message.into(),
        }
    }

    /// Create a warning for forwarded connections that had to be aborted.
    pub fn connection_drain(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ConnectionDrain,
            message: message.into(),
        }
    }

    /// Create a warning for a tunnel worker that panicked.
    pub fn worker_panicked(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::WorkerPanicked,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Failed to cleanly disconnect an SSH session.
    SshDisconnect,
    /// Forwarded connections did not finish in time and were aborted.
    ConnectionDrain,
    /// A tunnel worker task panicked.
    WorkerPanicked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::ssh_disconnect("connection reset"));
        diag.warn(Warning::connection_drain("2 connections aborted"));

        assert!(diag.has_warnings());
        assert_eq!(diag.warnings().len(), 2);
    }

    #[test]
    fn warning_constructors_set_correct_kind() {
        assert_eq!(
            Warning::ssh_disconnect("test").kind,
            WarningKind::SshDisconnect
        );
        assert_eq!(
            Warning::connection_drain("test").kind,
            WarningKind::ConnectionDrain
        );
        assert_eq!(
            Warning::worker_panicked("test").kind,
            WarningKind::WorkerPanicked
        );
    }
}
