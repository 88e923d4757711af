//! Cooperative pause/cancel token.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative early-exit request.
///
/// Checked between dispatched tasks by the run driver; a request never
/// preempts an in-flight external runner invocation.
pub trait Cancellable {
    /// Check if an early exit has been requested.
    fn is_cancelled(&self) -> bool;

    /// Request an early exit.
    fn cancel(&self);
}

/// In-process flag combined with an optional on-disk request file.
///
/// Shell tooling asks a running pass to stop by touching the request file;
/// the flag covers signal handlers and embedding callers. `reset` clears
/// both so the next pass can dispatch again.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    exit_file: Option<PathBuf>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            exit_file: None,
        }
    }

    /// Also honor requests made by creating `path`.
    pub fn with_exit_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.exit_file = Some(path.into());
        self
    }

    /// Clear the flag and consume any request file.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Relaxed);
        if let Some(path) = &self.exit_file {
            let _ = std::fs::remove_file(path);
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellable for CancellationToken {
    fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::Relaxed) {
            return true;
        }
        self.exit_file.as_ref().is_some_and(|p| p.exists())
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_round_trips() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn touching_the_request_file_cancels() {
        let dir = tempfile::tempdir().unwrap();
        let request = dir.path().join("exit_request");
        let token = CancellationToken::new().with_exit_file(&request);

        assert!(!token.is_cancelled());
        std::fs::write(&request, "").unwrap();
        assert!(token.is_cancelled());

        // Consuming the request re-arms the token.
        token.reset();
        assert!(!request.exists());
        assert!(!token.is_cancelled());
    }
}
