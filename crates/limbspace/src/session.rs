//! Robot session context: an explicit shutdown flag shared with the host.
//!
//! Long-running actions poll the flag at safe points (between samples, between
//! replay steps, between operator prompts) and stop cooperatively.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::WorkspaceError;

/// Cheap to clone; clones share the same flag.
#[derive(Clone, Debug, Default)]
pub struct Session {
    shutdown: Arc<AtomicBool>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every action running under this session to stop.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once shutdown was requested.
    pub fn check(&self) -> Result<(), WorkspaceError> {
        if self.is_shutdown() {
            Err(WorkspaceError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let s = Session::new();
        let handle = s.clone();
        assert!(s.check().is_ok());
        handle.request_shutdown();
        assert!(s.is_shutdown());
        assert!(matches!(s.check(), Err(WorkspaceError::Cancelled)));
    }
}
