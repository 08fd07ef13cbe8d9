//! Terminal-state-driven cleanup.

use std::path::Path;

use tracing::{debug, warn};

use super::ScratchContext;

/// What to remove once an execution has an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanupPlan {
    pub remove_scratch: bool,
    pub remove_input: bool,
}

impl CleanupPlan {
    /// Everything goes once the artifact is stored.
    pub fn after_success() -> Self {
        Self {
            remove_scratch: true,
            remove_input: true,
        }
    }

    /// Nothing goes on an intermediate retry; everything goes once no attempt
    /// remains.
    pub fn after_failure(terminal: bool) -> Self {
        Self {
            remove_scratch: terminal,
            remove_input: terminal,
        }
    }

    /// Best-effort: failures are logged, never returned.
    pub async fn execute(&self, scratch: Option<&ScratchContext>, input: &Path) {
        if self.remove_scratch {
            if let Some(scratch) = scratch {
                if let Err(e) = scratch.remove().await {
                    warn!(path = %scratch.path().display(), error = %e, "Failed to remove scratch directory");
                }
            }
        }

        if self.remove_input {
            match tokio::fs::remove_file(input).await {
                Ok(()) => debug!(path = %input.display(), "Removed input file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %input.display(), error = %e, "Failed to remove input file"),
            }
        }
    }
}
