//! # Restart policies for worker actors.
//!
//! Workers are built once; a restart re-enters the same instance's `run()` loop.
//!
//! ```text
//! RestartPolicy::Never      → run once; a failure makes the worker dead
//! RestartPolicy::OnFailure  → restart after Fail; clean return ends the actor (default)
//! RestartPolicy::Always     → restart after any return until the supervisor stops
//! ```

/// Policy controlling whether a worker's run loop is re-entered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Run once.
    Never,
    /// Restart only after a retryable failure.
    #[default]
    OnFailure,
    /// Restart after every return, clean or failed.
    Always,
}

impl RestartPolicy {
    /// Whether a clean return should be followed by another attempt.
    pub fn restarts_after_success(self) -> bool {
        matches!(self, RestartPolicy::Always)
    }

    /// Whether a retryable failure should be followed by another attempt.
    pub fn restarts_after_failure(self) -> bool {
        matches!(self, RestartPolicy::OnFailure | RestartPolicy::Always)
    }
}
