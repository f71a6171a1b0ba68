//! Error types used by the supervisor runtime and its workers.
//!
//! - [`RuntimeError`] failures of the supervisor itself (startup, shutdown, liveness).
//! - [`WorkerError`] failures raised from a worker's `run()` loop or constructor.
//!
//! Both types expose `as_label()` so subscribers can tag telemetry with a stable
//! snake_case identifier.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the supervisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A worker could not be constructed or launched during `start()`.
    #[error("startup failed: {reason}")]
    Startup {
        /// Human-readable cause (worker name and underlying error).
        reason: String,
    },

    /// The configured device variant is missing from the variant table.
    #[error("unknown hardware variant {variant:?}")]
    UnknownVariant {
        /// Variant name as configured.
        variant: String,
    },

    /// Joinable workers did not finish within the shutdown grace period.
    #[error("shutdown grace {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Workers that were still running when the grace period ended.
        stuck: Vec<String>,
    },

    /// A worker marked critical terminated permanently.
    #[error("critical worker {worker} died: {reason}")]
    CriticalWorkerDied {
        /// Name of the dead worker.
        worker: String,
        /// Last failure reported by the worker.
        reason: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/telemetry.
    ///
    /// # Example
    /// ```
    /// use gatewayconfig::RuntimeError;
    ///
    /// let err = RuntimeError::Startup { reason: "boom".into() };
    /// assert_eq!(err.as_label(), "runtime_startup_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Startup { .. } => "runtime_startup_failed",
            RuntimeError::UnknownVariant { .. } => "runtime_unknown_variant",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::CriticalWorkerDied { .. } => "runtime_critical_worker_died",
        }
    }
}

/// # Errors produced by workers.
///
/// `Fail` is retried by the worker actor according to its restart policy;
/// `Fatal` ends the actor permanently.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Non-recoverable error (construction failures are reported this way too).
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The run loop failed but may succeed if restarted.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The worker observed a quit request and gave up mid-operation.
    #[error("worker quit")]
    Canceled,
}

impl WorkerError {
    /// Shorthand for a retryable failure.
    pub fn fail(error: impl std::fmt::Display) -> Self {
        WorkerError::Fail {
            error: error.to_string(),
        }
    }

    /// Shorthand for a fatal failure.
    pub fn fatal(error: impl std::fmt::Display) -> Self {
        WorkerError::Fatal {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/telemetry.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Fatal { .. } => "worker_fatal",
            WorkerError::Fail { .. } => "worker_failed",
            WorkerError::Canceled => "worker_canceled",
        }
    }

    /// Indicates whether the actor may restart the run loop after this error.
    ///
    /// # Example
    /// ```
    /// use gatewayconfig::WorkerError;
    ///
    /// assert!(WorkerError::fail("socket closed").is_retryable());
    /// assert!(!WorkerError::fatal("adapter missing").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkerError::Fail { .. })
    }
}
