//! # LogWriter: runtime events as structured log records.
//!
//! ```text
//! INFO  worker starting        worker="wifi" attempt=1
//! WARN  worker failed          worker="wifi" attempt=1 reason="nmcli exited with 8"
//! INFO  restart scheduled      worker="wifi" delay_ms=1000 after_attempt=1
//! ERROR shutdown grace exceeded stuck="bluetooth_services"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Writes every event through `tracing`.
#[derive(Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::StateChanged => tracing::info!(state = reason, "supervisor state changed"),
            EventKind::StartupFailed => tracing::error!(worker, reason, "startup failed"),
            EventKind::ShutdownRequested => tracing::info!(reason, "shutdown requested"),
            EventKind::AllStoppedWithin => tracing::info!("all joinable workers stopped within grace"),
            EventKind::GraceExceeded => tracing::error!(stuck = reason, "shutdown grace exceeded"),
            EventKind::CriticalWorkerDied => tracing::error!(worker, reason, "critical worker died"),
            EventKind::HardwareDegraded => tracing::warn!(reason, "hardware input degraded to mock"),
            EventKind::ButtonHeld => tracing::info!("user button held; bluetooth advertising requested"),
            EventKind::WorkerStarting => tracing::info!(worker, attempt = e.attempt, "worker starting"),
            EventKind::WorkerStopped => tracing::debug!(worker, attempt = e.attempt, "worker stopped"),
            EventKind::WorkerFailed => {
                tracing::warn!(worker, attempt = e.attempt, reason, "worker failed")
            }
            EventKind::BackoffScheduled => tracing::info!(
                worker,
                delay_ms = e.delay_ms,
                after_attempt = e.attempt,
                reason,
                "restart scheduled"
            ),
            EventKind::WorkerQuitRequested => tracing::debug!(worker, "worker quit requested"),
            EventKind::WorkerExited => tracing::info!(worker, attempt = e.attempt, "worker exited"),
            EventKind::WorkerDead => tracing::error!(worker, attempt = e.attempt, reason, "worker dead"),
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = worker, reason, "subscriber queue overflow")
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(subscriber = worker, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
