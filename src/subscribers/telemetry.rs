//! # TelemetryReporter: error reporting tagged with device context.
//!
//! Every failure event (see [`Event::is_failure`]) is emitted as an `ERROR`
//! record on the `telemetry` target, carrying the environment, device id and
//! variant so a log shipper can forward it to the error-tracking backend named by
//! the DSN. Without a DSN the reporter is inert.
//!
//! Interrupts and requested stops are informational and never reported.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::events::Event;
use crate::subscribers::Subscribe;

/// Tags attached to every report.
#[derive(Debug, Clone, Default)]
pub struct TelemetryContext {
    /// Error-tracking endpoint. `None` disables reporting.
    pub dsn: Option<String>,
    /// Deployment environment (the application name).
    pub environment: String,
    pub device_id: String,
    pub variant: String,
}

#[derive(Debug)]
pub struct TelemetryReporter {
    ctx: TelemetryContext,
    reported: AtomicU64,
}

impl TelemetryReporter {
    pub fn new(ctx: TelemetryContext) -> Self {
        if ctx.dsn.is_none() {
            tracing::debug!("telemetry dsn not configured; error reporting disabled");
        }
        Self {
            ctx,
            reported: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.ctx.dsn.is_some()
    }

    /// Number of events reported so far.
    pub fn reported(&self) -> u64 {
        self.reported.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Subscribe for TelemetryReporter {
    async fn on_event(&self, e: &Event) {
        if !self.is_enabled() || !e.is_failure() {
            return;
        }
        self.reported.fetch_add(1, Ordering::Relaxed);
        tracing::error!(
            target: "telemetry",
            environment = %self.ctx.environment,
            device_id = %self.ctx.device_id,
            variant = %self.ctx.variant,
            kind = ?e.kind,
            seq = e.seq,
            worker = e.worker.as_deref(),
            reason = e.reason.as_deref(),
            "reported failure"
        );
    }

    fn name(&self) -> &'static str {
        "telemetry_reporter"
    }

    fn queue_capacity(&self) -> usize {
        256
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    fn context(dsn: Option<&str>) -> TelemetryContext {
        TelemetryContext {
            dsn: dsn.map(str::to_string),
            environment: "gatewayconfig".into(),
            device_id: "abc123".into(),
            variant: "NEBHNT-OUT1".into(),
        }
    }

    #[tokio::test]
    async fn reports_failures_only() {
        let reporter = TelemetryReporter::new(context(Some("https://key@telemetry.invalid/1")));
        reporter.on_event(&Event::new(EventKind::WorkerStarting)).await;
        reporter.on_event(&Event::new(EventKind::ShutdownRequested)).await;
        reporter
            .on_event(&Event::new(EventKind::WorkerDead).with_worker("wifi"))
            .await;
        assert_eq!(reporter.reported(), 1);
    }

    #[tokio::test]
    async fn inert_without_dsn() {
        let reporter = TelemetryReporter::new(context(None));
        reporter.on_event(&Event::new(EventKind::StartupFailed)).await;
        assert!(!reporter.is_enabled());
        assert_eq!(reporter.reported(), 0);
    }
}
