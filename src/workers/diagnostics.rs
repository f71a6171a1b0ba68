//! Periodically fetches the diagnostics document and publishes its pass/fail flag.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::WorkerError;
use crate::state::SharedState;
use crate::workers::Worker;

const POLL_INTERVAL: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The part of the diagnostics document this daemon consumes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiagnosticsReport {
    /// Overall pass/fail.
    #[serde(rename = "PF")]
    pub pf: bool,
}

impl DiagnosticsReport {
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

pub struct Diagnostics {
    url: String,
    client: reqwest::Client,
    shared: Arc<SharedState>,
}

impl Diagnostics {
    pub fn new(url: impl Into<String>, shared: Arc<SharedState>) -> Result<Self, WorkerError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(WorkerError::fatal)?;
        Ok(Self {
            url: url.into(),
            client,
            shared,
        })
    }

    async fn fetch(&self) -> Result<DiagnosticsReport, WorkerError> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(WorkerError::fail)?
            .text()
            .await
            .map_err(WorkerError::fail)?;
        DiagnosticsReport::parse(&body).map_err(WorkerError::fail)
    }
}

#[async_trait]
impl Worker for Diagnostics {
    fn name(&self) -> &str {
        "diagnostics"
    }

    async fn run(&self) -> Result<(), WorkerError> {
        loop {
            match self.fetch().await {
                Ok(report) => {
                    tracing::debug!(ok = report.pf, "diagnostics fetched");
                    self.shared.set_diagnostics_ok(report.pf);
                }
                Err(e) => {
                    self.shared.set_diagnostics_ok(false);
                    return Err(e);
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
