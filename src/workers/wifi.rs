//! Wi-Fi scanning and connectivity through NetworkManager.
//!
//! Scans on start, every [`SCAN_INTERVAL`], and whenever `should_scan_wifi` is
//! raised. Each pass refreshes `wifi_list_cache` and `have_internet`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::select;

use crate::error::WorkerError;
use crate::nmcli;
use crate::state::SharedState;
use crate::workers::Worker;

const SCAN_INTERVAL: Duration = Duration::from_secs(60);

/// Parses `nmcli --terse --fields SSID device wifi list` output.
///
/// Hidden networks (empty SSID) are skipped, duplicates keep their first
/// position, and `\:` escapes are undone.
pub fn parse_ssids(output: &str) -> Vec<String> {
    let mut ssids: Vec<String> = Vec::new();
    for line in output.lines() {
        let ssid = line.trim().replace("\\:", ":");
        if !ssid.is_empty() && !ssids.contains(&ssid) {
            ssids.push(ssid);
        }
    }
    ssids
}

pub struct Wifi {
    shared: Arc<SharedState>,
}

impl Wifi {
    pub fn new(shared: Arc<SharedState>) -> Self {
        Self { shared }
    }

    async fn refresh(&self) -> Result<(), WorkerError> {
        let listing = nmcli::run(["--terse", "--fields", "SSID", "device", "wifi", "list"])
            .await
            .map_err(WorkerError::fail)?;
        let ssids = parse_ssids(&listing);
        tracing::debug!(count = ssids.len(), "wifi scan complete");
        self.shared.set_wifi_list(ssids);

        let connectivity = nmcli::run(["networking", "connectivity", "check"])
            .await
            .map_err(WorkerError::fail)?;
        self.shared.set_have_internet(connectivity.trim() == "full");
        Ok(())
    }
}

#[async_trait]
impl Worker for Wifi {
    fn name(&self) -> &str {
        "wifi"
    }

    async fn run(&self) -> Result<(), WorkerError> {
        loop {
            self.shared.take_wifi_scan_request();
            self.refresh().await?;

            select! {
                _ = tokio::time::sleep(SCAN_INTERVAL) => {}
                _ = self.shared.wifi_scan_requested() => {
                    tracing::debug!("wifi scan requested");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssids_are_deduplicated_and_unescaped() {
        let out = "HomeNet\n\nCafe\\:Guest\nHomeNet\n  Office  \n";
        assert_eq!(parse_ssids(out), ["HomeNet", "Cafe:Guest", "Office"]);
    }

    #[test]
    fn empty_output_is_empty_list() {
        assert!(parse_ssids("").is_empty());
    }
}
