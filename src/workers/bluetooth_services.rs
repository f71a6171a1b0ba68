//! Bluetooth onboarding services.
//!
//! Exposes the device identity to a pairing phone and tracks onboarding
//! progress. The GATT surface itself lives outside this daemon; this worker keeps
//! the state the services read up to date:
//!
//! - `ethernet_online` from the carrier file,
//! - `onboarding` from the advertising flag,
//! - a Wi-Fi rescan request whenever a pairing session begins.
//!
//! It is the only joinable worker: `quit()` makes `run()` return at its next
//! wake-up.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::state::{OnboardingState, SharedState};
use crate::workers::Worker;

const REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Identity presented to the pairing phone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub eth0_mac: String,
    pub wlan0_mac: String,
    pub onboarding_key: String,
    pub pub_key: String,
    pub firmware_version: String,
}

pub struct BluetoothServices {
    info: DeviceInfo,
    ethernet_is_online_filepath: PathBuf,
    shared: Arc<SharedState>,
    quit: CancellationToken,
}

impl BluetoothServices {
    pub fn new(info: DeviceInfo, ethernet_is_online_filepath: impl Into<PathBuf>, shared: Arc<SharedState>) -> Self {
        Self {
            info,
            ethernet_is_online_filepath: ethernet_is_online_filepath.into(),
            shared,
            quit: CancellationToken::new(),
        }
    }

    fn refresh(&self) {
        self.shared
            .set_ethernet_online(read_ethernet_online(&self.ethernet_is_online_filepath));

        let advertising = self.shared.is_advertising_bluetooth();
        match (advertising, self.shared.onboarding()) {
            (true, OnboardingState::Idle) => {
                tracing::info!("pairing session started");
                self.shared.set_onboarding(OnboardingState::Pairing);
                self.shared.request_wifi_scan();
            }
            (false, OnboardingState::Pairing) => {
                tracing::info!("pairing session ended");
                self.shared.set_onboarding(OnboardingState::Idle);
            }
            _ => {}
        }
    }
}

/// `1` means link up; an unreadable file means down.
fn read_ethernet_online(path: &Path) -> bool {
    fs::read_to_string(path)
        .map(|s| s.trim() == "1")
        .unwrap_or(false)
}

#[async_trait]
impl Worker for BluetoothServices {
    fn name(&self) -> &str {
        "bluetooth_services"
    }

    async fn run(&self) -> Result<(), WorkerError> {
        tracing::info!(
            eth0 = %self.info.eth0_mac,
            wlan0 = %self.info.wlan0_mac,
            firmware = %self.info.firmware_version,
            "bluetooth services running"
        );

        let mut ticker = time::interval(REFRESH_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = self.quit.cancelled() => {
                    tracing::info!("bluetooth services quit");
                    return Ok(());
                }
                _ = ticker.tick() => self.refresh(),
            }
        }
    }

    fn quit(&self) {
        self.quit.cancel();
    }
}
