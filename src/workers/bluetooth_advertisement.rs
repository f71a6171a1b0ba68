//! Bluetooth advertisement on request.
//!
//! Waits for `should_advertise_bluetooth`, advertises for a fixed window, then
//! clears both the advertising state and the request. A hold that arrives while
//! advertising is absorbed by the current window.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::WorkerError;
use crate::hardware::VariantDetails;
use crate::state::SharedState;
use crate::workers::Worker;

/// How long one request keeps the device advertising.
pub const ADVERTISEMENT_DURATION: Duration = Duration::from_secs(5 * 60);

/// Advertised name: variant friendly name plus the last three MAC octets.
pub fn local_name(friendly: &str, eth0_mac: &str) -> String {
    let hex: String = eth0_mac.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    let suffix = &hex[hex.len().saturating_sub(6)..];
    format!("{friendly} {}", suffix.to_ascii_uppercase())
}

pub struct BluetoothAdvertisement {
    local_name: String,
    shared: Arc<SharedState>,
    duration: Duration,
}

impl BluetoothAdvertisement {
    pub fn new(eth0_mac: &str, shared: Arc<SharedState>, variant: &VariantDetails) -> Self {
        Self {
            local_name: local_name(variant.friendly, eth0_mac),
            shared,
            duration: ADVERTISEMENT_DURATION,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }
}

#[async_trait]
impl Worker for BluetoothAdvertisement {
    fn name(&self) -> &str {
        "bluetooth_advertisement"
    }

    async fn run(&self) -> Result<(), WorkerError> {
        loop {
            self.shared.advertise_requested().await;

            tracing::info!(name = %self.local_name, duration = ?self.duration, "advertising");
            self.shared.set_advertising(true);
            tokio::time::sleep(self.duration).await;
            self.shared.set_advertising(false);
            self.shared.finish_advertising();
            tracing::info!(name = %self.local_name, "advertising finished");
        }
    }
}
