//! # Shared state exchanged between the supervisor and workers.
//!
//! [`SharedState`] is the single record through which workers publish status and
//! the supervisor publishes intent. Every field is a [`tokio::sync::watch`] cell:
//! reads clone out of a short read lock, writes replace the value under a short
//! write lock, and consumers can either poll the current value or await the next
//! change.
//!
//! ## Field ownership
//! Each field has exactly one writer. This is a convention, documented here and on
//! every setter, not a runtime check.
//!
//! | field                        | writer                                        |
//! |------------------------------|-----------------------------------------------|
//! | `should_advertise_bluetooth` | set: supervisor button callback; clear: bluetooth advertisement |
//! | `is_advertising_bluetooth`   | bluetooth advertisement                       |
//! | `are_diagnostics_ok`         | diagnostics                                   |
//! | `have_internet`              | wifi                                          |
//! | `wifi_list_cache`            | wifi                                          |
//! | `should_scan_wifi`           | set: bluetooth services; clear: wifi          |
//! | `onboarding`                 | bluetooth services                            |
//! | `ethernet_online`            | bluetooth services                            |
//!
//! ## Visibility
//! A write is observed by the next read on any thread after the write completes.
//! Pollers must not expect to see a write in the same iteration it happened.

use tokio::sync::watch;

/// Progress of an onboarding session driven over Bluetooth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnboardingState {
    /// No phone is onboarding the device.
    #[default]
    Idle,
    /// Advertising; waiting for a phone to pair.
    Pairing,
    /// Gateway has been added to the network.
    Complete,
}

/// Plain copy of every field, taken field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSnapshot {
    pub should_advertise_bluetooth: bool,
    pub is_advertising_bluetooth: bool,
    pub are_diagnostics_ok: bool,
    pub have_internet: bool,
    pub should_scan_wifi: bool,
    pub wifi_list_cache: Vec<String>,
    pub onboarding: OnboardingState,
    pub ethernet_online: bool,
}

/// Synchronized status/intent record shared by all workers.
#[derive(Debug)]
pub struct SharedState {
    should_advertise_bluetooth: watch::Sender<bool>,
    is_advertising_bluetooth: watch::Sender<bool>,
    are_diagnostics_ok: watch::Sender<bool>,
    have_internet: watch::Sender<bool>,
    should_scan_wifi: watch::Sender<bool>,
    wifi_list_cache: watch::Sender<Vec<String>>,
    onboarding: watch::Sender<OnboardingState>,
    ethernet_online: watch::Sender<bool>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

/// Replaces the value only when it differs, so watchers wake on real changes.
fn store<T: PartialEq>(cell: &watch::Sender<T>, value: T) -> bool {
    cell.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    })
}

impl SharedState {
    /// Creates the record with every flag cleared.
    pub fn new() -> Self {
        Self {
            should_advertise_bluetooth: watch::channel(false).0,
            is_advertising_bluetooth: watch::channel(false).0,
            are_diagnostics_ok: watch::channel(false).0,
            have_internet: watch::channel(false).0,
            should_scan_wifi: watch::channel(false).0,
            wifi_list_cache: watch::channel(Vec::new()).0,
            onboarding: watch::channel(OnboardingState::Idle).0,
            ethernet_online: watch::channel(false).0,
        }
    }

    // ---- should_advertise_bluetooth ----

    /// Requests Bluetooth advertising. Writer: supervisor button callback only.
    pub fn request_advertising(&self) {
        self.should_advertise_bluetooth.send_replace(true);
    }

    /// Clears the advertising request. Writer: bluetooth advertisement only.
    pub fn finish_advertising(&self) {
        store(&self.should_advertise_bluetooth, false);
    }

    pub fn should_advertise_bluetooth(&self) -> bool {
        *self.should_advertise_bluetooth.borrow()
    }

    /// Completes once advertising has been requested (immediately if it already is).
    pub async fn advertise_requested(&self) {
        let mut rx = self.should_advertise_bluetooth.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|requested| *requested).await;
    }

    // ---- is_advertising_bluetooth ----

    /// Writer: bluetooth advertisement.
    pub fn set_advertising(&self, advertising: bool) {
        store(&self.is_advertising_bluetooth, advertising);
    }

    pub fn is_advertising_bluetooth(&self) -> bool {
        *self.is_advertising_bluetooth.borrow()
    }

    // ---- are_diagnostics_ok ----

    /// Writer: diagnostics.
    pub fn set_diagnostics_ok(&self, ok: bool) {
        store(&self.are_diagnostics_ok, ok);
    }

    pub fn are_diagnostics_ok(&self) -> bool {
        *self.are_diagnostics_ok.borrow()
    }

    // ---- have_internet ----

    /// Writer: wifi.
    pub fn set_have_internet(&self, online: bool) {
        store(&self.have_internet, online);
    }

    pub fn have_internet(&self) -> bool {
        *self.have_internet.borrow()
    }

    // ---- should_scan_wifi ----

    /// Asks the wifi worker to refresh its scan. Writer: bluetooth services.
    pub fn request_wifi_scan(&self) {
        self.should_scan_wifi.send_replace(true);
    }

    /// Clears a pending scan request, returning whether one was pending. Writer: wifi.
    pub fn take_wifi_scan_request(&self) -> bool {
        let mut was_requested = false;
        self.should_scan_wifi.send_if_modified(|requested| {
            was_requested = *requested;
            *requested = false;
            was_requested
        });
        was_requested
    }

    pub fn should_scan_wifi(&self) -> bool {
        *self.should_scan_wifi.borrow()
    }

    /// Completes once a scan has been requested.
    pub async fn wifi_scan_requested(&self) {
        let mut rx = self.should_scan_wifi.subscribe();
        let _ = rx.wait_for(|requested| *requested).await;
    }

    // ---- wifi_list_cache ----

    /// Writer: wifi.
    pub fn set_wifi_list(&self, ssids: Vec<String>) {
        store(&self.wifi_list_cache, ssids);
    }

    pub fn wifi_list(&self) -> Vec<String> {
        self.wifi_list_cache.borrow().clone()
    }

    // ---- onboarding ----

    /// Writer: bluetooth services.
    pub fn set_onboarding(&self, progress: OnboardingState) {
        store(&self.onboarding, progress);
    }

    pub fn onboarding(&self) -> OnboardingState {
        *self.onboarding.borrow()
    }

    // ---- ethernet_online ----

    /// Writer: bluetooth services.
    pub fn set_ethernet_online(&self, online: bool) {
        store(&self.ethernet_online, online);
    }

    pub fn ethernet_online(&self) -> bool {
        *self.ethernet_online.borrow()
    }

    /// Copies every field. Fields are read one at a time, so the snapshot is not
    /// atomic across fields.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            should_advertise_bluetooth: self.should_advertise_bluetooth(),
            is_advertising_bluetooth: self.is_advertising_bluetooth(),
            are_diagnostics_ok: self.are_diagnostics_ok(),
            have_internet: self.have_internet(),
            should_scan_wifi: self.should_scan_wifi(),
            wifi_list_cache: self.wifi_list(),
            onboarding: self.onboarding(),
            ethernet_online: self.ethernet_online(),
        }
    }
}
