//! # Command-line and environment configuration.
//!
//! [`AppConfig`] is parsed with clap; every flag can also be supplied through the
//! environment variable of the same name, which is how the container runtime
//! configures the daemon.
//!
//! ```text
//! AppConfig (clap, env)
//!     ├─► telemetry_config()       → telemetry::initialise
//!     ├─► supervisor_config()      → SupervisorConfig (grace, hold threshold, ...)
//!     ├─► hardware_settings(pins)  → HardwareInput::detect
//!     └─► identity_source()        → MAC addresses and miner keys
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use clap::builder::BoolishValueParser;

use crate::core::SupervisorConfig;
use crate::hardware::{HardwareSettings, PinAssignment};
use crate::identity::IdentitySource;
use crate::telemetry::{DEFAULT_LOG_FILTER, TelemetryConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "gatewayconfig")]
#[command(about = "Gateway configuration daemon", long_about = None)]
pub struct AppConfig {
    /// Telemetry DSN; error reporting is tagged with it when set.
    #[arg(long, env = "SENTRY_CONFIG")]
    pub sentry_dsn: Option<String>,

    /// Application name, used as the telemetry environment.
    #[arg(long, env = "BALENA_APP_NAME", default_value = "gatewayconfig")]
    pub balena_app_name: String,

    /// Device identifier attached to telemetry.
    #[arg(long, env = "BALENA_DEVICE_UUID", default_value = "unknown")]
    pub balena_device_uuid: String,

    /// Hardware variant identifier, e.g. `NEBHNT-OUT1`.
    #[arg(long, env = "VARIANT")]
    pub variant: String,

    #[arg(long, env = "ETH0_MAC_ADDRESS_FILEPATH", default_value = "/sys/class/net/eth0/address")]
    pub eth0_mac_address_filepath: PathBuf,

    #[arg(long, env = "WLAN0_MAC_ADDRESS_FILEPATH", default_value = "/sys/class/net/wlan0/address")]
    pub wlan0_mac_address_filepath: PathBuf,

    #[arg(long, env = "MINER_KEYS_FILEPATH", default_value = "/var/data/public_keys")]
    pub miner_keys_filepath: PathBuf,

    /// Diagnostics document fetched by the diagnostics worker.
    #[arg(long, env = "DIAGNOSTICS_JSON_URL", default_value = "http://diagnostics/json")]
    pub diagnostics_json_url: String,

    /// File whose content is `1` while the ethernet link is up.
    #[arg(long, env = "ETHERNET_IS_ONLINE_FILEPATH", default_value = "/sys/class/net/eth0/carrier")]
    pub ethernet_is_online_filepath: PathBuf,

    #[arg(long, env = "FIRMWARE_VERSION", default_value = "unknown")]
    pub firmware_version: String,

    /// Use the physical button and LED. Accepts true/false, 1/0, yes/no.
    #[arg(long, env = "IS_GPIO_ENABLED", default_value = "true", value_parser = BoolishValueParser::new(), action = clap::ArgAction::Set)]
    pub gpio_enabled: bool,

    #[arg(long, env = "GPIO_SYSFS_ROOT", default_value = "/sys/class/gpio")]
    pub gpio_sysfs_root: PathBuf,

    #[arg(long, env = "LOG_FILTER", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,

    /// Emit logs as JSON lines.
    #[arg(long, env = "LOG_JSON", default_value = "false", value_parser = BoolishValueParser::new(), action = clap::ArgAction::Set)]
    pub log_json: bool,

    /// Continuous hold required to request advertising.
    #[arg(long, env = "BUTTON_HOLD_SECONDS", default_value_t = 2)]
    pub button_hold_seconds: u64,

    /// Upper bound on waiting for joinable workers during stop.
    #[arg(long, env = "SHUTDOWN_GRACE_SECONDS", default_value_t = 10)]
    pub shutdown_grace_seconds: u64,
}

impl AppConfig {
    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            log_filter: self.log_filter.clone(),
            json: self.log_json,
        }
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            grace: Duration::from_secs(self.shutdown_grace_seconds),
            hold_threshold: Duration::from_secs(self.button_hold_seconds),
            ..SupervisorConfig::default()
        }
    }

    pub fn hardware_settings(&self, pins: PinAssignment) -> HardwareSettings {
        let cfg = self.supervisor_config();
        HardwareSettings {
            gpio_enabled: self.gpio_enabled,
            pins,
            sysfs_root: self.gpio_sysfs_root.clone(),
            hold_threshold: cfg.hold_threshold(),
            poll_interval: cfg.button_poll,
        }
    }

    pub fn identity_source(&self) -> IdentitySource {
        IdentitySource::new(
            &self.eth0_mac_address_filepath,
            &self.wlan0_mac_address_filepath,
            &self.miner_keys_filepath,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_variant_is_given() {
        let cfg = AppConfig::try_parse_from(["gatewayconfig", "--variant", "NEBHNT-IN1"]).expect("parse");
        assert!(cfg.gpio_enabled);
        assert_eq!(cfg.button_hold_seconds, 2);
        assert_eq!(cfg.supervisor_config().grace, Duration::from_secs(10));
        assert_eq!(cfg.miner_keys_filepath, PathBuf::from("/var/data/public_keys"));
    }

    #[test]
    fn gpio_flag_accepts_boolish_values() {
        let cfg = AppConfig::try_parse_from([
            "gatewayconfig",
            "--variant",
            "NEBHNT-IN1",
            "--gpio-enabled",
            "0",
        ])
        .expect("parse");
        assert!(!cfg.gpio_enabled);

        let settings = cfg.hardware_settings(PinAssignment { button: 26, status: 25 });
        assert!(!settings.gpio_enabled);
        assert_eq!(settings.hold_threshold, Duration::from_secs(2));
    }

    #[test]
    fn variant_is_required() {
        assert!(AppConfig::try_parse_from(["gatewayconfig"]).is_err());
    }
}
