use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use gatewayconfig::hardware::variant_details;
use gatewayconfig::workers::{StandardWorkers, standard_workers};
use gatewayconfig::{
    AppConfig, HardwareInput, RuntimeError, Subscribe, Supervisor, TelemetryContext,
    TelemetryReporter, nmcli, telemetry,
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "gatewayconfig failed to start");
            eprintln!("gatewayconfig: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let cfg = AppConfig::parse();
    telemetry::initialise(&cfg.telemetry_config()).context("initialising logging")?;

    let variant = variant_details(&cfg.variant).ok_or_else(|| RuntimeError::UnknownVariant {
        variant: cfg.variant.clone(),
    })?;
    tracing::info!(
        variant = variant.name,
        firmware = %cfg.firmware_version,
        "starting gatewayconfig"
    );

    // The daemon already runs with the privileges NetworkManager needs.
    nmcli::disable_use_sudo();

    let hardware = HardwareInput::detect(&cfg.hardware_settings(variant.pins()));

    let mut subscribers: Vec<Arc<dyn Subscribe>> = Vec::new();
    #[cfg(feature = "logging")]
    subscribers.push(Arc::new(gatewayconfig::LogWriter::new()));
    subscribers.push(Arc::new(TelemetryReporter::new(TelemetryContext {
        dsn: cfg.sentry_dsn.clone(),
        environment: cfg.balena_app_name.clone(),
        device_id: cfg.balena_device_uuid.clone(),
        variant: variant.name.to_string(),
    })));

    let workers = standard_workers(StandardWorkers {
        identity: Arc::new(cfg.identity_source()),
        variant,
        firmware_version: cfg.firmware_version.clone(),
        ethernet_is_online_filepath: cfg.ethernet_is_online_filepath.clone(),
        diagnostics_json_url: cfg.diagnostics_json_url.clone(),
    });

    let supervisor = Supervisor::builder(cfg.supervisor_config())
        .with_hardware(hardware)
        .with_subscribers(subscribers)
        .with_workers(workers)
        .build();

    let reason = supervisor.run().await;
    tracing::info!(reason = reason.label(), "gatewayconfig stopped");
    Ok(ExitCode::from(reason.exit_code()))
}
