//! NetworkManager command-line shim.
//!
//! The daemon runs as root inside its container, so `nmcli` must be invoked
//! directly rather than through `sudo`. [`disable_use_sudo`] is called once at
//! startup; every `nmcli` invocation is built through [`command`].

use std::process::Output;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::process::Command;

static USE_SUDO: AtomicBool = AtomicBool::new(true);

#[derive(Debug, Error)]
pub enum NmcliError {
    #[error("failed to spawn nmcli: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("nmcli exited with {status}: {stderr}")]
    Status { status: String, stderr: String },
}

/// Makes later [`command`] calls invoke `nmcli` without `sudo`.
pub fn disable_use_sudo() {
    if USE_SUDO.swap(false, Ordering::AcqRel) {
        tracing::debug!("nmcli: sudo disabled");
    }
}

pub fn uses_sudo() -> bool {
    USE_SUDO.load(Ordering::Acquire)
}

/// Builds an `nmcli` invocation with the given arguments.
pub fn command<I, S>(args: I) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let mut cmd = if uses_sudo() {
        let mut cmd = Command::new("sudo");
        cmd.arg("nmcli");
        cmd
    } else {
        Command::new("nmcli")
    };
    cmd.args(args).kill_on_drop(true);
    cmd
}

/// Runs `nmcli` and returns its stdout when it exits successfully.
pub async fn run<I, S>(args: I) -> Result<String, NmcliError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let Output {
        status,
        stdout,
        stderr,
    } = command(args).output().await?;

    if !status.success() {
        return Err(NmcliError::Status {
            status: status.to_string(),
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&stdout).into_owned())
}
