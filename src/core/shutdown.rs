//! # OS signal handling.
//!
//! [`wait_for_interrupt`] completes when the process receives a termination
//! signal and reports which one.
//!
//! **Unix:** `SIGINT`, `SIGTERM`, `SIGQUIT`. **Other platforms:** Ctrl-C.

/// Termination signal that ended the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Interrupt,
    Terminate,
    Quit,
}

impl Interrupt {
    pub fn label(self) -> &'static str {
        match self {
            Interrupt::Interrupt => "SIGINT",
            Interrupt::Terminate => "SIGTERM",
            Interrupt::Quit => "SIGQUIT",
        }
    }
}

/// Waits for a termination signal.
///
/// Each call creates independent listeners. Fails only if registration fails.
#[cfg(unix)]
pub async fn wait_for_interrupt() -> std::io::Result<Interrupt> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let which = tokio::select! {
        _ = sigint.recv()  => Interrupt::Interrupt,
        _ = sigterm.recv() => Interrupt::Terminate,
        _ = sigquit.recv() => Interrupt::Quit,
    };
    Ok(which)
}

/// Waits for a termination signal.
#[cfg(not(unix))]
pub async fn wait_for_interrupt() -> std::io::Result<Interrupt> {
    tokio::signal::ctrl_c().await.map(|()| Interrupt::Interrupt)
}
