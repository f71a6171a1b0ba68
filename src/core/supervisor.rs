//! # Supervisor: worker lifecycle, button bridge and the ordered stop sequence.
//!
//! ## States
//! ```text
//! Initializing ──start()──► Running ──stop()──► Stopping ──► Stopped
//!      │                                            ▲
//!      └──────────── startup failure / stop() ──────┘
//! ```
//! The current state is published on a `watch` channel ([`Supervisor::state_changes`]).
//!
//! ## start()
//! 1. Arms the button: a qualifying hold sets `should_advertise_bluetooth` and
//!    publishes `ButtonHeld`.
//! 2. Builds each [`WorkerSpec`] in order and launches one actor per worker.
//! 3. Moves to `Running`.
//!
//! Any build or launch failure runs `stop(StartupFailed)` before returning, so no
//! launched worker is left without a stop attempt.
//!
//! ## stop()
//! ```text
//! first caller:  Stopping ─► cancel actors' restart loops
//!                         ─► release hardware pins
//!                         ─► quit() + bounded join of joinable workers (grace)
//!                         ─► abort detached workers
//!                         ─► deliver queued events to subscribers (flush_timeout)
//!                         ─► Stopped
//! other callers: wait for Stopped, Ok(())
//! ```
//!
//! ## run()
//! `start()`, then the first of: termination signal, [`Supervisor::request_stop`],
//! or a stop begun elsewhere (critical worker death). Returns the [`StopReason`]
//! that drove the stop; [`StopReason::exit_code`] maps it to the process status.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use gatewayconfig::{Supervisor, SupervisorConfig, SupervisorState, StopReason, Worker, WorkerError, WorkerSpec};
//!
//! struct Idle;
//!
//! #[async_trait]
//! impl Worker for Idle {
//!     fn name(&self) -> &str { "idle" }
//!     async fn run(&self) -> Result<(), WorkerError> {
//!         std::future::pending::<()>().await;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let sup = Supervisor::builder(SupervisorConfig::default())
//!         .with_workers(vec![WorkerSpec::new("idle", |_| Ok(Arc::new(Idle) as _))])
//!         .build();
//!
//!     sup.start().await.expect("start");
//!     assert_eq!(sup.state(), SupervisorState::Running);
//!
//!     sup.stop(StopReason::Requested).await.expect("stop");
//!     assert_eq!(sup.state(), SupervisorState::Stopped);
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::actor::WorkerActorParams;
use crate::core::alive::AliveTracker;
use crate::core::builder::Listener;
use crate::core::config::SupervisorConfig;
use crate::core::registry::{CriticalDeath, WorkerRegistry};
use crate::core::shutdown::{self, Interrupt};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::hardware::{HardwareInput, Indicator};
use crate::state::SharedState;
use crate::workers::{WorkerContext, WorkerSpec};

/// Lifecycle state of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Initializing,
    Running,
    Stopping,
    /// Terminal.
    Stopped,
}

impl SupervisorState {
    pub fn label(self) -> &'static str {
        match self {
            SupervisorState::Initializing => "initializing",
            SupervisorState::Running => "running",
            SupervisorState::Stopping => "stopping",
            SupervisorState::Stopped => "stopped",
        }
    }
}

/// Why the supervisor stopped. Used for reporting and exit-code selection only;
/// every reason runs the same stop sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Termination signal.
    Interrupted { signal: &'static str },
    /// [`Supervisor::request_stop`] or a direct `stop()` call.
    Requested,
    /// A worker could not be built or launched.
    StartupFailed,
    /// A critical worker terminated permanently.
    CriticalWorkerDied { worker: String },
}

impl StopReason {
    pub fn label(&self) -> &'static str {
        match self {
            StopReason::Interrupted { .. } => "interrupted",
            StopReason::Requested => "requested",
            StopReason::StartupFailed => "startup_failed",
            StopReason::CriticalWorkerDied { .. } => "critical_worker_died",
        }
    }

    /// True for reasons that indicate a fault rather than an operator decision.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            StopReason::StartupFailed | StopReason::CriticalWorkerDied { .. }
        )
    }

    /// Process exit status: 0 for interrupts and requested stops, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.is_error() { 1 } else { 0 }
    }
}

impl From<Interrupt> for StopReason {
    fn from(signal: Interrupt) -> Self {
        StopReason::Interrupted {
            signal: signal.label(),
        }
    }
}

/// Owns the shared state, the hardware input and every worker's execution context.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    subscriber_count: usize,
    flush: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
    alive: Arc<AliveTracker>,
    shared: Arc<SharedState>,
    hardware: Arc<HardwareInput>,
    registry: WorkerRegistry,
    specs: Mutex<Vec<WorkerSpec>>,
    started: AtomicBool,
    state: watch::Sender<SupervisorState>,
    /// Cancelled when the stop sequence begins.
    stop_token: CancellationToken,
    /// Cancelled by `request_stop()`.
    stop_requested: CancellationToken,
    stop_reason: OnceCell<StopReason>,
    deaths: Mutex<Option<mpsc::UnboundedReceiver<CriticalDeath>>>,
}

impl Supervisor {
    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        listener: Listener,
        alive: Arc<AliveTracker>,
        shared: Arc<SharedState>,
        hardware: Arc<HardwareInput>,
        specs: Vec<WorkerSpec>,
    ) -> Self {
        let stop_token = CancellationToken::new();
        let (deaths_tx, deaths_rx) = mpsc::unbounded_channel();
        let registry = WorkerRegistry::new(bus.clone(), stop_token.clone(), deaths_tx);

        Self {
            cfg,
            bus,
            subscriber_count: listener.subscriber_count,
            flush: listener.flush,
            listener: Mutex::new(Some(listener.handle)),
            alive,
            shared,
            hardware,
            registry,
            specs: Mutex::new(specs),
            started: AtomicBool::new(false),
            state: watch::channel(SupervisorState::Initializing).0,
            stop_token,
            stop_requested: CancellationToken::new(),
            stop_reason: OnceCell::new(),
            deaths: Mutex::new(Some(deaths_rx)),
        }
    }

    /// Builds and launches every worker, then enters `Running`.
    ///
    /// On failure the stop sequence has already completed when this returns.
    pub async fn start(self: &Arc<Self>) -> Result<(), RuntimeError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(RuntimeError::Startup {
                reason: format!("supervisor already started ({})", self.state().label()),
            });
        }
        if self.state() != SupervisorState::Initializing {
            return Err(RuntimeError::Startup {
                reason: format!("supervisor is {}", self.state().label()),
            });
        }

        self.install_button_callback();
        if let Some(reason) = self.hardware.fallback_reason() {
            self.bus
                .publish(Event::new(EventKind::HardwareDegraded).with_reason(reason));
        }
        self.spawn_death_monitor().await;

        let ctx = WorkerContext {
            shared: Arc::clone(&self.shared),
            indicator: Indicator::new(Arc::clone(&self.hardware)),
            gpio_enabled: self.hardware.is_gpio(),
        };
        let specs = std::mem::take(&mut *self.specs.lock().await);

        for spec in specs {
            let (built, res) = spec.build(&ctx);
            let worker = match res {
                Ok(worker) => worker,
                Err(e) => return self.fail_startup(&built.name, e.to_string()).await,
            };
            let params = WorkerActorParams {
                restart: built.restart.unwrap_or(self.cfg.restart),
                backoff: built.backoff.unwrap_or(self.cfg.backoff),
            };
            if !self
                .registry
                .launch(built.role, built.critical, worker, params)
                .await
            {
                return self
                    .fail_startup(&built.name, "stop began during startup".to_string())
                    .await;
            }
        }

        let entered = self.state.send_if_modified(|s| {
            if *s == SupervisorState::Initializing {
                *s = SupervisorState::Running;
                true
            } else {
                false
            }
        });
        if !entered {
            return Err(RuntimeError::Startup {
                reason: "stopped during startup".to_string(),
            });
        }
        self.publish_state(SupervisorState::Running);
        Ok(())
    }

    async fn fail_startup(&self, worker: &str, reason: String) -> Result<(), RuntimeError> {
        self.bus.publish(
            Event::new(EventKind::StartupFailed)
                .with_worker(worker)
                .with_reason(reason.as_str()),
        );
        if let Err(e) = self.stop(StopReason::StartupFailed).await {
            tracing::warn!(error = %e, "stop after startup failure was not clean");
        }
        Err(RuntimeError::Startup {
            reason: format!("{worker}: {reason}"),
        })
    }

    /// Runs the stop sequence once. Concurrent and later callers wait for
    /// `Stopped` and get `Ok(())`.
    ///
    /// The first caller gets [`RuntimeError::GraceExceeded`] when joinable workers
    /// outlived the grace period; the supervisor is `Stopped` either way.
    pub async fn stop(&self, reason: StopReason) -> Result<(), RuntimeError> {
        let mut first = false;
        self.state.send_if_modified(|s| match s {
            SupervisorState::Initializing | SupervisorState::Running => {
                *s = SupervisorState::Stopping;
                first = true;
                true
            }
            SupervisorState::Stopping | SupervisorState::Stopped => false,
        });

        if !first {
            let mut rx = self.state.subscribe();
            // The sender lives in `self`, so the channel cannot close while we wait.
            let _ = rx.wait_for(|s| *s == SupervisorState::Stopped).await;
            return Ok(());
        }

        let _ = self.stop_reason.set(reason.clone());
        self.publish_state(SupervisorState::Stopping);
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(reason.label()));

        self.stop_token.cancel();
        self.hardware.release();
        let stuck = self.registry.shutdown(self.cfg.grace).await;

        let res = if stuck.is_empty() {
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
            Ok(())
        } else {
            self.bus
                .publish(Event::new(EventKind::GraceExceeded).with_reason(stuck.join(", ")));
            Err(RuntimeError::GraceExceeded {
                grace: self.cfg.grace,
                stuck,
            })
        };

        self.publish_state(SupervisorState::Stopped);
        self.flush_events().await;
        self.state.send_replace(SupervisorState::Stopped);
        res
    }

    /// Starts, waits for a stop trigger, stops. Returns the reason of the stop
    /// that actually ran.
    pub async fn run(self: &Arc<Self>) -> StopReason {
        if let Err(e) = self.start().await {
            tracing::error!(error = %e, label = e.as_label(), "supervisor failed to start");
            return self.stop_reason().unwrap_or(StopReason::StartupFailed);
        }

        let trigger = tokio::select! {
            signal = interrupted() => StopReason::from(signal),
            _ = self.stop_requested.cancelled() => StopReason::Requested,
            _ = self.stop_token.cancelled() => {
                self.stop_reason().unwrap_or(StopReason::Requested)
            }
        };

        if let Err(e) = self.stop(trigger.clone()).await {
            tracing::error!(error = %e, label = e.as_label(), "supervisor stop was not clean");
        }
        self.stop_reason().unwrap_or(trigger)
    }

    /// Asks a running [`Supervisor::run`] to stop with [`StopReason::Requested`].
    pub fn request_stop(&self) {
        self.stop_requested.cancel();
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Receiver observing every state transition.
    pub fn state_changes(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    /// Reason recorded by the first `stop()` call, if any.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason.get().cloned()
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    pub fn hardware(&self) -> &Arc<HardwareInput> {
        &self.hardware
    }

    /// Runtime event bus; receivers see events published after subscribing.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscriber_count
    }

    /// Workers currently inside `run()`, sorted.
    pub async fn alive_workers(&self) -> Vec<String> {
        self.alive.snapshot().await
    }

    /// Launched workers in launch order. Empty once stop has completed.
    pub async fn launched_workers(&self) -> Vec<String> {
        self.registry.names().await
    }

    fn install_button_callback(&self) {
        let shared = Arc::clone(&self.shared);
        let bus = self.bus.clone();
        self.hardware.on_held(move || {
            shared.request_advertising();
            bus.publish(Event::new(EventKind::ButtonHeld));
        });
    }

    /// Stops the supervisor when a critical worker dies.
    async fn spawn_death_monitor(self: &Arc<Self>) {
        let Some(mut rx) = self.deaths.lock().await.take() else {
            return;
        };
        let me = Arc::clone(self);

        tokio::spawn(async move {
            tokio::select! {
                Some(CriticalDeath { worker, reason }) = rx.recv() => {
                    let err = RuntimeError::CriticalWorkerDied {
                        worker: worker.clone(),
                        reason,
                    };
                    tracing::error!(error = %err, label = err.as_label(), "stopping");
                    me.bus.publish(
                        Event::new(EventKind::CriticalWorkerDied)
                            .with_worker(worker.as_str())
                            .with_reason(err.to_string()),
                    );
                    if let Err(e) = me.stop(StopReason::CriticalWorkerDied { worker }).await {
                        tracing::warn!(error = %e, "stop after critical worker death was not clean");
                    }
                }
                _ = me.stop_token.cancelled() => {}
                else => {}
            }
        });
    }

    /// Delivers every event published so far to the subscribers, then ends the
    /// listener. Later events are not delivered.
    async fn flush_events(&self) {
        let Some(mut handle) = self.listener.lock().await.take() else {
            return;
        };
        self.flush.cancel();
        if time::timeout(self.cfg.flush_timeout, &mut handle).await.is_err() {
            tracing::warn!(timeout = ?self.cfg.flush_timeout, "subscribers did not drain in time");
            handle.abort();
        }
    }

    fn publish_state(&self, state: SupervisorState) {
        self.bus
            .publish(Event::new(EventKind::StateChanged).with_reason(state.label()));
    }
}

/// Completes on a termination signal; never completes if listeners cannot be installed.
async fn interrupted() -> Interrupt {
    match shutdown::wait_for_interrupt().await {
        Ok(signal) => signal,
        Err(e) => {
            tracing::warn!(error = %e, "failed to install signal handlers");
            std::future::pending().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use crate::hardware::fake::FakeGpio;
    use crate::hardware::{Gpio, HardwareError, HardwareSettings, PinAssignment, USER_BUTTON_HOLD};
    use crate::policies::{BackoffPolicy, JitterPolicy, RestartPolicy};
    use crate::subscribers::Subscribe;
    use crate::workers::{Worker, WorkerRef};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::time::{self, Instant};

    #[derive(Clone, Copy)]
    enum Behaviour {
        /// Runs until `quit()`.
        UntilQuit,
        /// Ignores `quit()` and never returns.
        Hang,
        /// Fails fatally after the given delay.
        DieAfter(Duration),
        /// Panics on every attempt.
        Panic,
    }

    struct Scripted {
        name: &'static str,
        behaviour: Behaviour,
        runs: AtomicUsize,
        quits: AtomicUsize,
        quit: CancellationToken,
    }

    #[async_trait]
    impl Worker for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(&self) -> Result<(), WorkerError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::UntilQuit => {
                    self.quit.cancelled().await;
                    Ok(())
                }
                Behaviour::Hang => std::future::pending().await,
                Behaviour::DieAfter(d) => {
                    time::sleep(d).await;
                    Err(WorkerError::fatal("adapter lost"))
                }
                Behaviour::Panic => panic!("worker bug"),
            }
        }

        fn quit(&self) {
            self.quits.fetch_add(1, Ordering::SeqCst);
            self.quit.cancel();
        }
    }

    fn scripted(name: &'static str, behaviour: Behaviour) -> Arc<Scripted> {
        Arc::new(Scripted {
            name,
            behaviour,
            runs: AtomicUsize::new(0),
            quits: AtomicUsize::new(0),
            quit: CancellationToken::new(),
        })
    }

    fn spec_for(p: &Arc<Scripted>) -> WorkerSpec {
        let p = Arc::clone(p);
        WorkerSpec::new(p.name, move |_| Ok(p as WorkerRef))
    }

    fn fast_backoff() -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(100),
            max: Duration::from_millis(100),
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    fn config() -> SupervisorConfig {
        SupervisorConfig {
            grace: Duration::from_secs(2),
            backoff: fast_backoff(),
            ..SupervisorConfig::default()
        }
    }

    fn gpio_hardware(fake: &Arc<FakeGpio>) -> HardwareInput {
        HardwareInput::with_gpio(
            Arc::clone(fake) as Arc<dyn Gpio>,
            USER_BUTTON_HOLD,
            Duration::from_millis(50),
        )
    }

    async fn settle() {
        time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn gpio_disabled_launches_every_worker_without_hardware_calls() {
        let opened = Arc::new(AtomicBool::new(false));
        let settings = HardwareSettings {
            gpio_enabled: false,
            pins: PinAssignment { button: 26, status: 25 },
            sysfs_root: PathBuf::from("/nonexistent/gpio"),
            hold_threshold: USER_BUTTON_HOLD,
            poll_interval: Duration::from_millis(50),
        };
        let hardware = {
            let opened = Arc::clone(&opened);
            HardwareInput::detect_with(&settings, move |_| {
                opened.store(true, Ordering::SeqCst);
                Err(HardwareError::Unavailable { path: PathBuf::new() })
            })
        };

        let scripted_workers = [
            scripted("led", Behaviour::UntilQuit),
            scripted("bluetooth_services", Behaviour::UntilQuit),
            scripted("diagnostics", Behaviour::UntilQuit),
            scripted("wifi", Behaviour::UntilQuit),
            scripted("bluetooth_advertisement", Behaviour::UntilQuit),
        ];
        let mut specs: Vec<WorkerSpec> = scripted_workers.iter().map(spec_for).collect();
        specs[1] = spec_for(&scripted_workers[1]).joinable().critical();

        let sup = Supervisor::builder(config())
            .with_hardware(hardware)
            .with_workers(specs)
            .build();
        sup.start().await.expect("start");
        settle().await;

        assert_eq!(sup.state(), SupervisorState::Running);
        assert!(!opened.load(Ordering::SeqCst));
        assert!(!sup.hardware().is_gpio());
        assert_eq!(
            sup.launched_workers().await,
            ["led", "bluetooth_services", "diagnostics", "wifi", "bluetooth_advertisement"]
        );
        for p in &scripted_workers {
            assert_eq!(p.runs.load(Ordering::SeqCst), 1, "{} ran", p.name);
        }

        sup.stop(StopReason::Requested).await.expect("stop");
        assert_eq!(sup.state(), SupervisorState::Stopped);
        assert_eq!(scripted_workers[1].quits.load(Ordering::SeqCst), 1);
        assert_eq!(scripted_workers[0].quits.load(Ordering::SeqCst), 0, "detached workers are not quit");
    }

    #[tokio::test(start_paused = true)]
    async fn button_hold_requests_advertising() {
        let fake = Arc::new(FakeGpio::default());
        let sup = Supervisor::builder(config())
            .with_hardware(gpio_hardware(&fake))
            .build();
        let mut events = sup.bus().subscribe();
        sup.start().await.expect("start");

        fake.press(true);
        time::sleep(Duration::from_millis(1_500)).await;
        assert!(!sup.shared().should_advertise_bluetooth());

        time::sleep(Duration::from_millis(600)).await;
        assert!(sup.shared().should_advertise_bluetooth());

        let mut saw_button = false;
        while let Ok(ev) = events.try_recv() {
            saw_button |= ev.kind == EventKind::ButtonHeld;
        }
        assert!(saw_button);

        sup.stop(StopReason::Requested).await.expect("stop");
        assert_eq!(fake.releases(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_stops_release_hardware_once() {
        let fake = Arc::new(FakeGpio::default());
        let bt = scripted("bluetooth_services", Behaviour::UntilQuit);
        let sup = Supervisor::builder(config())
            .with_hardware(gpio_hardware(&fake))
            .with_workers(vec![spec_for(&bt).joinable()])
            .build();
        sup.start().await.expect("start");
        settle().await;

        let (a, b, c) = tokio::join!(
            sup.stop(StopReason::Requested),
            sup.stop(StopReason::Interrupted { signal: "SIGINT" }),
            sup.stop(StopReason::Requested),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        sup.stop(StopReason::Requested).await.expect("repeat stop");

        assert_eq!(sup.state(), SupervisorState::Stopped);
        assert_eq!(fake.releases(), 1);
        assert_eq!(bt.quits.load(Ordering::SeqCst), 1);
        assert_eq!(sup.stop_reason(), Some(StopReason::Requested));
    }

    #[tokio::test(start_paused = true)]
    async fn third_worker_build_failure_stops_everything() {
        let fake = Arc::new(FakeGpio::default());
        let first = scripted("led", Behaviour::UntilQuit);
        let second = scripted("bluetooth_services", Behaviour::UntilQuit);
        let fourth_built = Arc::new(AtomicBool::new(false));

        let specs = vec![
            spec_for(&first),
            spec_for(&second).joinable(),
            WorkerSpec::new("diagnostics", |_| Err(WorkerError::fatal("bad url"))),
            {
                let built = Arc::clone(&fourth_built);
                WorkerSpec::new("wifi", move |_| {
                    built.store(true, Ordering::SeqCst);
                    Ok(scripted("wifi", Behaviour::UntilQuit) as WorkerRef)
                })
            },
        ];

        let sup = Supervisor::builder(config())
            .with_hardware(gpio_hardware(&fake))
            .with_workers(specs)
            .build();
        let err = sup.start().await.expect_err("startup must fail");

        assert!(matches!(err, RuntimeError::Startup { ref reason } if reason.starts_with("diagnostics")));
        assert_eq!(sup.state(), SupervisorState::Stopped);
        assert_eq!(sup.stop_reason(), Some(StopReason::StartupFailed));
        assert_eq!(fake.releases(), 1);
        assert_eq!(second.quits.load(Ordering::SeqCst), 1);
        assert!(!fourth_built.load(Ordering::SeqCst));
        assert!(sup.launched_workers().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn critical_worker_death_stops_supervisor() {
        let bt = scripted("bluetooth_services", Behaviour::DieAfter(Duration::from_millis(200)));
        let led = scripted("led", Behaviour::UntilQuit);
        let sup = Supervisor::builder(config())
            .with_workers(vec![spec_for(&led), spec_for(&bt).joinable().critical()])
            .build();

        let reason = time::timeout(Duration::from_secs(5), sup.run())
            .await
            .expect("run returns");
        assert_eq!(
            reason,
            StopReason::CriticalWorkerDied {
                worker: "bluetooth_services".into()
            }
        );
        assert_eq!(reason.exit_code(), 1);
        assert_eq!(sup.state(), SupervisorState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn non_critical_death_is_ignored() {
        let diag = scripted("diagnostics", Behaviour::DieAfter(Duration::from_millis(200)));
        let sup = Supervisor::builder(config())
            .with_workers(vec![spec_for(&diag)])
            .build();
        sup.start().await.expect("start");

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sup.state(), SupervisorState::Running);
        assert!(sup.alive_workers().await.is_empty());
        sup.stop(StopReason::Requested).await.expect("stop");
    }

    #[tokio::test(start_paused = true)]
    async fn hung_joinable_worker_is_bounded_by_grace() {
        let hung = scripted("bluetooth_services", Behaviour::Hang);
        let sup = Supervisor::builder(config())
            .with_workers(vec![spec_for(&hung).joinable()])
            .build();
        sup.start().await.expect("start");
        settle().await;

        let started = Instant::now();
        let err = sup.stop(StopReason::Requested).await.expect_err("grace exceeded");

        assert!(matches!(err, RuntimeError::GraceExceeded { ref stuck, .. } if stuck == &["bluetooth_services"]));
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(sup.state(), SupervisorState::Stopped);
        assert_eq!(hung.quits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn requested_stop_exits_zero() {
        let sup = Supervisor::builder(config())
            .with_workers(vec![spec_for(&scripted("wifi", Behaviour::UntilQuit))])
            .build();
        let runner = {
            let sup = Arc::clone(&sup);
            tokio::spawn(async move { sup.run().await })
        };

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sup.state(), SupervisorState::Running);
        sup.request_stop();

        let reason = runner.await.expect("join");
        assert_eq!(reason, StopReason::Requested);
        assert_eq!(reason.exit_code(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_worker_is_isolated_and_restarted() {
        let bad = scripted("wifi", Behaviour::Panic);
        let good = scripted("led", Behaviour::UntilQuit);
        let sup = Supervisor::builder(SupervisorConfig {
            restart: RestartPolicy::OnFailure,
            ..config()
        })
        .with_workers(vec![spec_for(&bad), spec_for(&good)])
        .build();
        let mut events = sup.bus().subscribe();
        sup.start().await.expect("start");

        time::sleep(Duration::from_millis(350)).await;
        assert_eq!(sup.state(), SupervisorState::Running);
        assert!(bad.runs.load(Ordering::SeqCst) >= 3, "restarted after panics");
        assert_eq!(good.runs.load(Ordering::SeqCst), 1);
        assert!(sup.alive_workers().await.contains(&"led".to_string()));

        let mut failures = 0;
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::WorkerFailed {
                failures += 1;
            }
        }
        assert!(failures >= 3);
        sup.stop(StopReason::Requested).await.expect("stop");
    }

    #[derive(Default)]
    struct Recorder {
        kinds: std::sync::Mutex<Vec<EventKind>>,
    }

    impl Recorder {
        fn kinds(&self) -> Vec<EventKind> {
            self.kinds.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.kinds.lock().expect("lock").push(event.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn startup_failure_reaches_subscribers_before_run_returns() {
        let recorder = Arc::new(Recorder::default());
        let sup = Supervisor::builder(config())
            .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
            .with_workers(vec![WorkerSpec::new("diagnostics", |_| {
                Err(WorkerError::fatal("bad url"))
            })])
            .build();

        let reason = sup.run().await;

        assert_eq!(reason, StopReason::StartupFailed);
        let kinds = recorder.kinds();
        assert!(kinds.contains(&EventKind::StartupFailed), "{kinds:?}");
        assert_eq!(kinds.last(), Some(&EventKind::StateChanged));
    }

    #[tokio::test(start_paused = true)]
    async fn critical_death_is_reported_before_run_returns() {
        let recorder = Arc::new(Recorder::default());
        let bt = scripted("bluetooth_services", Behaviour::DieAfter(Duration::from_millis(200)));
        let sup = Supervisor::builder(config())
            .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
            .with_workers(vec![spec_for(&bt).joinable().critical()])
            .build();

        let reason = sup.run().await;

        assert!(matches!(reason, StopReason::CriticalWorkerDied { .. }));
        let kinds = recorder.kinds();
        assert!(kinds.contains(&EventKind::WorkerDead), "{kinds:?}");
        assert!(kinds.contains(&EventKind::CriticalWorkerDied), "{kinds:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn events_after_stop_are_not_delivered() {
        let recorder = Arc::new(Recorder::default());
        let sup = Supervisor::builder(config())
            .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
            .build();
        sup.start().await.expect("start");
        sup.stop(StopReason::Requested).await.expect("stop");
        let delivered = recorder.kinds().len();

        sup.bus().publish(Event::new(EventKind::ButtonHeld));
        settle().await;

        assert_eq!(recorder.kinds().len(), delivered);
        assert_eq!(sup.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let sup = Supervisor::builder(config()).build();
        sup.start().await.expect("start");
        assert!(sup.start().await.is_err());
        sup.stop(StopReason::Requested).await.expect("stop");
        assert!(sup.start().await.is_err());
    }
}
