use std::sync::Arc;

use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{alive::AliveTracker, config::SupervisorConfig, supervisor::Supervisor};
use crate::{
    events::{Bus, Event},
    hardware::HardwareInput,
    state::SharedState,
    subscribers::{Subscribe, SubscriberSet},
    workers::WorkerSpec,
};

/// Builder for a [`Supervisor`].
///
/// Unset parts default to a fresh [`SharedState`], the mock [`HardwareInput`],
/// no subscribers and no workers.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    hardware: Option<HardwareInput>,
    shared: Option<Arc<SharedState>>,
    workers: Vec<WorkerSpec>,
}

impl Supervisor {
    /// Starts building a supervisor with the given configuration.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }
}

impl SupervisorBuilder {
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            hardware: None,
            shared: None,
            workers: Vec::new(),
        }
    }

    /// Event subscribers, each driven by its own task and bounded queue.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Hardware input selected by capability detection.
    pub fn with_hardware(mut self, hardware: HardwareInput) -> Self {
        self.hardware = Some(hardware);
        self
    }

    pub fn with_shared_state(mut self, shared: Arc<SharedState>) -> Self {
        self.shared = Some(shared);
        self
    }

    /// Workers to build and launch in `start()`, in order.
    pub fn with_workers(mut self, workers: Vec<WorkerSpec>) -> Self {
        self.workers = workers;
        self
    }

    /// Builds the supervisor and spawns its event listener.
    ///
    /// Must be called within a tokio runtime.
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let subscriber_count = subs.len();
        let alive = Arc::new(AliveTracker::new());
        let hardware = self
            .hardware
            .unwrap_or_else(|| HardwareInput::mock(self.cfg.hold_threshold()));
        let shared = self.shared.unwrap_or_default();

        let flush = CancellationToken::new();
        let listener = spawn_listener(bus.subscribe(), subs, Arc::clone(&alive), flush.clone());

        Arc::new(Supervisor::new_internal(
            self.cfg,
            bus,
            Listener {
                subscriber_count,
                flush,
                handle: listener,
            },
            alive,
            shared,
            Arc::new(hardware),
            self.workers,
        ))
    }
}

/// The task forwarding bus events, and how to wind it down.
pub(crate) struct Listener {
    pub(crate) subscriber_count: usize,
    /// Cancelled once no further events will be delivered.
    pub(crate) flush: CancellationToken,
    pub(crate) handle: JoinHandle<()>,
}

/// Forwards bus events to the alive tracker (in order) and the subscriber set.
///
/// After `flush` fires, events already on the bus are still delivered, then the
/// subscriber queues are drained and the task ends.
fn spawn_listener(
    mut rx: broadcast::Receiver<Event>,
    subs: SubscriberSet,
    alive: Arc<AliveTracker>,
    flush: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                res = rx.recv() => match res {
                    Ok(ev) => {
                        alive.update(&ev).await;
                        subs.emit(&ev);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = flush.cancelled() => {
                    loop {
                        match rx.try_recv() {
                            Ok(ev) => {
                                alive.update(&ev).await;
                                subs.emit(&ev);
                            }
                            Err(TryRecvError::Lagged(skipped)) => {
                                tracing::warn!(skipped, "event listener lagged");
                            }
                            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                        }
                    }
                    break;
                }
            }
        }
        subs.shutdown().await;
    })
}
