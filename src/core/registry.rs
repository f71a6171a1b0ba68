//! # Worker registry: owns the execution context of every launched worker.
//!
//! ```text
//! launch(built, worker)
//!     └─► tokio::spawn(WorkerActor::run(stop))
//!             └─► on exit of a critical worker (Exited / Dead) → CriticalDeath channel
//!
//! shutdown(grace)
//!     ├─► Joinable: publish WorkerQuitRequested, worker.quit()
//!     ├─► Joinable: await each join until the shared deadline; abort the rest
//!     └─► Detached: abort
//! ```
//!
//! ## Rules
//! - Launching after the stop token fired is refused, so a slot can never be
//!   added behind `shutdown`'s back.
//! - `shutdown` drains the slots; a second call finds nothing to do.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::core::actor::{ActorExit, WorkerActor, WorkerActorParams};
use crate::events::{Bus, Event, EventKind};
use crate::workers::{ShutdownRole, WorkerRef};

/// Permanent termination of a critical worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CriticalDeath {
    pub(crate) worker: String,
    pub(crate) reason: String,
}

struct Slot {
    name: Arc<str>,
    role: ShutdownRole,
    worker: WorkerRef,
    join: JoinHandle<()>,
}

/// Launched workers and their join handles.
pub(crate) struct WorkerRegistry {
    slots: Mutex<Vec<Slot>>,
    bus: Bus,
    stop: CancellationToken,
    deaths: mpsc::UnboundedSender<CriticalDeath>,
}

impl WorkerRegistry {
    pub(crate) fn new(
        bus: Bus,
        stop: CancellationToken,
        deaths: mpsc::UnboundedSender<CriticalDeath>,
    ) -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
            bus,
            stop,
            deaths,
        }
    }

    /// Spawns the actor for `worker`. Returns false if stop already began.
    pub(crate) async fn launch(
        &self,
        role: ShutdownRole,
        critical: bool,
        worker: WorkerRef,
        params: WorkerActorParams,
    ) -> bool {
        let mut slots = self.slots.lock().await;
        if self.stop.is_cancelled() {
            return false;
        }

        let name: Arc<str> = Arc::from(worker.name());
        let actor = WorkerActor::new(Arc::clone(&worker), params, self.bus.clone());
        let stop = self.stop.clone();
        let deaths = self.deaths.clone();
        let worker_name = Arc::clone(&name);

        let join = tokio::spawn(async move {
            let exit = actor.run(stop).await;
            if !critical {
                return;
            }
            let reason = match exit {
                ActorExit::Stopped => return,
                ActorExit::Exited => "exited".to_string(),
                ActorExit::Dead { reason } => reason,
            };
            let _ = deaths.send(CriticalDeath {
                worker: worker_name.to_string(),
                reason,
            });
        });

        slots.push(Slot {
            name,
            role,
            worker,
            join,
        });
        true
    }

    /// Names of launched workers, in launch order.
    pub(crate) async fn names(&self) -> Vec<String> {
        self.slots
            .lock()
            .await
            .iter()
            .map(|s| s.name.to_string())
            .collect()
    }

    /// Quits and joins joinable workers within `grace`, aborts everything else.
    ///
    /// Returns the joinable workers that did not finish in time.
    pub(crate) async fn shutdown(&self, grace: Duration) -> Vec<String> {
        let slots: Vec<Slot> = self.slots.lock().await.drain(..).collect();
        let (joinable, detached): (Vec<Slot>, Vec<Slot>) = slots
            .into_iter()
            .partition(|s| s.role == ShutdownRole::Joinable);

        for slot in &joinable {
            self.bus
                .publish(Event::new(EventKind::WorkerQuitRequested).with_worker(Arc::clone(&slot.name)));
            slot.worker.quit();
        }

        let deadline = Instant::now() + grace;
        let mut stuck = Vec::new();
        for mut slot in joinable {
            if time::timeout_at(deadline, &mut slot.join).await.is_err() {
                slot.join.abort();
                stuck.push(slot.name.to_string());
            }
        }

        for slot in detached {
            slot.join.abort();
        }
        stuck
    }
}
