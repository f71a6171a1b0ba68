//! # Worker liveness tracker with sequence-based ordering.
//!
//! ```text
//! Bus ──► supervisor listener ──► AliveTracker::update()
//!                                       │
//!                                       ▼
//!                         HashMap<String, WorkerState> (name → {seq, alive})
//! ```
//!
//! ## Rules
//! - `WorkerStarting` marks a worker alive; `WorkerStopped`, `WorkerFailed`,
//!   `WorkerExited` and `WorkerDead` mark it not alive.
//! - Events with `seq <= last_seq` for a worker are rejected as stale.
//! - Reads are eventually consistent with the bus.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};

#[derive(Debug, Clone, Copy)]
struct WorkerState {
    last_seq: Option<u64>,
    alive: bool,
}

/// Tracks which workers are currently inside `run()`.
#[derive(Debug, Default)]
pub struct AliveTracker {
    state: RwLock<HashMap<String, WorkerState>>,
}

impl AliveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `ev` if it is newer than the last event seen for its worker.
    ///
    /// Returns true when the alive flag was (re)written.
    pub async fn update(&self, ev: &Event) -> bool {
        let alive = match ev.kind {
            EventKind::WorkerStarting => true,
            EventKind::WorkerStopped
            | EventKind::WorkerFailed
            | EventKind::WorkerExited
            | EventKind::WorkerDead => false,
            _ => return false,
        };
        let Some(name) = ev.worker.as_deref() else {
            return false;
        };

        let mut state = self.state.write().await;
        let entry = state.entry(name.to_string()).or_insert(WorkerState {
            last_seq: None,
            alive: false,
        });
        if entry.last_seq.is_some_and(|last| ev.seq <= last) {
            return false;
        }
        entry.last_seq = Some(ev.seq);
        entry.alive = alive;
        true
    }

    /// Sorted names of workers currently alive.
    pub async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut alive: Vec<String> = state
            .iter()
            .filter(|(_, ws)| ws.alive)
            .map(|(name, _)| name.clone())
            .collect();
        alive.sort_unstable();
        alive
    }
}
