// Completion counters, owned by one aggregator task.
//
// Pools never touch the counters; they send a `TaskEvent` per finished task
// and the aggregator applies it, so concurrent completions cannot lose
// updates.

use inkwell_common::task::{PoolKind, TaskKind};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    pub notifications_sent: u64,
    pub computations_completed: u64,
    pub io_failed: u64,
    pub compute_failed: u64,
}

impl DispatchStats {
    pub fn failed(&self) -> u64 {
        self.io_failed + self.compute_failed
    }

    /// Tasks that ran to an end, successful or not.
    pub fn finished(&self) -> u64 {
        self.notifications_sent + self.computations_completed + self.failed()
    }

    fn apply(&mut self, event: TaskEvent) {
        match (event.succeeded, event.kind, event.pool) {
            (true, TaskKind::Notify, _) => self.notifications_sent += 1,
            (true, TaskKind::Compute, _) => self.computations_completed += 1,
            (false, _, PoolKind::Io) => self.io_failed += 1,
            (false, _, PoolKind::Compute) => self.compute_failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TaskEvent {
    pub pool: PoolKind,
    pub kind: TaskKind,
    pub succeeded: bool,
}

/// Runs until every event sender is dropped, then returns the final tally.
pub(crate) async fn aggregate(
    mut events: mpsc::UnboundedReceiver<TaskEvent>,
    publish: watch::Sender<DispatchStats>,
) -> DispatchStats {
    let mut stats = DispatchStats::default();
    while let Some(event) = events.recv().await {
        stats.apply(event);
        publish.send_replace(stats);
    }
    debug!(finished = stats.finished(), "dispatch stats aggregator stopped");
    stats
}
