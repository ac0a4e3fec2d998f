//! Fire-and-forget background dispatch over two independently sized pools.
//!
//! | Pool | Default bound | Default isolation |
//! |---|---|---|
//! | `Io` | 5 | blocking threads |
//! | `Compute` | available parallelism | child processes |
//!
//! Submission never waits for a worker. Task outcomes are never returned to
//! the submitter; they are logged and counted in [`DispatchStats`].

mod isolation;
mod pool;
mod stats;

use std::sync::Arc;

use inkwell_common::task::{PoolKind, Task, TaskId, TaskRequest};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::DispatcherConfig;
use crate::error::SubmitError;
use crate::worker::TaskRunner;
use pool::Pool;
pub use pool::PoolSnapshot;
pub use stats::DispatchStats;

pub struct TaskDispatcher {
    io: Pool,
    compute: Pool,
    stats: watch::Receiver<DispatchStats>,
    aggregator: JoinHandle<DispatchStats>,
}

impl TaskDispatcher {
    /// Spawn both pools' schedulers and the stats aggregator on `handle`.
    pub fn start(
        config: &DispatcherConfig,
        runner: Arc<TaskRunner>,
        handle: &Handle,
    ) -> anyhow::Result<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (stats_tx, stats_rx) = watch::channel(DispatchStats::default());

        let io = Pool::start(PoolKind::Io, &config.io, Arc::clone(&runner), events_tx.clone(), handle)?;
        let compute = Pool::start(PoolKind::Compute, &config.compute, runner, events_tx, handle)?;
        let aggregator = handle.spawn(stats::aggregate(events_rx, stats_tx));

        Ok(Self { io, compute, stats: stats_rx, aggregator })
    }

    /// Queue `task` on `pool` and return at once.
    pub fn submit(&self, pool: PoolKind, task: Task) -> Result<TaskId, SubmitError> {
        let request = TaskRequest::new(task);
        let id = request.id;
        self.pool(pool).submit(request)?;
        Ok(id)
    }

    pub fn notify(&self, message: impl Into<String>) -> Result<TaskId, SubmitError> {
        self.submit(PoolKind::Io, Task::notify(message))
    }

    pub fn compute(&self, task_name: impl Into<String>) -> Result<TaskId, SubmitError> {
        self.submit(PoolKind::Compute, Task::compute(task_name))
    }

    pub fn stats(&self) -> DispatchStats {
        *self.stats.borrow()
    }

    /// Receiver that sees every published stats update.
    pub fn subscribe(&self) -> watch::Receiver<DispatchStats> {
        self.stats.clone()
    }

    pub fn pool_gauges(&self, pool: PoolKind) -> PoolSnapshot {
        self.pool(pool).snapshot()
    }

    /// Close both queues, run everything already queued, and return the
    /// final counters.
    pub async fn shutdown(self) -> DispatchStats {
        let Self { io, compute, stats, aggregator } = self;
        io.drain().await;
        compute.drain().await;

        let final_stats = match aggregator.await {
            Ok(final_stats) => final_stats,
            Err(join_error) => {
                error!(error = %join_error, "dispatch stats aggregator ended abnormally");
                *stats.borrow()
            }
        };
        info!(
            notifications_sent = final_stats.notifications_sent,
            computations_completed = final_stats.computations_completed,
            failed = final_stats.failed(),
            "dispatcher shut down"
        );
        final_stats
    }

    fn pool(&self, kind: PoolKind) -> &Pool {
        match kind {
            PoolKind::Io => &self.io,
            PoolKind::Compute => &self.compute,
        }
    }
}
