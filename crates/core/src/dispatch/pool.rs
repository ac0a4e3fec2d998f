// One worker pool: a FIFO queue, a scheduler loop and a permit bound.
//
// `submit` only pushes onto an unbounded channel (plus a capacity check for
// bounded queues), so it never waits for a worker slot. The scheduler takes
// tasks in order and starts each one once a permit is free.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use inkwell_common::task::{PoolKind, TaskRequest};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use super::isolation::Executor;
use super::stats::TaskEvent;
use crate::config::{Isolation, PoolConfig, QueuePolicy};
use crate::error::SubmitError;
use crate::worker::TaskRunner;

#[derive(Debug, Default)]
struct PoolGauges {
    queued: AtomicUsize,
    active: AtomicUsize,
    peak_active: AtomicUsize,
}

/// Point-in-time view of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolSnapshot {
    pub pool: PoolKind,
    pub concurrency: usize,
    pub isolation: Isolation,
    /// Submitted but not yet started.
    pub queued: usize,
    pub active: usize,
    /// Highest `active` seen since the pool started.
    pub peak_active: usize,
}

pub(crate) struct Pool {
    kind: PoolKind,
    concurrency: usize,
    isolation: Isolation,
    policy: QueuePolicy,
    queue: mpsc::UnboundedSender<TaskRequest>,
    gauges: Arc<PoolGauges>,
    scheduler: JoinHandle<()>,
}

impl Pool {
    pub(crate) fn start(
        kind: PoolKind,
        config: &PoolConfig,
        runner: Arc<TaskRunner>,
        events: mpsc::UnboundedSender<TaskEvent>,
        handle: &Handle,
    ) -> anyhow::Result<Self> {
        let executor = Executor::for_pool(kind, config, runner)?;
        let concurrency = config.concurrency_for(kind);
        let isolation = executor.isolation();
        let gauges = Arc::new(PoolGauges::default());
        let (queue, queue_rx) = mpsc::unbounded_channel();

        let scheduler = handle.spawn(schedule(
            kind,
            queue_rx,
            Arc::new(Semaphore::new(concurrency)),
            Arc::new(executor),
            Arc::clone(&gauges),
            events,
        ));

        info!(pool = %kind, concurrency, ?isolation, queue = ?config.queue, "worker pool started");
        Ok(Self { kind, concurrency, isolation, policy: config.queue, queue, gauges, scheduler })
    }

    pub(crate) fn submit(&self, request: TaskRequest) -> Result<(), SubmitError> {
        self.reserve_queue_slot()?;
        let id = request.id;
        if self.queue.send(request).is_err() {
            self.gauges.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(SubmitError::Closed { pool: self.kind });
        }
        debug!(pool = %self.kind, task_id = %id, "task queued");
        Ok(())
    }

    fn reserve_queue_slot(&self) -> Result<(), SubmitError> {
        match self.policy {
            QueuePolicy::Unbounded => {
                self.gauges.queued.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            QueuePolicy::Bounded { capacity } => self
                .gauges
                .queued
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |queued| {
                    (queued < capacity).then_some(queued + 1)
                })
                .map(|_| ())
                .map_err(|_| {
                    warn!(pool = %self.kind, capacity, "task rejected: queue full");
                    SubmitError::ResourceExhausted { pool: self.kind, capacity }
                }),
        }
    }

    pub(crate) fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            pool: self.kind,
            concurrency: self.concurrency,
            isolation: self.isolation,
            queued: self.gauges.queued.load(Ordering::SeqCst),
            active: self.gauges.active.load(Ordering::SeqCst),
            peak_active: self.gauges.peak_active.load(Ordering::SeqCst),
        }
    }

    /// Stop accepting tasks and wait until every queued task has run.
    pub(crate) async fn drain(self) {
        let Self { kind, queue, scheduler, .. } = self;
        drop(queue);
        if let Err(join_error) = scheduler.await {
            error!(pool = %kind, error = %join_error, "pool scheduler ended abnormally");
        }
        info!(pool = %kind, "worker pool drained");
    }
}

async fn schedule(
    kind: PoolKind,
    mut queue: mpsc::UnboundedReceiver<TaskRequest>,
    permits: Arc<Semaphore>,
    executor: Arc<Executor>,
    gauges: Arc<PoolGauges>,
    events: mpsc::UnboundedSender<TaskEvent>,
) {
    let mut running = JoinSet::new();

    while let Some(request) = queue.recv().await {
        // The semaphore is never closed.
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        reap_finished(kind, &mut running);

        gauges.queued.fetch_sub(1, Ordering::SeqCst);
        let active = gauges.active.fetch_add(1, Ordering::SeqCst) + 1;
        gauges.peak_active.fetch_max(active, Ordering::SeqCst);
        debug!(pool = %kind, task_id = %request.id, active, "task started");

        let executor = Arc::clone(&executor);
        let gauges = Arc::clone(&gauges);
        let events = events.clone();
        running.spawn(async move {
            let id = request.id;
            let task_kind = request.task.kind();
            let result = executor.execute(request).await;

            gauges.active.fetch_sub(1, Ordering::SeqCst);
            drop(permit);

            match &result {
                Ok(()) => debug!(pool = %kind, task_id = %id, task = %task_kind, "task finished"),
                Err(error) => {
                    warn!(pool = %kind, task_id = %id, task = %task_kind, error = %format!("{error:#}"), "task failed")
                }
            }
            let _ = events.send(TaskEvent { pool: kind, kind: task_kind, succeeded: result.is_ok() });
        });
    }

    while let Some(joined) = running.join_next().await {
        log_abnormal_end(kind, joined);
    }
}

/// Collect supervisors that already ended. Returns how many ended abnormally.
fn reap_finished(kind: PoolKind, running: &mut JoinSet<()>) -> usize {
    let mut abnormal = 0;
    while let Some(joined) = running.try_join_next() {
        if log_abnormal_end(kind, joined) {
            abnormal += 1;
        }
    }
    abnormal
}

fn log_abnormal_end(kind: PoolKind, joined: Result<(), JoinError>) -> bool {
    match joined {
        Ok(()) => false,
        Err(join_error) => {
            error!(pool = %kind, error = %join_error, "task supervisor ended abnormally");
            true
        }
    }
}
