//! Task bodies run by the dispatcher's pools.
//!
//! The same `TaskRunner` executes a task whether the pool runs it on a
//! blocking thread or in a `run-task` child process.

pub mod compute;
pub mod notification;

use std::io::BufRead;
use std::sync::Arc;

use anyhow::Context;
use inkwell_common::task::{Task, TaskRequest};

use crate::config::WorkerConfig;
pub use compute::ComputeWorker;
pub use notification::{NotificationWorker, Notifier, SimulatedNotifier};

#[derive(Clone)]
pub struct TaskRunner {
    notifications: NotificationWorker,
    compute: ComputeWorker,
}

impl TaskRunner {
    pub fn new(config: &WorkerConfig) -> Self {
        Self::with_notifier(
            Arc::new(SimulatedNotifier::new(config.notify_delay())),
            ComputeWorker::new(config.compute_iterations),
        )
    }

    pub fn with_notifier(notifier: Arc<dyn Notifier>, compute: ComputeWorker) -> Self {
        Self { notifications: NotificationWorker::new(notifier), compute }
    }

    /// Run one task to completion on the calling thread.
    pub fn run(&self, task: &Task) -> anyhow::Result<()> {
        match task {
            Task::Notify { message } => self.notifications.run(message),
            Task::Compute { task_name } => {
                self.compute.run(task_name);
                Ok(())
            }
        }
    }
}

/// Read the single JSON `TaskRequest` line a process-isolated pool writes.
pub fn read_request(mut reader: impl BufRead) -> anyhow::Result<TaskRequest> {
    let mut line = String::new();
    reader.read_line(&mut line).context("failed to read task request")?;
    if line.trim().is_empty() {
        anyhow::bail!("no task request on stdin");
    }
    serde_json::from_str(line.trim()).context("failed to parse task request")
}
