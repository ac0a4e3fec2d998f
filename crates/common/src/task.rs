// Background task wire types.
//
// A task carries only owned, serializable data so it can cross a process
// boundary unchanged: the isolated pool writes one `TaskRequest` as JSON to a
// child's stdin.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TaskId = Uuid;

/// Which pool a task is submitted to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    /// Small fixed pool for work that waits on external I/O.
    Io,
    /// Pool sized to the machine for CPU-bound work.
    Compute,
}

impl PoolKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Io => "io",
            Self::Compute => "compute",
        }
    }
}

impl std::fmt::Display for PoolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    Notify { message: String },
    Compute { task_name: String },
}

impl Task {
    pub fn notify(message: impl Into<String>) -> Self {
        Self::Notify { message: message.into() }
    }

    pub fn compute(task_name: impl Into<String>) -> Self {
        Self::Compute { task_name: task_name.into() }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Self::Notify { .. } => TaskKind::Notify,
            Self::Compute { .. } => TaskKind::Compute,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Notify,
    Compute,
}

impl TaskKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Notify => "notify",
            Self::Compute => "compute",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRequest {
    pub id: TaskId,
    pub task: Task,
}

impl TaskRequest {
    pub fn new(task: Task) -> Self {
        Self { id: Uuid::new_v4(), task }
    }
}
