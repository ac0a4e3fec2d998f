// `inkwell run-task`: the child side of process isolation.
//
// Reads one `TaskRequest` from stdin and runs it. Exit status 0 means the
// task succeeded.

use std::io;

use anyhow::Context as _;
use inkwell_core::worker::{self, TaskRunner};
use tracing::debug;

use super::Context;
use crate::exit_code::ExitCode;

pub fn run(ctx: &Context) -> anyhow::Result<ExitCode> {
    let request = worker::read_request(io::stdin().lock())?;
    debug!(task_id = %request.id, task = %request.task.kind(), "running isolated task");

    TaskRunner::new(&ctx.config.workers)
        .run(&request.task)
        .with_context(|| format!("task {} failed", request.id))?;
    Ok(ExitCode::Success)
}
