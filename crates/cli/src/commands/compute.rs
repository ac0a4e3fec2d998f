// `inkwell compute`: run CPU-bound jobs on the compute pool.

use clap::Args;
use inkwell_common::task::{PoolKind, Task};

use super::{dispatch_batch, Context};
use crate::exit_code::ExitCode;

#[derive(Debug, Args)]
pub struct ComputeArgs {
    pub task_name: String,

    /// Number of jobs to queue.
    #[arg(long, default_value_t = 1)]
    count: usize,
}

pub fn run(args: ComputeArgs, ctx: &Context) -> anyhow::Result<ExitCode> {
    let tasks = (0..args.count)
        .map(|n| match args.count {
            1 => Task::compute(args.task_name.clone()),
            _ => Task::compute(format!("{}-{n}", args.task_name)),
        })
        .collect();
    dispatch_batch(ctx, PoolKind::Compute, tasks)
}
