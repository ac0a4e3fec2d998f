// `inkwell notify`: queue notifications on the I/O pool and wait for them.

use clap::Args;
use inkwell_common::task::{PoolKind, Task};

use super::{dispatch_batch, Context};
use crate::exit_code::ExitCode;

#[derive(Debug, Args)]
pub struct NotifyArgs {
    pub message: String,

    /// Send the message this many times.
    #[arg(long, default_value_t = 1)]
    count: usize,
}

pub fn run(args: NotifyArgs, ctx: &Context) -> anyhow::Result<ExitCode> {
    let tasks = (0..args.count).map(|_| Task::notify(args.message.clone())).collect();
    dispatch_batch(ctx, PoolKind::Io, tasks)
}
