// CLI subcommand dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Subcommand};
use inkwell_common::error::ErrorCode;
use inkwell_common::task::{PoolKind, Task, TaskId};
use inkwell_core::config::InkwellConfig;
use inkwell_core::dispatch::{DispatchStats, TaskDispatcher};
use inkwell_core::store::VersionedStore;
use inkwell_core::worker::TaskRunner;
use serde::Serialize;
use tokio::runtime::Runtime;

use crate::exit_code::ExitCode;
use crate::output::{self, OutputFormat};

pub mod compute;
pub mod create;
pub mod edit;
pub mod history;
pub mod ls;
pub mod notify;
pub mod read;
pub mod rm;
pub mod run_task;

#[derive(Subcommand)]
pub enum Command {
    /// Create a document
    Create(create::CreateArgs),
    /// Show a document
    Read(read::ReadArgs),
    /// List documents, newest first
    Ls(ls::LsArgs),
    /// Replace a document's content if it is still at the expected version
    Edit(edit::EditArgs),
    /// Delete a document and its history (author only)
    Rm(rm::RmArgs),
    /// Show accepted edits, oldest first
    History(history::HistoryArgs),
    /// Send notifications through the I/O pool
    Notify(notify::NotifyArgs),
    /// Run CPU-bound jobs on the compute pool
    Compute(compute::ComputeArgs),
    /// Execute one task read from stdin (used by process-isolated pools)
    #[command(hide = true)]
    RunTask,
}

/// Identity of the caller. Taken as given; nothing is authenticated.
#[derive(Debug, Args)]
pub struct PrincipalArgs {
    /// Principal performing the action.
    #[arg(long = "as", value_name = "PRINCIPAL")]
    pub principal: String,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct ContentArgs {
    /// Content text.
    #[arg(long)]
    content: Option<String>,

    /// Read content from a file.
    #[arg(long)]
    file: Option<PathBuf>,
}

impl ContentArgs {
    pub fn resolve(&self) -> anyhow::Result<String> {
        match (&self.content, &self.file) {
            (Some(content), _) => Ok(content.clone()),
            (_, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read content file `{}`", path.display())),
            (None, None) => anyhow::bail!("either --content or --file is required"),
        }
    }
}

pub struct Context {
    pub format: OutputFormat,
    pub config: InkwellConfig,
    /// `--config`, handed on to `run-task` children.
    config_path: Option<PathBuf>,
    db_override: Option<PathBuf>,
}

impl Context {
    pub fn new(
        format: OutputFormat,
        config: InkwellConfig,
        config_path: Option<PathBuf>,
        db_override: Option<PathBuf>,
    ) -> Self {
        Self { format, config, config_path, db_override }
    }

    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        match &self.db_override {
            Some(path) => Ok(path.clone()),
            None => self
                .config
                .database_path()
                .context("could not determine home directory for the default database; pass --db"),
        }
    }

    pub fn open_store(&self) -> anyhow::Result<VersionedStore> {
        VersionedStore::open_sqlite(self.database_path()?)
    }

    /// Runtime plus a dispatcher whose pools live on it.
    pub fn start_dispatcher(&self) -> anyhow::Result<(Runtime, TaskDispatcher)> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to build tokio runtime")?;
        let runner = Arc::new(TaskRunner::new(&self.config.workers));
        let dispatch = match &self.config_path {
            Some(path) => self.config.dispatch.clone().with_worker_config_path(path),
            None => self.config.dispatch.clone(),
        };
        let dispatcher = TaskDispatcher::start(&dispatch, runner, runtime.handle())?;
        Ok((runtime, dispatcher))
    }
}

pub fn run(cmd: Command, ctx: &Context) -> anyhow::Result<ExitCode> {
    match cmd {
        Command::Create(args) => create::run(args, ctx),
        Command::Read(args) => read::run(args, ctx),
        Command::Ls(args) => ls::run(args, ctx),
        Command::Edit(args) => edit::run(args, ctx),
        Command::Rm(args) => rm::run(args, ctx),
        Command::History(args) => history::run(args, ctx),
        Command::Notify(args) => notify::run(args, ctx),
        Command::Compute(args) => compute::run(args, ctx),
        Command::RunTask => run_task::run(ctx),
    }
}

#[derive(Debug, Serialize)]
pub struct DispatchResult {
    pub pool: PoolKind,
    pub task_ids: Vec<TaskId>,
    pub stats: DispatchStats,
}

/// Submit `tasks` to one pool, then drain the dispatcher and report.
pub(crate) fn dispatch_batch(
    ctx: &Context,
    pool: PoolKind,
    tasks: Vec<Task>,
) -> anyhow::Result<ExitCode> {
    let (runtime, dispatcher) = ctx.start_dispatcher()?;
    let submitted: Result<Vec<TaskId>, _> =
        tasks.into_iter().map(|task| dispatcher.submit(pool, task)).collect();
    // Already-queued tasks still run if a later submit was rejected.
    let stats = runtime.block_on(dispatcher.shutdown());
    let task_ids = submitted?;

    if stats.failed() > 0 {
        output::print_warning(
            ctx.format,
            ErrorCode::InternalError.as_str(),
            &format!("{} task(s) failed; see log output", stats.failed()),
        );
    }
    let result = DispatchResult { pool, task_ids, stats };
    output::print_output(ctx.format, &result, format_dispatch_human)?;
    Ok(ExitCode::Success)
}

fn format_dispatch_human(result: &DispatchResult) -> String {
    format!(
        "{} task(s) on the {} pool: {} notification(s) sent, {} computation(s) completed, {} failed",
        result.task_ids.len(),
        result.pool,
        result.stats.notifications_sent,
        result.stats.computations_completed,
        result.stats.failed()
    )
}
