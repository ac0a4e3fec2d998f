// How a pool runs one task: on a blocking thread of the runtime, or in a
// child process fed the task as JSON on stdin.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use inkwell_common::task::{PoolKind, TaskRequest};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::{Isolation, PoolConfig};
use crate::worker::TaskRunner;

pub(crate) enum Executor {
    Threads { runner: Arc<TaskRunner> },
    Process { program: PathBuf, args: Vec<String> },
}

impl Executor {
    pub(crate) fn for_pool(
        kind: PoolKind,
        config: &PoolConfig,
        runner: Arc<TaskRunner>,
    ) -> anyhow::Result<Self> {
        match config.isolation_for(kind) {
            Isolation::Threads => Ok(Self::Threads { runner }),
            Isolation::Process => {
                let program = match &config.worker_program {
                    Some(program) => program.clone(),
                    None => std::env::current_exe()
                        .context("failed to locate current executable for worker processes")?,
                };
                Ok(Self::Process { program, args: config.worker_args() })
            }
        }
    }

    pub(crate) fn isolation(&self) -> Isolation {
        match self {
            Self::Threads { .. } => Isolation::Threads,
            Self::Process { .. } => Isolation::Process,
        }
    }

    pub(crate) async fn execute(&self, request: TaskRequest) -> anyhow::Result<()> {
        match self {
            Self::Threads { runner } => run_on_thread(Arc::clone(runner), request).await,
            Self::Process { program, args } => run_in_process(program, args, &request).await,
        }
    }
}

async fn run_on_thread(runner: Arc<TaskRunner>, request: TaskRequest) -> anyhow::Result<()> {
    match tokio::task::spawn_blocking(move || runner.run(&request.task)).await {
        Ok(result) => result,
        Err(join_error) if join_error.is_panic() => Err(anyhow!("task panicked")),
        Err(join_error) => Err(anyhow!(join_error).context("task was cancelled")),
    }
}

async fn run_in_process(
    program: &Path,
    args: &[String],
    request: &TaskRequest,
) -> anyhow::Result<()> {
    let mut payload = serde_json::to_vec(request).context("failed to encode task request")?;
    payload.push(b'\n');

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn worker process `{}`", program.display()))?;

    let mut stdin = child.stdin.take().context("worker process stdin was not captured")?;
    match stdin.write_all(&payload).await {
        // A worker may exit without reading; its exit status decides.
        Err(error) if error.kind() != ErrorKind::BrokenPipe => {
            return Err(error).context("failed to write task request to worker process");
        }
        _ => {}
    }
    drop(stdin);

    let status = child.wait().await.context("failed to wait for worker process")?;
    if !status.success() {
        bail!("worker process `{}` exited with {status}", program.display());
    }
    Ok(())
}
