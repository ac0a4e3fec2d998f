// inkwell CLI entry point.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use inkwell_core::config::InkwellConfig;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_code;
mod output;

use commands::Context;
use exit_code::ExitCode;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "inkwell", about = "Versioned documents with conflict detection and background tasks")]
struct Cli {
    /// Force JSON output.
    #[arg(long, global = true)]
    json: bool,

    /// Database file (overrides config and INKWELL_DATABASE_URL).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Config file (defaults to ~/.inkwell/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> process::ExitCode {
    let cli = Cli::parse();
    let format = OutputFormat::detect(cli.json);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            output::print_anyhow_error(format, &error);
            return ExitCode::from_error(&error).into();
        }
    };
    init_tracing(&config.log_filter);

    let ctx = Context::new(format, config, cli.config, cli.db);
    match commands::run(cli.command, &ctx) {
        Ok(code) => code.into(),
        Err(error) => {
            tracing::debug!(error = %format!("{error:#}"), "command failed");
            output::print_anyhow_error(format, &error);
            ExitCode::from_error(&error).into()
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<InkwellConfig> {
    let config = match path {
        Some(path) => InkwellConfig::load_from(path)?.with_env_overrides()?,
        None => InkwellConfig::load()?,
    };
    Ok(config)
}

/// Logs go to stderr so stdout stays parseable. `RUST_LOG` wins over the
/// configured filter.
fn init_tracing(configured_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
