// `inkwell ls`: every document, newest first.

use clap::Args;
use inkwell_common::types::Document;
use serde::Serialize;

use super::Context;
use crate::exit_code::ExitCode;
use crate::output;

#[derive(Debug, Args)]
pub struct LsArgs {}

#[derive(Debug, Serialize)]
pub struct LsResult {
    pub documents: Vec<Document>,
}

pub fn run(_args: LsArgs, ctx: &Context) -> anyhow::Result<ExitCode> {
    let documents = ctx.open_store()?.list()?;
    output::print_output(ctx.format, &LsResult { documents }, format_human)?;
    Ok(ExitCode::Success)
}

fn format_human(result: &LsResult) -> String {
    if result.documents.is_empty() {
        return "No documents.".into();
    }

    let mut lines = vec![format!("{} document(s)", result.documents.len())];
    for d in &result.documents {
        lines.push(format!("  {}  v{}  {} ({})", d.id, d.version, d.title, d.author_id));
    }
    lines.join("\n")
}
