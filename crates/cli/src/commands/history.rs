// `inkwell history`: accepted edits, oldest first, optionally re-verified.

use clap::Args;
use inkwell_common::types::{DocumentId, Revision};
use inkwell_core::audit::ChainReport;
use serde::Serialize;

use super::Context;
use crate::exit_code::ExitCode;
use crate::output;

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Document id.
    pub id: DocumentId,

    /// Recompute the hash chain and report tampering.
    #[arg(long)]
    verify: bool,
}

#[derive(Debug, Serialize)]
pub struct HistoryResult {
    pub document_id: DocumentId,
    pub revisions: Vec<Revision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<ChainReport>,
}

pub fn run(args: HistoryArgs, ctx: &Context) -> anyhow::Result<ExitCode> {
    let store = ctx.open_store()?;
    let audit = store.audit();
    let revisions = audit.history(args.id)?;
    let chain = if args.verify { Some(audit.verify(args.id)?) } else { None };

    let result = HistoryResult { document_id: args.id, revisions, chain };
    output::print_output(ctx.format, &result, format_human)?;

    match &result.chain {
        Some(report) if !report.is_intact() => Ok(ExitCode::Error),
        _ => Ok(ExitCode::Success),
    }
}

fn format_human(result: &HistoryResult) -> String {
    let mut lines = Vec::new();
    if result.revisions.is_empty() {
        lines.push(format!("{} has no edits yet.", result.document_id));
    }
    for revision in &result.revisions {
        lines.push(format!(
            "v{}  {}  {}",
            revision.version,
            revision.updated_at.format("%Y-%m-%d %H:%M:%S%.6f"),
            revision.editor_id
        ));
        for line in revision.content.lines() {
            lines.push(format!("    {line}"));
        }
    }
    if let Some(report) = &result.chain {
        match report.first_broken_version {
            None => lines.push(format!("Chain intact ({} revision(s) checked)", report.checked)),
            Some(version) => lines.push(format!("Chain BROKEN at version {version}")),
        }
    }
    lines.join("\n")
}
