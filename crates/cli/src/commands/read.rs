// `inkwell read`: current content of one document.

use clap::Args;
use inkwell_common::types::{Document, DocumentId};

use super::Context;
use crate::exit_code::ExitCode;
use crate::output;

#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Document id.
    pub id: DocumentId,
}

pub fn run(args: ReadArgs, ctx: &Context) -> anyhow::Result<ExitCode> {
    let document = ctx.open_store()?.read(args.id)?;
    output::print_output(ctx.format, &document, format_human)?;
    Ok(ExitCode::Success)
}

fn format_human(document: &Document) -> String {
    format!(
        "{} (version {}, by {}, updated {})\n\n{}",
        document.title,
        document.version,
        document.author_id,
        document.updated_at.format("%Y-%m-%d %H:%M:%S"),
        document.content
    )
}
