// `inkwell create`: new document at version 1.

use clap::Args;
use inkwell_common::types::{Document, PrincipalId};

use super::{ContentArgs, Context, PrincipalArgs};
use crate::exit_code::ExitCode;
use crate::output;

#[derive(Debug, Args)]
pub struct CreateArgs {
    #[arg(long)]
    title: String,

    #[command(flatten)]
    content: ContentArgs,

    #[command(flatten)]
    principal: PrincipalArgs,
}

pub fn run(args: CreateArgs, ctx: &Context) -> anyhow::Result<ExitCode> {
    let content = args.content.resolve()?;
    let store = ctx.open_store()?;
    let document = store.create(&args.title, &content, &PrincipalId::new(args.principal.principal))?;
    output::print_output(ctx.format, &document, format_human)?;
    Ok(ExitCode::Success)
}

fn format_human(document: &Document) -> String {
    format!("Created {} \"{}\" (version {})", document.id, document.title, document.version)
}
