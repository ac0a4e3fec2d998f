// `inkwell rm`: delete a document and its history. Author only.

use clap::Args;
use inkwell_common::outcome::DeleteReceipt;
use inkwell_common::types::{DocumentId, PrincipalId};

use super::{Context, PrincipalArgs};
use crate::exit_code::ExitCode;
use crate::output;

#[derive(Debug, Args)]
pub struct RmArgs {
    /// Document id.
    pub id: DocumentId,

    #[command(flatten)]
    principal: PrincipalArgs,
}

pub fn run(args: RmArgs, ctx: &Context) -> anyhow::Result<ExitCode> {
    let receipt =
        ctx.open_store()?.delete(args.id, &PrincipalId::new(args.principal.principal))?;
    output::print_output(ctx.format, &receipt, format_human)?;
    Ok(ExitCode::Success)
}

fn format_human(receipt: &DeleteReceipt) -> String {
    format!("Deleted {} ({} revision(s) removed)", receipt.id, receipt.revisions_removed)
}
