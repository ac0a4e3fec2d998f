// `inkwell edit`: version-checked content replacement.
//
// A stale `--expected-version` prints the current document next to the
// rejected draft and exits with the conflict code; nothing is saved.

use clap::Args;
use inkwell_common::error::ErrorCode;
use inkwell_common::outcome::UpdateOutcome;
use inkwell_common::types::{Document, DocumentId, PrincipalId};

use super::{ContentArgs, Context, PrincipalArgs};
use crate::exit_code::ExitCode;
use crate::output;

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Document id.
    pub id: DocumentId,

    /// Version the edit was based on.
    #[arg(long)]
    expected_version: i64,

    #[command(flatten)]
    content: ContentArgs,

    #[command(flatten)]
    principal: PrincipalArgs,

    /// Queue a notification about the accepted edit and wait for it.
    #[arg(long)]
    notify: bool,
}

pub fn run(args: EditArgs, ctx: &Context) -> anyhow::Result<ExitCode> {
    let content = args.content.resolve()?;
    let editor = PrincipalId::new(args.principal.principal);
    let outcome = ctx.open_store()?.update(args.id, args.expected_version, &content, &editor)?;
    output::print_output(ctx.format, &outcome, format_human)?;

    match &outcome {
        UpdateOutcome::Accepted { document } => {
            if args.notify {
                announce(ctx, document, &editor)?;
            }
            Ok(ExitCode::Success)
        }
        UpdateOutcome::Conflict { current, .. } => {
            output::print_warning(
                ctx.format,
                ErrorCode::EditConflict.as_str(),
                &format!(
                    "edit not saved: document is at version {}. Re-read it and retry with --expected-version {}",
                    current.version, current.version
                ),
            );
            Ok(ExitCode::Conflict)
        }
    }
}

fn announce(ctx: &Context, document: &Document, editor: &PrincipalId) -> anyhow::Result<()> {
    let (runtime, dispatcher) = ctx.start_dispatcher()?;
    let submitted = dispatcher.notify(format!(
        "{editor} updated \"{}\" to version {}",
        document.title, document.version
    ));
    let stats = runtime.block_on(dispatcher.shutdown());
    submitted?;
    if stats.failed() > 0 {
        output::print_warning(ctx.format, ErrorCode::InternalError.as_str(), "notification failed");
    }
    Ok(())
}

fn format_human(outcome: &UpdateOutcome) -> String {
    match outcome {
        UpdateOutcome::Accepted { document } => {
            format!("Saved {} at version {}", document.id, document.version)
        }
        UpdateOutcome::Conflict { current, attempted_content } => format!(
            "Conflict: {} was changed by someone else (now version {}).\n\n\
             Current content:\n{}\n\nYour draft:\n{}",
            current.id, current.version, current.content, attempted_content
        ),
    }
}
