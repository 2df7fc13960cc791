// `redraft edit`: apply SEARCH/REPLACE blocks read from a file or stdin.

use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use redraft_common::types::Actor;
use redraft_engine::EditReport;

use crate::commands::{parse_actor, read_input};
use crate::exit_code::check_notifications;
use crate::output::{self, OutputFormat};
use crate::workspace::{GlobalArgs, Workspace};

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Document title or id (defaults to the active document). Blocks inside
    /// a `<file path="...">` envelope pick their own document.
    pub doc: Option<String>,

    /// Read the patch from a file instead of stdin.
    #[arg(long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Edit as this writer; refused while another writer holds the lock.
    #[arg(long, value_parser = parse_actor)]
    actor: Option<Actor>,
}

pub fn run(globals: &GlobalArgs, args: EditArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(globals.json);
    let patch = read_input(args.file.as_deref())?;
    let mut workspace = Workspace::open(globals)?;
    let target = workspace.resolve(args.doc.as_deref())?;

    let report = workspace.dispatcher.edit_as(args.actor, target, &patch, Utc::now());
    if changed_blocks(&report) > 0 {
        workspace.save()?;
    }
    output::print_output(format, &report, format_human)?;
    check_notifications(&report.notifications)
}

fn format_human(report: &EditReport) -> String {
    let mut lines = vec![output::render_notifications(&report.notifications)];
    lines.push(format!(
        "{} of {} block(s) succeeded, {} changed content",
        report.applied_count,
        report.outcomes.len(),
        changed_blocks(report)
    ));
    lines.join("\n")
}

fn changed_blocks(report: &EditReport) -> usize {
    report.outcomes.iter().filter(|block| block.report.outcome.changed_content()).count()
}
