// `redraft undo`, `redraft redo` and `redraft goto`: move through a
// document's revision history without creating revisions.

use chrono::Utc;
use clap::Args;
use redraft_common::protocol::{Command, Target};

use crate::commands::finish;
use crate::output::OutputFormat;
use crate::workspace::{GlobalArgs, Workspace};

#[derive(Debug, Args)]
pub struct StepArgs {
    /// Document title or id (defaults to the active document).
    pub doc: Option<String>,
}

#[derive(Debug, Args)]
pub struct GotoArgs {
    /// Revision index as listed by `redraft history` (0 is the oldest kept).
    pub index: usize,

    /// Document title or id (defaults to the active document).
    pub doc: Option<String>,
}

pub fn run_undo(globals: &GlobalArgs, args: StepArgs) -> anyhow::Result<()> {
    run_navigation(globals, args.doc.as_deref(), |target| Command::Undo { target })
}

pub fn run_redo(globals: &GlobalArgs, args: StepArgs) -> anyhow::Result<()> {
    run_navigation(globals, args.doc.as_deref(), |target| Command::Redo { target })
}

pub fn run_goto(globals: &GlobalArgs, args: GotoArgs) -> anyhow::Result<()> {
    let index = args.index;
    run_navigation(globals, args.doc.as_deref(), |target| Command::GoTo { target, index })
}

fn run_navigation(
    globals: &GlobalArgs,
    doc: Option<&str>,
    command: impl FnOnce(Target) -> Command,
) -> anyhow::Result<()> {
    let format = OutputFormat::detect(globals.json);
    let mut workspace = Workspace::open(globals)?;
    let target = workspace.resolve(doc)?;
    let notifications = workspace.dispatcher.execute(command(target), Utc::now());
    finish(&mut workspace, format, &notifications)
}
