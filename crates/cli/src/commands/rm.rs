// `redraft rm`: delete a document.

use chrono::Utc;
use clap::Args;
use redraft_common::protocol::Command;

use crate::commands::finish;
use crate::output::OutputFormat;
use crate::workspace::{GlobalArgs, Workspace};

#[derive(Debug, Args)]
pub struct RmArgs {
    /// Document title or id (defaults to the active document).
    pub doc: Option<String>,
}

pub fn run(globals: &GlobalArgs, args: RmArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(globals.json);
    let mut workspace = Workspace::open(globals)?;
    let target = workspace.resolve(args.doc.as_deref())?;
    let notifications = workspace.dispatcher.execute(Command::Delete { target }, Utc::now());
    finish(&mut workspace, format, &notifications)
}
