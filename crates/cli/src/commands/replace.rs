// `redraft replace`: swap a document's whole content for a new revision.

use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use redraft_common::types::Actor;

use crate::commands::{finish, parse_actor, read_input};
use crate::output::OutputFormat;
use crate::workspace::{GlobalArgs, Workspace};

#[derive(Debug, Args)]
pub struct ReplaceArgs {
    /// Document title or id (defaults to the active document).
    pub doc: Option<String>,

    /// Read the new content from a file instead of stdin.
    #[arg(long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Replace as this writer; refused while another writer holds the lock.
    #[arg(long, value_parser = parse_actor)]
    actor: Option<Actor>,
}

pub fn run(globals: &GlobalArgs, args: ReplaceArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(globals.json);
    let content = read_input(args.file.as_deref())?;
    let mut workspace = Workspace::open(globals)?;
    let target = workspace.resolve(args.doc.as_deref())?;

    let notification = workspace.dispatcher.replace_as(args.actor, target, content, Utc::now());
    finish(&mut workspace, format, &[notification])
}
