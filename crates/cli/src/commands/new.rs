// `redraft new`: create a document and make it active.

use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use redraft_common::protocol::Command;
use redraft_common::types::DocumentKind;

use crate::commands::{finish, parse_kind, read_input};
use crate::output::OutputFormat;
use crate::workspace::{GlobalArgs, Workspace};

#[derive(Debug, Args)]
pub struct NewArgs {
    /// Document title; later commands can refer to the document by it.
    pub title: String,

    /// Document kind: code, markdown, text, diagram or html.
    #[arg(long, default_value = "text", value_parser = parse_kind)]
    kind: DocumentKind,

    /// Language tag recorded on revisions (defaults from the kind).
    #[arg(long)]
    language: Option<String>,

    /// Initial content.
    #[arg(long, group = "content_source")]
    content: Option<String>,

    /// Read initial content from a file.
    #[arg(long, value_name = "FILE", group = "content_source")]
    file: Option<PathBuf>,
}

pub fn run(globals: &GlobalArgs, args: NewArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(globals.json);
    let mut workspace = Workspace::open(globals)?;

    let content = match (args.content, &args.file) {
        (Some(content), _) => content,
        (None, Some(path)) => read_input(Some(path.as_path()))?,
        (None, None) => String::new(),
    };
    let command =
        Command::Create { kind: args.kind, title: args.title, content, language: args.language };
    let notifications = workspace.dispatcher.execute(command, Utc::now());
    finish(&mut workspace, format, &notifications)
}
