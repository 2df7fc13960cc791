// CLI subcommand dispatch.

use std::io::{self, IsTerminal, Read};
use std::path::Path;

use anyhow::Context;
use clap::Subcommand;
use redraft_common::protocol::Notification;
use redraft_common::types::{Actor, DocumentKind};

use crate::exit_code::{check_notifications, Rejected};
use crate::output::{self, OutputFormat};
use crate::workspace::{GlobalArgs, Workspace};

pub mod diff;
pub mod edit;
pub mod history;
pub mod lock;
pub mod ls;
pub mod navigate;
pub mod new;
pub mod replace;
pub mod rm;
pub mod session;
pub mod show;

#[derive(Subcommand)]
pub enum Command {
    /// Create a document and make it active
    New(new::NewArgs),
    /// Apply SEARCH/REPLACE blocks to a document
    Edit(edit::EditArgs),
    /// Replace a document's whole content
    Replace(replace::ReplaceArgs),
    /// Step back one revision
    Undo(navigate::StepArgs),
    /// Step forward one revision
    Redo(navigate::StepArgs),
    /// Jump to a revision by index
    Goto(navigate::GotoArgs),
    /// Delete a document
    Rm(rm::RmArgs),
    /// Take the advisory edit lock
    Lock(lock::LockArgs),
    /// Release the advisory edit lock
    Unlock(lock::LockArgs),
    /// List documents
    Ls(ls::LsArgs),
    /// Print a document's content
    Show(show::ShowArgs),
    /// List a document's revisions
    History(history::HistoryArgs),
    /// Line diff between two revisions
    Diff(diff::DiffArgs),
    /// Serve newline-delimited JSON commands on stdin
    Session(session::SessionArgs),
}

pub fn run(globals: &GlobalArgs, cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::New(args) => new::run(globals, args),
        Command::Edit(args) => edit::run(globals, args),
        Command::Replace(args) => replace::run(globals, args),
        Command::Undo(args) => navigate::run_undo(globals, args),
        Command::Redo(args) => navigate::run_redo(globals, args),
        Command::Goto(args) => navigate::run_goto(globals, args),
        Command::Rm(args) => rm::run(globals, args),
        Command::Lock(args) => lock::run(globals, args, true),
        Command::Unlock(args) => lock::run(globals, args, false),
        Command::Ls(args) => ls::run(globals, args),
        Command::Show(args) => show::run(globals, args),
        Command::History(args) => history::run(globals, args),
        Command::Diff(args) => diff::run(globals, args),
        Command::Session(args) => session::run(globals, args),
    }
}

/// Prints the notifications, saves when anything succeeded, and turns a
/// failed notification into the command's error.
pub(crate) fn finish(
    workspace: &mut Workspace,
    format: OutputFormat,
    notifications: &[Notification],
) -> anyhow::Result<()> {
    if notifications.iter().any(|notification| notification.success) {
        workspace.save()?;
    }
    print_notifications(format, notifications)?;
    check_notifications(notifications)
}

pub(crate) fn print_notifications(
    format: OutputFormat,
    notifications: &[Notification],
) -> anyhow::Result<()> {
    match notifications {
        [single] => output::print_output(format, single, output::render_notification)?,
        many => output::print_output(format, &many, |many| output::render_notifications(many))?,
    }
    Ok(())
}

/// Reads `file`, or stdin when no file is given. An interactive stdin is a
/// usage error rather than a silent wait.
pub(crate) fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()));
    }
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Err(Rejected::usage("pass --file or pipe the input on stdin").into());
    }
    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer).context("failed to read stdin")?;
    Ok(buffer)
}

pub(crate) fn parse_kind(value: &str) -> Result<DocumentKind, String> {
    DocumentKind::parse(value)
        .ok_or_else(|| format!("unknown kind `{value}` (code, markdown, text, diagram, html)"))
}

pub(crate) fn parse_actor(value: &str) -> Result<Actor, String> {
    Actor::parse(value).ok_or_else(|| format!("unknown actor `{value}` (user, ai)"))
}
