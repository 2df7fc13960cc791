// `redraft lock` / `redraft unlock`: the advisory per-document edit lock.
//
// The lease keeps running between invocations; any later command that opens
// the store drops locks older than the lease.

use chrono::Utc;
use clap::Args;
use redraft_common::protocol::Command;
use redraft_common::types::Actor;

use crate::commands::{finish, parse_actor};
use crate::output::OutputFormat;
use crate::workspace::{GlobalArgs, Workspace};

#[derive(Debug, Args)]
pub struct LockArgs {
    /// Document title or id (defaults to the active document).
    pub doc: Option<String>,

    /// Writer taking or giving up the lock.
    #[arg(long, default_value = "user", value_parser = parse_actor)]
    actor: Actor,
}

pub fn run(globals: &GlobalArgs, args: LockArgs, held: bool) -> anyhow::Result<()> {
    let format = OutputFormat::detect(globals.json);
    let mut workspace = Workspace::open(globals)?;
    let target = workspace.resolve(args.doc.as_deref())?;
    let command = Command::Lock { target, held, actor: args.actor };
    let notifications = workspace.dispatcher.execute(command, Utc::now());
    finish(&mut workspace, format, &notifications)
}
