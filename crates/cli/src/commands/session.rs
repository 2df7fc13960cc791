// `redraft session`: long-running mode for editors and agents. Reads one
// JSON command per stdin line, writes one JSON reply per stdout line (an edit
// report for edits, a notification otherwise), and saves the store after every command. The lease sweeper runs for the
// whole session.

use anyhow::Context;
use clap::Args;
use redraft_engine::runtime::{shared, with_dispatcher};
use redraft_engine::session::serve_session;
use redraft_engine::spawn_lease_sweeper;
use tokio::io::BufReader;
use tracing::info;

use crate::workspace::{GlobalArgs, Workspace};

#[derive(Debug, Args)]
pub struct SessionArgs {}

pub fn run(globals: &GlobalArgs, _args: SessionArgs) -> anyhow::Result<()> {
    let workspace = Workspace::open(globals)?;
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?
        .block_on(serve(workspace))
}

async fn serve(workspace: Workspace) -> anyhow::Result<()> {
    let (config, dispatcher, mut repository) = workspace.into_parts();
    let shared = shared(dispatcher);
    let sweeper = spawn_lease_sweeper(shared.clone(), config.locks.sweep_interval());
    info!("session started");

    let served = serve_session(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        shared.clone(),
        |dispatcher| repository.save(dispatcher.store().snapshot()),
    )
    .await;

    sweeper.wait().await;
    with_dispatcher(&shared, |dispatcher| repository.save(dispatcher.store().snapshot()))?
        .context("failed to save store at session end")?;

    let handled = served?;
    info!(handled, "session finished");
    Ok(())
}
