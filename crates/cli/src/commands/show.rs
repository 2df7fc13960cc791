// `redraft show`: print a document's current (or an older) revision.

use anyhow::{anyhow, bail};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use crate::workspace::{GlobalArgs, Workspace};

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Document title or id (defaults to the active document).
    pub doc: Option<String>,

    /// Revision index to print instead of the current one.
    #[arg(long)]
    revision: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowResult {
    pub id: Uuid,
    pub title: String,
    pub index: usize,
    pub sequence: u64,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub content: String,
}

pub fn run(globals: &GlobalArgs, args: ShowArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(globals.json);
    let workspace = Workspace::open(globals)?;
    let target = workspace.resolve(args.doc.as_deref())?;
    let id = workspace.store().resolve(target)?;
    let document = workspace.store().get(id).ok_or_else(|| anyhow!("document {id} not found"))?;

    let index = args.revision.unwrap_or(document.active_index);
    let Some(revision) = document.revisions.get(index) else {
        bail!(
            "revision index {index} is out of range for `{}` ({} kept)",
            document.title,
            document.revisions.len()
        );
    };

    let result = ShowResult {
        id,
        title: document.title.clone(),
        index,
        sequence: revision.sequence,
        language: revision.language.clone(),
        created_at: revision.created_at,
        content: revision.content.clone(),
    };
    output::print_output(format, &result, |result| result.content.clone())?;
    Ok(())
}
