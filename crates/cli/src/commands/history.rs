// `redraft history`: list the kept revisions of a document.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use clap::Args;
use redraft_common::types::{Document, RevisionWindow};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use crate::workspace::{GlobalArgs, Workspace};

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Document title or id (defaults to the active document).
    pub doc: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResult {
    pub id: Uuid,
    pub title: String,
    pub active_index: usize,
    /// True while the newest revision still absorbs rapid edits.
    pub window_open: bool,
    pub revisions: Vec<RevisionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionEntry {
    pub index: usize,
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub lines: usize,
    pub bytes: usize,
}

pub fn run(globals: &GlobalArgs, args: HistoryArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(globals.json);
    let workspace = Workspace::open(globals)?;
    let target = workspace.resolve(args.doc.as_deref())?;
    let id = workspace.store().resolve(target)?;
    let document = workspace.store().get(id).ok_or_else(|| anyhow!("document {id} not found"))?;

    output::print_output(format, &history(document), format_human)?;
    Ok(())
}

fn history(document: &Document) -> HistoryResult {
    HistoryResult {
        id: document.id,
        title: document.title.clone(),
        active_index: document.active_index,
        window_open: !matches!(document.revision_window, RevisionWindow::Closed),
        revisions: document
            .revisions
            .iter()
            .enumerate()
            .map(|(index, revision)| RevisionEntry {
                index,
                sequence: revision.sequence,
                created_at: revision.created_at,
                lines: revision.content.lines().count(),
                bytes: revision.content.len(),
            })
            .collect(),
    }
}

fn format_human(result: &HistoryResult) -> String {
    let mut lines = vec![format!("{} ({} revision(s))", result.title, result.revisions.len())];
    for revision in &result.revisions {
        let marker = if revision.index == result.active_index { "*" } else { " " };
        lines.push(format!(
            "{marker} [{}] revision {} at {} ({} lines, {} bytes)",
            revision.index,
            revision.sequence,
            revision.created_at.format("%Y-%m-%d %H:%M:%S"),
            revision.lines,
            revision.bytes
        ));
    }
    lines.join("\n")
}
