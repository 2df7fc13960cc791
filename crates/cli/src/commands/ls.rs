// `redraft ls`: list documents.

use chrono::{DateTime, Utc};
use clap::Args;
use redraft_common::types::{Actor, DocumentKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use crate::workspace::{GlobalArgs, Workspace};

#[derive(Debug, Args)]
pub struct LsArgs {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsResult {
    #[serde(default)]
    pub documents: Vec<DocEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocEntry {
    pub id: Uuid,
    pub title: String,
    pub kind: DocumentKind,
    pub revisions: usize,
    pub current_sequence: u64,
    pub updated_at: DateTime<Utc>,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<Actor>,
}

pub fn run(globals: &GlobalArgs, _args: LsArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(globals.json);
    let workspace = Workspace::open(globals)?;
    let result = list(&workspace, Utc::now());
    output::print_output(format, &result, format_human)?;
    Ok(())
}

fn list(workspace: &Workspace, now: DateTime<Utc>) -> LsResult {
    let store = workspace.store();
    let coordinator = workspace.dispatcher.coordinator();
    let active = store.active_id();
    let documents = store
        .documents()
        .map(|document| DocEntry {
            id: document.id,
            title: document.title.clone(),
            kind: document.kind,
            revisions: document.revisions.len(),
            current_sequence: document.active_revision().sequence,
            updated_at: document.updated_at,
            active: active == Some(document.id),
            locked_by: coordinator.holder(store, document.id, now),
        })
        .collect();
    LsResult { documents }
}

fn format_human(result: &LsResult) -> String {
    if result.documents.is_empty() {
        return "No documents. Create one with: redraft new <title>".into();
    }

    let mut lines = Vec::new();
    lines.push(format!("{} document(s)", result.documents.len()));
    for d in &result.documents {
        let marker = if d.active { "*" } else { " " };
        let lock = d
            .locked_by
            .map(|actor| format!(" [locked by {}]", actor.as_str()))
            .unwrap_or_default();
        lines.push(format!(
            "{marker} {} ({}, revision {} of {} kept) {}{lock}",
            d.title,
            d.kind.as_str(),
            d.current_sequence,
            d.revisions,
            d.id
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, active: bool, locked_by: Option<Actor>) -> DocEntry {
        DocEntry {
            id: Uuid::nil(),
            title: title.into(),
            kind: DocumentKind::Markdown,
            revisions: 3,
            current_sequence: 7,
            updated_at: Utc::now(),
            active,
            locked_by,
        }
    }

    #[test]
    fn human_format_marks_active_and_locked_documents() {
        let result = LsResult {
            documents: vec![
                entry("README.md", true, Some(Actor::Ai)),
                entry("notes.md", false, None),
            ],
        };
        let output = format_human(&result);
        assert!(output.starts_with("2 document(s)"));
        assert!(output.contains("* README.md (markdown, revision 7 of 3 kept)"));
        assert!(output.contains("[locked by ai]"));
        assert!(output.contains("  notes.md"));
        assert_eq!(output.matches("locked by").count(), 1);
    }

    #[test]
    fn human_format_empty_store() {
        let output = format_human(&LsResult { documents: Vec::new() });
        assert!(output.contains("redraft new"));
    }

    #[test]
    fn json_omits_missing_lock() {
        let mut buf = Vec::new();
        output::write_output(
            &mut buf,
            OutputFormat::Json,
            &LsResult { documents: vec![entry("a", false, None)] },
            format_human,
        )
        .unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(String::from_utf8(buf).unwrap().trim()).unwrap();
        assert_eq!(parsed["documents"][0]["title"], "a");
        assert!(parsed["documents"][0].get("locked_by").is_none());
    }
}
