// `redraft diff`: line diff between two kept revisions of a document.

use anyhow::{anyhow, bail};
use clap::Args;
use redraft_common::diff::{
    generate_diff_with_context, render_diff, DiffLine, DEFAULT_CONTEXT_LINES,
};
use redraft_common::types::Document;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use crate::workspace::{GlobalArgs, Workspace};

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Document title or id (defaults to the active document).
    pub doc: Option<String>,

    /// Older revision index (defaults to the one before `--to`).
    #[arg(long)]
    from: Option<usize>,

    /// Newer revision index (defaults to the current revision).
    #[arg(long)]
    to: Option<usize>,

    /// Unchanged lines shown around each change.
    #[arg(long, default_value_t = DEFAULT_CONTEXT_LINES)]
    context: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffResult {
    pub id: Uuid,
    pub title: String,
    pub from: usize,
    pub to: usize,
    pub lines: Vec<DiffLine>,
}

pub fn run(globals: &GlobalArgs, args: DiffArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(globals.json);
    let workspace = Workspace::open(globals)?;
    let target = workspace.resolve(args.doc.as_deref())?;
    let id = workspace.store().resolve(target)?;
    let document = workspace.store().get(id).ok_or_else(|| anyhow!("document {id} not found"))?;

    let result = diff_revisions(document, args.from, args.to, args.context)?;
    output::print_output(format, &result, format_human)?;
    Ok(())
}

fn diff_revisions(
    document: &Document,
    from: Option<usize>,
    to: Option<usize>,
    context: usize,
) -> anyhow::Result<DiffResult> {
    let kept = document.revisions.len();
    let to = to.unwrap_or(document.active_index);
    let from = from.unwrap_or_else(|| to.saturating_sub(1));
    for index in [from, to] {
        if index >= kept {
            bail!("revision index {index} is out of range for `{}` ({kept} kept)", document.title);
        }
    }

    let lines = generate_diff_with_context(
        &document.revisions[from].content,
        &document.revisions[to].content,
        context,
    );
    Ok(DiffResult { id: document.id, title: document.title.clone(), from, to, lines })
}

fn format_human(result: &DiffResult) -> String {
    let header = format!("{}: revision [{}] -> [{}]", result.title, result.from, result.to);
    if result.lines.is_empty() {
        return format!("{header}\nNo changes.");
    }
    format!("{header}\n{}", render_diff(&result.lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use redraft_common::diff::DiffLineKind;
    use redraft_common::types::DocumentKind;
    use redraft_engine::store::{DocumentStore, NewDocument, StoreLimits};

    fn document_with_two_revisions() -> Document {
        let start = Utc::now();
        let mut store = DocumentStore::new(StoreLimits::default());
        let id = store
            .create_document(
                NewDocument::new(DocumentKind::Code, "lib.rs").with_content("a\nb\nc"),
                start,
            )
            .expect("create");
        store.update_content(id, "a\nB\nc".into(), start + Duration::seconds(2)).expect("update");
        store.get(id).expect("document").clone()
    }

    #[test]
    fn default_range_compares_current_with_previous() {
        let document = document_with_two_revisions();
        let result = diff_revisions(&document, None, None, 0).expect("diff");
        assert_eq!((result.from, result.to), (0, 1));
        let kinds: Vec<_> = result.lines.iter().map(|line| line.kind).collect();
        assert_eq!(kinds, vec![DiffLineKind::Removed, DiffLineKind::Added]);

        let output = format_human(&result);
        assert!(output.starts_with("lib.rs: revision [0] -> [1]"));
        assert!(output.contains("- b"));
        assert!(output.contains("+ B"));
    }

    #[test]
    fn single_revision_has_no_changes() {
        let document = document_with_two_revisions();
        let result = diff_revisions(&document, Some(1), Some(1), 3).expect("diff");
        assert!(result.lines.is_empty());
        assert!(format_human(&result).ends_with("No changes."));
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let document = document_with_two_revisions();
        let err = diff_revisions(&document, Some(0), Some(5), 3).expect_err("index 5 missing");
        assert!(err.to_string().contains("out of range"));
    }
}
