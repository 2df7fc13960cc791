// Outbound notifications and the human-readable rendering of patch outcomes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::patch::apply::preview;
use crate::patch::{BlockOutcome, BlockReport, PatchReport};

/// Result of one command, shaped for whoever shows it to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Absent when the command failed before a document was resolved.
    pub document_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub change_summaries: Vec<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl Notification {
    pub fn success(
        document_id: Uuid,
        title: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            document_id: Some(document_id),
            title: title.into(),
            change_summaries: vec![summary.into()],
            success: true,
            errors: None,
        }
    }

    pub fn failure(
        document_id: Option<Uuid>,
        title: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            document_id,
            title: title.into(),
            change_summaries: Vec::new(),
            success: false,
            errors: Some(vec![error.into()]),
        }
    }

    /// Folds a patch report (plus parser complaints) into one notification.
    ///
    /// Succeeds only when there was at least one block and every block
    /// applied or was already applied.
    pub fn from_patch(
        document_id: Uuid,
        title: impl Into<String>,
        report: &PatchReport,
        parse_errors: &[String],
    ) -> Self {
        let mut change_summaries = Vec::new();
        let mut errors: Vec<String> = parse_errors.to_vec();

        for block in &report.outcomes {
            match describe_block(block) {
                BlockMessage::Change(summary) => change_summaries.push(summary),
                BlockMessage::Problem(problem) => errors.push(problem),
            }
        }

        let success =
            !report.outcomes.is_empty() && report.all_succeeded() && parse_errors.is_empty();
        Self {
            document_id: Some(document_id),
            title: title.into(),
            change_summaries,
            success,
            errors: (!errors.is_empty()).then_some(errors),
        }
    }

    pub fn error_list(&self) -> &[String] {
        self.errors.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockMessage {
    Change(String),
    Problem(String),
}

/// Renders one block outcome. `already_applied` is reported as a problem
/// entry so the writer learns its patch was stale, though it still counts
/// as success.
pub fn describe_block(block: &BlockReport) -> BlockMessage {
    let number = block.index + 1;
    match &block.outcome {
        BlockOutcome::Applied { line, removed_lines, added_lines } => BlockMessage::Change(format!(
            "Block {number}: replaced {} with {} at line {line}",
            plural_lines(*removed_lines),
            plural_lines(*added_lines),
        )),
        BlockOutcome::AlreadyApplied => BlockMessage::Problem(format!(
            "Block {number}: already applied, content left unchanged:\n{}",
            block.search_preview
        )),
        BlockOutcome::NotFound { suggestion } => {
            let mut message =
                format!("Block {number}: search text not found:\n{}", block.search_preview);
            if let Some(suggestion) = suggestion {
                message.push_str(&format!(
                    "\nDid you mean (line {}, {:.0}% similar):\n{}",
                    suggestion.line,
                    suggestion.similarity * 100.0,
                    preview(&suggestion.text)
                ));
            }
            BlockMessage::Problem(message)
        }
        BlockOutcome::MultipleMatches { count } => BlockMessage::Problem(format!(
            "Block {number}: search text matches {count} locations; include more surrounding lines so it matches once:\n{}",
            block.search_preview
        )),
        BlockOutcome::OverlapsEarlierEdit => BlockMessage::Problem(format!(
            "Block {number}: search text overlaps text written by an earlier block of this patch:\n{}",
            block.search_preview
        )),
    }
}

fn plural_lines(count: usize) -> String {
    if count == 1 {
        "1 line".to_owned()
    } else {
        format!("{count} lines")
    }
}
