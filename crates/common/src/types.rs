// Core domain types shared across all redraft crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// What a document holds; drives the default revision language.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Code,
    Markdown,
    Text,
    Diagram,
    Html,
}

impl DocumentKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Markdown => "markdown",
            Self::Text => "text",
            Self::Diagram => "diagram",
            Self::Html => "html",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "code" => Some(Self::Code),
            "markdown" => Some(Self::Markdown),
            "text" => Some(Self::Text),
            "diagram" => Some(Self::Diagram),
            "html" => Some(Self::Html),
            _ => None,
        }
    }

    /// Language recorded on revisions when the creator gave no hint.
    pub const fn default_language(self) -> &'static str {
        match self {
            Self::Code | Self::Text => "plaintext",
            Self::Markdown => "markdown",
            Self::Diagram => "mermaid",
            Self::Html => "html",
        }
    }
}

/// Writer identity used by the advisory lock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    User,
    Ai,
}

impl Actor {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "ai" => Some(Self::Ai),
            _ => None,
        }
    }
}

/// One content snapshot in a document's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Revision {
    pub id: Uuid,
    /// Monotonic per document, starting at 1.
    pub sequence: u64,
    pub content: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
}

/// Advisory lock attached to a document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lock {
    pub holder: Actor,
    pub acquired_at: DateTime<Utc>,
}

/// Whether the newest revision still accepts in-place merges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RevisionWindow {
    Open { revision_id: Uuid },
    #[default]
    Closed,
}

/// A versioned document: content lives in `revisions[active_index]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub kind: DocumentKind,
    pub revisions: Vec<Revision>,
    pub active_index: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub lock: Option<Lock>,
    #[serde(default)]
    pub revision_window: RevisionWindow,
}

impl Document {
    /// Revision the document currently shows.
    ///
    /// Panics only if the non-empty invariant was broken, which
    /// `check_invariants` rejects on load.
    pub fn active_revision(&self) -> &Revision {
        &self.revisions[self.active_index]
    }

    pub fn content(&self) -> &str {
        &self.active_revision().content
    }

    pub fn language(&self) -> &str {
        &self.active_revision().language
    }

    pub fn last_sequence(&self) -> u64 {
        self.revisions.last().map(|revision| revision.sequence).unwrap_or(0)
    }

    pub fn can_undo(&self) -> bool {
        self.active_index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.active_index + 1 < self.revisions.len()
    }

    /// Revision currently accepting merges, if the window is open on the
    /// active, newest revision.
    pub fn open_revision(&self) -> Option<&Revision> {
        let RevisionWindow::Open { revision_id } = self.revision_window else {
            return None;
        };
        let last = self.revisions.len().checked_sub(1)?;
        if self.active_index != last {
            return None;
        }
        let revision = &self.revisions[last];
        (revision.id == revision_id).then_some(revision)
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.revisions.is_empty() {
            return Err(InvariantError::NoRevisions { document_id: self.id });
        }
        if self.active_index >= self.revisions.len() {
            return Err(InvariantError::ActiveIndexOutOfRange {
                document_id: self.id,
                index: self.active_index,
                len: self.revisions.len(),
            });
        }
        for pair in self.revisions.windows(2) {
            if pair[1].sequence <= pair[0].sequence {
                return Err(InvariantError::SequenceNotIncreasing {
                    document_id: self.id,
                    previous: pair[0].sequence,
                    next: pair[1].sequence,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantError {
    #[error("document {document_id} has no revisions")]
    NoRevisions { document_id: Uuid },
    #[error("document {document_id} active index {index} is out of range for {len} revisions")]
    ActiveIndexOutOfRange { document_id: Uuid, index: usize, len: usize },
    #[error("document {document_id} revision sequence {next} does not follow {previous}")]
    SequenceNotIncreasing { document_id: Uuid, previous: u64, next: u64 },
}

/// UI-only scalars persisted alongside the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Preferences {
    pub panel_width: Option<u32>,
}
