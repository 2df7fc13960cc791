// Versioned document registry.
//
// The whole registry is one `StoreSnapshot` value. Every operation is a
// single `&mut self` transition over it, taking `now` explicitly, so two
// back-to-back calls can never interleave a read of stale state.
//
// History rules:
// - the newest revision stays open for in-place merges while edits keep
//   arriving within the debounce window
// - anything else appends a revision, discarding the redo tail first
// - history is capped; the oldest revision falls off the front

use chrono::{DateTime, Duration, Utc};
use redraft_common::patch::{PatchBlock, PatchEngine, PatchReport};
use redraft_common::protocol::Target;
use redraft_common::types::{
    Document, DocumentKind, InvariantError, Lock, Preferences, Revision, RevisionWindow,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const MAX_DOCUMENTS: usize = 10;
pub const MAX_REVISIONS: usize = 50;
pub const DEBOUNCE_MS: i64 = 1_000;
pub const IDLE_TIMEOUT_MINUTES: i64 = 30;

/// Capacity and timing knobs for the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    pub max_documents: usize,
    pub max_revisions: usize,
    pub debounce: Duration,
    pub idle_timeout: Duration,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_documents: MAX_DOCUMENTS,
            max_revisions: MAX_REVISIONS,
            debounce: Duration::milliseconds(DEBOUNCE_MS),
            idle_timeout: Duration::minutes(IDLE_TIMEOUT_MINUTES),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("document {0} not found")]
    NotFound(Uuid),
    #[error("no document is active")]
    NoActiveDocument,
    #[error("document limit of {limit} reached and no idle document can be evicted")]
    CapacityExceeded { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Invariant(#[from] InvariantError),
    #[error("registry key {key} holds document {document_id}")]
    KeyMismatch { key: Uuid, document_id: Uuid },
    #[error("document {0} appears more than once")]
    DuplicateDocument(Uuid),
    #[error("active document {0} is not in the registry")]
    DanglingActive(Uuid),
}

/// Flat, JSON-representable registry state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Insertion ordered `[id, document]` pairs.
    pub documents: Vec<(Uuid, Document)>,
    pub active_document: Option<Uuid>,
    #[serde(default)]
    pub preferences: Preferences,
}

impl StoreSnapshot {
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut seen = std::collections::HashSet::with_capacity(self.documents.len());
        for (key, document) in &self.documents {
            if *key != document.id {
                return Err(SnapshotError::KeyMismatch { key: *key, document_id: document.id });
            }
            if !seen.insert(*key) {
                return Err(SnapshotError::DuplicateDocument(*key));
            }
            document.check_invariants()?;
        }
        if let Some(active) = self.active_document {
            if !seen.contains(&active) {
                return Err(SnapshotError::DanglingActive(active));
            }
        }
        Ok(())
    }
}

/// Creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub kind: DocumentKind,
    pub title: String,
    pub content: String,
    pub language: Option<String>,
}

impl NewDocument {
    pub fn new(kind: DocumentKind, title: impl Into<String>) -> Self {
        Self { kind, title: title.into(), content: String::new(), language: None }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// How `update_content` recorded a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Folded into the open revision.
    Merged { sequence: u64 },
    /// New revision; `dropped_oldest` when the history cap trimmed the front.
    Appended { sequence: u64, dropped_oldest: bool },
}

impl UpdateOutcome {
    pub fn sequence(self) -> u64 {
        match self {
            Self::Merged { sequence } | Self::Appended { sequence, .. } => sequence,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    snapshot: StoreSnapshot,
    limits: StoreLimits,
}

impl DocumentStore {
    pub fn new(limits: StoreLimits) -> Self {
        Self { snapshot: StoreSnapshot::default(), limits }
    }

    /// Restores a persisted registry after checking its invariants.
    pub fn from_snapshot(
        snapshot: StoreSnapshot,
        limits: StoreLimits,
    ) -> Result<Self, SnapshotError> {
        snapshot.validate()?;
        Ok(Self { snapshot, limits })
    }

    pub fn snapshot(&self) -> &StoreSnapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> StoreSnapshot {
        self.snapshot
    }

    pub fn limits(&self) -> StoreLimits {
        self.limits
    }

    pub fn len(&self) -> usize {
        self.snapshot.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.documents.is_empty()
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.snapshot.documents.iter().map(|(_, document)| document)
    }

    pub fn get(&self, id: Uuid) -> Option<&Document> {
        self.documents().find(|document| document.id == id)
    }

    pub fn active_id(&self) -> Option<Uuid> {
        self.snapshot.active_document
    }

    pub fn active(&self) -> Option<&Document> {
        self.active_id().and_then(|id| self.get(id))
    }

    /// Maps a command target onto an existing document id.
    pub fn resolve(&self, target: Target) -> Result<Uuid, StoreError> {
        match target {
            Target::Active => self.active_id().ok_or(StoreError::NoActiveDocument),
            Target::Id(id) if self.get(id).is_some() => Ok(id),
            Target::Id(id) => Err(StoreError::NotFound(id)),
        }
    }

    /// Finds a document by title (first match in registry order) or id text.
    pub fn find_by_path(&self, path: &str) -> Option<Uuid> {
        let path = path.trim();
        self.documents()
            .find(|document| document.title == path)
            .map(|document| document.id)
            .or_else(|| Uuid::parse_str(path).ok().filter(|id| self.get(*id).is_some()))
    }

    pub fn preferences(&self) -> &Preferences {
        &self.snapshot.preferences
    }

    pub fn set_panel_width(&mut self, width: Option<u32>) {
        self.snapshot.preferences.panel_width = width;
    }

    pub fn set_active(&mut self, id: Uuid) -> bool {
        if self.get(id).is_none() {
            warn!(%id, "cannot activate unknown document");
            return false;
        }
        self.snapshot.active_document = Some(id);
        true
    }

    /// Creates a document with one seed revision and makes it active.
    ///
    /// A full registry first tries to evict one idle, non-active document.
    pub fn create_document(
        &mut self,
        request: NewDocument,
        now: DateTime<Utc>,
    ) -> Result<Uuid, StoreError> {
        if self.len() >= self.limits.max_documents && self.evict_idle(now).is_none() {
            warn!(limit = self.limits.max_documents, "document capacity exceeded");
            return Err(StoreError::CapacityExceeded { limit: self.limits.max_documents });
        }

        let language =
            request.language.unwrap_or_else(|| request.kind.default_language().to_owned());
        let seed = Revision {
            id: Uuid::new_v4(),
            sequence: 1,
            content: request.content,
            language,
            created_at: now,
        };
        let document = Document {
            id: Uuid::new_v4(),
            title: request.title,
            kind: request.kind,
            revision_window: RevisionWindow::Open { revision_id: seed.id },
            revisions: vec![seed],
            active_index: 0,
            created_at: now,
            updated_at: now,
            lock: None,
        };

        let id = document.id;
        info!(%id, title = %document.title, kind = document.kind.as_str(), "document created");
        self.snapshot.documents.push((id, document));
        self.snapshot.active_document = Some(id);
        Ok(id)
    }

    /// Records new content, merging into the open revision when the last
    /// edit is younger than the debounce window.
    pub fn update_content(
        &mut self,
        id: Uuid,
        content: String,
        now: DateTime<Utc>,
    ) -> Result<UpdateOutcome, StoreError> {
        let limits = self.limits;
        let document = self.document_mut(id).ok_or(StoreError::NotFound(id))?;
        document.updated_at = now;

        let mergeable = document
            .open_revision()
            .is_some_and(|open| now.signed_duration_since(open.created_at) < limits.debounce);
        if mergeable {
            let open = document.active_index;
            let revision = &mut document.revisions[open];
            revision.content = content;
            revision.created_at = now;
            debug!(%id, sequence = revision.sequence, "merged edit into open revision");
            return Ok(UpdateOutcome::Merged { sequence: revision.sequence });
        }

        let language = document.language().to_owned();
        document.revisions.truncate(document.active_index + 1);
        let sequence = document.last_sequence() + 1;
        let revision =
            Revision { id: Uuid::new_v4(), sequence, content, language, created_at: now };
        document.revision_window = RevisionWindow::Open { revision_id: revision.id };
        document.revisions.push(revision);
        document.active_index = document.revisions.len() - 1;

        let mut dropped_oldest = false;
        while document.revisions.len() > limits.max_revisions.max(1) && document.active_index > 0 {
            document.revisions.remove(0);
            document.active_index -= 1;
            dropped_oldest = true;
        }

        debug!(%id, sequence, dropped_oldest, "appended revision");
        Ok(UpdateOutcome::Appended { sequence, dropped_oldest })
    }

    /// Unconditional overwrite: always a fresh revision.
    pub fn replace_content(
        &mut self,
        id: Uuid,
        content: String,
        now: DateTime<Utc>,
    ) -> Result<UpdateOutcome, StoreError> {
        if !self.close_revision_window(id) {
            return Err(StoreError::NotFound(id));
        }
        self.update_content(id, content, now)
    }

    /// Runs `blocks` against the active content and records the result when
    /// at least one block changed it.
    pub fn apply_patch(
        &mut self,
        id: Uuid,
        blocks: &[PatchBlock],
        engine: &PatchEngine,
        now: DateTime<Utc>,
    ) -> Result<PatchReport, StoreError> {
        let current = self.get(id).ok_or(StoreError::NotFound(id))?;
        let report = engine.apply(current.content(), blocks);
        if report.changed_content() {
            self.update_content(id, report.new_content.clone(), now)?;
        }
        Ok(report)
    }

    /// Seals the open revision so the next update appends. Returns false
    /// only for unknown documents.
    pub fn close_revision_window(&mut self, id: Uuid) -> bool {
        match self.document_mut(id) {
            Some(document) => {
                document.revision_window = RevisionWindow::Closed;
                true
            }
            None => false,
        }
    }

    pub fn undo(&mut self, id: Uuid) -> bool {
        let Some(document) = self.document_mut(id) else {
            warn!(%id, "undo on unknown document");
            return false;
        };
        if !document.can_undo() {
            return false;
        }
        document.active_index -= 1;
        document.revision_window = RevisionWindow::Closed;
        true
    }

    pub fn redo(&mut self, id: Uuid) -> bool {
        let Some(document) = self.document_mut(id) else {
            warn!(%id, "redo on unknown document");
            return false;
        };
        if !document.can_redo() {
            return false;
        }
        document.active_index += 1;
        document.revision_window = RevisionWindow::Closed;
        true
    }

    /// Jumps to `index` in the history. Out-of-range indexes are logged and
    /// ignored.
    pub fn go_to_revision(&mut self, id: Uuid, index: usize) -> bool {
        let Some(document) = self.document_mut(id) else {
            warn!(%id, "go to revision on unknown document");
            return false;
        };
        if index >= document.revisions.len() {
            warn!(%id, index, len = document.revisions.len(), "revision index out of range");
            return false;
        }
        if index != document.active_index {
            document.active_index = index;
            document.revision_window = RevisionWindow::Closed;
        }
        true
    }

    /// Removes a document together with its lock and open revision. If it was
    /// active, the most recently created remaining document takes over.
    pub fn delete_document(&mut self, id: Uuid) -> bool {
        let before = self.snapshot.documents.len();
        self.snapshot.documents.retain(|(key, _)| *key != id);
        if self.snapshot.documents.len() == before {
            return false;
        }

        if self.snapshot.active_document == Some(id) {
            self.snapshot.active_document = self.snapshot.documents.last().map(|(key, _)| *key);
        }
        info!(%id, active = ?self.snapshot.active_document, "document deleted");
        true
    }

    /// Evicts the least recently updated non-active document idle longer
    /// than the idle timeout.
    pub fn evict_idle(&mut self, now: DateTime<Utc>) -> Option<Uuid> {
        let active = self.snapshot.active_document;
        let idle_timeout = self.limits.idle_timeout;
        let victim = self
            .documents()
            .filter(|document| Some(document.id) != active)
            .filter(|document| now.signed_duration_since(document.updated_at) > idle_timeout)
            .min_by_key(|document| document.updated_at)
            .map(|document| document.id)?;

        self.snapshot.documents.retain(|(key, _)| *key != victim);
        info!(id = %victim, "evicted idle document");
        Some(victim)
    }

    pub fn lock(&self, id: Uuid) -> Option<Lock> {
        self.get(id).and_then(|document| document.lock)
    }

    /// Lock slot of one document, for the edit coordinator.
    pub(crate) fn lock_slot(&mut self, id: Uuid) -> Option<&mut Option<Lock>> {
        self.document_mut(id).map(|document| &mut document.lock)
    }

    pub(crate) fn lock_slots(&mut self) -> impl Iterator<Item = (Uuid, &mut Option<Lock>)> {
        self.snapshot.documents.iter_mut().map(|(id, document)| (*id, &mut document.lock))
    }

    fn document_mut(&mut self, id: Uuid) -> Option<&mut Document> {
        self.snapshot
            .documents
            .iter_mut()
            .find(|(key, _)| *key == id)
            .map(|(_, document)| document)
    }
}
