// Command dispatcher: turns inbound commands into store, lock and patch
// calls and reports each result as notifications.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use redraft_common::patch::{BlockReport, PatchBlock, PatchEngine};
use redraft_common::protocol::{Command, Notification, Target};
use redraft_common::types::{Actor, DocumentKind};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::lock::EditCoordinator;
use crate::store::{DocumentStore, NewDocument, StoreError};

/// Everything one `edit` produced. Block indexes in `outcomes` are positions
/// in the raw patch, across all targeted documents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditReport {
    pub applied_count: usize,
    pub outcomes: Vec<TargetedBlock>,
    pub notifications: Vec<Notification>,
}

impl EditReport {
    pub fn success(&self) -> bool {
        !self.notifications.is_empty() && self.notifications.iter().all(|n| n.success)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetedBlock {
    pub document_id: Uuid,
    #[serde(flatten)]
    pub report: BlockReport,
}

#[derive(Debug)]
pub struct Dispatcher {
    store: DocumentStore,
    coordinator: EditCoordinator,
    engine: PatchEngine,
}

impl Dispatcher {
    pub fn new(store: DocumentStore, coordinator: EditCoordinator, engine: PatchEngine) -> Self {
        Self { store, coordinator, engine }
    }

    /// Wraps an already loaded store with the configured lease and
    /// suggestion threshold.
    pub fn from_config(config: &EngineConfig, store: DocumentStore) -> Self {
        Self::new(
            store,
            EditCoordinator::new(config.locks.lease()),
            PatchEngine::with_threshold(config.patch.suggestion_threshold),
        )
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut DocumentStore {
        &mut self.store
    }

    pub fn into_store(self) -> DocumentStore {
        self.store
    }

    pub fn coordinator(&self) -> &EditCoordinator {
        &self.coordinator
    }

    pub fn engine(&self) -> &PatchEngine {
        &self.engine
    }

    /// Runs one command. Always yields at least one notification.
    pub fn execute(&mut self, command: Command, now: DateTime<Utc>) -> Vec<Notification> {
        debug!(?command, "dispatching command");
        match command {
            Command::Create { kind, title, content, language } => {
                vec![self.create(kind, title, content, language, now)]
            }
            Command::Edit { target, patch, actor } => {
                self.edit_as(actor, target, &patch, now).notifications
            }
            Command::Replace { target, content, actor } => {
                vec![self.replace_as(actor, target, content, now)]
            }
            Command::Lock { target, held, actor } => {
                vec![self.lock_notification(target, held, actor, now)]
            }
            Command::Undo { target } => vec![self.undo(target)],
            Command::Redo { target } => vec![self.redo(target)],
            Command::GoTo { target, index } => vec![self.go_to(target, index)],
            Command::Delete { target } => vec![self.delete(target)],
        }
    }

    pub fn create(
        &mut self,
        kind: DocumentKind,
        title: String,
        content: String,
        language: Option<String>,
        now: DateTime<Utc>,
    ) -> Notification {
        let request = NewDocument { kind, title: title.clone(), content, language };
        match self.store.create_document(request, now) {
            Ok(id) => {
                Notification::success(id, title, format!("Created {} document", kind.as_str()))
            }
            Err(error) => Notification::failure(None, title, error.to_string()),
        }
    }

    pub fn edit(&mut self, target: Target, raw_patch: &str, now: DateTime<Utc>) -> EditReport {
        self.edit_as(None, target, raw_patch, now)
    }

    /// Parses `raw_patch` and applies its blocks. Blocks inside a
    /// `<file path="...">` envelope go to the document with that title (or
    /// id); the rest go to `target`.
    pub fn edit_as(
        &mut self,
        actor: Option<Actor>,
        target: Target,
        raw_patch: &str,
        now: DateTime<Utc>,
    ) -> EditReport {
        let parsed = self.engine.parse(raw_patch);
        let mut parse_errors = parsed.error_messages();
        let mut report =
            EditReport { applied_count: 0, outcomes: Vec::new(), notifications: Vec::new() };

        if parsed.blocks.is_empty() {
            let default_id = self.store.resolve(target).ok();
            if parse_errors.is_empty() {
                parse_errors.push("patch contains no SEARCH/REPLACE blocks".to_owned());
            }
            report.notifications.push(Notification {
                document_id: default_id,
                title: self.title_of(default_id),
                change_summaries: Vec::new(),
                success: false,
                errors: Some(parse_errors),
            });
            return report;
        }

        let (groups, routing_failures) = self.group_blocks(target, parsed.blocks);
        report.notifications.extend(routing_failures);

        for (id, blocks) in groups {
            let title = self.title_of(Some(id));
            if let Some(actor) = actor {
                if !self.coordinator.permits(&self.store, id, actor, now) {
                    let holder = self.coordinator.holder(&self.store, id, now);
                    warn!(%id, actor = actor.as_str(), "edit rejected by lock");
                    report.notifications.push(Notification::failure(
                        Some(id),
                        title,
                        locked_message(holder),
                    ));
                    continue;
                }
            }

            let (positions, blocks): (Vec<usize>, Vec<PatchBlock>) = blocks.into_iter().unzip();
            let mut patch = match self.store.apply_patch(id, &blocks, &self.engine, now) {
                Ok(patch) => patch,
                Err(error) => {
                    report.notifications.push(Notification::failure(
                        Some(id),
                        title,
                        error.to_string(),
                    ));
                    continue;
                }
            };
            for block in &mut patch.outcomes {
                block.index = positions[block.index];
            }

            let errors_here = std::mem::take(&mut parse_errors);
            report.applied_count += patch.applied_count;
            report.notifications.push(Notification::from_patch(id, title, &patch, &errors_here));
            report.outcomes.extend(
                patch
                    .outcomes
                    .into_iter()
                    .map(|block| TargetedBlock { document_id: id, report: block }),
            );
        }

        if !parse_errors.is_empty() {
            report.notifications.push(Notification {
                document_id: None,
                title: String::new(),
                change_summaries: Vec::new(),
                success: false,
                errors: Some(parse_errors),
            });
        }
        report
    }

    /// Splits blocks by destination document, keeping first-appearance order.
    fn group_blocks(
        &self,
        target: Target,
        blocks: Vec<PatchBlock>,
    ) -> (Vec<(Uuid, Vec<(usize, PatchBlock)>)>, Vec<Notification>) {
        let default_id = self.store.resolve(target);
        let mut groups: Vec<(Uuid, Vec<(usize, PatchBlock)>)> = Vec::new();
        let mut slots: HashMap<Uuid, usize> = HashMap::new();
        let mut failures = Vec::new();

        for (position, block) in blocks.into_iter().enumerate() {
            let destination = match block.target_path.as_deref() {
                Some(path) => self.store.find_by_path(path).ok_or_else(|| {
                    warn!(path, "patch envelope names no known document");
                    Notification::failure(
                        None,
                        path,
                        format!("Block {}: no document matches path `{path}`", position + 1),
                    )
                }),
                None => default_id.clone().map_err(|error| {
                    Notification::failure(
                        None,
                        target.to_string(),
                        format!("Block {}: {error}", position + 1),
                    )
                }),
            };

            match destination {
                Ok(id) => {
                    let slot = *slots.entry(id).or_insert_with(|| {
                        groups.push((id, Vec::new()));
                        groups.len() - 1
                    });
                    groups[slot].1.push((position, block));
                }
                Err(notification) => failures.push(notification),
            }
        }

        (groups, failures)
    }

    pub fn replace(&mut self, target: Target, content: String, now: DateTime<Utc>) -> Notification {
        self.replace_as(None, target, content, now)
    }

    pub fn replace_as(
        &mut self,
        actor: Option<Actor>,
        target: Target,
        content: String,
        now: DateTime<Utc>,
    ) -> Notification {
        let id = match self.store.resolve(target) {
            Ok(id) => id,
            Err(error) => {
                return Notification::failure(None, target.to_string(), error.to_string())
            }
        };
        let title = self.title_of(Some(id));
        if let Some(actor) = actor {
            if !self.coordinator.permits(&self.store, id, actor, now) {
                let holder = self.coordinator.holder(&self.store, id, now);
                return Notification::failure(Some(id), title, locked_message(holder));
            }
        }

        match self.store.replace_content(id, content, now) {
            Ok(outcome) => Notification::success(
                id,
                title,
                format!("Replaced content (revision {})", outcome.sequence()),
            ),
            Err(error) => Notification::failure(Some(id), title, error.to_string()),
        }
    }

    /// `held = true` acquires for `actor`; `held = false` releases.
    pub fn lock(&mut self, target: Target, held: bool, actor: Actor, now: DateTime<Utc>) -> bool {
        let Ok(id) = self.store.resolve(target) else {
            warn!(%target, "lock target not found");
            return false;
        };
        if held {
            self.coordinator.acquire(&mut self.store, id, actor, now)
        } else {
            self.coordinator.release(&mut self.store, id)
        }
    }

    fn lock_notification(
        &mut self,
        target: Target,
        held: bool,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Notification {
        let id = match self.store.resolve(target) {
            Ok(id) => id,
            Err(error) => {
                return Notification::failure(None, target.to_string(), error.to_string())
            }
        };
        let title = self.title_of(Some(id));
        let granted = self.lock(target, held, actor, now);
        match (granted, held) {
            (true, true) => {
                Notification::success(id, title, format!("Locked by {}", actor.as_str()))
            }
            (true, false) => Notification::success(id, title, "Unlocked"),
            (false, _) => {
                let holder = self.coordinator.holder(&self.store, id, now);
                Notification::failure(Some(id), title, locked_message(holder))
            }
        }
    }

    pub fn undo(&mut self, target: Target) -> Notification {
        self.navigate(target, "Nothing to undo", |store, id| store.undo(id))
    }

    pub fn redo(&mut self, target: Target) -> Notification {
        self.navigate(target, "Nothing to redo", |store, id| store.redo(id))
    }

    pub fn go_to(&mut self, target: Target, index: usize) -> Notification {
        let message = format!("Revision index {index} is out of range");
        self.navigate(target, &message, |store, id| store.go_to_revision(id, index))
    }

    fn navigate(
        &mut self,
        target: Target,
        refused: &str,
        step: impl FnOnce(&mut DocumentStore, Uuid) -> bool,
    ) -> Notification {
        let id = match self.store.resolve(target) {
            Ok(id) => id,
            Err(error) => {
                return Notification::failure(None, target.to_string(), error.to_string())
            }
        };
        let title = self.title_of(Some(id));
        if !step(&mut self.store, id) {
            return Notification::failure(Some(id), title, refused);
        }
        match self.store.get(id) {
            Some(document) => Notification::success(
                id,
                title,
                format!(
                    "Now at revision {} ({} of {})",
                    document.active_revision().sequence,
                    document.active_index + 1,
                    document.revisions.len()
                ),
            ),
            None => Notification::failure(Some(id), title, StoreError::NotFound(id).to_string()),
        }
    }

    pub fn delete(&mut self, target: Target) -> Notification {
        let id = match self.store.resolve(target) {
            Ok(id) => id,
            Err(error) => {
                return Notification::failure(None, target.to_string(), error.to_string())
            }
        };
        let title = self.title_of(Some(id));
        if self.store.delete_document(id) {
            Notification::success(id, title, "Deleted")
        } else {
            Notification::failure(Some(id), title, StoreError::NotFound(id).to_string())
        }
    }

    /// Drops expired locks; used by the lease sweeper.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> Vec<Uuid> {
        self.coordinator.sweep_expired(&mut self.store, now)
    }

    fn title_of(&self, id: Option<Uuid>) -> String {
        id.and_then(|id| self.store.get(id))
            .map(|document| document.title.clone())
            .unwrap_or_default()
    }
}

fn locked_message(holder: Option<Actor>) -> String {
    match holder {
        Some(holder) => format!("document is locked by {}", holder.as_str()),
        None => "document is locked".to_owned(),
    }
}
