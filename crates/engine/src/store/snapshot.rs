// Loads and saves the registry snapshot through a `KvStorage`.

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::documents::{DocumentStore, StoreLimits, StoreSnapshot};
use super::kv::KvStorage;

pub const SNAPSHOT_KEY: &str = "redraft.snapshot";

#[derive(Debug)]
pub struct SnapshotRepository<S> {
    storage: S,
}

impl<S: KvStorage> SnapshotRepository<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Reads and validates the persisted snapshot, if one exists.
    pub fn load(&self) -> Result<Option<StoreSnapshot>> {
        let Some(bytes) = self.storage.get(SNAPSHOT_KEY)? else {
            return Ok(None);
        };
        let snapshot: StoreSnapshot =
            serde_json::from_slice(&bytes).context("failed to decode persisted snapshot")?;
        snapshot.validate().context("persisted snapshot violates store invariants")?;
        debug!(documents = snapshot.documents.len(), "loaded snapshot");
        Ok(Some(snapshot))
    }

    /// Restores a store from storage, or starts empty when nothing was saved.
    pub fn load_store(&self, limits: StoreLimits) -> Result<DocumentStore> {
        match self.load()? {
            Some(snapshot) => DocumentStore::from_snapshot(snapshot, limits)
                .context("persisted snapshot violates store invariants"),
            None => {
                info!("no snapshot found, starting with an empty store");
                Ok(DocumentStore::new(limits))
            }
        }
    }

    pub fn save(&mut self, snapshot: &StoreSnapshot) -> Result<()> {
        let bytes = serde_json::to_vec(snapshot).context("failed to encode snapshot")?;
        self.storage.set(SNAPSHOT_KEY, &bytes)?;
        debug!(documents = snapshot.documents.len(), bytes = bytes.len(), "saved snapshot");
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.storage.remove(SNAPSHOT_KEY)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use redraft_common::types::DocumentKind;
    use tempfile::tempdir;

    use super::{SnapshotRepository, SNAPSHOT_KEY};
    use crate::store::documents::{DocumentStore, NewDocument, StoreLimits};
    use crate::store::kv::{FileStorage, KvStorage, MemoryStorage};
    use crate::store::sqlite::SqliteStorage;

    fn populated_store() -> DocumentStore {
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).single().expect("timestamp");
        let mut store = DocumentStore::new(StoreLimits::default());
        let id = store
            .create_document(
                NewDocument::new(DocumentKind::Code, "main.rs").with_content("fn main() {}"),
                t0,
            )
            .expect("create");
        store
            .update_content(id, "fn main() { run(); }".into(), t0 + chrono::Duration::seconds(5))
            .expect("update");
        store
            .create_document(NewDocument::new(DocumentKind::Diagram, "flow"), t0)
            .expect("create");
        store.set_panel_width(Some(360));
        store
    }

    fn round_trip<S: KvStorage>(storage: S) {
        let store = populated_store();
        let mut repository = SnapshotRepository::new(storage);
        assert!(repository.load().expect("empty load").is_none());

        repository.save(store.snapshot()).expect("save");
        let restored = repository.load_store(StoreLimits::default()).expect("load");
        assert_eq!(restored.snapshot(), store.snapshot());

        repository.clear().expect("clear");
        assert!(repository.load().expect("load after clear").is_none());
    }

    #[test]
    fn memory_round_trip() {
        round_trip(MemoryStorage::new());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempdir().expect("tempdir should be created");
        round_trip(FileStorage::open(dir.path()).expect("file storage"));
    }

    #[test]
    fn sqlite_round_trip() {
        let dir = tempdir().expect("tempdir should be created");
        round_trip(SqliteStorage::open(dir.path().join("store.db")).expect("sqlite storage"));
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let mut storage = MemoryStorage::new();
        storage.set(SNAPSHOT_KEY, b"{not json").expect("set");
        let repository = SnapshotRepository::new(storage);
        assert!(repository.load().is_err());
    }

    #[test]
    fn invariant_violations_are_rejected_on_load() {
        let mut snapshot = populated_store().into_snapshot();
        snapshot.documents[0].1.active_index = 99;
        let mut storage = MemoryStorage::new();
        storage
            .set(SNAPSHOT_KEY, &serde_json::to_vec(&snapshot).expect("encode"))
            .expect("set");

        let error = SnapshotRepository::new(storage).load().expect_err("must reject");
        assert!(format!("{error:#}").contains("invariants"));
    }

    #[test]
    fn missing_preferences_default() {
        let json = br#"{"documents":[],"active_document":null}"#;
        let mut storage = MemoryStorage::new();
        storage.set(SNAPSHOT_KEY, json).expect("set");

        let snapshot =
            SnapshotRepository::new(storage).load().expect("load").expect("snapshot present");
        assert!(snapshot.documents.is_empty());
        assert_eq!(snapshot.preferences.panel_width, None);
    }
}
