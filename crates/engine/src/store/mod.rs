// Document registry and its persistence: key-value backends and snapshots.

pub mod documents;
pub mod kv;
pub mod snapshot;
pub mod sqlite;

pub use documents::{
    DocumentStore, NewDocument, SnapshotError, StoreError, StoreLimits, StoreSnapshot,
    UpdateOutcome, DEBOUNCE_MS, IDLE_TIMEOUT_MINUTES, MAX_DOCUMENTS, MAX_REVISIONS,
};
pub use kv::{FileStorage, KvStorage, MemoryStorage};
pub use snapshot::{SnapshotRepository, SNAPSHOT_KEY};
pub use sqlite::SqliteStorage;
