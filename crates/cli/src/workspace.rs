// Opens the persisted document store the CLI works against.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::Args;
use redraft_common::protocol::Target;
use redraft_engine::config::{EngineConfig, StorageBackend};
use redraft_engine::store::{
    DocumentStore, FileStorage, KvStorage, SnapshotRepository, SqliteStorage,
};
use redraft_engine::Dispatcher;
use tracing::{debug, info};

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Storage location (a directory, or a database file with `--sqlite`).
    #[arg(long, global = true, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Keep the snapshot in SQLite instead of JSON files.
    #[arg(long, global = true)]
    pub sqlite: bool,

    /// Force JSON output.
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file to use instead of `~/.redraft/config.toml`.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// A loaded dispatcher plus the repository it is saved back to.
pub struct Workspace {
    pub config: EngineConfig,
    pub dispatcher: Dispatcher,
    repository: SnapshotRepository<Box<dyn KvStorage>>,
}

impl Workspace {
    pub fn open(globals: &GlobalArgs) -> Result<Self> {
        let mut config = match &globals.config {
            Some(path) => EngineConfig::load_from(path)
                .with_context(|| format!("failed to load config `{}`", path.display()))?,
            None => EngineConfig::load(),
        };
        if globals.sqlite {
            config.storage.backend = StorageBackend::Sqlite;
        }
        if let Some(path) = &globals.store {
            config.storage.path = Some(path.clone());
        }

        let location = config
            .storage_path()
            .ok_or_else(|| anyhow!("could not determine home directory; pass --store"))?;
        let storage = open_storage(config.storage.backend, &location)?;
        let repository = SnapshotRepository::new(storage);
        let store = repository.load_store(config.store.limits())?;
        let mut dispatcher = Dispatcher::from_config(&config, store);

        let released = dispatcher.sweep_expired(Utc::now());
        if !released.is_empty() {
            info!(count = released.len(), "released expired locks on open");
        }
        debug!(path = %location.display(), documents = dispatcher.store().len(), "store opened");

        Ok(Self { config, dispatcher, repository })
    }

    pub fn store(&self) -> &DocumentStore {
        self.dispatcher.store()
    }

    pub fn save(&mut self) -> Result<()> {
        self.repository.save(self.dispatcher.store().snapshot())
    }

    pub fn into_parts(self) -> (EngineConfig, Dispatcher, SnapshotRepository<Box<dyn KvStorage>>) {
        (self.config, self.dispatcher, self.repository)
    }

    /// `None` means the active document; otherwise an id, `active`, or a
    /// document title.
    pub fn resolve(&self, doc: Option<&str>) -> Result<Target> {
        resolve_target(self.store(), doc)
    }
}

pub fn open_storage(backend: StorageBackend, location: &Path) -> Result<Box<dyn KvStorage>> {
    let storage: Box<dyn KvStorage> = match backend {
        StorageBackend::File => Box::new(FileStorage::open(location)?),
        StorageBackend::Sqlite => Box::new(SqliteStorage::open(location)?),
    };
    Ok(storage)
}

pub fn resolve_target(store: &DocumentStore, doc: Option<&str>) -> Result<Target> {
    let Some(doc) = doc else {
        return Ok(Target::Active);
    };
    if let Ok(target) = doc.parse::<Target>() {
        return Ok(target);
    }
    match store.find_by_path(doc) {
        Some(id) => Ok(Target::Id(id)),
        None => bail!("document `{doc}` not found"),
    }
}
