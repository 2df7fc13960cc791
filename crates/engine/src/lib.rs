// redraft-engine: document store, edit locks, command dispatch and
// persistence.

pub mod config;
pub mod dispatch;
pub mod lock;
pub mod runtime;
pub mod security;
pub mod session;
pub mod store;

pub use dispatch::{Dispatcher, EditReport, TargetedBlock};
pub use lock::EditCoordinator;
pub use runtime::{spawn_lease_sweeper, LeaseSweeperHandle, SharedDispatcher};
pub use store::{DocumentStore, NewDocument, StoreError, StoreLimits, StoreSnapshot};
