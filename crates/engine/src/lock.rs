// Advisory per-document edit locks.
//
// Locks are signals, not enforcement:
// - acquire grants an unlocked document or re-grants the current holder
//   without touching its lease
// - release always unlocks, whoever holds it
// - a sweep drops locks held longer than the lease so a crashed writer
//   cannot block a document forever
//
// Nothing here stops `DocumentStore::update_content`; the dispatcher checks
// the lock before editing on behalf of a writer.

use chrono::{DateTime, Duration, Utc};
use redraft_common::types::{Actor, Lock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::store::DocumentStore;

pub const LEASE_SECONDS: i64 = 30;
pub const SWEEP_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditCoordinator {
    lease: Duration,
}

impl Default for EditCoordinator {
    fn default() -> Self {
        Self::new(Duration::seconds(LEASE_SECONDS))
    }
}

impl EditCoordinator {
    pub fn new(lease: Duration) -> Self {
        Self { lease }
    }

    pub fn lease(&self) -> Duration {
        self.lease
    }

    /// Returns true when `actor` holds the lock afterwards. A repeated
    /// acquire by the holder keeps the original `acquired_at`; a lock past
    /// its lease can be taken over before the sweeper gets to it.
    pub fn acquire(
        &self,
        store: &mut DocumentStore,
        id: Uuid,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(slot) = store.lock_slot(id) else {
            warn!(%id, actor = actor.as_str(), "lock requested for unknown document");
            return false;
        };
        match *slot {
            Some(lock) if lock.holder == actor => true,
            Some(lock) if self.is_expired(&lock, now) => {
                *slot = Some(Lock { holder: actor, acquired_at: now });
                info!(
                    %id,
                    previous = lock.holder.as_str(),
                    holder = actor.as_str(),
                    "lock taken over after lease expiry"
                );
                true
            }
            Some(lock) => {
                info!(
                    %id,
                    holder = lock.holder.as_str(),
                    requested_by = actor.as_str(),
                    "lock denied"
                );
                false
            }
            None => {
                *slot = Some(Lock { holder: actor, acquired_at: now });
                info!(%id, holder = actor.as_str(), "lock acquired");
                true
            }
        }
    }

    /// Unlocks regardless of holder. False only for unknown documents.
    pub fn release(&self, store: &mut DocumentStore, id: Uuid) -> bool {
        let Some(slot) = store.lock_slot(id) else {
            return false;
        };
        if let Some(previous) = slot.take() {
            info!(%id, holder = previous.holder.as_str(), "lock released");
        }
        true
    }

    /// Current holder, ignoring a lock whose lease already ran out but has
    /// not been swept yet.
    pub fn holder(&self, store: &DocumentStore, id: Uuid, now: DateTime<Utc>) -> Option<Actor> {
        store.lock(id).filter(|lock| !self.is_expired(lock, now)).map(|lock| lock.holder)
    }

    /// True when `actor` may edit: the document is unlocked or `actor` holds it.
    pub fn permits(
        &self,
        store: &DocumentStore,
        id: Uuid,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> bool {
        self.holder(store, id, now).map_or(true, |holder| holder == actor)
    }

    pub fn is_expired(&self, lock: &Lock, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(lock.acquired_at) > self.lease
    }

    /// Drops every lock older than the lease; returns the unlocked documents.
    pub fn sweep_expired(&self, store: &mut DocumentStore, now: DateTime<Utc>) -> Vec<Uuid> {
        let mut released = Vec::new();
        for (id, slot) in store.lock_slots() {
            if slot.is_some_and(|lock| self.is_expired(&lock, now)) {
                if let Some(expired) = slot.take() {
                    warn!(%id, holder = expired.holder.as_str(), "lock lease expired");
                }
                released.push(id);
            }
        }
        released
    }
}
