// Shared dispatcher plus the background lease sweeper.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dispatch::Dispatcher;

/// One dispatcher call is one critical section.
pub type SharedDispatcher = Arc<Mutex<Dispatcher>>;

pub fn shared(dispatcher: Dispatcher) -> SharedDispatcher {
    Arc::new(Mutex::new(dispatcher))
}

/// Runs `f` with the dispatcher locked.
pub fn with_dispatcher<T>(
    shared: &SharedDispatcher,
    f: impl FnOnce(&mut Dispatcher) -> T,
) -> Result<T> {
    let mut guard = shared.lock().map_err(|_| anyhow!("dispatcher lock poisoned"))?;
    Ok(f(&mut guard))
}

/// Releases locks whose lease ran out, stamped with the current time.
pub fn sweep_once(shared: &SharedDispatcher) -> Result<Vec<Uuid>> {
    with_dispatcher(shared, |dispatcher| dispatcher.sweep_expired(Utc::now()))
}

pub struct LeaseSweeperHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl LeaseSweeperHandle {
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    pub async fn wait(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for LeaseSweeperHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sweeps expired locks every `period` until the handle shuts it down.
pub fn spawn_lease_sweeper(shared: SharedDispatcher, period: Duration) -> LeaseSweeperHandle {
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel(4);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => {
                    match sweep_once(&shared) {
                        Ok(released) if !released.is_empty() => {
                            info!(count = released.len(), "lease sweeper released locks");
                        }
                        Ok(_) => {}
                        Err(error) => {
                            warn!(?error, "lease sweeper stopping");
                            break;
                        }
                    }
                }
            }
        }
        debug!("lease sweeper stopped");
    });

    LeaseSweeperHandle { shutdown_tx, task: Some(task) }
}
