//! Per-schedule serialization.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Lock registry keyed by schedule id.
///
/// Generation and lifecycle mutations for one schedule hold its lock for the
/// whole read-decide-write sequence, so a batch run and a manual trigger
/// racing on the same schedule commit at most one invoice per cycle.
/// Distinct schedules never contend, and reads take no lock at all.
#[derive(Default)]
pub struct ScheduleLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ScheduleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, schedule_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(schedule_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        lock.lock_owned().await
    }

    /// Drop the registry entry for a deleted schedule.
    pub fn discard(&self, schedule_id: Uuid) {
        self.locks.remove(&schedule_id);
    }
}
