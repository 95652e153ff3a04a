use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per slot id. Booking and cancellation hold it across their
/// check-reserve-write sequence; the store CAS stays the final arbiter.
#[derive(Default)]
pub struct SlotLockRegistry {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl SlotLockRegistry {
    pub async fn lock(&self, slot_id: Uuid) -> OwnedMutexGuard<()> {
        let slot_lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // entries nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(slot_id).or_default())
        };
        slot_lock.lock_owned().await
    }

    pub fn tracked(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }
}
