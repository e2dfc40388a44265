use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::types::UserId;

/// one mutex per user, serializing read-evaluate-write sequences on that
/// user's loans; a slot lives only while someone holds or waits on it
#[derive(Debug, Default)]
pub struct UserLocks {
    slots: DashMap<UserId, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// run `f` while holding the user's lock
    pub fn serialize<T>(&self, user_id: UserId, f: impl FnOnce() -> T) -> T {
        // clone the slot out so the map shard is not held while `f` runs
        let slot = self.slots.entry(user_id).or_default().clone();
        let value = {
            let _guard = slot.lock();
            f()
        };
        drop(slot);
        // the shard lock orders this against `entry`, so a slot is never
        // dropped while another caller holds a clone of it
        self.slots
            .remove_if(&user_id, |_, slot| Arc::strong_count(slot) == 1);
        value
    }

    /// number of users with a lock currently held or awaited
    pub fn tracked_users(&self) -> usize {
        self.slots.len()
    }
}
