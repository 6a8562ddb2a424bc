use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::utils::address_key;

type Slots = HashMap<String, Arc<AsyncMutex<()>>>;

/// Single-flight guard keyed by wallet address.
///
/// At most one holder per address at a time; other callers for the same address
/// wait their turn. Slots are dropped once nobody holds or waits on them.
#[derive(Clone, Default)]
pub struct AddressLocks {
    slots: Arc<Mutex<Slots>>,
}

pub struct AddressGuard {
    key: String,
    slots: Arc<Mutex<Slots>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl AddressLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, address: &str) -> AddressGuard {
        let key = address_key(address);
        let slot = {
            let mut slots = lock_slots(&self.slots);
            // a waiter dropped after its holder released leaves an unreferenced slot
            slots.retain(|other, slot| *other == key || Arc::strong_count(slot) > 1);
            slots.entry(key.clone()).or_default().clone()
        };

        let guard = slot.lock_owned().await;
        AddressGuard {
            key,
            slots: self.slots.clone(),
            guard: Some(guard),
        }
    }

    /// Addresses that currently have a holder or waiters.
    #[cfg(test)]
    pub fn active(&self) -> usize {
        lock_slots(&self.slots).len()
    }
}

impl Drop for AddressGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut slots = lock_slots(&self.slots);
        let idle = slots
            .get(&self.key)
            .map(|slot| Arc::strong_count(slot) == 1)
            .unwrap_or(false);
        if idle {
            slots.remove(&self.key);
        }
    }
}

fn lock_slots(slots: &Mutex<Slots>) -> std::sync::MutexGuard<'_, Slots> {
    slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
