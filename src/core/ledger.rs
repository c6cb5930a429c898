//! Exclusive resource slot bookkeeping.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use parking_lot::Mutex;

use crate::core::{ResourceId, WorkIdentity};

/// Tracks which resource slots are currently held and by whom.
///
/// An entry exists only while its slot is held; absence means free. Every
/// mutation happens under one short `parking_lot::Mutex` critical section, so
/// claim-if-free is atomic with respect to concurrent claims and releases of
/// the same slot.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    held: Mutex<HashMap<ResourceId, WorkIdentity>>,
}

impl ResourceLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `resource` for `holder` if and only if it is free.
    ///
    /// Returns `false` without touching the existing claim when the slot is
    /// already held.
    pub fn try_claim(&self, resource: ResourceId, holder: WorkIdentity) -> bool {
        let mut held = self.held.lock();
        match held.entry(resource) {
            Entry::Occupied(existing) => {
                tracing::trace!(
                    "resource {} already held by task {}",
                    resource,
                    existing.get()
                );
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(holder);
                true
            }
        }
    }

    /// Release `resource`, returning the holder that was removed.
    ///
    /// Releasing a free slot is a no-op and returns `None`.
    pub fn release(&self, resource: ResourceId) -> Option<WorkIdentity> {
        self.held.lock().remove(&resource)
    }

    /// Current holder of `resource`, if any.
    pub fn holder(&self, resource: ResourceId) -> Option<WorkIdentity> {
        self.held.lock().get(&resource).copied()
    }

    /// Snapshot of all held slots, sorted by resource id.
    pub fn held(&self) -> Vec<(ResourceId, WorkIdentity)> {
        let mut snapshot: Vec<_> = self
            .held
            .lock()
            .iter()
            .map(|(resource, holder)| (*resource, *holder))
            .collect();
        snapshot.sort_unstable();
        snapshot
    }

    /// Number of held slots.
    pub fn len(&self) -> usize {
        self.held.lock().len()
    }

    /// Whether no slot is held.
    pub fn is_empty(&self) -> bool {
        self.held.lock().is_empty()
    }
}
