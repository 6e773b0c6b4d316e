use std::cell::Cell;
use std::rc::Rc;

use crate::resource::{Metadata, ResourceKind};
use crate::storage::slot::ResourceSlot;
use crate::storage::transfer::{Accessor, ResourceFlow};
use crate::transaction::Transaction;

/// A single slot as seen by one class of caller. The permission booleans
/// are fixed at construction from the slot's transfer type, the accessor,
/// and the face's flow configuration; a disallowed direction short-circuits
/// to zero before the slot's filter is ever evaluated.
pub struct ExposedSlot<K: ResourceKind> {
    slot: ResourceSlot<K>,
    insertion: bool,
    extraction: bool,
}

impl<K: ResourceKind> ExposedSlot<K> {
    pub fn new(slot: &ResourceSlot<K>, accessor: Accessor, flow: ResourceFlow) -> Self {
        let transfer = slot.transfer_type();
        Self {
            slot: slot.clone(),
            insertion: flow.can_flow_in() && transfer.allows_insertion(accessor),
            extraction: flow.can_flow_out() && transfer.allows_extraction(accessor),
        }
    }

    pub fn supports_insertion(&self) -> bool {
        self.insertion
    }

    pub fn supports_extraction(&self) -> bool {
        self.extraction
    }

    pub fn insert(
        &self,
        resource: &K,
        metadata: &Metadata,
        amount: u64,
        tx: Option<&mut Transaction<'_>>,
    ) -> u64 {
        if !self.insertion {
            return 0;
        }
        self.slot.insert(resource, metadata, amount, tx)
    }

    pub fn extract(
        &self,
        resource: &K,
        metadata: &Metadata,
        amount: u64,
        tx: Option<&mut Transaction<'_>>,
    ) -> u64 {
        if !self.extraction {
            return 0;
        }
        self.slot.extract(resource, metadata, amount, tx)
    }

    pub fn try_insert(&self, resource: &K, metadata: &Metadata, amount: u64) -> u64 {
        if !self.insertion {
            return 0;
        }
        self.slot.try_insert(resource, metadata, amount)
    }

    pub fn try_extract(&self, resource: &K, metadata: &Metadata, amount: u64) -> u64 {
        if !self.extraction {
            return 0;
        }
        self.slot.try_extract(resource, metadata, amount)
    }

    pub fn resource(&self) -> Option<K> {
        self.slot.resource()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_empty()
    }

    pub fn amount(&self) -> u64 {
        self.slot.amount()
    }

    pub fn capacity(&self) -> u64 {
        self.slot.effective_capacity()
    }

    /// Cheap staleness signal for interop callers.
    pub fn modifications(&self) -> u64 {
        self.slot.modifications()
    }
}

/// A direction-restricted view over an aggregate's slots for one class of
/// external consumer. Shares the aggregate's validity flag: once the owner
/// invalidates the storage, every view returns zero from every operation.
pub struct ExposedStorage<K: ResourceKind> {
    slots: Vec<ExposedSlot<K>>,
    valid: Rc<Cell<bool>>,
}

impl<K: ResourceKind> ExposedStorage<K> {
    pub(crate) fn new(
        slots: &[ResourceSlot<K>],
        valid: Rc<Cell<bool>>,
        accessor: Accessor,
        flow: ResourceFlow,
    ) -> Self {
        Self {
            slots: slots
                .iter()
                .map(|slot| ExposedSlot::new(slot, accessor, flow))
                .collect(),
            valid,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether every member slot is empty, matching the owning aggregate's
    /// meaning of emptiness.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(ExposedSlot::is_empty)
    }

    pub fn slot(&self, index: usize) -> &ExposedSlot<K> {
        &self.slots[index]
    }

    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }

    pub fn supports_insertion(&self) -> bool {
        self.slots.iter().any(ExposedSlot::supports_insertion)
    }

    pub fn supports_extraction(&self) -> bool {
        self.slots.iter().any(ExposedSlot::supports_extraction)
    }

    pub fn insert(
        &self,
        resource: &K,
        metadata: &Metadata,
        amount: u64,
        mut tx: Option<&mut Transaction<'_>>,
    ) -> u64 {
        if !self.valid.get() {
            return 0;
        }
        let mut inserted = 0;
        for slot in &self.slots {
            inserted += slot.insert(resource, metadata, amount - inserted, tx.as_deref_mut());
            if inserted == amount {
                break;
            }
        }
        inserted
    }

    pub fn extract(
        &self,
        resource: &K,
        metadata: &Metadata,
        amount: u64,
        mut tx: Option<&mut Transaction<'_>>,
    ) -> u64 {
        if !self.valid.get() {
            return 0;
        }
        let mut extracted = 0;
        for slot in &self.slots {
            extracted += slot.extract(resource, metadata, amount - extracted, tx.as_deref_mut());
            if extracted == amount {
                break;
            }
        }
        extracted
    }

    pub fn try_insert(&self, resource: &K, metadata: &Metadata, amount: u64) -> u64 {
        if !self.valid.get() {
            return 0;
        }
        let mut inserted = 0;
        for slot in &self.slots {
            inserted += slot.try_insert(resource, metadata, amount - inserted);
            if inserted == amount {
                break;
            }
        }
        inserted
    }

    pub fn try_extract(&self, resource: &K, metadata: &Metadata, amount: u64) -> u64 {
        if !self.valid.get() {
            return 0;
        }
        let mut extracted = 0;
        for slot in &self.slots {
            extracted += slot.try_extract(resource, metadata, amount - extracted);
            if extracted == amount {
                break;
            }
        }
        extracted
    }

    /// Maximum of the member slots' modification counters.
    pub fn modifications(&self) -> u64 {
        self.slots
            .iter()
            .map(ExposedSlot::modifications)
            .max()
            .unwrap_or(0)
    }
}
