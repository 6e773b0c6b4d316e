use std::cell::Cell;
use std::rc::Rc;

use log::debug;

use machina_serde::{ByteReader, ByteWriter, SerdeErr};

use crate::resource::{Metadata, ResourceFilter, ResourceKind, ResourceRegistry};
use crate::storage::exposed::ExposedStorage;
use crate::storage::slot::ResourceSlot;
use crate::storage::transfer::{Accessor, ResourceFlow, TransferType};
use crate::transaction::Transaction;

/// Builds a [`StorageAggregate`] from per-slot specifications. Slot order
/// here is the order every fan-out operation will visit them in.
pub struct StorageBuilder<K: ResourceKind> {
    slots: Vec<ResourceSlot<K>>,
}

impl<K: ResourceKind> StorageBuilder<K> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn add_slot(
        mut self,
        transfer: TransferType,
        filter: ResourceFilter<K>,
        capacity: u64,
    ) -> Self {
        self.slots.push(ResourceSlot::new(transfer, filter, capacity));
        self
    }

    pub fn build(self) -> StorageAggregate<K> {
        StorageAggregate {
            slots: self.slots,
            valid: Rc::new(Cell::new(true)),
        }
    }
}

impl<K: ResourceKind> Default for StorageBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// An ordered, fixed-length group of slots exposed as one logical storage.
///
/// Fan-out is strictly index order - the first slot gets first refusal,
/// remainders move on - which keeps behavior predictable for machine logic
/// that reasons about slot layout.
#[derive(Clone)]
pub struct StorageAggregate<K: ResourceKind> {
    slots: Vec<ResourceSlot<K>>,
    valid: Rc<Cell<bool>>,
}

impl<K: ResourceKind> StorageAggregate<K> {
    pub fn builder() -> StorageBuilder<K> {
        StorageBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_empty())
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_full())
    }

    pub fn slot(&self, index: usize) -> &ResourceSlot<K> {
        &self.slots[index]
    }

    pub fn slots(&self) -> &[ResourceSlot<K>] {
        &self.slots
    }

    pub fn contains(&self, resource: &K, metadata: &Metadata) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.contains(resource, metadata))
    }

    /// The maximum of the member counters. Sync consumers only need "did
    /// anything change since last sample", so one value suffices.
    pub fn modifications(&self) -> u64 {
        self.slots
            .iter()
            .map(ResourceSlot::modifications)
            .max()
            .unwrap_or(0)
    }

    /// Whether the owning machine still exists. Operations on an
    /// invalidated aggregate are no-ops returning zero.
    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }

    /// Marks the aggregate dead, e.g. when the owning machine is removed.
    /// Exposed views share the flag and die with it.
    pub fn invalidate(&self) {
        debug!("storage aggregate invalidated");
        self.valid.set(false);
    }

    // Fan-out operations

    /// The amount an insert would accept across all slots, without mutating.
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

    /// Inserts across member slots in index order, threading the remainder,
    /// stopping once satisfied. Returns the total accepted.
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

    /// Like [`insert`](Self::insert), but tops up slots already holding the
    /// pair before opening new ones.
    pub fn insert_matching(
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
            if slot.contains(resource, metadata) {
                inserted += slot.insert(resource, metadata, amount - inserted, tx.as_deref_mut());
                if inserted == amount {
                    return inserted;
                }
            }
        }
        inserted + self.insert(resource, metadata, amount - inserted, tx)
    }

    /// The amount an extract would remove across all slots, without
    /// mutating.
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

    /// Extracts across member slots in index order. Returns the total
    /// removed.
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

    /// A direction-restricted view of this storage for one class of caller.
    /// Slots whose transfer type forbids the operation for that accessor do
    /// not participate at all - their filters are never consulted.
    pub fn exposed(&self, accessor: Accessor, flow: ResourceFlow) -> ExposedStorage<K> {
        ExposedStorage::new(&self.slots, self.valid.clone(), accessor, flow)
    }

    // Serialization

    pub fn write_tag(&self, registry: &ResourceRegistry<K>, writer: &mut ByteWriter) {
        for slot in &self.slots {
            slot.write_tag(registry, writer);
        }
    }

    pub fn read_tag(
        &self,
        registry: &ResourceRegistry<K>,
        reader: &mut ByteReader,
    ) -> Result<(), SerdeErr> {
        for slot in &self.slots {
            slot.read_tag(registry, reader)?;
        }
        Ok(())
    }

    pub fn write_packet(&self, registry: &ResourceRegistry<K>, writer: &mut ByteWriter) {
        for slot in &self.slots {
            slot.write_packet(registry, writer);
        }
    }

    pub fn read_packet(
        &self,
        registry: &ResourceRegistry<K>,
        reader: &mut ByteReader,
    ) -> Result<(), SerdeErr> {
        for slot in &self.slots {
            slot.read_packet(registry, reader)?;
        }
        Ok(())
    }
}
