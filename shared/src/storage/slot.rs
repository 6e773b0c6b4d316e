use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use machina_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

use crate::resource::{Metadata, RawId, ResourceFilter, ResourceKind, ResourceRegistry};
use crate::storage::transfer::TransferType;
use crate::transaction::{Transaction, TransactionParticipant};

// assertions made:
// if amount > 0 then resource is Some (and the inverse)
// if resource is None then metadata is empty
// every aborted transaction unwinds through restore_snapshot - if a mutation
// skips enlisting, the rollback will be off

struct SlotInner<K: ResourceKind> {
    resource: Option<K>,
    metadata: Metadata,
    amount: u64,
    capacity: u64,
    transfer: TransferType,
    filter: ResourceFilter<K>,
    modifications: u64,
}

impl<K: ResourceKind> SlotInner<K> {
    fn effective_capacity_for(&self, resource: &K) -> u64 {
        match resource.declared_capacity() {
            Some(declared) => self.capacity.min(declared),
            None => self.capacity,
        }
    }

    fn effective_capacity(&self) -> u64 {
        match &self.resource {
            Some(resource) => self.effective_capacity_for(resource),
            None => self.capacity,
        }
    }

    fn set_empty(&mut self) {
        self.resource = None;
        self.metadata = Metadata::empty();
        self.amount = 0;
    }

    fn is_sane(&self) -> bool {
        match &self.resource {
            Some(_) => self.amount > 0 && self.amount <= self.effective_capacity(),
            None => self.amount == 0 && self.metadata.is_empty(),
        }
    }
}

struct SlotSnapshot<K: ResourceKind> {
    resource: Option<K>,
    metadata: Metadata,
    amount: u64,
    modifications: u64,
}

impl<K: ResourceKind> TransactionParticipant for RefCell<SlotInner<K>> {
    fn take_snapshot(&self) -> Box<dyn Any> {
        let inner = self.borrow();
        Box::new(SlotSnapshot {
            resource: inner.resource.clone(),
            metadata: inner.metadata.clone(),
            amount: inner.amount,
            modifications: inner.modifications,
        })
    }

    fn restore_snapshot(&self, snapshot: Box<dyn Any>) {
        let snapshot = snapshot
            .downcast::<SlotSnapshot<K>>()
            .expect("slot snapshot type mismatch");
        let mut inner = self.borrow_mut();
        inner.resource = snapshot.resource;
        inner.metadata = snapshot.metadata;
        inner.amount = snapshot.amount;
        inner.modifications = snapshot.modifications;
        debug_assert!(inner.is_sane());
    }
}

/// The smallest addressable resource ledger: at most one
/// (resource, metadata, amount) triple, bounded by a capacity and guarded by
/// an acceptance filter.
///
/// `ResourceSlot` is a cheap-clone handle; the owning aggregate, open
/// transactions, exposed views and sync fields all share the same ledger
/// through their own handles.
#[derive(Clone)]
pub struct ResourceSlot<K: ResourceKind> {
    inner: Rc<RefCell<SlotInner<K>>>,
}

impl<K: ResourceKind> ResourceSlot<K> {
    pub fn new(transfer: TransferType, filter: ResourceFilter<K>, capacity: u64) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SlotInner {
                resource: None,
                metadata: Metadata::empty(),
                amount: 0,
                capacity,
                transfer,
                filter,
                modifications: 1,
            })),
        }
    }

    // Queries

    pub fn resource(&self) -> Option<K> {
        self.inner.borrow().resource.clone()
    }

    pub fn metadata(&self) -> Metadata {
        self.inner.borrow().metadata.clone()
    }

    pub fn amount(&self) -> u64 {
        self.inner.borrow().amount
    }

    /// The current (resource, metadata, amount) triple as one read.
    pub fn contents(&self) -> (Option<K>, Metadata, u64) {
        let inner = self.inner.borrow();
        (inner.resource.clone(), inner.metadata.clone(), inner.amount)
    }

    /// Designer-configured ceiling, before any kind-declared cap.
    pub fn capacity(&self) -> u64 {
        self.inner.borrow().capacity
    }

    /// Capacity for the currently held resource: the base capacity clamped
    /// by the kind's declared cap. The base capacity when empty.
    pub fn effective_capacity(&self) -> u64 {
        self.inner.borrow().effective_capacity()
    }

    /// Capacity this slot would grant the given kind.
    pub fn effective_capacity_for(&self, resource: &K) -> u64 {
        self.inner.borrow().effective_capacity_for(resource)
    }

    pub fn transfer_type(&self) -> TransferType {
        self.inner.borrow().transfer
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().amount == 0
    }

    pub fn is_full(&self) -> bool {
        let inner = self.inner.borrow();
        inner.amount == inner.effective_capacity()
    }

    pub fn contains(&self, resource: &K, metadata: &Metadata) -> bool {
        let inner = self.inner.borrow();
        inner.resource.as_ref() == Some(resource) && inner.metadata == *metadata
    }

    /// Whether the acceptance filter passes for the pair. Advisory only:
    /// the slot may hold a value its filter would reject today.
    pub fn accepts(&self, resource: &K, metadata: &Metadata) -> bool {
        let inner = self.inner.borrow();
        (inner.filter)(resource, metadata)
    }

    /// Strictly increases on every externally visible mutation. Consumers
    /// compare counters to detect change without deep comparison.
    pub fn modifications(&self) -> u64 {
        self.inner.borrow().modifications
    }

    /// Advances the modification counter. Paired with [`set`](Self::set),
    /// which deliberately does not.
    pub fn mark_modified(&self) {
        self.inner.borrow_mut().modifications += 1;
    }

    // Insertion

    /// The amount an insert of the pair would accept, without mutating.
    pub fn try_insert(&self, resource: &K, metadata: &Metadata, amount: u64) -> u64 {
        let inner = self.inner.borrow();
        if amount == 0 {
            return 0;
        }
        if !(inner.filter)(resource, metadata) {
            return 0;
        }
        let compatible = match &inner.resource {
            Some(held) => held == resource && inner.metadata == *metadata,
            None => true,
        };
        if !compatible {
            return 0;
        }
        let capacity = inner.effective_capacity_for(resource);
        amount.min(capacity.saturating_sub(inner.amount))
    }

    /// Whether an insert of exactly `amount` would be accepted in full.
    pub fn can_insert(&self, resource: &K, metadata: &Metadata, amount: u64) -> bool {
        self.try_insert(resource, metadata, amount) == amount
    }

    /// Accepts up to `amount` of the pair, clamped to the remaining
    /// effective capacity. A partial accept is not an error; callers handle
    /// the remainder. Returns the amount accepted.
    ///
    /// The pre-operation state is registered with `tx` before any field
    /// changes, so an enclosing abort restores this slot exactly.
    pub fn insert(
        &self,
        resource: &K,
        metadata: &Metadata,
        amount: u64,
        tx: Option<&mut Transaction<'_>>,
    ) -> u64 {
        let accepted = self.try_insert(resource, metadata, amount);
        if accepted == 0 {
            return 0;
        }
        if let Some(tx) = tx {
            tx.enlist(self.participant());
        }
        let mut inner = self.inner.borrow_mut();
        if inner.resource.is_none() {
            inner.resource = Some(resource.clone());
            inner.metadata = metadata.clone();
        }
        inner.amount += accepted;
        inner.modifications += 1;
        debug_assert!(inner.is_sane());
        accepted
    }

    // Extraction

    /// The amount an extract of the pair would remove, without mutating.
    pub fn try_extract(&self, resource: &K, metadata: &Metadata, amount: u64) -> u64 {
        let inner = self.inner.borrow();
        if amount == 0 || inner.amount == 0 {
            return 0;
        }
        match &inner.resource {
            Some(held) if held == resource && inner.metadata == *metadata => {
                amount.min(inner.amount)
            }
            _ => 0,
        }
    }

    /// The amount a kind-only extract would remove, ignoring metadata.
    pub fn try_extract_kind(&self, resource: &K, amount: u64) -> u64 {
        let inner = self.inner.borrow();
        if amount == 0 || inner.amount == 0 {
            return 0;
        }
        match &inner.resource {
            Some(held) if held == resource => amount.min(inner.amount),
            _ => 0,
        }
    }

    /// The amount an extract of anything would remove, without mutating.
    pub fn try_extract_any(&self, amount: u64) -> u64 {
        amount.min(self.inner.borrow().amount)
    }

    /// Whether an extract of exactly `amount` of the pair would succeed.
    pub fn can_extract(&self, resource: &K, metadata: &Metadata, amount: u64) -> bool {
        amount > 0 && self.try_extract(resource, metadata, amount) == amount
    }

    /// Removes up to `amount` of the pair. Returns 0 when empty or holding
    /// a different pair. Removing the last unit resets the slot to empty
    /// (resource and metadata clear together, never separately).
    pub fn extract(
        &self,
        resource: &K,
        metadata: &Metadata,
        amount: u64,
        tx: Option<&mut Transaction<'_>>,
    ) -> u64 {
        let removed = self.try_extract(resource, metadata, amount);
        self.finish_extract(removed, tx)
    }

    /// Removes up to `amount` of the kind, whatever metadata it carries.
    pub fn extract_kind(
        &self,
        resource: &K,
        amount: u64,
        tx: Option<&mut Transaction<'_>>,
    ) -> u64 {
        let removed = self.try_extract_kind(resource, amount);
        self.finish_extract(removed, tx)
    }

    /// Removes up to `amount` regardless of what is held.
    pub fn extract_any(&self, amount: u64, tx: Option<&mut Transaction<'_>>) -> u64 {
        let removed = self.try_extract_any(amount);
        self.finish_extract(removed, tx)
    }

    fn finish_extract(&self, removed: u64, tx: Option<&mut Transaction<'_>>) -> u64 {
        if removed == 0 {
            return 0;
        }
        if let Some(tx) = tx {
            tx.enlist(self.participant());
        }
        let mut inner = self.inner.borrow_mut();
        inner.amount -= removed;
        if inner.amount == 0 {
            inner.set_empty();
        }
        inner.modifications += 1;
        debug_assert!(inner.is_sane());
        removed
    }

    // Raw access

    /// Unconditional override for synchronization and testing. Bypasses the
    /// filter and the transaction log, and does NOT advance the modification
    /// counter - that is the caller's responsibility (see
    /// [`mark_modified`](Self::mark_modified)). Not a normal mutation path.
    pub fn set(&self, resource: Option<K>, metadata: Metadata, amount: u64) {
        let mut inner = self.inner.borrow_mut();
        inner.resource = resource;
        inner.metadata = metadata;
        inner.amount = amount;
        debug_assert!(inner.is_sane());
    }

    // Serialization

    /// Persists the slot as `(raw id, metadata, amount)`. An empty slot
    /// writes the reserved [`RawId::NONE`] sentinel and amount 0.
    ///
    /// Panics if the held resource was never registered - persisting an
    /// unregistered kind is a programming error.
    pub fn write_tag(&self, registry: &ResourceRegistry<K>, writer: &mut ByteWriter) {
        let inner = self.inner.borrow();
        match &inner.resource {
            Some(resource) => {
                let id = registry
                    .id_of(resource)
                    .expect("held resource is not in the registry");
                writer.write_var_u32(id.0);
                inner.metadata.ser(writer);
                writer.write_var_u64(inner.amount);
            }
            None => {
                writer.write_var_u32(RawId::NONE.0);
                Metadata::empty().ser(writer);
                writer.write_var_u64(0);
            }
        }
    }

    /// Restores the slot from its tag. Does not advance the modification
    /// counter.
    pub fn read_tag(
        &self,
        registry: &ResourceRegistry<K>,
        reader: &mut ByteReader,
    ) -> Result<(), SerdeErr> {
        let raw = reader.read_var_u32()?;
        let metadata = Metadata::de(reader)?;
        let amount = reader.read_var_u64()?;
        let mut inner = self.inner.borrow_mut();
        if raw == RawId::NONE.0 {
            inner.set_empty();
        } else {
            let resource = registry.get(RawId(raw)).ok_or(SerdeErr::UnknownId(raw))?;
            // reject shapes that would break the slot invariants before
            // touching any field
            if amount == 0 || amount > inner.effective_capacity_for(resource) {
                return Err(SerdeErr::InvalidValue("tag amount"));
            }
            inner.resource = Some(resource.clone());
            inner.metadata = metadata;
            inner.amount = amount;
        }
        debug_assert!(inner.is_sane());
        Ok(())
    }

    /// Sync wire form: amount first, then the pair only when non-empty.
    pub fn write_packet(&self, registry: &ResourceRegistry<K>, writer: &mut ByteWriter) {
        let inner = self.inner.borrow();
        writer.write_var_u64(inner.amount);
        if inner.amount > 0 {
            let resource = inner.resource.as_ref().expect("amount without a resource");
            let id = registry
                .id_of(resource)
                .expect("held resource is not in the registry");
            writer.write_var_u32(id.0);
            inner.metadata.ser(writer);
        }
    }

    /// Applies an incoming sync packet. Does not advance the modification
    /// counter; the receiving sync field does that.
    pub fn read_packet(
        &self,
        registry: &ResourceRegistry<K>,
        reader: &mut ByteReader,
    ) -> Result<(), SerdeErr> {
        let amount = reader.read_var_u64()?;
        if amount == 0 {
            let mut inner = self.inner.borrow_mut();
            inner.set_empty();
            return Ok(());
        }
        let raw = reader.read_var_u32()?;
        let resource = registry
            .get(RawId(raw))
            .ok_or(SerdeErr::UnknownId(raw))?
            .clone();
        let metadata = Metadata::de(reader)?;
        let mut inner = self.inner.borrow_mut();
        if amount > inner.effective_capacity_for(&resource) {
            return Err(SerdeErr::InvalidValue("packet amount"));
        }
        inner.resource = Some(resource);
        inner.metadata = metadata;
        inner.amount = amount;
        debug_assert!(inner.is_sane());
        Ok(())
    }

    fn participant(&self) -> Rc<dyn TransactionParticipant> {
        self.inner.clone()
    }

    /// Identity of the underlying ledger, for callers that need to tell two
    /// handles to the same slot apart from two separate slots.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
