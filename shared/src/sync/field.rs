use std::cell::RefCell;
use std::rc::Rc;

use machina_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

use crate::resource::{Metadata, ResourceKind, ResourceRegistry};
use crate::storage::aggregate::StorageAggregate;
use crate::storage::slot::ResourceSlot;

/// One unit of state tracked for delta synchronization.
///
/// A field owns the "last acknowledged" copy it diffs against; that copy is
/// sync bookkeeping, never part of the authoritative model. All mutation of
/// the underlying state must flow through the registered accessors - a write
/// that bypasses them silently desyncs.
pub trait SyncField {
    /// Whether the current value differs from the last acknowledged copy,
    /// by this field's own equality rule.
    fn has_changed(&self) -> bool;

    /// Encode the current value, self-contained. Used for full frames and
    /// resync baselines.
    fn write(&self, writer: &mut ByteWriter);

    /// Encode only what changed since the last acknowledged copy. Defaults
    /// to the full encoding; compound fields override.
    fn write_delta(&self, writer: &mut ByteWriter) {
        self.write(writer);
    }

    /// Copy the current value into the last-acknowledged slot.
    fn acknowledge(&mut self);

    /// Decode a full encoding and apply it (receiving side).
    fn apply(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr>;

    /// Decode a delta encoding and apply it. Defaults to the full decode.
    fn apply_delta(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        self.apply(reader)
    }
}

/// A field-mutable scalar synchronized through a getter/setter pair.
/// Scalars compare by value.
pub struct ScalarField<T: Serde> {
    get: Box<dyn Fn() -> T>,
    set: Box<dyn FnMut(T)>,
    last: T,
}

impl<T: Serde> ScalarField<T> {
    /// The last-acknowledged copy is seeded from the getter at registration
    /// time.
    pub fn new(get: impl Fn() -> T + 'static, set: impl FnMut(T) + 'static) -> Self {
        let last = get();
        Self {
            get: Box::new(get),
            set: Box::new(set),
            last,
        }
    }
}

impl<T: Serde + 'static> SyncField for ScalarField<T> {
    fn has_changed(&self) -> bool {
        (self.get)() != self.last
    }

    fn write(&self, writer: &mut ByteWriter) {
        (self.get)().ser(writer);
    }

    fn acknowledge(&mut self) {
        self.last = (self.get)();
    }

    fn apply(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        let value = T::de(reader)?;
        self.last = value.clone();
        (self.set)(value);
        Ok(())
    }
}

/// A single slot as one sync field. Slots compare by their
/// (resource, metadata, amount) triple, not by modification counter, so a
/// counter bump with no visible change sends nothing.
pub struct SlotField<K: ResourceKind> {
    slot: ResourceSlot<K>,
    registry: Rc<ResourceRegistry<K>>,
    last: (Option<K>, Metadata, u64),
}

impl<K: ResourceKind> SlotField<K> {
    pub fn new(slot: &ResourceSlot<K>, registry: Rc<ResourceRegistry<K>>) -> Self {
        let last = slot.contents();
        Self {
            slot: slot.clone(),
            registry,
            last,
        }
    }
}

impl<K: ResourceKind> SyncField for SlotField<K> {
    fn has_changed(&self) -> bool {
        self.slot.contents() != self.last
    }

    fn write(&self, writer: &mut ByteWriter) {
        self.slot.write_packet(&self.registry, writer);
    }

    fn acknowledge(&mut self) {
        self.last = self.slot.contents();
    }

    fn apply(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        self.slot.read_packet(&self.registry, reader)?;
        // raw slot writes leave the counter to the caller
        self.slot.mark_modified();
        Ok(())
    }
}

/// A whole aggregate as one sync field. Change detection is per-slot
/// modification counters; the delta encoding addresses only the slots that
/// moved, collapsing to the full body when every slot did.
pub struct StorageField<K: ResourceKind> {
    storage: StorageAggregate<K>,
    registry: Rc<ResourceRegistry<K>>,
    last: Vec<u64>,
}

impl<K: ResourceKind> StorageField<K> {
    pub fn new(storage: &StorageAggregate<K>, registry: Rc<ResourceRegistry<K>>) -> Self {
        let last = Self::counters(storage);
        Self {
            storage: storage.clone(),
            registry,
            last,
        }
    }

    fn counters(storage: &StorageAggregate<K>) -> Vec<u64> {
        storage
            .slots()
            .iter()
            .map(ResourceSlot::modifications)
            .collect()
    }

    fn changed_indices(&self) -> Vec<usize> {
        self.storage
            .slots()
            .iter()
            .enumerate()
            .filter(|(i, slot)| slot.modifications() != self.last[*i])
            .map(|(i, _)| i)
            .collect()
    }
}

impl<K: ResourceKind> SyncField for StorageField<K> {
    fn has_changed(&self) -> bool {
        self.storage
            .slots()
            .iter()
            .zip(&self.last)
            .any(|(slot, last)| slot.modifications() != *last)
    }

    fn write(&self, writer: &mut ByteWriter) {
        self.storage.write_packet(&self.registry, writer);
    }

    fn write_delta(&self, writer: &mut ByteWriter) {
        let changed = self.changed_indices();
        writer.write_var_u32(changed.len() as u32);

        // all slots changed: the full body is cheaper than indexed entries
        if changed.len() == self.storage.len() {
            self.storage.write_packet(&self.registry, writer);
            return;
        }

        for index in changed {
            writer.write_var_u32(index as u32);
            self.storage.slot(index).write_packet(&self.registry, writer);
        }
    }

    fn acknowledge(&mut self) {
        self.last = Self::counters(&self.storage);
    }

    fn apply(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        self.storage.read_packet(&self.registry, reader)?;
        for slot in self.storage.slots() {
            slot.mark_modified();
        }
        Ok(())
    }

    fn apply_delta(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        let count = reader.read_var_u32()? as usize;
        if count == self.storage.len() {
            return self.apply(reader);
        }
        for _ in 0..count {
            let index = reader.read_var_u32()? as usize;
            if index >= self.storage.len() {
                return Err(SerdeErr::InvalidValue("slot index"));
            }
            let slot = self.storage.slot(index);
            slot.read_packet(&self.registry, reader)?;
            slot.mark_modified();
        }
        Ok(())
    }
}

/// A row of boolean flags (per-face toggles and the like) packed
/// `ceil(n/8)` bytes instead of one field per flag. Bit `j` of byte `i`
/// carries flag `i*8 + j`.
pub struct BitsField {
    source: Rc<RefCell<Vec<bool>>>,
    last: Vec<bool>,
}

impl BitsField {
    pub fn new(source: Rc<RefCell<Vec<bool>>>) -> Self {
        let last = source.borrow().clone();
        Self { source, last }
    }
}

impl SyncField for BitsField {
    fn has_changed(&self) -> bool {
        *self.source.borrow() != self.last
    }

    fn write(&self, writer: &mut ByteWriter) {
        let flags = self.source.borrow();
        let bytes = flags.len().div_ceil(8);
        for i in 0..bytes {
            let mut byte = 0u8;
            for j in 0..8 {
                let index = i * 8 + j;
                if index < flags.len() && flags[index] {
                    byte |= 1 << j;
                }
            }
            writer.write_u8(byte);
        }
    }

    fn acknowledge(&mut self) {
        self.last = self.source.borrow().clone();
    }

    fn apply(&mut self, reader: &mut ByteReader) -> Result<(), SerdeErr> {
        let mut flags = self.source.borrow_mut();
        let bytes = flags.len().div_ceil(8);
        for i in 0..bytes {
            let byte = reader.read_u8()?;
            for j in 0..8 {
                let index = i * 8 + j;
                if index < flags.len() {
                    flags[index] = byte & (1 << j) != 0;
                }
            }
        }
        Ok(())
    }
}
