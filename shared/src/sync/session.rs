use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use machina_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

use crate::resource::{ResourceKind, ResourceRegistry};
use crate::storage::aggregate::StorageAggregate;
use crate::storage::slot::ResourceSlot;
use crate::sync::field::{BitsField, ScalarField, SlotField, StorageField, SyncField};

const FRAME_FULL: u8 = 0;
const FRAME_SPARSE: u8 = 1;

/// Sparse frames address fields with one index byte.
const MAX_FIELDS: usize = 255;

/// One observer's view of a machine's synchronizable state.
///
/// Both halves use the same type: the authoritative side registers fields
/// and calls [`sample`](Self::sample) once per tick, the observing side
/// registers the same fields in the same order and feeds frames to
/// [`apply`](Self::apply). Registration order is the wire order; the two
/// sides must match.
///
/// Sessions live for one open UI session and are dropped when it closes.
pub struct SyncSession {
    fields: Vec<Box<dyn SyncField>>,
}

impl SyncSession {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Registers a field. Panics past the per-session field limit - that is
    /// a screen-design error, not a runtime condition.
    pub fn register(&mut self, field: Box<dyn SyncField>) {
        assert!(
            self.fields.len() < MAX_FIELDS,
            "a session supports at most {} sync fields",
            MAX_FIELDS
        );
        debug!("sync session registered field {}", self.fields.len());
        self.fields.push(field);
    }

    pub fn register_scalar<T: Serde + 'static>(
        &mut self,
        get: impl Fn() -> T + 'static,
        set: impl FnMut(T) + 'static,
    ) {
        self.register(Box::new(ScalarField::new(get, set)));
    }

    pub fn register_slot<K: ResourceKind>(
        &mut self,
        slot: &ResourceSlot<K>,
        registry: Rc<ResourceRegistry<K>>,
    ) {
        self.register(Box::new(SlotField::new(slot, registry)));
    }

    pub fn register_storage<K: ResourceKind>(
        &mut self,
        storage: &StorageAggregate<K>,
        registry: Rc<ResourceRegistry<K>>,
    ) {
        self.register(Box::new(StorageField::new(storage, registry)));
    }

    pub fn register_bits(&mut self, source: Rc<RefCell<Vec<bool>>>) {
        self.register(Box::new(BitsField::new(source)));
    }

    /// Diffs every field against its last acknowledged value and assembles
    /// at most one frame: `None` when nothing changed, a full frame when
    /// everything did, a sparse frame otherwise. Every field actually sent
    /// is acknowledged immediately, so the next sample diffs against what
    /// just went out.
    pub fn sample(&mut self) -> Option<Vec<u8>> {
        let changed: Vec<usize> = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, field)| field.has_changed())
            .map(|(index, _)| index)
            .collect();

        if changed.is_empty() {
            return None;
        }

        let mut writer = ByteWriter::new();
        if changed.len() == self.fields.len() {
            writer.write_u8(FRAME_FULL);
            for field in &mut self.fields {
                field.write(&mut writer);
                field.acknowledge();
            }
        } else {
            writer.write_u8(FRAME_SPARSE);
            writer.write_u8(changed.len() as u8);
            for index in changed {
                let field = &mut self.fields[index];
                writer.write_u8(index as u8);
                field.write_delta(&mut writer);
                field.acknowledge();
            }
        }
        Some(writer.to_bytes())
    }

    /// The unconditional full payload a freshly opened session starts from.
    /// No mode byte: the receiver knows its first frame is the baseline.
    pub fn initial(&mut self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        for field in &mut self.fields {
            field.write(&mut writer);
            field.acknowledge();
        }
        writer.to_bytes()
    }

    /// Applies a sampled frame on the observing side. Sparse frames touch
    /// only the fields they address.
    pub fn apply(&mut self, frame: &[u8]) -> Result<(), SerdeErr> {
        let mut reader = ByteReader::new(frame);
        match reader.read_u8()? {
            FRAME_FULL => {
                for field in &mut self.fields {
                    field.apply(&mut reader)?;
                }
                Ok(())
            }
            FRAME_SPARSE => {
                let count = reader.read_u8()?;
                for _ in 0..count {
                    let index = reader.read_u8()? as usize;
                    let field = self
                        .fields
                        .get_mut(index)
                        .ok_or(SerdeErr::InvalidValue("sync field index"))?;
                    field.apply_delta(&mut reader)?;
                }
                Ok(())
            }
            _ => Err(SerdeErr::InvalidValue("sync frame mode")),
        }
    }

    /// Applies the session-open baseline payload.
    pub fn apply_initial(&mut self, payload: &[u8]) -> Result<(), SerdeErr> {
        let mut reader = ByteReader::new(payload);
        for field in &mut self.fields {
            field.apply(&mut reader)?;
        }
        Ok(())
    }
}

impl Default for SyncSession {
    fn default() -> Self {
        Self::new()
    }
}
