use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::hash::Hash;

use log::debug;

use machina_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

/// A kind of storable resource: a discrete item type, a fluid type, an
/// energy unit. Implemented by the host per resource family.
pub trait ResourceKind: Clone + Eq + Hash + Debug + 'static {
    /// Kind-declared maximum amount a single slot may hold of this resource,
    /// if the kind caps itself below the slot's own capacity.
    fn declared_capacity(&self) -> Option<u64> {
        None
    }

    /// Human-readable name, for host UIs and diagnostics.
    fn display_name(&self) -> &str;
}

/// Predicate governing what a slot will accept. Advisory at insertion time
/// only: a slot may legally keep holding a value that would now fail its
/// own filter.
pub type ResourceFilter<K> = Box<dyn Fn(&K, &Metadata) -> bool>;

/// A filter that accepts every resource.
pub fn accept_all<K: ResourceKind>() -> ResourceFilter<K> {
    Box::new(|_, _| true)
}

/// A filter that accepts only the given kind, with any metadata.
pub fn accept_only<K: ResourceKind>(kind: K) -> ResourceFilter<K> {
    Box::new(move |candidate, _| *candidate == kind)
}

/// Opaque, structurally comparable data attached to a stored resource beyond
/// its kind. Empty metadata and "no metadata" are the same thing for match
/// purposes; only the serialization boundary distinguishes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: BTreeMap<String, Vec<u8>>,
}

impl Metadata {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }
}

impl Serde for Metadata {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_var_u32(self.entries.len() as u32);
        for (key, value) in &self.entries {
            key.ser(writer);
            value.ser(writer);
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let len = reader.read_var_u32()?;
        let mut entries = BTreeMap::new();
        for _ in 0..len {
            let key = String::de(reader)?;
            let value = Vec::<u8>::de(reader)?;
            entries.insert(key, value);
        }
        Ok(Self { entries })
    }
}

/// Registry-assigned dense id used at the serialization boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawId(pub u32);

impl RawId {
    /// Reserved sentinel encoding "no resource" in the tag format.
    pub const NONE: RawId = RawId(u32::MAX);
}

/// Maps resource kinds to stable raw ids and back. An explicit object handed
/// to machine construction; never ambient global state. Only the tag and
/// wire codecs consult it.
pub struct ResourceRegistry<K: ResourceKind> {
    entries: Vec<K>,
    ids: HashMap<K, RawId>,
}

impl<K: ResourceKind> ResourceRegistry<K> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            ids: HashMap::new(),
        }
    }

    /// Registers a kind, returning its id. Re-registering returns the
    /// existing id unchanged.
    pub fn register(&mut self, kind: K) -> RawId {
        if let Some(id) = self.ids.get(&kind) {
            debug!("resource {:?} already registered", kind);
            return *id;
        }
        let id = RawId(self.entries.len() as u32);
        assert!(id != RawId::NONE, "resource registry is full");
        self.ids.insert(kind.clone(), id);
        self.entries.push(kind);
        id
    }

    pub fn id_of(&self, kind: &K) -> Option<RawId> {
        self.ids.get(kind).copied()
    }

    pub fn get(&self, id: RawId) -> Option<&K> {
        self.entries.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: ResourceKind> Default for ResourceRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}
