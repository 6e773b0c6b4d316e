//! # Machina Shared
//! Transactional machine resource storage and delta menu synchronization,
//! shared between the authoritative (host) and observing (client) halves of
//! a machine UI session.
//!
//! The library is single-threaded cooperative: all slot, aggregate and
//! transaction operations for one machine happen on the host's simulation
//! step for that machine, and sync sampling happens synchronously once per
//! tick per open session.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use machina_serde::{ByteReader, ByteWriter, Serde, SerdeErr};

mod resource;
mod storage;
mod sync;
mod transaction;

pub use resource::{
    accept_all, accept_only, Metadata, RawId, ResourceFilter, ResourceKind, ResourceRegistry,
};
pub use storage::{
    aggregate::{StorageAggregate, StorageBuilder},
    exposed::{ExposedSlot, ExposedStorage},
    slot::ResourceSlot,
    transfer::{Accessor, ResourceFlow, TransferType},
};
pub use sync::{
    field::{BitsField, ScalarField, SlotField, StorageField, SyncField},
    session::SyncSession,
};
pub use transaction::{Transaction, TransactionParticipant};
