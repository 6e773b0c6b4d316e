//! # Machina Serde
//! Byte-level serialization used by the machina storage & sync protocol.
//!
//! Everything here is byte-framed: the wire format addresses fields with
//! single index bytes and packs fine-grained boolean state into whole bytes,
//! so there is no sub-byte bit cursor.

mod error;
mod reader;
mod serde;
mod writer;

pub use error::SerdeErr;
pub use reader::ByteReader;
pub use serde::Serde;
pub use writer::ByteWriter;
