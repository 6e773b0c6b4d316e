pub mod aggregate;
pub mod exposed;
pub mod slot;
pub mod transfer;
