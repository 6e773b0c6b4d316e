pub mod field;
pub mod session;
