use thiserror::Error;

/// Errors that can occur while decoding incoming bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// Ran out of bytes mid-value
    #[error("unexpected end of buffer")]
    UnexpectedEnd,

    /// A decoded value was out of range for its type
    #[error("invalid value while decoding {0}")]
    InvalidValue(&'static str),

    /// A raw registry id with no registered resource behind it
    #[error("unknown raw id {0}")]
    UnknownId(u32),

    /// A string field that was not valid UTF-8
    #[error("invalid utf-8 in string field")]
    InvalidUtf8,
}
