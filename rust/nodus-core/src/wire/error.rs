// Format errors - everything that can be wrong with bytes or strings received from outside

/// Malformed input rejected at a decoding boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("Unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("Length {len} exceeds maximum {max}")]
    TooLong { len: u64, max: u64 },

    #[error("Invalid UTF-8 string")]
    InvalidUtf8,

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
}
