//! Crate-wide error type.
//! Only configuration problems and device setup are real failures; the
//! acquisition path reports "not yet" through its own result type.

use thiserror::Error;

pub type ScopeResult<T> = Result<T, ScopeError>;

#[derive(Error, Debug)]
pub enum ScopeError {
    /// Ring capacity is zero or not a power of two.
    #[error("ring capacity must be a non-zero power of two, got {0}")]
    InvalidCapacity(usize),

    /// Bulk read outside the retained window (usually evicted data).
    #[error("requested range [{start}, {end}) is out of bounds")]
    OutOfBounds { start: u64, end: u64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Audio device lookup, stream construction or start failed.
    #[error("audio device error: {0}")]
    Device(String),
}
