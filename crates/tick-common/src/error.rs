use thiserror::Error;

/// Tick generation errors covering clock access, range, parsing, and configuration failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TickError {
    /// The platform clock could not produce a reading.
    ///
    /// Fatal for the caller: no tick is issued and the generator state is
    /// left untouched.
    #[error("clock unavailable: {0}")]
    ClockUnavailable(String),

    /// A tick computation would leave the signed 64-bit range.
    #[error("tick out of range: {0}")]
    OutOfRange(String),

    /// A civil timestamp could not be parsed or represented.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Configuration or initialization error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for tick operations.
pub type TickResult<T> = Result<T, TickError>;
