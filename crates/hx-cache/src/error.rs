use thiserror::Error;

/// Errors surfaced by a shared cache implementation.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Cache connection could not be established within the retry budget.
    /// Fatal at startup.
    #[error("Cache connection error: {0}")]
    Connection(String),

    /// A read or write failed after the connection was established.
    #[error("Cache operation failed: {0}")]
    Operation(String),
}
