//! Mock HAL error types

use thiserror::Error;

/// Mock HAL specific error
#[derive(Debug, Error)]
pub enum MockHalError {
    /// Fault name not recognized
    #[error("unknown fault '{0}', expected one of: {names}", names = crate::MockFault::ALL.map(|f| f.name()).join(", "))]
    UnknownFault(String),

    /// Delivery thread could not be started
    #[error("failed to spawn delivery thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result alias
pub type Result<T> = std::result::Result<T, MockHalError>;
