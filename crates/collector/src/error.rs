//! Collector error types

use contracts::HalError;
use thiserror::Error;

/// Collector error
#[derive(Debug, Error)]
pub enum CollectorError {
    /// HAL rejected the event queue
    #[error("hal initialize failed: {0}")]
    Initialize(#[source] HalError),

    /// Session already torn down
    #[error("session is closed")]
    SessionClosed,

    /// Reader thread could not be started
    #[error("failed to spawn event reader thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Collector Result type alias
pub type Result<T> = std::result::Result<T, CollectorError>;
