//! Layered error definitions
//!
//! Categorized by source: config / hal / queue / memory

use thiserror::Error;

/// Unified contract error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== HAL Errors =====
    /// HAL call returned a non-OK status where OK was required
    #[error("hal call '{operation}' failed: {source}")]
    Hal {
        operation: String,
        #[source]
        source: crate::HalError,
    },

    // ===== Transport Errors =====
    /// Event queue closed by the other side
    #[error("event queue closed")]
    QueueClosed,

    /// Shared memory access outside the region
    #[error("shared memory access out of bounds: offset={offset}, len={len}, size={size}")]
    MemoryOutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create HAL call error
    pub fn hal(operation: impl Into<String>, source: crate::HalError) -> Self {
        Self::Hal {
            operation: operation.into(),
            source,
        }
    }
}
