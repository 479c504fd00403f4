//! Error types for the RBAC enforcer

use thiserror::Error;

/// RBAC engine errors
///
/// The synced facade never creates, wraps or rewrites these; whatever the
/// engine returns is handed back to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RbacError {
    /// Malformed identifier, domain or permission tuple
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Referenced subject does not exist in the model
    #[error("Not found: {0}")]
    NotFound(String),

    /// Model configuration does not support the requested operation
    #[error("Model error: {0}")]
    Model(String),

    /// Configuration could not be read, parsed or validated
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type for RBAC operations
pub type Result<T> = std::result::Result<T, RbacError>;

impl From<toml::de::Error> for RbacError {
    fn from(e: toml::de::Error) -> Self {
        RbacError::Config(e.to_string())
    }
}
