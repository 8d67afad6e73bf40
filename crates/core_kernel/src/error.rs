//! The unified domain error taxonomy
//!
//! Every state-changing operation returns this error type and propagates it
//! unmodified: no wrapping, no swallowing of primary errors.

use thiserror::Error;

use crate::money::MoneyError;
use crate::ports::PortError;
use crate::temporal::TemporalError;

/// Domain error taxonomy shared by all rental and billing operations
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input: insufficient payment, missing field, invalid target status
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Valid input that violates a domain rule
    #[error("Business rule violation: {0}")]
    Business(String),

    /// Station or ownership permission failure
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Missing or malformed configuration; fatal, never a business condition
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An external collaborator (gateway, email, storage) failed
    #[error("External service error: {0}")]
    External(String),
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        DomainError::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        DomainError::BadRequest(message.into())
    }

    pub fn business(message: impl Into<String>) -> Self {
        DomainError::Business(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        DomainError::Forbidden(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        DomainError::Configuration(message.into())
    }
}

impl From<MoneyError> for DomainError {
    fn from(err: MoneyError) -> Self {
        DomainError::BadRequest(err.to_string())
    }
}

impl From<TemporalError> for DomainError {
    fn from(err: TemporalError) -> Self {
        DomainError::BadRequest(err.to_string())
    }
}

impl From<PortError> for DomainError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { .. } => DomainError::NotFound(err.to_string()),
            other => DomainError::External(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_not_found_maps_to_not_found() {
        let err: DomainError = PortError::not_found("Invoice", "INV-1").into();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn test_port_connection_maps_to_external() {
        let err: DomainError = PortError::connection("gateway unreachable").into();
        assert!(matches!(err, DomainError::External(_)));
    }
}
