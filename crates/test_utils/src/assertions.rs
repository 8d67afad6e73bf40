//! Custom assertion helpers for domain errors

use core_kernel::DomainError;

/// Asserts the result failed with a Business error and returns its message
pub fn assert_business<T: std::fmt::Debug>(result: Result<T, DomainError>) -> String {
    match result {
        Err(DomainError::Business(message)) => message,
        other => panic!("expected a business error, got {:?}", other),
    }
}

/// Asserts the result failed with a BadRequest error and returns its message
pub fn assert_bad_request<T: std::fmt::Debug>(result: Result<T, DomainError>) -> String {
    match result {
        Err(DomainError::BadRequest(message)) => message,
        other => panic!("expected a bad-request error, got {:?}", other),
    }
}

/// Asserts the result failed with a Forbidden error
pub fn assert_forbidden<T: std::fmt::Debug>(result: Result<T, DomainError>) {
    match result {
        Err(DomainError::Forbidden(_)) => {}
        other => panic!("expected a forbidden error, got {:?}", other),
    }
}

/// Asserts the result failed with a NotFound error
pub fn assert_not_found<T: std::fmt::Debug>(result: Result<T, DomainError>) {
    match result {
        Err(DomainError::NotFound(_)) => {}
        other => panic!("expected a not-found error, got {:?}", other),
    }
}
