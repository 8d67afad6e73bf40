//! Collaborator ports
//!
//! Port traits for the external systems the rental core talks to: the
//! payment gateway, the notification sender, and object storage. Adapters
//! implement these traits; tests substitute mocks.
//!
//! External calls are blocking I/O with no built-in retry. A failure inside
//! a transaction rolls back persisted state, but it cannot un-send an email
//! that was already delivered, so callers tolerate at-least-once
//! notifications.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

/// Error type for port operations
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested entity was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    /// The operation conflicts with existing data
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Connection to the underlying system failed
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// The external system rejected the request
    #[error("Rejected by {service}: {message}")]
    Rejected { service: String, message: String },

    /// An internal adapter error occurred
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PortError {
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
        }
    }

    pub fn rejected(service: impl Into<String>, message: impl Into<String>) -> Self {
        PortError::Rejected {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
        }
    }
}

/// Request to open a payment at the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPaymentRequest {
    pub amount: Money,
    pub order_id: String,
    pub description: String,
    pub fallback_url: String,
}

/// Redirect handed back by the gateway for an opened payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRedirect {
    pub redirect_url: String,
}

/// Verified contents of a gateway callback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCallbackResult {
    pub order_id: String,
    pub success: bool,
    pub amount: Money,
    pub paid_at: DateTime<Utc>,
    pub transaction_ref: String,
}

/// Payment-gateway collaborator
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a payment and returns the customer-facing redirect URL
    async fn create_payment(
        &self,
        request: GatewayPaymentRequest,
    ) -> Result<GatewayRedirect, PortError>;

    /// Verifies a raw callback payload and decodes its contents
    fn verify_callback(
        &self,
        payload: &serde_json::Value,
    ) -> Result<GatewayCallbackResult, PortError>;
}

/// Email notification collaborator
///
/// Templates are plain HTML with `{{placeholder}}` substitution performed
/// by the caller.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str)
        -> Result<(), PortError>;
}

/// A stored object reference returned by the storage collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
    pub url: String,
    pub storage_id: String,
}

/// Object-storage collaborator for payment-evidence images
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<StoredObject, PortError>;

    async fn delete(&self, storage_id: &str) -> Result<(), PortError>;
}

/// Fills `{{key}}` placeholders in an email template
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (key, value) in values {
        rendered = rendered.replace(&format!("{{{{{}}}}}", key), value);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_substitution_fills_all_placeholders() {
        let body = render_template(
            "<p>Hello {{name}}, your contract {{contract}} is ready.</p>",
            &[("name", "Ada"), ("contract", "CTR-1")],
        );
        assert_eq!(body, "<p>Hello Ada, your contract CTR-1 is ready.</p>");
    }

    #[test]
    fn test_unknown_placeholders_are_left_alone() {
        let body = render_template("{{a}} {{b}}", &[("a", "x")]);
        assert_eq!(body, "x {{b}}");
    }
}
