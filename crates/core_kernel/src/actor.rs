//! Acting identity
//!
//! State-changing operations receive the acting user explicitly instead of
//! reading an ambient authentication context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of the acting user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorRole {
    Customer,
    Staff,
    Admin,
}

/// The resolved identity performing an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingIdentity {
    pub actor_id: Uuid,
    pub role: ActorRole,
}

impl ActingIdentity {
    pub fn new(actor_id: Uuid, role: ActorRole) -> Self {
        Self { actor_id, role }
    }

    pub fn customer(actor_id: Uuid) -> Self {
        Self::new(actor_id, ActorRole::Customer)
    }

    pub fn staff(actor_id: Uuid) -> Self {
        Self::new(actor_id, ActorRole::Staff)
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, ActorRole::Staff | ActorRole::Admin)
    }

    pub fn is_customer(&self) -> bool {
        matches!(self.role, ActorRole::Customer)
    }
}
