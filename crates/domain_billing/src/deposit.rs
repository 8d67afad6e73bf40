//! Deposit held against a Handover invoice

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{DepositId, DomainError, InvoiceId, Money};

/// Lifecycle of a deposit hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepositStatus {
    Pending,
    Refunded,
    Forfeited,
}

/// A refundable hold tied 1:1 to a Handover invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deposit {
    pub id: DepositId,
    pub invoice_id: InvoiceId,
    pub amount: Money,
    pub status: DepositStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deposit {
    pub fn new(invoice_id: InvoiceId, amount: Money) -> Self {
        let now = Utc::now();
        Self {
            id: DepositId::new_v7(),
            invoice_id,
            amount,
            status: DepositStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == DepositStatus::Pending
    }

    /// Releases the deposit back to the customer
    pub fn refund(&mut self) -> Result<(), DomainError> {
        self.transition(DepositStatus::Refunded)
    }

    /// Keeps the deposit after a policy violation
    pub fn forfeit(&mut self) -> Result<(), DomainError> {
        self.transition(DepositStatus::Forfeited)
    }

    fn transition(&mut self, to: DepositStatus) -> Result<(), DomainError> {
        if !self.is_pending() {
            return Err(DomainError::business(format!(
                "deposit {} is already {:?}",
                self.id, self.status
            )));
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}
