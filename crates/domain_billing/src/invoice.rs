//! Invoice and invoice-item entities

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ChecklistItemId, ContractId, DomainError, InvoiceId, InvoiceItemId, Money, Rate};

/// The four invoice kinds tied to contract lifecycle stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceKind {
    Handover,
    Reservation,
    Return,
    Refund,
}

/// Invoice settlement status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Cancelled,
}

/// How an invoice was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    OnlineWallet,
}

/// Kinds of invoice line items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceItemKind {
    BaseRental,
    Other,
    LateReturn,
    Cleaning,
    Damage,
    Refund,
}

/// A line item on an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: InvoiceItemId,
    pub invoice_id: InvoiceId,
    pub kind: InvoiceItemKind,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Money,
    /// Damage provenance: the checklist item that recorded the damage
    pub checklist_item_id: Option<ChecklistItemId>,
}

impl InvoiceItem {
    pub fn new(
        invoice_id: InvoiceId,
        kind: InvoiceItemKind,
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Money,
    ) -> Self {
        Self {
            id: InvoiceItemId::new_v7(),
            invoice_id,
            kind,
            description: description.into(),
            quantity,
            unit_price,
            checklist_item_id: None,
        }
    }

    /// Links the item to the checklist entry that produced it
    pub fn with_checklist_item(mut self, checklist_item_id: ChecklistItemId) -> Self {
        self.checklist_item_id = Some(checklist_item_id);
        self
    }

    /// quantity x unit price
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A financial document tied to one contract lifecycle stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub contract_id: ContractId,
    pub kind: InvoiceKind,
    pub status: InvoiceStatus,
    pub subtotal: Money,
    pub tax_rate: Rate,
    pub paid_amount: Option<Money>,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn new(contract_id: ContractId, kind: InvoiceKind, subtotal: Money, tax_rate: Rate) -> Self {
        let now = Utc::now();
        Self {
            id: InvoiceId::new_v7(),
            contract_id,
            kind,
            status: InvoiceStatus::Pending,
            subtotal,
            tax_rate,
            paid_amount: None,
            paid_at: None,
            payment_method: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == InvoiceStatus::Pending
    }

    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }

    /// Settles the invoice
    ///
    /// # Errors
    ///
    /// Business error if the invoice is not Pending.
    pub fn mark_paid(
        &mut self,
        amount: Money,
        paid_at: DateTime<Utc>,
        method: Option<PaymentMethod>,
    ) -> Result<(), DomainError> {
        if !self.is_pending() {
            return Err(DomainError::business(format!(
                "invoice {} is already settled",
                self.id
            )));
        }
        self.status = InvoiceStatus::Paid;
        self.paid_amount = Some(amount);
        self.paid_at = Some(paid_at);
        self.payment_method = method;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Voids a pending invoice
    ///
    /// # Errors
    ///
    /// Business error if the invoice is not Pending.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        if !self.is_pending() {
            return Err(DomainError::business(format!(
                "only pending invoices can be cancelled, invoice {} is {:?}",
                self.id, self.status
            )));
        }
        self.status = InvoiceStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Appends to the invoice notes; notes are never rewritten
    pub fn append_note(&mut self, note: &str) {
        match &mut self.notes {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(note);
            }
            None => self.notes = Some(note.to_string()),
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn pending_invoice() -> Invoice {
        Invoice::new(
            ContractId::new(),
            InvoiceKind::Handover,
            Money::new(dec!(100), Currency::USD),
            Rate::new(dec!(0.1)),
        )
    }

    #[test]
    fn test_mark_paid_stamps_payment_fields() {
        let mut invoice = pending_invoice();
        let paid = Money::new(dec!(210), Currency::USD);

        invoice
            .mark_paid(paid, Utc::now(), Some(PaymentMethod::Cash))
            .unwrap();

        assert!(invoice.is_paid());
        assert_eq!(invoice.paid_amount, Some(paid));
        assert_eq!(invoice.payment_method, Some(PaymentMethod::Cash));
        assert!(invoice.paid_at.is_some());
    }

    #[test]
    fn test_settled_invoice_cannot_be_paid_again() {
        let mut invoice = pending_invoice();
        let paid = Money::new(dec!(210), Currency::USD);
        invoice.mark_paid(paid, Utc::now(), None).unwrap();

        let second = invoice.mark_paid(paid, Utc::now(), None);
        assert!(matches!(second, Err(DomainError::Business(_))));
    }

    #[test]
    fn test_cancel_requires_pending() {
        let mut invoice = pending_invoice();
        invoice.cancel().unwrap();
        assert!(matches!(invoice.cancel(), Err(DomainError::Business(_))));
    }

    #[test]
    fn test_notes_are_append_only() {
        let mut invoice = pending_invoice();
        invoice.append_note("first");
        invoice.append_note("second");
        assert_eq!(invoice.notes.as_deref(), Some("first\nsecond"));
    }
}
