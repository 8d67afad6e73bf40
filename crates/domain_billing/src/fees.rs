//! Fee computation for invoices
//!
//! The amount-due formula is reproduced exactly as the business defined it,
//! asymmetries included:
//!
//! ```text
//! total = subtotal
//!       + subtotal x taxRate
//!       + (Handover ? depositAmount : 0)
//!       + (Return   ? sum of LateReturn items : 0)
//!       - (Refund   ? sum of Refund items : 0)   // floored at zero
//! ```
//!
//! The subtotal sums every item except LateReturn and Refund kinds; those
//! two are layered on again by the formula above. Do not "correct" either
//! rule without sign-off on the underlying business rule.

use core_kernel::{Currency, DomainError, Money};

use crate::deposit::Deposit;
use crate::invoice::{Invoice, InvoiceItem, InvoiceItemKind, InvoiceKind};

/// Invoice subtotal: every item except LateReturn and Refund kinds
pub fn invoice_subtotal(
    currency: Currency,
    items: &[InvoiceItem],
) -> Result<Money, DomainError> {
    let mut subtotal = Money::zero(currency);
    for item in items {
        if matches!(
            item.kind,
            InvoiceItemKind::LateReturn | InvoiceItemKind::Refund
        ) {
            continue;
        }
        subtotal = subtotal.checked_add(&item.line_total())?;
    }
    Ok(subtotal)
}

/// Sum of the line totals of one item kind
fn items_total(
    currency: Currency,
    items: &[InvoiceItem],
    kind: InvoiceItemKind,
) -> Result<Money, DomainError> {
    let mut total = Money::zero(currency);
    for item in items.iter().filter(|i| i.kind == kind) {
        total = total.checked_add(&item.line_total())?;
    }
    Ok(total)
}

/// The required settlement amount for an invoice
///
/// Never negative: when the refund items exceed the pre-refund total, the
/// result is floored at zero.
pub fn amount_due(
    invoice: &Invoice,
    items: &[InvoiceItem],
    deposit: Option<&Deposit>,
) -> Result<Money, DomainError> {
    let currency = invoice.subtotal.currency();
    let tax = invoice.tax_rate.apply(&invoice.subtotal);
    let mut total = invoice.subtotal.checked_add(&tax)?;

    match invoice.kind {
        InvoiceKind::Handover => {
            if let Some(deposit) = deposit {
                total = total.checked_add(&deposit.amount)?;
            }
        }
        InvoiceKind::Return => {
            let late = items_total(currency, items, InvoiceItemKind::LateReturn)?;
            total = total.checked_add(&late)?;
        }
        InvoiceKind::Refund => {
            let refund = items_total(currency, items, InvoiceItemKind::Refund)?;
            total = total.saturating_sub(&refund)?;
        }
        InvoiceKind::Reservation => {}
    }

    Ok(total)
}
