//! Billing Domain - Rental Invoices and Deposits
//!
//! Each rental contract owns up to four invoice kinds tied to its lifecycle
//! stages: Handover and Reservation are created together at contract
//! creation, Return and Refund on demand. A refundable Deposit is held 1:1
//! against the Handover invoice.
//!
//! The amount-due formula is deliberately asymmetric (see [`fees`]): the
//! invoice subtotal excludes LateReturn and Refund items, which the formula
//! then layers back on top, and the refund subtraction is floored at zero.

pub mod deposit;
pub mod fees;
pub mod invoice;

pub use deposit::{Deposit, DepositStatus};
pub use fees::{amount_due, invoice_subtotal};
pub use invoice::{Invoice, InvoiceItem, InvoiceItemKind, InvoiceKind, InvoiceStatus, PaymentMethod};
