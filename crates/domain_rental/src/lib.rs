//! Rental Domain - Contract Lifecycle and Billing Orchestration
//!
//! This crate owns the hardest part of the system: the rental-contract state
//! machine, the invoice/payment workflow attached to each lifecycle stage,
//! and the conflict arbitration between overlapping reservations on the same
//! physical vehicle. Every state-changing operation runs inside exactly one
//! store transaction; any error rolls the whole operation back and
//! propagates unmodified.

pub mod checklist;
pub mod conflict;
pub mod contract;
pub mod notify;
pub mod party;
pub mod payments;
pub mod ports;
pub mod services;
pub mod sweeps;
pub mod vehicle;

pub use checklist::{Checklist, ChecklistItem, ChecklistKind};
pub use conflict::{conflicts_with, CONFLICT_BUFFER_DAYS};
pub use contract::{ContractStatus, RentalContract};
pub use party::{Customer, Staff};
pub use payments::{CreateInvoiceRequest, InvoiceService, NewInvoiceItem};
pub use ports::{ContractQuery, Page, PaymentLink, RentalStore, RentalTx};
pub use services::{
    CreateContractRequest, HandoverRequest, RentalContractService, ResolutionOption,
    VerifyDecision,
};
pub use sweeps::spawn_daily_sweeps;
pub use vehicle::{Vehicle, VehicleModel, VehicleStatus};
