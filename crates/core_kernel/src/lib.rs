//! Core Kernel - Foundational types for the vehicle-rental system
//!
//! This crate provides the building blocks shared by every domain module:
//! - Money and rate types with precise decimal arithmetic
//! - Rental-period temporal math (overlap tests, day/hour rounding)
//! - Strongly-typed identifiers
//! - The unified domain error taxonomy
//! - The cached business-variable configuration snapshot
//! - Port traits for external collaborators (payment gateway, email, storage)

pub mod actor;
pub mod config;
pub mod error;
pub mod identifiers;
pub mod money;
pub mod ports;
pub mod temporal;

pub use actor::{ActingIdentity, ActorRole};
pub use config::{BusinessVariableKey, BusinessVariableSource, BusinessVariables, VariableCache};
pub use error::DomainError;
pub use identifiers::{
    ChecklistId, ChecklistItemId, ContractId, CustomerId, DepositId, InvoiceId, InvoiceItemId,
    PaymentLinkId, StaffId, StationId, VehicleId, VehicleModelId,
};
pub use money::{Currency, Money, MoneyError, Rate};
pub use ports::{
    render_template, GatewayCallbackResult, GatewayPaymentRequest, GatewayRedirect,
    NotificationSender, ObjectStorage, PaymentGateway, PortError, StoredObject,
};
pub use temporal::{ceil_days, ceil_hours, late_hours, RentalPeriod, TemporalError};
