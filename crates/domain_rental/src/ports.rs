//! Persistence ports for the rental domain
//!
//! The store hands out transactions; every state-changing service operation
//! runs inside exactly one of them. A transaction is either committed or
//! rolled back as a whole, so partial writes never become visible.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{
    ChecklistItemId, ContractId, CustomerId, InvoiceId, Money, PaymentLinkId, PortError, StaffId,
    StationId, VehicleId, VehicleModelId,
};
use domain_billing::{Deposit, Invoice, InvoiceItem};

use crate::checklist::{Checklist, ChecklistKind};
use crate::contract::{ContractStatus, RentalContract};
use crate::party::{Customer, Staff};
use crate::vehicle::{Vehicle, VehicleModel};

/// A pending online payment, keyed by the gateway order id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLink {
    pub id: PaymentLinkId,
    pub invoice_id: InvoiceId,
    pub order_id: String,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}

impl PaymentLink {
    pub fn new(invoice_id: InvoiceId, order_id: impl Into<String>, amount: Money) -> Self {
        Self {
            id: PaymentLinkId::new_v7(),
            invoice_id,
            order_id: order_id.into(),
            amount,
            created_at: Utc::now(),
        }
    }
}

/// Filter for contract listings
#[derive(Debug, Clone, Default)]
pub struct ContractQuery {
    pub customer_id: Option<CustomerId>,
    pub vehicle_id: Option<VehicleId>,
    pub station_id: Option<StationId>,
    pub statuses: Option<Vec<ContractStatus>>,
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
}

impl ContractQuery {
    pub fn matches(&self, contract: &RentalContract) -> bool {
        if let Some(customer_id) = self.customer_id {
            if contract.customer_id != customer_id {
                return false;
            }
        }
        if let Some(vehicle_id) = self.vehicle_id {
            if contract.vehicle_id != Some(vehicle_id) {
                return false;
            }
        }
        if let Some(station_id) = self.station_id {
            if contract.station_id != station_id {
                return false;
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&contract.status) {
                return false;
            }
        }
        true
    }
}

/// One page of a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Hands out transactions over the rental store
#[async_trait]
pub trait RentalStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn RentalTx>, PortError>;
}

/// One unit of work over the rental store
///
/// Reads observe the transaction's own writes. `commit` and `rollback`
/// consume the transaction; dropping one without either is equivalent to a
/// rollback.
#[async_trait]
pub trait RentalTx: Send {
    // contracts
    async fn get_contract(&self, id: ContractId) -> Result<RentalContract, PortError>;
    async fn save_contract(&mut self, contract: &RentalContract) -> Result<(), PortError>;
    async fn find_contracts(&self, query: &ContractQuery)
        -> Result<Page<RentalContract>, PortError>;
    /// Non-terminal contracts of one customer
    async fn find_open_contracts_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<RentalContract>, PortError>;
    /// Non-terminal contracts bound to one vehicle
    async fn find_open_contracts_for_vehicle(
        &self,
        vehicle_id: VehicleId,
    ) -> Result<Vec<RentalContract>, PortError>;
    /// Non-terminal contracts in any of the given states, across all vehicles
    async fn find_contracts_in_statuses(
        &self,
        statuses: &[ContractStatus],
    ) -> Result<Vec<RentalContract>, PortError>;

    // vehicles
    async fn get_vehicle(&self, id: VehicleId) -> Result<Vehicle, PortError>;
    async fn save_vehicle(&mut self, vehicle: &Vehicle) -> Result<(), PortError>;
    async fn find_vehicles_by_model(
        &self,
        station_id: StationId,
        model_id: VehicleModelId,
    ) -> Result<Vec<Vehicle>, PortError>;
    async fn get_model(&self, id: VehicleModelId) -> Result<VehicleModel, PortError>;

    // parties
    async fn get_customer(&self, id: CustomerId) -> Result<Customer, PortError>;
    async fn get_staff(&self, id: StaffId) -> Result<Staff, PortError>;

    // checklists
    async fn find_checklist(
        &self,
        contract_id: ContractId,
        kind: ChecklistKind,
    ) -> Result<Option<Checklist>, PortError>;
    async fn get_checklist_item(
        &self,
        id: ChecklistItemId,
    ) -> Result<crate::checklist::ChecklistItem, PortError>;

    // invoices
    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError>;
    async fn save_invoice(&mut self, invoice: &Invoice) -> Result<(), PortError>;
    async fn find_invoices_for_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Vec<Invoice>, PortError>;
    async fn find_invoice_items(&self, invoice_id: InvoiceId)
        -> Result<Vec<InvoiceItem>, PortError>;
    async fn save_invoice_item(&mut self, item: &InvoiceItem) -> Result<(), PortError>;

    // deposits
    async fn find_deposit_for_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Option<Deposit>, PortError>;
    async fn save_deposit(&mut self, deposit: &Deposit) -> Result<(), PortError>;

    // payment links
    async fn save_payment_link(&mut self, link: &PaymentLink) -> Result<(), PortError>;
    async fn find_payment_link_by_order(
        &self,
        order_id: &str,
    ) -> Result<Option<PaymentLink>, PortError>;
    async fn delete_payment_link(&mut self, id: PaymentLinkId) -> Result<(), PortError>;

    async fn commit(self: Box<Self>) -> Result<(), PortError>;
    async fn rollback(self: Box<Self>) -> Result<(), PortError>;
}
