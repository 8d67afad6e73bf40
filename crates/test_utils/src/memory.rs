//! In-memory rental store
//!
//! Backs the service tests with real transactional semantics: `begin` takes
//! a snapshot of the shared state, every write goes to the snapshot, and
//! `commit` swaps the snapshot back in. A rollback (or a dropped
//! transaction) simply discards the snapshot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use core_kernel::{
    ChecklistItemId, ContractId, CustomerId, DepositId, InvoiceId, InvoiceItemId, PaymentLinkId,
    PortError, StaffId, StationId, VehicleId, VehicleModelId,
};
use domain_billing::{Deposit, Invoice, InvoiceItem};
use domain_rental::{
    Checklist, ChecklistItem, ChecklistKind, ContractQuery, ContractStatus, Customer, Page,
    PaymentLink, RentalContract, RentalStore, RentalTx, Staff, Vehicle, VehicleModel,
};

/// Everything the store holds, cloneable as one snapshot
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub contracts: HashMap<ContractId, RentalContract>,
    pub vehicles: HashMap<VehicleId, Vehicle>,
    pub models: HashMap<VehicleModelId, VehicleModel>,
    pub customers: HashMap<CustomerId, Customer>,
    pub staff: HashMap<StaffId, Staff>,
    pub checklists: Vec<Checklist>,
    pub invoices: HashMap<InvoiceId, Invoice>,
    pub invoice_items: HashMap<InvoiceItemId, InvoiceItem>,
    pub deposits: HashMap<DepositId, Deposit>,
    pub payment_links: HashMap<PaymentLinkId, PaymentLink>,
}

/// Shared in-memory store
#[derive(Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current committed state, for assertions
    pub fn snapshot(&self) -> MemoryState {
        self.state.lock().expect("memory store lock poisoned").clone()
    }

    /// Seeds committed state directly, bypassing transactions
    pub fn seed(&self, f: impl FnOnce(&mut MemoryState)) {
        let mut state = self.state.lock().expect("memory store lock poisoned");
        f(&mut state);
    }

    pub fn seed_customer(&self, customer: Customer) {
        self.seed(|s| {
            s.customers.insert(customer.id, customer);
        });
    }

    pub fn seed_staff(&self, staff: Staff) {
        self.seed(|s| {
            s.staff.insert(staff.id, staff);
        });
    }

    pub fn seed_model(&self, model: VehicleModel) {
        self.seed(|s| {
            s.models.insert(model.id, model);
        });
    }

    pub fn seed_vehicle(&self, vehicle: Vehicle) {
        self.seed(|s| {
            s.vehicles.insert(vehicle.id, vehicle);
        });
    }

    pub fn seed_contract(&self, contract: RentalContract) {
        self.seed(|s| {
            s.contracts.insert(contract.id, contract);
        });
    }

    pub fn seed_checklist(&self, checklist: Checklist) {
        self.seed(|s| {
            s.checklists.push(checklist);
        });
    }

    pub fn seed_invoice(&self, invoice: Invoice) {
        self.seed(|s| {
            s.invoices.insert(invoice.id, invoice);
        });
    }

    pub fn seed_invoice_item(&self, item: InvoiceItem) {
        self.seed(|s| {
            s.invoice_items.insert(item.id, item);
        });
    }

    pub fn seed_deposit(&self, deposit: Deposit) {
        self.seed(|s| {
            s.deposits.insert(deposit.id, deposit);
        });
    }
}

#[async_trait]
impl RentalStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn RentalTx>, PortError> {
        let working = self.snapshot();
        Ok(Box::new(MemoryTx {
            shared: Arc::clone(&self.state),
            working,
        }))
    }
}

struct MemoryTx {
    shared: Arc<Mutex<MemoryState>>,
    working: MemoryState,
}

impl MemoryTx {
    fn open_contracts(&self) -> impl Iterator<Item = &RentalContract> {
        self.working.contracts.values().filter(|c| !c.is_terminal())
    }
}

#[async_trait]
impl RentalTx for MemoryTx {
    async fn get_contract(&self, id: ContractId) -> Result<RentalContract, PortError> {
        self.working
            .contracts
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("RentalContract", id))
    }

    async fn save_contract(&mut self, contract: &RentalContract) -> Result<(), PortError> {
        self.working.contracts.insert(contract.id, contract.clone());
        Ok(())
    }

    async fn find_contracts(
        &self,
        query: &ContractQuery,
    ) -> Result<Page<RentalContract>, PortError> {
        let mut matching: Vec<RentalContract> = self
            .working
            .contracts
            .values()
            .filter(|c| query.matches(c))
            .cloned()
            .collect();
        matching.sort_by_key(|c| c.created_at);

        let total = matching.len() as u64;
        let items = if query.page_size == 0 {
            matching
        } else {
            let skip = (query.page.saturating_sub(1) as usize) * query.page_size as usize;
            matching
                .into_iter()
                .skip(skip)
                .take(query.page_size as usize)
                .collect()
        };
        Ok(Page {
            items,
            total,
            page: query.page.max(1),
            page_size: query.page_size,
        })
    }

    async fn find_open_contracts_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<RentalContract>, PortError> {
        Ok(self
            .open_contracts()
            .filter(|c| c.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn find_open_contracts_for_vehicle(
        &self,
        vehicle_id: VehicleId,
    ) -> Result<Vec<RentalContract>, PortError> {
        Ok(self
            .open_contracts()
            .filter(|c| c.vehicle_id == Some(vehicle_id))
            .cloned()
            .collect())
    }

    async fn find_contracts_in_statuses(
        &self,
        statuses: &[ContractStatus],
    ) -> Result<Vec<RentalContract>, PortError> {
        Ok(self
            .open_contracts()
            .filter(|c| statuses.contains(&c.status))
            .cloned()
            .collect())
    }

    async fn get_vehicle(&self, id: VehicleId) -> Result<Vehicle, PortError> {
        self.working
            .vehicles
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Vehicle", id))
    }

    async fn save_vehicle(&mut self, vehicle: &Vehicle) -> Result<(), PortError> {
        self.working.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(())
    }

    async fn find_vehicles_by_model(
        &self,
        station_id: StationId,
        model_id: VehicleModelId,
    ) -> Result<Vec<Vehicle>, PortError> {
        let mut vehicles: Vec<Vehicle> = self
            .working
            .vehicles
            .values()
            .filter(|v| v.station_id == station_id && v.model_id == model_id)
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| a.license_plate.cmp(&b.license_plate));
        Ok(vehicles)
    }

    async fn get_model(&self, id: VehicleModelId) -> Result<VehicleModel, PortError> {
        self.working
            .models
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("VehicleModel", id))
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Customer, PortError> {
        self.working
            .customers
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Customer", id))
    }

    async fn get_staff(&self, id: StaffId) -> Result<Staff, PortError> {
        self.working
            .staff
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Staff", id))
    }

    async fn find_checklist(
        &self,
        contract_id: ContractId,
        kind: ChecklistKind,
    ) -> Result<Option<Checklist>, PortError> {
        Ok(self
            .working
            .checklists
            .iter()
            .find(|c| c.contract_id == contract_id && c.kind == kind)
            .cloned())
    }

    async fn get_checklist_item(&self, id: ChecklistItemId) -> Result<ChecklistItem, PortError> {
        self.working
            .checklists
            .iter()
            .flat_map(|c| c.items.iter())
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| PortError::not_found("ChecklistItem", id))
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError> {
        self.working
            .invoices
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Invoice", id))
    }

    async fn save_invoice(&mut self, invoice: &Invoice) -> Result<(), PortError> {
        self.working.invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn find_invoices_for_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Vec<Invoice>, PortError> {
        let mut invoices: Vec<Invoice> = self
            .working
            .invoices
            .values()
            .filter(|i| i.contract_id == contract_id)
            .cloned()
            .collect();
        invoices.sort_by_key(|i| i.created_at);
        Ok(invoices)
    }

    async fn find_invoice_items(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<InvoiceItem>, PortError> {
        Ok(self
            .working
            .invoice_items
            .values()
            .filter(|i| i.invoice_id == invoice_id)
            .cloned()
            .collect())
    }

    async fn save_invoice_item(&mut self, item: &InvoiceItem) -> Result<(), PortError> {
        self.working.invoice_items.insert(item.id, item.clone());
        Ok(())
    }

    async fn find_deposit_for_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Option<Deposit>, PortError> {
        Ok(self
            .working
            .deposits
            .values()
            .find(|d| d.invoice_id == invoice_id)
            .cloned())
    }

    async fn save_deposit(&mut self, deposit: &Deposit) -> Result<(), PortError> {
        self.working.deposits.insert(deposit.id, deposit.clone());
        Ok(())
    }

    async fn save_payment_link(&mut self, link: &PaymentLink) -> Result<(), PortError> {
        self.working.payment_links.insert(link.id, link.clone());
        Ok(())
    }

    async fn find_payment_link_by_order(
        &self,
        order_id: &str,
    ) -> Result<Option<PaymentLink>, PortError> {
        Ok(self
            .working
            .payment_links
            .values()
            .find(|l| l.order_id == order_id)
            .cloned())
    }

    async fn delete_payment_link(&mut self, id: PaymentLinkId) -> Result<(), PortError> {
        self.working.payment_links.remove(&id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        let mut shared = self
            .shared
            .lock()
            .map_err(|_| PortError::internal("memory store lock poisoned"))?;
        *shared = self.working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), PortError> {
        Ok(())
    }
}
