//! Contract lifecycle application service
//!
//! Every state-changing operation opens exactly one store transaction,
//! performs all of its reads and writes inside it, and either commits the
//! whole thing or rolls it back and propagates the error unmodified.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use core_kernel::{
    late_hours, ActingIdentity, ContractId, CustomerId, DomainError, NotificationSender,
    RentalPeriod, Rate, StaffId, StationId, VariableCache, VehicleModelId,
};
use domain_billing::{invoice_subtotal, Deposit, Invoice, InvoiceItem, InvoiceItemKind, InvoiceKind};

use crate::checklist::ChecklistKind;
use crate::conflict::activate_contract;
use crate::contract::{ContractStatus, RentalContract};
use crate::notify;
use crate::party::Staff;
use crate::ports::{ContractQuery, Page, RentalStore, RentalTx};
use crate::vehicle::{Vehicle, VehicleStatus};

/// Commits on success, rolls back and propagates the original error on
/// failure. A rollback failure is secondary and only logged.
pub(crate) async fn finish_tx<T>(
    tx: Box<dyn RentalTx>,
    result: Result<T, DomainError>,
) -> Result<T, DomainError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed after aborted operation");
            }
            Err(err)
        }
    }
}

/// Voids every still-pending invoice of a contract
pub(crate) async fn cancel_pending_invoices(
    tx: &mut dyn RentalTx,
    contract_id: ContractId,
) -> Result<(), DomainError> {
    for mut invoice in tx.find_invoices_for_contract(contract_id).await? {
        if invoice.is_pending() {
            invoice.cancel()?;
            tx.save_invoice(&invoice).await?;
        }
    }
    Ok(())
}

/// Resolves the acting staff member and checks the station assignment
pub(crate) async fn require_station_staff(
    tx: &dyn RentalTx,
    actor: &ActingIdentity,
    station_id: StationId,
) -> Result<Staff, DomainError> {
    if !actor.is_staff() {
        return Err(DomainError::forbidden("staff permission required"));
    }
    let staff = tx.get_staff(StaffId::from(actor.actor_id)).await?;
    if staff.station_id != station_id {
        return Err(DomainError::forbidden(
            "staff is not assigned to the contract's station",
        ));
    }
    Ok(staff)
}

/// First available vehicle of the model at the station with no open
/// contract inside the buffered window. No load balancing.
pub(crate) async fn find_available_vehicle(
    tx: &dyn RentalTx,
    station_id: StationId,
    model_id: VehicleModelId,
    period: &RentalPeriod,
    buffer_days: i64,
) -> Result<Option<Vehicle>, DomainError> {
    let widened = period.widen_days(buffer_days);
    for vehicle in tx.find_vehicles_by_model(station_id, model_id).await? {
        if !vehicle.is_available() {
            continue;
        }
        let open = tx.find_open_contracts_for_vehicle(vehicle.id).await?;
        if open.iter().any(|c| c.period.overlaps(&widened)) {
            continue;
        }
        return Ok(Some(vehicle));
    }
    Ok(None)
}

/// Request payload for contract creation
#[derive(Debug, Clone)]
pub struct CreateContractRequest {
    pub station_id: StationId,
    pub model_id: VehicleModelId,
    pub period: RentalPeriod,
}

/// Staff decision on a pending rental request
#[derive(Debug, Clone)]
pub enum VerifyDecision {
    Approve,
    Reject {
        reason: String,
        /// Pull the vehicle out of service alongside the rejection
        vehicle_unusable: bool,
    },
}

/// Signature payload for the handover step
#[derive(Debug, Clone, Copy)]
pub struct HandoverRequest {
    pub contract_id: ContractId,
    pub staff_signed: bool,
    pub customer_signed: bool,
}

/// Customer resolution after the vehicle became unavailable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOption {
    KeepVehicle,
    RequestRefund,
}

/// Orchestrates the rental-contract lifecycle
pub struct RentalContractService {
    store: Arc<dyn RentalStore>,
    notifier: Arc<dyn NotificationSender>,
    variables: Arc<VariableCache>,
}

impl RentalContractService {
    pub fn new(
        store: Arc<dyn RentalStore>,
        notifier: Arc<dyn NotificationSender>,
        variables: Arc<VariableCache>,
    ) -> Self {
        Self {
            store,
            notifier,
            variables,
        }
    }

    /// Creates a contract with its Handover and Reservation invoices and the
    /// pending deposit, all in one transaction
    pub async fn create(
        &self,
        actor: &ActingIdentity,
        request: CreateContractRequest,
    ) -> Result<RentalContract, DomainError> {
        if !actor.is_customer() {
            return Err(DomainError::forbidden("only customers create rentals"));
        }
        let mut tx = self.store.begin().await?;
        let result = self.create_in_tx(&mut *tx, actor, request).await;
        finish_tx(tx, result).await
    }

    async fn create_in_tx(
        &self,
        tx: &mut dyn RentalTx,
        actor: &ActingIdentity,
        request: CreateContractRequest,
    ) -> Result<RentalContract, DomainError> {
        let customer = tx.get_customer(CustomerId::from(actor.actor_id)).await?;
        if !customer.can_rent() {
            return Err(DomainError::business(
                "customer identity or driver license is not verified",
            ));
        }
        let open = tx.find_open_contracts_for_customer(customer.id).await?;
        if !open.is_empty() {
            return Err(DomainError::business(
                "customer already has an open rental contract",
            ));
        }

        let vars = self.variables.current();
        let buffer_days = vars.rental_contract_buffer_days()?;
        let vehicle = find_available_vehicle(
            tx,
            request.station_id,
            request.model_id,
            &request.period,
            buffer_days,
        )
        .await?
        .ok_or_else(|| {
            DomainError::business("no available vehicle of the requested model at the station")
        })?;
        let model = tx.get_model(request.model_id).await?;

        let contract = RentalContract::new(
            customer.id,
            request.station_id,
            vehicle.id,
            request.period,
        );

        let days = request.period.rental_days();
        let handover_subtotal = model.cost_per_day.multiply(Decimal::from(days));
        let handover_invoice = Invoice::new(
            contract.id,
            InvoiceKind::Handover,
            handover_subtotal,
            vars.base_vat()?,
        );
        let handover_item = InvoiceItem::new(
            handover_invoice.id,
            InvoiceItemKind::BaseRental,
            format!("Base rental, {} day(s)", days),
            Decimal::from(days),
            model.cost_per_day,
        );

        let reservation_invoice = Invoice::new(
            contract.id,
            InvoiceKind::Reservation,
            model.reservation_fee,
            Rate::zero(),
        );
        let reservation_item = InvoiceItem::new(
            reservation_invoice.id,
            InvoiceItemKind::Other,
            "Reservation fee",
            Decimal::ONE,
            model.reservation_fee,
        );

        let deposit = Deposit::new(handover_invoice.id, model.deposit_fee);

        tx.save_contract(&contract).await?;
        tx.save_invoice(&handover_invoice).await?;
        tx.save_invoice_item(&handover_item).await?;
        tx.save_invoice(&reservation_invoice).await?;
        tx.save_invoice_item(&reservation_item).await?;
        tx.save_deposit(&deposit).await?;

        info!(
            contract_id = %contract.id,
            vehicle_id = %vehicle.id,
            days,
            "rental contract created"
        );
        Ok(contract)
    }

    /// Staff approval or rejection of a pending request
    pub async fn verify(
        &self,
        actor: &ActingIdentity,
        contract_id: ContractId,
        decision: VerifyDecision,
    ) -> Result<RentalContract, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = self.verify_in_tx(&mut *tx, actor, contract_id, decision).await;
        finish_tx(tx, result).await
    }

    async fn verify_in_tx(
        &self,
        tx: &mut dyn RentalTx,
        actor: &ActingIdentity,
        contract_id: ContractId,
        decision: VerifyDecision,
    ) -> Result<RentalContract, DomainError> {
        let mut contract = tx.get_contract(contract_id).await?;
        require_station_staff(tx, actor, contract.station_id).await?;
        let customer = tx.get_customer(contract.customer_id).await?;

        match decision {
            VerifyDecision::Approve => {
                let vehicle_id = contract
                    .vehicle_id
                    .ok_or_else(|| DomainError::business("contract has no vehicle bound"))?;
                let vehicle = tx.get_vehicle(vehicle_id).await?;
                if !vehicle.is_available() {
                    return Err(DomainError::business(format!(
                        "vehicle {} is no longer available",
                        vehicle.id
                    )));
                }
                contract.approve()?;
                tx.save_contract(&contract).await?;

                let (subject, body) = notify::approved(&customer, &contract);
                self.notifier
                    .send_email(&customer.email, &subject, &body)
                    .await?;
            }
            VerifyDecision::Reject {
                reason,
                vehicle_unusable,
            } => {
                contract.reject(&reason)?;
                tx.save_contract(&contract).await?;
                cancel_pending_invoices(tx, contract.id).await?;

                if vehicle_unusable {
                    if let Some(vehicle_id) = contract.vehicle_id {
                        let mut vehicle = tx.get_vehicle(vehicle_id).await?;
                        vehicle.status = VehicleStatus::Maintenance;
                        tx.save_vehicle(&vehicle).await?;
                    }
                }

                let (subject, body) = notify::rejected(&customer, &contract, &reason);
                self.notifier
                    .send_email(&customer.email, &subject, &body)
                    .await?;
            }
        }

        info!(contract_id = %contract.id, status = ?contract.status, "contract verified");
        Ok(contract)
    }

    /// Records handover signatures and hands the vehicle over once both are in
    pub async fn handover(
        &self,
        actor: &ActingIdentity,
        request: HandoverRequest,
    ) -> Result<RentalContract, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = self.handover_in_tx(&mut *tx, actor, request).await;
        finish_tx(tx, result).await
    }

    async fn handover_in_tx(
        &self,
        tx: &mut dyn RentalTx,
        actor: &ActingIdentity,
        request: HandoverRequest,
    ) -> Result<RentalContract, DomainError> {
        let mut contract = tx.get_contract(request.contract_id).await?;
        let staff = require_station_staff(tx, actor, contract.station_id).await?;

        if contract.actual_start.is_some() {
            return Err(DomainError::business(format!(
                "contract {} was already handed over",
                contract.id
            )));
        }
        let now = Utc::now();
        if !contract.period.has_started(now) {
            return Err(DomainError::business(
                "the rental window has not started yet",
            ));
        }
        if tx
            .find_checklist(contract.id, ChecklistKind::Handover)
            .await?
            .is_none()
        {
            return Err(DomainError::business(
                "no handover checklist exists for the contract",
            ));
        }
        let invoices = tx.find_invoices_for_contract(contract.id).await?;
        let handover_paid = invoices
            .iter()
            .any(|i| i.kind == InvoiceKind::Handover && i.is_paid());
        if !handover_paid {
            return Err(DomainError::business("not handover payment"));
        }

        let started = contract.record_signatures(
            request.staff_signed,
            request.customer_signed,
            staff.id,
            now,
        );
        if started {
            let vehicle_id = contract
                .vehicle_id
                .ok_or_else(|| DomainError::business("contract has no vehicle bound"))?;
            let mut vehicle = tx.get_vehicle(vehicle_id).await?;
            vehicle.status = VehicleStatus::Rented;
            tx.save_vehicle(&vehicle).await?;
            info!(contract_id = %contract.id, vehicle_id = %vehicle.id, "vehicle handed over");
        }
        tx.save_contract(&contract).await?;
        Ok(contract)
    }

    /// Processes the vehicle return and builds the Return invoice
    ///
    /// Returns the id of the new invoice.
    pub async fn process_return(
        &self,
        actor: &ActingIdentity,
        contract_id: ContractId,
    ) -> Result<core_kernel::InvoiceId, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = self.process_return_in_tx(&mut *tx, actor, contract_id).await;
        finish_tx(tx, result).await
    }

    async fn process_return_in_tx(
        &self,
        tx: &mut dyn RentalTx,
        actor: &ActingIdentity,
        contract_id: ContractId,
    ) -> Result<core_kernel::InvoiceId, DomainError> {
        let mut contract = tx.get_contract(contract_id).await?;
        let staff = require_station_staff(tx, actor, contract.station_id).await?;

        let now = Utc::now();
        contract.mark_returned(staff.id, now)?;

        let vars = self.variables.current();
        let currency = vars.currency();
        let invoice = Invoice::new(
            contract.id,
            InvoiceKind::Return,
            core_kernel::Money::zero(currency),
            Rate::zero(),
        );

        let mut items = Vec::new();
        let late = late_hours(contract.period.end, now, vars.max_late_return_hours()?);
        if late > 0 {
            items.push(InvoiceItem::new(
                invoice.id,
                InvoiceItemKind::LateReturn,
                format!("Late return, {} hour(s)", late),
                Decimal::from(late),
                vars.late_return_fee_per_hour()?,
            ));
        }
        items.push(InvoiceItem::new(
            invoice.id,
            InvoiceItemKind::Cleaning,
            "Cleaning fee",
            Decimal::ONE,
            vars.cleaning_fee()?,
        ));
        if let Some(checklist) = tx.find_checklist(contract.id, ChecklistKind::Return).await? {
            for damaged in checklist.damaged_items() {
                if let Some(fee) = damaged.damage_fee {
                    items.push(
                        InvoiceItem::new(
                            invoice.id,
                            InvoiceItemKind::Damage,
                            format!("Damage: {}", damaged.component),
                            Decimal::ONE,
                            fee,
                        )
                        .with_checklist_item(damaged.id),
                    );
                }
            }
        }

        let mut invoice = invoice;
        invoice.subtotal = invoice_subtotal(currency, &items)?;
        tx.save_invoice(&invoice).await?;
        for item in &items {
            tx.save_invoice_item(item).await?;
        }

        if let Some(vehicle_id) = contract.vehicle_id {
            let mut vehicle = tx.get_vehicle(vehicle_id).await?;
            vehicle.status = VehicleStatus::Maintenance;
            tx.save_vehicle(&vehicle).await?;
        }
        tx.save_contract(&contract).await?;

        info!(
            contract_id = %contract.id,
            invoice_id = %invoice.id,
            late_hours = late,
            "vehicle returned"
        );
        Ok(invoice.id)
    }

    /// Customer cancellation, owner-only, before activation
    pub async fn cancel(
        &self,
        actor: &ActingIdentity,
        contract_id: ContractId,
    ) -> Result<RentalContract, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = self.cancel_in_tx(&mut *tx, actor, contract_id).await;
        finish_tx(tx, result).await
    }

    async fn cancel_in_tx(
        &self,
        tx: &mut dyn RentalTx,
        actor: &ActingIdentity,
        contract_id: ContractId,
    ) -> Result<RentalContract, DomainError> {
        let mut contract = tx.get_contract(contract_id).await?;
        if !actor.is_customer() || CustomerId::from(actor.actor_id) != contract.customer_id {
            return Err(DomainError::forbidden(
                "only the owning customer may cancel the contract",
            ));
        }
        contract.cancel_by_customer()?;
        tx.save_contract(&contract).await?;
        cancel_pending_invoices(tx, contract.id).await?;
        info!(contract_id = %contract.id, "contract cancelled by customer");
        Ok(contract)
    }

    /// Staff-driven status override
    ///
    /// The only supported transition is Active to UnavailableVehicle; the
    /// vehicle goes to Maintenance at the same time.
    pub async fn update_status(
        &self,
        actor: &ActingIdentity,
        contract_id: ContractId,
        target: ContractStatus,
    ) -> Result<RentalContract, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = self
            .update_status_in_tx(&mut *tx, actor, contract_id, target)
            .await;
        finish_tx(tx, result).await
    }

    async fn update_status_in_tx(
        &self,
        tx: &mut dyn RentalTx,
        actor: &ActingIdentity,
        contract_id: ContractId,
        target: ContractStatus,
    ) -> Result<RentalContract, DomainError> {
        let mut contract = tx.get_contract(contract_id).await?;
        require_station_staff(tx, actor, contract.station_id).await?;

        if target != ContractStatus::UnavailableVehicle {
            return Err(DomainError::bad_request(format!(
                "unsupported status override {:?}",
                target
            )));
        }
        contract.mark_unavailable()?;
        tx.save_contract(&contract).await?;

        if let Some(vehicle_id) = contract.vehicle_id {
            let mut vehicle = tx.get_vehicle(vehicle_id).await?;
            vehicle.status = VehicleStatus::Maintenance;
            tx.save_vehicle(&vehicle).await?;
        }
        info!(contract_id = %contract.id, "contract marked unavailable by staff");
        Ok(contract)
    }

    /// Rearranges bookings after a return checklist records a maintenance
    /// window on the vehicle
    ///
    /// Pending reservations inside the window are cancelled; active ones move
    /// to UnavailableVehicle with a silent rebind attempt, and their
    /// customers are asked to resolve.
    pub async fn change_vehicle(&self, contract_id: ContractId) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;
        let result = self.change_vehicle_in_tx(&mut *tx, contract_id).await;
        finish_tx(tx, result).await
    }

    async fn change_vehicle_in_tx(
        &self,
        tx: &mut dyn RentalTx,
        contract_id: ContractId,
    ) -> Result<(), DomainError> {
        let contract = tx.get_contract(contract_id).await?;
        let checklist = tx
            .find_checklist(contract.id, ChecklistKind::Return)
            .await?
            .ok_or_else(|| DomainError::business("no return checklist exists for the contract"))?;
        let maintained_until = checklist.maintained_until.ok_or_else(|| {
            DomainError::business("the return checklist records no maintenance window")
        })?;
        let vehicle_id = contract
            .vehicle_id
            .ok_or_else(|| DomainError::business("contract has no vehicle bound"))?;
        let vehicle = tx.get_vehicle(vehicle_id).await?;

        let vars = self.variables.current();
        let buffer_days = vars.rental_contract_buffer_days()?;

        let others = tx.find_open_contracts_for_vehicle(vehicle_id).await?;
        for mut other in others {
            if other.id == contract.id || other.period.start >= maintained_until {
                continue;
            }
            let customer = tx.get_customer(other.customer_id).await?;
            match other.status {
                ContractStatus::RequestPending | ContractStatus::PaymentPending => {
                    other.force_cancel(
                        "cancelled automatically: vehicle entering maintenance",
                    )?;
                    tx.save_contract(&other).await?;
                    cancel_pending_invoices(tx, other.id).await?;

                    let (subject, body) = notify::maintenance_cancelled(&customer, &other);
                    self.notifier
                        .send_email(&customer.email, &subject, &body)
                        .await?;
                }
                ContractStatus::Active => {
                    other.mark_unavailable()?;
                    let replacement = find_available_vehicle(
                        tx,
                        other.station_id,
                        vehicle.model_id,
                        &other.period,
                        buffer_days,
                    )
                    .await?;
                    match replacement {
                        Some(replacement) => {
                            other.rebind_vehicle(Some(replacement.id));
                            tx.save_contract(&other).await?;

                            let (subject, body) = notify::vehicle_swapped(
                                &customer,
                                &other,
                                &replacement.license_plate,
                            );
                            self.notifier
                                .send_email(&customer.email, &subject, &body)
                                .await?;
                        }
                        None => {
                            other.rebind_vehicle(None);
                            tx.save_contract(&other).await?;

                            let (subject, body) = notify::resolution_needed(&customer, &other);
                            self.notifier
                                .send_email(&customer.email, &subject, &body)
                                .await?;
                        }
                    }
                }
                _ => {}
            }
        }
        info!(vehicle_id = %vehicle_id, "bookings rearranged around maintenance window");
        Ok(())
    }

    /// Customer resolution of an UnavailableVehicle contract
    pub async fn process_customer_confirm(
        &self,
        actor: &ActingIdentity,
        contract_id: ContractId,
        option: ResolutionOption,
    ) -> Result<RentalContract, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = self
            .process_customer_confirm_in_tx(&mut *tx, actor, contract_id, option)
            .await;
        finish_tx(tx, result).await
    }

    async fn process_customer_confirm_in_tx(
        &self,
        tx: &mut dyn RentalTx,
        actor: &ActingIdentity,
        contract_id: ContractId,
        option: ResolutionOption,
    ) -> Result<RentalContract, DomainError> {
        let mut contract = tx.get_contract(contract_id).await?;
        if !actor.is_customer() || CustomerId::from(actor.actor_id) != contract.customer_id {
            return Err(DomainError::forbidden(
                "only the owning customer may resolve the contract",
            ));
        }
        if contract.status != ContractStatus::UnavailableVehicle {
            return Err(DomainError::business(format!(
                "contract {} is not awaiting a resolution",
                contract.id
            )));
        }

        match option {
            ResolutionOption::KeepVehicle => {
                activate_contract(tx, &mut contract, self.notifier.as_ref()).await?;
            }
            ResolutionOption::RequestRefund => {
                contract.request_refund()?;
                tx.save_contract(&contract).await?;

                let vars = self.variables.current();
                let currency = vars.currency();
                let mut refunded = core_kernel::Money::zero(currency);
                for invoice in tx.find_invoices_for_contract(contract.id).await? {
                    let settled = matches!(
                        invoice.kind,
                        InvoiceKind::Handover | InvoiceKind::Reservation
                    ) && invoice.is_paid();
                    if settled {
                        if let Some(paid) = invoice.paid_amount {
                            refunded = refunded.checked_add(&paid)?;
                        }
                    }
                }

                let refund_invoice = Invoice::new(
                    contract.id,
                    InvoiceKind::Refund,
                    core_kernel::Money::zero(currency),
                    Rate::zero(),
                );
                let refund_item = InvoiceItem::new(
                    refund_invoice.id,
                    InvoiceItemKind::Refund,
                    "Refund of payments received",
                    Decimal::ONE,
                    refunded,
                );
                tx.save_invoice(&refund_invoice).await?;
                tx.save_invoice_item(&refund_item).await?;
                info!(
                    contract_id = %contract.id,
                    invoice_id = %refund_invoice.id,
                    "refund requested"
                );
            }
        }
        Ok(contract)
    }

    /// Paginated contract listing
    pub async fn list_contracts(
        &self,
        query: &ContractQuery,
    ) -> Result<Page<RentalContract>, DomainError> {
        let tx = self.store.begin().await?;
        let result = tx.find_contracts(query).await.map_err(DomainError::from);
        finish_tx(tx, result).await
    }

    pub async fn get_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<RentalContract, DomainError> {
        let tx = self.store.begin().await?;
        let result = tx.get_contract(contract_id).await.map_err(DomainError::from);
        finish_tx(tx, result).await
    }

    pub(crate) fn store(&self) -> &Arc<dyn RentalStore> {
        &self.store
    }

    pub(crate) fn notifier(&self) -> &Arc<dyn NotificationSender> {
        &self.notifier
    }

    pub(crate) fn variables(&self) -> &Arc<VariableCache> {
        &self.variables
    }
}
