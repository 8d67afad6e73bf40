//! RentalContract aggregate
//!
//! The contract is the consistency boundary of the rental lifecycle. It is
//! created once, mutated only through the transitions below, and never
//! hard-deleted: terminal states end the lifecycle.
//!
//! # State machine
//!
//! ```text
//! RequestPending -> PaymentPending   staff approves
//! RequestPending -> Cancelled        staff rejects / customer cancels
//! PaymentPending -> Active           a Handover or Reservation invoice is paid
//! PaymentPending -> Cancelled        customer cancels before payment
//! Active         -> Returned         return processed
//! Active         -> UnavailableVehicle   vehicle pulled for maintenance
//! Request/Payment/Active -> Cancelled    pickup deadline passed, never started
//! UnavailableVehicle -> Active       customer accepts the vehicle swap
//! UnavailableVehicle -> RefundPending    customer requests a refund
//! RefundPending  -> Completed        refund invoice paid
//! Returned       -> Completed        return invoice settled
//! ```
//!
//! A late return is a flag on the vehicle, not a contract state.
//!
//! # Invariants
//!
//! - `actual_start` is set exactly when both signature flags are true at the
//!   moment of setting
//! - terminal contracts (Cancelled, Completed) never transition again

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{
    ContractId, CustomerId, DomainError, RentalPeriod, StaffId, StationId, VehicleId,
};

/// Contract lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractStatus {
    RequestPending,
    PaymentPending,
    Active,
    Returned,
    UnavailableVehicle,
    RefundPending,
    Completed,
    Cancelled,
}

impl ContractStatus {
    /// Terminal states never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(self, ContractStatus::Cancelled | ContractStatus::Completed)
    }
}

/// One customer's reservation of one vehicle for a date interval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalContract {
    pub id: ContractId,
    pub customer_id: CustomerId,
    /// Bound vehicle; cleared when a swap fails to find a replacement
    pub vehicle_id: Option<VehicleId>,
    pub station_id: StationId,
    pub period: RentalPeriod,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
    pub status: ContractStatus,
    pub signed_by_customer: bool,
    pub signed_by_staff: bool,
    pub handover_staff_id: Option<StaffId>,
    pub return_staff_id: Option<StaffId>,
    /// Append-only audit log
    pub description: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RentalContract {
    pub fn new(
        customer_id: CustomerId,
        station_id: StationId,
        vehicle_id: VehicleId,
        period: RentalPeriod,
    ) -> Self {
        let now = Utc::now();
        let mut contract = Self {
            id: ContractId::new_v7(),
            customer_id,
            vehicle_id: Some(vehicle_id),
            station_id,
            period,
            actual_start: None,
            actual_end: None,
            status: ContractStatus::RequestPending,
            signed_by_customer: false,
            signed_by_staff: false,
            handover_staff_id: None,
            return_staff_id: None,
            description: String::new(),
            notes: None,
            created_at: now,
            updated_at: now,
        };
        contract.append_audit("contract created");
        contract
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Appends a timestamped line to the audit log; the log is never rewritten
    pub fn append_audit(&mut self, line: &str) {
        let now = Utc::now();
        if !self.description.is_empty() {
            self.description.push('\n');
        }
        self.description
            .push_str(&format!("[{}] {}", now.format("%Y-%m-%d %H:%M:%S"), line));
        self.updated_at = now;
    }

    /// Staff approval: RequestPending -> PaymentPending
    pub fn approve(&mut self) -> Result<(), DomainError> {
        self.expect_status(ContractStatus::RequestPending, "approve")?;
        self.status = ContractStatus::PaymentPending;
        self.append_audit("approved by staff, awaiting payment");
        Ok(())
    }

    /// Staff rejection: RequestPending -> Cancelled
    pub fn reject(&mut self, note: &str) -> Result<(), DomainError> {
        self.expect_status(ContractStatus::RequestPending, "reject")?;
        self.status = ContractStatus::Cancelled;
        self.append_audit(&format!("rejected by staff: {}", note));
        Ok(())
    }

    /// Customer cancellation, valid only before activation
    pub fn cancel_by_customer(&mut self) -> Result<(), DomainError> {
        match self.status {
            ContractStatus::RequestPending | ContractStatus::PaymentPending => {
                self.status = ContractStatus::Cancelled;
                self.append_audit("cancelled by customer");
                Ok(())
            }
            _ => Err(DomainError::business(format!(
                "contract {} can no longer be cancelled by the customer",
                self.id
            ))),
        }
    }

    /// System-authored cancellation (conflict sweep, expired pickup, maintenance)
    pub fn force_cancel(&mut self, note: &str) -> Result<(), DomainError> {
        if self.is_terminal() {
            return Err(DomainError::business(format!(
                "contract {} is already closed",
                self.id
            )));
        }
        self.status = ContractStatus::Cancelled;
        self.append_audit(note);
        Ok(())
    }

    /// Payment received: PaymentPending -> Active
    pub fn activate(&mut self) -> Result<(), DomainError> {
        self.expect_status(ContractStatus::PaymentPending, "activate")?;
        self.status = ContractStatus::Active;
        self.append_audit("payment received, contract active");
        Ok(())
    }

    /// Customer accepted the swapped vehicle: UnavailableVehicle -> Active
    pub fn reactivate_after_swap(&mut self) -> Result<(), DomainError> {
        self.expect_status(ContractStatus::UnavailableVehicle, "reactivate")?;
        self.status = ContractStatus::Active;
        self.append_audit("customer kept the replacement vehicle");
        Ok(())
    }

    /// Records handover signatures
    ///
    /// When both flags become true the actual start is stamped, and only
    /// then. Returns true if this call started the rental.
    pub fn record_signatures(
        &mut self,
        staff_signed: bool,
        customer_signed: bool,
        staff_id: StaffId,
        now: DateTime<Utc>,
    ) -> bool {
        if staff_signed {
            self.signed_by_staff = true;
        }
        if customer_signed {
            self.signed_by_customer = true;
        }
        self.updated_at = Utc::now();

        if self.signed_by_staff && self.signed_by_customer && self.actual_start.is_none() {
            self.actual_start = Some(now);
            self.handover_staff_id = Some(staff_id);
            self.append_audit("both signatures recorded, vehicle handed over");
            true
        } else {
            false
        }
    }

    /// Return processed: Active -> Returned
    pub fn mark_returned(
        &mut self,
        staff_id: StaffId,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status == ContractStatus::Returned {
            return Err(DomainError::business(format!(
                "contract {} has already been returned",
                self.id
            )));
        }
        self.expect_status(ContractStatus::Active, "return")?;
        self.status = ContractStatus::Returned;
        self.actual_end = Some(now);
        self.return_staff_id = Some(staff_id);
        self.append_audit("vehicle returned");
        Ok(())
    }

    /// Vehicle pulled for extended maintenance: Active -> UnavailableVehicle
    pub fn mark_unavailable(&mut self) -> Result<(), DomainError> {
        self.expect_status(ContractStatus::Active, "mark unavailable")?;
        self.status = ContractStatus::UnavailableVehicle;
        self.append_audit("vehicle became unavailable, awaiting customer resolution");
        Ok(())
    }

    /// Customer chose a refund: UnavailableVehicle -> RefundPending
    pub fn request_refund(&mut self) -> Result<(), DomainError> {
        self.expect_status(ContractStatus::UnavailableVehicle, "request refund")?;
        self.status = ContractStatus::RefundPending;
        self.append_audit("customer requested a refund");
        Ok(())
    }

    /// Settlement finished: Returned or RefundPending -> Completed
    pub fn complete(&mut self) -> Result<(), DomainError> {
        match self.status {
            ContractStatus::Returned | ContractStatus::RefundPending => {
                self.status = ContractStatus::Completed;
                self.append_audit("contract completed");
                Ok(())
            }
            _ => Err(DomainError::business(format!(
                "contract {} cannot be completed from {:?}",
                self.id, self.status
            ))),
        }
    }

    /// Rebinds (or clears) the vehicle during a swap
    pub fn rebind_vehicle(&mut self, vehicle_id: Option<VehicleId>) {
        self.vehicle_id = vehicle_id;
        match vehicle_id {
            Some(id) => self.append_audit(&format!("rebound to replacement vehicle {}", id)),
            None => self.append_audit("no replacement vehicle found"),
        }
    }

    fn expect_status(
        &self,
        expected: ContractStatus,
        action: &str,
    ) -> Result<(), DomainError> {
        if self.status != expected {
            return Err(DomainError::business(format!(
                "cannot {} contract {} in status {:?}",
                action, self.id, self.status
            )));
        }
        Ok(())
    }
}
