//! Test Data Builders
//!
//! Builder patterns for constructing test data with sensible defaults.
//! Tests specify only the relevant fields and take defaults for the rest.

use chrono::{DateTime, Utc};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use uuid::Uuid;

use core_kernel::{
    ChecklistId, ChecklistItemId, CustomerId, Money, RentalPeriod, StaffId, StationId, VehicleId,
    VehicleModelId,
};
use domain_rental::{
    Checklist, ChecklistItem, ChecklistKind, ContractStatus, Customer, RentalContract, Staff,
    Vehicle, VehicleModel, VehicleStatus,
};

use crate::fixtures::{MoneyFixtures, TemporalFixtures};

/// Builder for test customers; verified and allowed to rent by default
pub struct CustomerBuilder {
    id: CustomerId,
    email: String,
    full_name: String,
    identity_verified: bool,
    license_verified: bool,
}

impl Default for CustomerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomerBuilder {
    pub fn new() -> Self {
        Self {
            id: CustomerId::new(),
            email: SafeEmail().fake(),
            full_name: Name().fake(),
            identity_verified: true,
            license_verified: true,
        }
    }

    pub fn with_id(mut self, id: CustomerId) -> Self {
        self.id = id;
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Leaves both verification flags unset
    pub fn unverified(mut self) -> Self {
        self.identity_verified = false;
        self.license_verified = false;
        self
    }

    pub fn without_license(mut self) -> Self {
        self.license_verified = false;
        self
    }

    pub fn build(self) -> Customer {
        Customer {
            id: self.id,
            email: self.email,
            full_name: self.full_name,
            identity_verified: self.identity_verified,
            license_verified: self.license_verified,
        }
    }
}

/// Builder for staff members
pub struct StaffBuilder {
    id: StaffId,
    email: String,
    full_name: String,
    station_id: StationId,
}

impl StaffBuilder {
    pub fn new(station_id: StationId) -> Self {
        Self {
            id: StaffId::new(),
            email: SafeEmail().fake(),
            full_name: Name().fake(),
            station_id,
        }
    }

    pub fn with_id(mut self, id: StaffId) -> Self {
        self.id = id;
        self
    }

    pub fn build(self) -> Staff {
        Staff {
            id: self.id,
            email: self.email,
            full_name: self.full_name,
            station_id: self.station_id,
        }
    }
}

/// Builder for vehicle models with the standard test pricing
/// (20/day, 5 reservation, 100 deposit)
pub struct VehicleModelBuilder {
    id: VehicleModelId,
    name: String,
    cost_per_day: Money,
    reservation_fee: Money,
    deposit_fee: Money,
}

impl Default for VehicleModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VehicleModelBuilder {
    pub fn new() -> Self {
        Self {
            id: VehicleModelId::new(),
            name: "City Runner".to_string(),
            cost_per_day: MoneyFixtures::usd(20),
            reservation_fee: MoneyFixtures::usd(5),
            deposit_fee: MoneyFixtures::usd(100),
        }
    }

    pub fn with_cost_per_day(mut self, cost: Money) -> Self {
        self.cost_per_day = cost;
        self
    }

    pub fn with_reservation_fee(mut self, fee: Money) -> Self {
        self.reservation_fee = fee;
        self
    }

    pub fn with_deposit_fee(mut self, fee: Money) -> Self {
        self.deposit_fee = fee;
        self
    }

    pub fn build(self) -> VehicleModel {
        VehicleModel {
            id: self.id,
            name: self.name,
            cost_per_day: self.cost_per_day,
            reservation_fee: self.reservation_fee,
            deposit_fee: self.deposit_fee,
        }
    }
}

/// Builder for vehicles, Available by default
pub struct VehicleBuilder {
    id: VehicleId,
    model_id: VehicleModelId,
    station_id: StationId,
    license_plate: String,
    status: VehicleStatus,
}

impl VehicleBuilder {
    pub fn new(model_id: VehicleModelId, station_id: StationId) -> Self {
        Self {
            id: VehicleId::new(),
            model_id,
            station_id,
            license_plate: format!("TEST-{}", &Uuid::new_v4().simple().to_string()[..6]),
            status: VehicleStatus::Available,
        }
    }

    pub fn with_id(mut self, id: VehicleId) -> Self {
        self.id = id;
        self
    }

    pub fn with_status(mut self, status: VehicleStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_license_plate(mut self, plate: impl Into<String>) -> Self {
        self.license_plate = plate.into();
        self
    }

    pub fn build(self) -> Vehicle {
        Vehicle {
            id: self.id,
            model_id: self.model_id,
            station_id: self.station_id,
            license_plate: self.license_plate,
            status: self.status,
        }
    }
}

/// Builder for contracts in an arbitrary lifecycle position
///
/// Service tests normally create contracts through the service; this builder
/// exists for sweep and payment tests that need a contract mid-lifecycle.
pub struct ContractBuilder {
    customer_id: CustomerId,
    vehicle_id: Option<VehicleId>,
    station_id: StationId,
    period: RentalPeriod,
    status: ContractStatus,
    actual_start: Option<DateTime<Utc>>,
    actual_end: Option<DateTime<Utc>>,
    signed: bool,
}

impl ContractBuilder {
    pub fn new(customer_id: CustomerId, vehicle_id: VehicleId, station_id: StationId) -> Self {
        Self {
            customer_id,
            vehicle_id: Some(vehicle_id),
            station_id,
            period: TemporalFixtures::current_period(),
            status: ContractStatus::RequestPending,
            actual_start: None,
            actual_end: None,
            signed: false,
        }
    }

    pub fn with_period(mut self, period: RentalPeriod) -> Self {
        self.period = period;
        self
    }

    pub fn with_status(mut self, status: ContractStatus) -> Self {
        self.status = status;
        self
    }

    /// Marks the contract as handed over at the period start
    pub fn started(mut self) -> Self {
        self.actual_start = Some(self.period.start);
        self.signed = true;
        self
    }

    pub fn with_actual_end(mut self, at: DateTime<Utc>) -> Self {
        self.actual_end = Some(at);
        self
    }

    pub fn build(self) -> RentalContract {
        let mut contract = RentalContract::new(
            self.customer_id,
            self.station_id,
            self.vehicle_id.expect("builder always binds a vehicle"),
            self.period,
        );
        contract.status = self.status;
        contract.actual_start = self.actual_start;
        contract.actual_end = self.actual_end;
        if self.signed {
            contract.signed_by_customer = true;
            contract.signed_by_staff = true;
        }
        contract
    }
}

/// Builder for checklists
pub struct ChecklistBuilder {
    checklist: Checklist,
}

impl ChecklistBuilder {
    pub fn new(contract_id: core_kernel::ContractId, kind: ChecklistKind) -> Self {
        Self {
            checklist: Checklist {
                id: ChecklistId::new(),
                contract_id,
                kind,
                maintained_until: None,
                items: Vec::new(),
                completed_at: Some(Utc::now()),
            },
        }
    }

    pub fn with_maintained_until(mut self, until: DateTime<Utc>) -> Self {
        self.checklist.maintained_until = Some(until);
        self
    }

    pub fn with_item(mut self, component: impl Into<String>) -> Self {
        self.checklist.items.push(ChecklistItem {
            id: ChecklistItemId::new(),
            component: component.into(),
            is_damaged: false,
            damage_fee: None,
            note: None,
        });
        self
    }

    pub fn with_damaged_item(mut self, component: impl Into<String>, fee: Money) -> Self {
        self.checklist.items.push(ChecklistItem {
            id: ChecklistItemId::new(),
            component: component.into(),
            is_damaged: true,
            damage_fee: Some(fee),
            note: Some("damaged on return".to_string()),
        });
        self
    }

    pub fn build(self) -> Checklist {
        self.checklist
    }
}
