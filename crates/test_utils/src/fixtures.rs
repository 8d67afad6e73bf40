//! Pre-built Test Fixtures
//!
//! Ready-to-use test data and a fully wired service environment over the
//! in-memory store and mock collaborators.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{
    BusinessVariableKey, BusinessVariables, Currency, Money, RentalPeriod, StationId,
    VariableCache,
};
use domain_rental::{Customer, InvoiceService, RentalContractService, Staff, Vehicle, VehicleModel};

use crate::builders::{CustomerBuilder, StaffBuilder, VehicleBuilder, VehicleModelBuilder};
use crate::memory::MemoryStore;
use crate::mocks::{MockGateway, MockNotifier, MockStorage};

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    pub fn usd(amount: i64) -> Money {
        Money::new(Decimal::from(amount), Currency::USD)
    }

    pub fn usd_dec(amount: Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    pub fn usd_zero() -> Money {
        Money::zero(Currency::USD)
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// A rental window that started yesterday and ends in three days
    pub fn current_period() -> RentalPeriod {
        let now = Utc::now();
        RentalPeriod::new(now - Duration::days(1), now + Duration::days(3)).unwrap()
    }

    /// A rental window starting in two days
    pub fn future_period() -> RentalPeriod {
        let now = Utc::now();
        RentalPeriod::new(now + Duration::days(2), now + Duration::days(7)).unwrap()
    }

    /// A rental window that ended yesterday
    pub fn ended_period() -> RentalPeriod {
        let now = Utc::now();
        RentalPeriod::new(now - Duration::days(6), now - Duration::days(1)).unwrap()
    }

    /// The five-day window of the standard pricing scenario
    pub fn five_day_period() -> RentalPeriod {
        RentalPeriod::new(
            Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap(),
        )
        .unwrap()
    }
}

static DEFAULT_VARIABLES: Lazy<HashMap<BusinessVariableKey, Decimal>> = Lazy::new(|| {
    HashMap::from([
        (BusinessVariableKey::LateReturnFeePerHour, dec!(8)),
        (BusinessVariableKey::CleaningFee, dec!(15)),
        (BusinessVariableKey::BaseVat, dec!(0.1)),
        (BusinessVariableKey::MaxLateReturnHours, dec!(2)),
        (BusinessVariableKey::RentalContractBufferDay, dec!(2)),
        (BusinessVariableKey::RefundCreationDelayDays, dec!(3)),
    ])
});

/// The standard business-variable snapshot used across the suite
pub fn default_variables() -> BusinessVariables {
    BusinessVariables::from_values(Currency::USD, DEFAULT_VARIABLES.clone())
}

pub fn variable_cache() -> Arc<VariableCache> {
    Arc::new(VariableCache::new(default_variables()))
}

/// A fully wired service environment over the in-memory store
pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<MockNotifier>,
    pub gateway: Arc<MockGateway>,
    pub storage: Arc<MockStorage>,
    pub variables: Arc<VariableCache>,
    pub rentals: Arc<RentalContractService>,
    pub invoices: Arc<InvoiceService>,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let notifier = MockNotifier::new();
        let gateway = MockGateway::new();
        let storage = MockStorage::new();
        let variables = variable_cache();

        let rentals = Arc::new(RentalContractService::new(
            store.clone(),
            notifier.clone(),
            variables.clone(),
        ));
        let invoices = Arc::new(InvoiceService::new(
            store.clone(),
            notifier.clone(),
            gateway.clone(),
            storage.clone(),
            variables.clone(),
        ));

        Self {
            store,
            notifier,
            gateway,
            storage,
            variables,
            rentals,
            invoices,
        }
    }

    /// Seeds one station with one verified customer, one staff member, the
    /// standard model, and one available vehicle
    pub fn seed_world(&self) -> SeededWorld {
        let station_id = StationId::new();
        let customer = CustomerBuilder::new().build();
        let staff = StaffBuilder::new(station_id).build();
        let model = VehicleModelBuilder::new().build();
        let vehicle = VehicleBuilder::new(model.id, station_id).build();

        self.store.seed_customer(customer.clone());
        self.store.seed_staff(staff.clone());
        self.store.seed_model(model.clone());
        self.store.seed_vehicle(vehicle.clone());

        SeededWorld {
            station_id,
            customer,
            staff,
            model,
            vehicle,
        }
    }
}

/// The entities seeded by [`TestEnv::seed_world`]
#[derive(Clone)]
pub struct SeededWorld {
    pub station_id: StationId,
    pub customer: Customer,
    pub staff: Staff,
    pub model: VehicleModel,
    pub vehicle: Vehicle,
}

/// Acting identity of a seeded customer
pub fn customer_actor(customer: &Customer) -> core_kernel::ActingIdentity {
    core_kernel::ActingIdentity::customer(customer.id.into())
}

/// Acting identity of a seeded staff member
pub fn staff_actor(staff: &Staff) -> core_kernel::ActingIdentity {
    core_kernel::ActingIdentity::staff(staff.id.into())
}

/// A second available vehicle of the same model at the same station
pub fn extra_vehicle(env: &TestEnv, world: &SeededWorld) -> Vehicle {
    let vehicle = VehicleBuilder::new(world.model.id, world.station_id).build();
    env.store.seed_vehicle(vehicle.clone());
    vehicle
}
