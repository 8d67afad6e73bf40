//! Vehicle and vehicle-model entities

use serde::{Deserialize, Serialize};

use core_kernel::{Money, StationId, VehicleId, VehicleModelId};

/// Operational status of a physical vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleStatus {
    /// Free to be booked
    Available,
    /// Reserved by a paid contract, not yet handed over
    Unavailable,
    /// In a customer's hands
    Rented,
    /// Undergoing maintenance after a return
    Maintenance,
    /// Flagged by the late-return sweep
    LateReturn,
}

/// A rentable model with its pricing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleModel {
    pub id: VehicleModelId,
    pub name: String,
    pub cost_per_day: Money,
    pub reservation_fee: Money,
    pub deposit_fee: Money,
}

/// One physical vehicle stationed somewhere
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub model_id: VehicleModelId,
    pub station_id: StationId,
    pub license_plate: String,
    pub status: VehicleStatus,
}

impl Vehicle {
    pub fn new(
        model_id: VehicleModelId,
        station_id: StationId,
        license_plate: impl Into<String>,
    ) -> Self {
        Self {
            id: VehicleId::new_v7(),
            model_id,
            station_id,
            license_plate: license_plate.into(),
            status: VehicleStatus::Available,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == VehicleStatus::Available
    }
}
