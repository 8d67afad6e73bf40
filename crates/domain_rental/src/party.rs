//! Customer and staff entities
//!
//! Identity verification itself (citizen papers, driver licenses, OTP) is an
//! external concern; the rental core only reads the verification flags.

use serde::{Deserialize, Serialize};

use core_kernel::{CustomerId, StaffId, StationId};

/// A renting customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: String,
    pub full_name: String,
    pub identity_verified: bool,
    pub license_verified: bool,
}

impl Customer {
    /// True when both the citizen identity and the driver license are on file
    pub fn can_rent(&self) -> bool {
        self.identity_verified && self.license_verified
    }
}

/// A staff member assigned to one station
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: StaffId,
    pub email: String,
    pub full_name: String,
    pub station_id: StationId,
}
