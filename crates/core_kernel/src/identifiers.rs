//! Strongly-typed identifiers for domain entities
//!
//! Newtype wrappers around UUIDs prevent a contract id from ever being
//! passed where an invoice id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Rental domain identifiers
define_id!(ContractId, "CTR");
define_id!(VehicleId, "VEH");
define_id!(VehicleModelId, "MOD");
define_id!(StationId, "STA");
define_id!(ChecklistId, "CHK");
define_id!(ChecklistItemId, "CHKI");

// Party identifiers
define_id!(CustomerId, "CUS");
define_id!(StaffId, "STF");

// Billing domain identifiers
define_id!(InvoiceId, "INV");
define_id!(InvoiceItemId, "ITM");
define_id!(DepositId, "DEP");
define_id!(PaymentLinkId, "PLK");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_id_display_carries_prefix() {
        let id = ContractId::new();
        assert!(id.to_string().starts_with("CTR-"));
    }

    #[test]
    fn test_id_round_trips_through_display() {
        let original = InvoiceId::new();
        let parsed: InvoiceId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_uuid_conversion() {
        let uuid = Uuid::new_v4();
        let id = VehicleId::from(uuid);
        let back: Uuid = id.into();
        assert_eq!(uuid, back);
    }
}
