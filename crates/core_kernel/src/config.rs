//! Cached business-variable configuration
//!
//! Business variables are loaded once at startup into an immutable snapshot.
//! A missing key at lookup time is a fatal configuration error, never a
//! recoverable business condition. The snapshot is only replaced through an
//! explicit reload.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::{Currency, Money, Rate};
use crate::ports::PortError;

/// Keys of the numeric business variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusinessVariableKey {
    LateReturnFeePerHour,
    CleaningFee,
    BaseVat,
    MaxLateReturnHours,
    RentalContractBufferDay,
    RefundCreationDelayDays,
}

impl BusinessVariableKey {
    pub fn name(&self) -> &'static str {
        match self {
            BusinessVariableKey::LateReturnFeePerHour => "LateReturnFeePerHour",
            BusinessVariableKey::CleaningFee => "CleaningFee",
            BusinessVariableKey::BaseVat => "BaseVAT",
            BusinessVariableKey::MaxLateReturnHours => "MaxLateReturnHours",
            BusinessVariableKey::RentalContractBufferDay => "RentalContractBufferDay",
            BusinessVariableKey::RefundCreationDelayDays => "RefundCreationDelayDays",
        }
    }
}

/// Immutable snapshot of the business variables
#[derive(Debug, Clone)]
pub struct BusinessVariables {
    currency: Currency,
    values: HashMap<BusinessVariableKey, Decimal>,
}

/// Environment representation of the snapshot, loaded with the `config` crate
#[derive(Debug, Clone, Deserialize)]
struct RawBusinessVariables {
    late_return_fee_per_hour: Decimal,
    cleaning_fee: Decimal,
    base_vat: Decimal,
    max_late_return_hours: Decimal,
    rental_contract_buffer_day: Decimal,
    refund_creation_delay_days: Decimal,
}

impl BusinessVariables {
    /// Builds a snapshot from explicit key/value pairs
    pub fn from_values(
        currency: Currency,
        values: HashMap<BusinessVariableKey, Decimal>,
    ) -> Self {
        Self { currency, values }
    }

    /// Loads the snapshot from environment variables prefixed `RENTAL_`
    ///
    /// Every variable is required; an absent one fails startup.
    pub fn from_env(currency: Currency) -> Result<Self, DomainError> {
        let raw: RawBusinessVariables = config::Config::builder()
            .add_source(config::Environment::with_prefix("RENTAL"))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| DomainError::configuration(e.to_string()))?;

        let mut values = HashMap::new();
        values.insert(
            BusinessVariableKey::LateReturnFeePerHour,
            raw.late_return_fee_per_hour,
        );
        values.insert(BusinessVariableKey::CleaningFee, raw.cleaning_fee);
        values.insert(BusinessVariableKey::BaseVat, raw.base_vat);
        values.insert(
            BusinessVariableKey::MaxLateReturnHours,
            raw.max_late_return_hours,
        );
        values.insert(
            BusinessVariableKey::RentalContractBufferDay,
            raw.rental_contract_buffer_day,
        );
        values.insert(
            BusinessVariableKey::RefundCreationDelayDays,
            raw.refund_creation_delay_days,
        );

        Ok(Self { currency, values })
    }

    /// Currency all monetary variables are denominated in
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Raw numeric lookup; fails fast on a missing key
    pub fn get(&self, key: BusinessVariableKey) -> Result<Decimal, DomainError> {
        self.values.get(&key).copied().ok_or_else(|| {
            DomainError::configuration(format!("business variable {} is not loaded", key.name()))
        })
    }

    fn get_i64(&self, key: BusinessVariableKey) -> Result<i64, DomainError> {
        self.get(key)?.to_i64().ok_or_else(|| {
            DomainError::configuration(format!(
                "business variable {} is not a whole number",
                key.name()
            ))
        })
    }

    pub fn late_return_fee_per_hour(&self) -> Result<Money, DomainError> {
        Ok(Money::new(
            self.get(BusinessVariableKey::LateReturnFeePerHour)?,
            self.currency,
        ))
    }

    pub fn cleaning_fee(&self) -> Result<Money, DomainError> {
        Ok(Money::new(
            self.get(BusinessVariableKey::CleaningFee)?,
            self.currency,
        ))
    }

    pub fn base_vat(&self) -> Result<Rate, DomainError> {
        Ok(Rate::new(self.get(BusinessVariableKey::BaseVat)?))
    }

    pub fn max_late_return_hours(&self) -> Result<i64, DomainError> {
        self.get_i64(BusinessVariableKey::MaxLateReturnHours)
    }

    pub fn rental_contract_buffer_days(&self) -> Result<i64, DomainError> {
        self.get_i64(BusinessVariableKey::RentalContractBufferDay)
    }

    pub fn refund_creation_delay_days(&self) -> Result<i64, DomainError> {
        self.get_i64(BusinessVariableKey::RefundCreationDelayDays)
    }
}

/// Source for (re)loading the business-variable snapshot from storage
#[async_trait]
pub trait BusinessVariableSource: Send + Sync {
    async fn load(&self) -> Result<BusinessVariables, PortError>;
}

/// Process-wide cache of the current snapshot
///
/// Readers always see a complete snapshot; `reload` swaps in a fresh one
/// atomically. Nothing mutates a snapshot in place.
pub struct VariableCache {
    inner: RwLock<Arc<BusinessVariables>>,
}

impl VariableCache {
    pub fn new(initial: BusinessVariables) -> Self {
        Self {
            inner: RwLock::new(Arc::new(initial)),
        }
    }

    /// Returns the current snapshot
    pub fn current(&self) -> Arc<BusinessVariables> {
        self.inner
            .read()
            .expect("variable cache lock poisoned")
            .clone()
    }

    /// Replaces the snapshot from the given source
    pub async fn reload(&self, source: &dyn BusinessVariableSource) -> Result<(), DomainError> {
        let fresh = source.load().await?;
        *self.inner.write().expect("variable cache lock poisoned") = Arc::new(fresh);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot() -> BusinessVariables {
        let mut values = HashMap::new();
        values.insert(BusinessVariableKey::BaseVat, dec!(0.1));
        values.insert(BusinessVariableKey::MaxLateReturnHours, dec!(2));
        BusinessVariables::from_values(Currency::USD, values)
    }

    #[test]
    fn test_lookup_returns_loaded_value() {
        let vars = snapshot();
        assert_eq!(vars.base_vat().unwrap().as_decimal(), dec!(0.1));
        assert_eq!(vars.max_late_return_hours().unwrap(), 2);
    }

    #[test]
    fn test_missing_key_is_a_configuration_error() {
        let vars = snapshot();
        assert!(matches!(
            vars.cleaning_fee(),
            Err(DomainError::Configuration(_))
        ));
    }

    #[test]
    fn test_cache_hands_out_the_same_snapshot_until_reload() {
        let cache = VariableCache::new(snapshot());
        let a = cache.current();
        let b = cache.current();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
