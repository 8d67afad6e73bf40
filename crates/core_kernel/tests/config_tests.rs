//! Tests for the business-variable snapshot and cache

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use core_kernel::{
    BusinessVariableKey, BusinessVariableSource, BusinessVariables, Currency, DomainError,
    PortError, VariableCache,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn full_snapshot(vat: Decimal) -> BusinessVariables {
    let mut values = HashMap::new();
    values.insert(BusinessVariableKey::LateReturnFeePerHour, dec!(8));
    values.insert(BusinessVariableKey::CleaningFee, dec!(15));
    values.insert(BusinessVariableKey::BaseVat, vat);
    values.insert(BusinessVariableKey::MaxLateReturnHours, dec!(2));
    values.insert(BusinessVariableKey::RentalContractBufferDay, dec!(1));
    values.insert(BusinessVariableKey::RefundCreationDelayDays, dec!(3));
    BusinessVariables::from_values(Currency::USD, values)
}

struct FixedSource(Decimal);

#[async_trait]
impl BusinessVariableSource for FixedSource {
    async fn load(&self) -> Result<BusinessVariables, PortError> {
        Ok(full_snapshot(self.0))
    }
}

struct BrokenSource;

#[async_trait]
impl BusinessVariableSource for BrokenSource {
    async fn load(&self) -> Result<BusinessVariables, PortError> {
        Err(PortError::connection("variables table unreachable"))
    }
}

#[test]
fn test_typed_accessors_read_the_snapshot() {
    let vars = full_snapshot(dec!(0.1));

    assert_eq!(vars.base_vat().unwrap().as_decimal(), dec!(0.1));
    assert_eq!(vars.cleaning_fee().unwrap().amount(), dec!(15));
    assert_eq!(vars.late_return_fee_per_hour().unwrap().amount(), dec!(8));
    assert_eq!(vars.max_late_return_hours().unwrap(), 2);
    assert_eq!(vars.rental_contract_buffer_days().unwrap(), 1);
    assert_eq!(vars.refund_creation_delay_days().unwrap(), 3);
}

#[test]
fn test_missing_variable_fails_fast() {
    let vars = BusinessVariables::from_values(Currency::USD, HashMap::new());
    let err = vars.base_vat().unwrap_err();
    assert!(matches!(err, DomainError::Configuration(_)));
}

// Environment loading runs inside one test so the RENTAL_* variables are
// never mutated concurrently.
#[test]
fn test_env_loading_requires_every_variable() {
    let vars = [
        ("RENTAL_LATE_RETURN_FEE_PER_HOUR", "8"),
        ("RENTAL_CLEANING_FEE", "15"),
        ("RENTAL_BASE_VAT", "0.1"),
        ("RENTAL_MAX_LATE_RETURN_HOURS", "2"),
        ("RENTAL_RENTAL_CONTRACT_BUFFER_DAY", "1"),
        ("RENTAL_REFUND_CREATION_DELAY_DAYS", "3"),
    ];
    for (key, value) in vars {
        std::env::set_var(key, value);
    }

    let loaded = BusinessVariables::from_env(Currency::USD).unwrap();
    assert_eq!(loaded.currency(), Currency::USD);
    assert_eq!(loaded.base_vat().unwrap().as_decimal(), dec!(0.1));
    assert_eq!(loaded.cleaning_fee().unwrap().amount(), dec!(15));
    assert_eq!(loaded.late_return_fee_per_hour().unwrap().amount(), dec!(8));
    assert_eq!(loaded.max_late_return_hours().unwrap(), 2);
    assert_eq!(loaded.rental_contract_buffer_days().unwrap(), 1);
    assert_eq!(loaded.refund_creation_delay_days().unwrap(), 3);

    std::env::remove_var("RENTAL_BASE_VAT");
    let err = BusinessVariables::from_env(Currency::USD).unwrap_err();
    assert!(matches!(err, DomainError::Configuration(_)));

    for (key, _) in vars {
        std::env::remove_var(key);
    }
}

#[tokio::test]
async fn test_reload_swaps_the_snapshot() {
    let cache = VariableCache::new(full_snapshot(dec!(0.1)));
    assert_eq!(cache.current().base_vat().unwrap().as_decimal(), dec!(0.1));

    cache.reload(&FixedSource(dec!(0.2))).await.unwrap();
    assert_eq!(cache.current().base_vat().unwrap().as_decimal(), dec!(0.2));
}

#[tokio::test]
async fn test_failed_reload_keeps_the_old_snapshot() {
    let cache = VariableCache::new(full_snapshot(dec!(0.1)));
    let before = cache.current();

    let result = cache.reload(&BrokenSource).await;
    assert!(result.is_err());
    assert!(Arc::ptr_eq(&before, &cache.current()));
}
