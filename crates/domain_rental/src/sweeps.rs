//! Background sweeps
//!
//! Two daily batch jobs reuse the state machine's transition rules: a
//! late-return warning over active rentals and a cleanup of contracts whose
//! rental window expired before the vehicle was ever picked up. Each sweep
//! batches its qualifying contracts into one transaction.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use core_kernel::DomainError;

use crate::contract::ContractStatus;
use crate::notify;
use crate::ports::RentalTx;
use crate::services::{cancel_pending_invoices, finish_tx, RentalContractService};
use crate::vehicle::VehicleStatus;

const SWEEP_INTERVAL: Duration = Duration::from_secs(86_400);

impl RentalContractService {
    /// Warns customers whose rental is past its scheduled return time
    ///
    /// Returns the number of contracts warned.
    pub async fn late_return_warning_sweep(&self) -> Result<usize, DomainError> {
        let mut tx = self.store().begin().await?;
        let result = self.late_return_warning_in_tx(&mut *tx).await;
        finish_tx(tx, result).await
    }

    async fn late_return_warning_in_tx(
        &self,
        tx: &mut dyn RentalTx,
    ) -> Result<usize, DomainError> {
        let now = Utc::now();
        let active = tx
            .find_contracts_in_statuses(&[ContractStatus::Active])
            .await?;

        let mut warned = 0;
        for mut contract in active {
            let overdue = contract.actual_start.is_some()
                && contract.actual_end.is_none()
                && contract.period.has_ended(now);
            if !overdue {
                continue;
            }

            let customer = tx.get_customer(contract.customer_id).await?;
            let (subject, body) = notify::late_return_warning(&customer, &contract);
            self.notifier()
                .send_email(&customer.email, &subject, &body)
                .await?;

            if let Some(vehicle_id) = contract.vehicle_id {
                let mut vehicle = tx.get_vehicle(vehicle_id).await?;
                vehicle.status = VehicleStatus::LateReturn;
                tx.save_vehicle(&vehicle).await?;
            }
            contract.append_audit("late return warning sent");
            tx.save_contract(&contract).await?;
            warned += 1;
        }

        if warned > 0 {
            info!(warned, "late-return warnings sent");
        }
        Ok(warned)
    }

    /// Cancels contracts whose rental window expired before pickup
    ///
    /// Returns the number of contracts cancelled.
    pub async fn expired_contract_cleanup_sweep(&self) -> Result<usize, DomainError> {
        let mut tx = self.store().begin().await?;
        let result = self.expired_cleanup_in_tx(&mut *tx).await;
        finish_tx(tx, result).await
    }

    async fn expired_cleanup_in_tx(&self, tx: &mut dyn RentalTx) -> Result<usize, DomainError> {
        let now = Utc::now();
        let candidates = tx
            .find_contracts_in_statuses(&[
                ContractStatus::RequestPending,
                ContractStatus::PaymentPending,
                ContractStatus::Active,
            ])
            .await?;

        let mut cancelled = 0;
        for mut contract in candidates {
            let expired = contract.actual_start.is_none() && contract.period.has_ended(now);
            if !expired {
                continue;
            }

            let was_active = contract.status == ContractStatus::Active;
            contract.force_cancel("cancelled automatically: vehicle was never picked up")?;
            tx.save_contract(&contract).await?;
            cancel_pending_invoices(tx, contract.id).await?;

            if was_active {
                if let Some(vehicle_id) = contract.vehicle_id {
                    let others = tx.find_open_contracts_for_vehicle(vehicle_id).await?;
                    let still_claimed = others
                        .iter()
                        .any(|c| c.id != contract.id && c.status == ContractStatus::Active);
                    if !still_claimed {
                        let mut vehicle = tx.get_vehicle(vehicle_id).await?;
                        vehicle.status = VehicleStatus::Available;
                        tx.save_vehicle(&vehicle).await?;
                    }
                }
            }

            let customer = tx.get_customer(contract.customer_id).await?;
            let (subject, body) = notify::expired_cancelled(&customer, &contract);
            self.notifier()
                .send_email(&customer.email, &subject, &body)
                .await?;
            cancelled += 1;
        }

        if cancelled > 0 {
            info!(cancelled, "expired contracts cleaned up");
        }
        Ok(cancelled)
    }
}

/// Spawns the daily sweep task
///
/// Both sweeps run once immediately and then every 24 hours. A failing
/// sweep is logged and retried at the next tick; the task never aborts.
pub fn spawn_daily_sweeps(service: Arc<RentalContractService>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(err) = service.late_return_warning_sweep().await {
                warn!(error = %err, "late-return warning sweep failed");
            }
            if let Err(err) = service.expired_contract_cleanup_sweep().await {
                warn!(error = %err, "expired-contract cleanup sweep failed");
            }
        }
    })
}
