//! Conflict arbitration between reservations on the same vehicle
//!
//! When a contract is activated it wins the vehicle outright. Every other
//! pending reservation whose window falls inside the winner's buffered
//! window is cancelled and its customer is notified. The buffer is fixed at
//! ten days on both sides, independent of the configurable booking buffer.

use tracing::info;

use core_kernel::{DomainError, NotificationSender};

use crate::contract::{ContractStatus, RentalContract};
use crate::notify;
use crate::ports::RentalTx;
use crate::services::cancel_pending_invoices;
use crate::vehicle::VehicleStatus;

/// Days added on both sides of the winner's period when arbitrating
pub const CONFLICT_BUFFER_DAYS: i64 = 10;

/// True when `other` loses to an activation of `winner`
///
/// Losers are the other non-terminal contracts on the same vehicle whose
/// period touches the winner's period widened by [`CONFLICT_BUFFER_DAYS`].
pub fn conflicts_with(winner: &RentalContract, other: &RentalContract) -> bool {
    if other.id == winner.id {
        return false;
    }
    if other.vehicle_id.is_none() || other.vehicle_id != winner.vehicle_id {
        return false;
    }
    if other.status.is_terminal() {
        return false;
    }
    winner
        .period
        .widen_days(CONFLICT_BUFFER_DAYS)
        .overlaps(&other.period)
}

/// Cancels every reservation that loses to the freshly activated contract
pub async fn cancel_conflicting(
    tx: &mut dyn RentalTx,
    winner: &RentalContract,
    notifier: &dyn NotificationSender,
) -> Result<(), DomainError> {
    let vehicle_id = match winner.vehicle_id {
        Some(id) => id,
        None => return Ok(()),
    };

    let candidates = tx.find_open_contracts_for_vehicle(vehicle_id).await?;
    for mut other in candidates {
        if !conflicts_with(winner, &other) {
            continue;
        }
        other.force_cancel(&format!(
            "cancelled automatically: vehicle booked by contract {}",
            winner.id
        ))?;
        tx.save_contract(&other).await?;
        cancel_pending_invoices(tx, other.id).await?;

        info!(
            contract_id = %other.id,
            winner_id = %winner.id,
            "reservation cancelled by conflict arbitration"
        );

        let customer = tx.get_customer(other.customer_id).await?;
        let (subject, body) = notify::conflict_cancelled(&customer, &other);
        notifier.send_email(&customer.email, &subject, &body).await?;
    }
    Ok(())
}

/// Shared activation routine
///
/// Re-checks the vehicle, reserves it, flips the contract to Active and
/// arbitrates conflicts. Used by both the first activation (payment
/// received) and the reactivation after a vehicle swap.
pub async fn activate_contract(
    tx: &mut dyn RentalTx,
    contract: &mut RentalContract,
    notifier: &dyn NotificationSender,
) -> Result<(), DomainError> {
    let vehicle_id = contract
        .vehicle_id
        .ok_or_else(|| DomainError::business("contract has no vehicle bound"))?;

    let mut vehicle = tx.get_vehicle(vehicle_id).await?;
    if !vehicle.is_available() {
        return Err(DomainError::business(format!(
            "vehicle {} is no longer available",
            vehicle.id
        )));
    }
    vehicle.status = VehicleStatus::Unavailable;
    tx.save_vehicle(&vehicle).await?;

    match contract.status {
        ContractStatus::UnavailableVehicle => contract.reactivate_after_swap()?,
        _ => contract.activate()?,
    }
    tx.save_contract(contract).await?;

    cancel_conflicting(tx, contract, notifier).await
}
