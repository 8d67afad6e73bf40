//! Background sweep tests over the in-memory store

use std::time::Duration;

use domain_billing::{Invoice, InvoiceKind, InvoiceStatus};
use domain_rental::{spawn_daily_sweeps, ContractStatus, VehicleStatus};
use test_utils::{extra_vehicle, ContractBuilder, MoneyFixtures, TemporalFixtures, TestEnv};

// ============================================================================
mod late_return_tests {
    use super::*;

    #[tokio::test]
    async fn test_overdue_rentals_are_warned_and_flagged() {
        let env = TestEnv::new();
        let world = env.seed_world();
        let contract = ContractBuilder::new(world.customer.id, world.vehicle.id, world.station_id)
            .with_period(TemporalFixtures::ended_period())
            .with_status(ContractStatus::Active)
            .started()
            .build();
        env.store.seed_contract(contract.clone());

        let warned = env.rentals.late_return_warning_sweep().await.unwrap();
        assert_eq!(warned, 1);

        let snapshot = env.store.snapshot();
        assert_eq!(
            snapshot.vehicles[&world.vehicle.id].status,
            VehicleStatus::LateReturn
        );
        assert!(snapshot.contracts[&contract.id]
            .description
            .contains("late return warning sent"));
        assert_eq!(env.notifier.sent_to(&world.customer.email).len(), 1);
    }

    #[tokio::test]
    async fn test_rentals_inside_their_window_are_left_alone() {
        let env = TestEnv::new();
        let world = env.seed_world();
        let contract = ContractBuilder::new(world.customer.id, world.vehicle.id, world.station_id)
            .with_period(TemporalFixtures::current_period())
            .with_status(ContractStatus::Active)
            .started()
            .build();
        env.store.seed_contract(contract);

        let warned = env.rentals.late_return_warning_sweep().await.unwrap();
        assert_eq!(warned, 0);
        assert!(env.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_returned_vehicles_are_not_warned() {
        let env = TestEnv::new();
        let world = env.seed_world();
        let contract = ContractBuilder::new(world.customer.id, world.vehicle.id, world.station_id)
            .with_period(TemporalFixtures::ended_period())
            .with_status(ContractStatus::Active)
            .started()
            .with_actual_end(chrono::Utc::now())
            .build();
        env.store.seed_contract(contract);

        let warned = env.rentals.late_return_warning_sweep().await.unwrap();
        assert_eq!(warned, 0);
    }
}

// ============================================================================
mod expired_cleanup_tests {
    use super::*;

    #[tokio::test]
    async fn test_expired_pending_requests_are_cancelled() {
        let env = TestEnv::new();
        let world = env.seed_world();
        let contract = ContractBuilder::new(world.customer.id, world.vehicle.id, world.station_id)
            .with_period(TemporalFixtures::ended_period())
            .with_status(ContractStatus::PaymentPending)
            .build();
        env.store.seed_contract(contract.clone());
        let handover = Invoice::new(
            contract.id,
            InvoiceKind::Handover,
            MoneyFixtures::usd(100),
            core_kernel::Rate::zero(),
        );
        env.store.seed_invoice(handover.clone());

        let cancelled = env.rentals.expired_contract_cleanup_sweep().await.unwrap();
        assert_eq!(cancelled, 1);

        let snapshot = env.store.snapshot();
        let cleaned = &snapshot.contracts[&contract.id];
        assert_eq!(cleaned.status, ContractStatus::Cancelled);
        assert!(cleaned.description.contains("never picked up"));
        assert_eq!(env.notifier.sent_to(&world.customer.email).len(), 1);
        assert_eq!(
            snapshot.invoices[&handover.id].status,
            InvoiceStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_never_picked_up_active_contract_releases_the_vehicle() {
        let env = TestEnv::new();
        let world = env.seed_world();
        // paid but never collected: active, no actual start
        let contract = ContractBuilder::new(world.customer.id, world.vehicle.id, world.station_id)
            .with_period(TemporalFixtures::ended_period())
            .with_status(ContractStatus::Active)
            .build();
        env.store.seed_contract(contract.clone());
        let mut vehicle = world.vehicle.clone();
        vehicle.status = VehicleStatus::Unavailable;
        env.store.seed_vehicle(vehicle);

        let cancelled = env.rentals.expired_contract_cleanup_sweep().await.unwrap();
        assert_eq!(cancelled, 1);

        let snapshot = env.store.snapshot();
        assert_eq!(
            snapshot.vehicles[&world.vehicle.id].status,
            VehicleStatus::Available
        );
    }

    #[tokio::test]
    async fn test_vehicle_stays_claimed_while_another_active_contract_holds_it() {
        let env = TestEnv::new();
        let world = env.seed_world();
        let expired = ContractBuilder::new(world.customer.id, world.vehicle.id, world.station_id)
            .with_period(TemporalFixtures::ended_period())
            .with_status(ContractStatus::Active)
            .build();
        let running = ContractBuilder::new(world.customer.id, world.vehicle.id, world.station_id)
            .with_period(TemporalFixtures::current_period())
            .with_status(ContractStatus::Active)
            .started()
            .build();
        env.store.seed_contract(expired.clone());
        env.store.seed_contract(running.clone());
        let mut vehicle = world.vehicle.clone();
        vehicle.status = VehicleStatus::Rented;
        env.store.seed_vehicle(vehicle);

        let cancelled = env.rentals.expired_contract_cleanup_sweep().await.unwrap();
        assert_eq!(cancelled, 1);

        let snapshot = env.store.snapshot();
        assert_eq!(snapshot.contracts[&expired.id].status, ContractStatus::Cancelled);
        assert_eq!(snapshot.contracts[&running.id].status, ContractStatus::Active);
        assert_eq!(
            snapshot.vehicles[&world.vehicle.id].status,
            VehicleStatus::Rented
        );
    }

    #[tokio::test]
    async fn test_started_rentals_are_not_expired() {
        let env = TestEnv::new();
        let world = env.seed_world();
        let contract = ContractBuilder::new(world.customer.id, world.vehicle.id, world.station_id)
            .with_period(TemporalFixtures::ended_period())
            .with_status(ContractStatus::Active)
            .started()
            .build();
        env.store.seed_contract(contract.clone());

        let cancelled = env.rentals.expired_contract_cleanup_sweep().await.unwrap();
        assert_eq!(cancelled, 0);
        assert_eq!(
            env.store.snapshot().contracts[&contract.id].status,
            ContractStatus::Active
        );
    }

    #[tokio::test]
    async fn test_both_sweeps_cover_disjoint_contracts() {
        let env = TestEnv::new();
        let world = env.seed_world();
        let second_vehicle = extra_vehicle(&env, &world);

        let overdue = ContractBuilder::new(world.customer.id, world.vehicle.id, world.station_id)
            .with_period(TemporalFixtures::ended_period())
            .with_status(ContractStatus::Active)
            .started()
            .build();
        let abandoned = ContractBuilder::new(world.customer.id, second_vehicle.id, world.station_id)
            .with_period(TemporalFixtures::ended_period())
            .with_status(ContractStatus::PaymentPending)
            .build();
        env.store.seed_contract(overdue.clone());
        env.store.seed_contract(abandoned.clone());

        assert_eq!(env.rentals.late_return_warning_sweep().await.unwrap(), 1);
        assert_eq!(env.rentals.expired_contract_cleanup_sweep().await.unwrap(), 1);

        let snapshot = env.store.snapshot();
        assert_eq!(snapshot.contracts[&overdue.id].status, ContractStatus::Active);
        assert_eq!(
            snapshot.contracts[&abandoned.id].status,
            ContractStatus::Cancelled
        );
    }
}

// ============================================================================
mod scheduler_tests {
    use super::*;

    #[tokio::test]
    async fn test_spawned_task_runs_the_sweeps_immediately() {
        let env = TestEnv::new();
        let world = env.seed_world();
        let contract = ContractBuilder::new(world.customer.id, world.vehicle.id, world.station_id)
            .with_period(TemporalFixtures::ended_period())
            .with_status(ContractStatus::Active)
            .started()
            .build();
        env.store.seed_contract(contract);

        let handle = spawn_daily_sweeps(env.rentals.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert_eq!(env.notifier.sent_to(&world.customer.email).len(), 1);
        assert_eq!(
            env.store.snapshot().vehicles[&world.vehicle.id].status,
            VehicleStatus::LateReturn
        );
    }
}
