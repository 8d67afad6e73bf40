//! Contract state-machine and query tests

use chrono::{Duration, TimeZone, Utc};
use core_kernel::{CustomerId, RentalPeriod, StaffId, StationId, VehicleId};
use domain_rental::{conflicts_with, ContractQuery, ContractStatus, RentalContract};

fn period(start_day: u32, end_day: u32) -> RentalPeriod {
    let start = Utc.with_ymd_and_hms(2025, 6, start_day, 9, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2025, 6, end_day, 9, 0, 0).unwrap();
    RentalPeriod::new(start, end).unwrap()
}

fn new_contract() -> RentalContract {
    RentalContract::new(
        CustomerId::new(),
        StationId::new(),
        VehicleId::new(),
        period(10, 15),
    )
}

// ============================================================================
mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_happy_path_runs_to_completed() {
        let mut c = new_contract();
        let staff = StaffId::new();

        c.approve().unwrap();
        assert_eq!(c.status, ContractStatus::PaymentPending);

        c.activate().unwrap();
        assert_eq!(c.status, ContractStatus::Active);

        assert!(c.record_signatures(true, true, staff, Utc::now()));
        assert!(c.actual_start.is_some());
        assert_eq!(c.handover_staff_id, Some(staff));

        c.mark_returned(staff, Utc::now()).unwrap();
        assert_eq!(c.status, ContractStatus::Returned);
        assert!(c.actual_end.is_some());

        c.complete().unwrap();
        assert_eq!(c.status, ContractStatus::Completed);
        assert!(c.is_terminal());
    }

    #[test]
    fn test_refund_branch_runs_to_completed() {
        let mut c = new_contract();
        c.approve().unwrap();
        c.activate().unwrap();
        c.mark_unavailable().unwrap();
        c.request_refund().unwrap();
        assert_eq!(c.status, ContractStatus::RefundPending);
        c.complete().unwrap();
        assert_eq!(c.status, ContractStatus::Completed);
    }

    #[test]
    fn test_swap_acceptance_reactivates() {
        let mut c = new_contract();
        c.approve().unwrap();
        c.activate().unwrap();
        c.mark_unavailable().unwrap();
        c.reactivate_after_swap().unwrap();
        assert_eq!(c.status, ContractStatus::Active);
    }

    #[test]
    fn test_second_return_is_rejected() {
        let mut c = new_contract();
        let staff = StaffId::new();
        c.approve().unwrap();
        c.activate().unwrap();
        c.mark_returned(staff, Utc::now()).unwrap();

        let again = c.mark_returned(staff, Utc::now());
        assert!(again.is_err());
        assert_eq!(c.status, ContractStatus::Returned);
    }

    #[test]
    fn test_customer_cannot_cancel_after_activation() {
        let mut c = new_contract();
        c.approve().unwrap();
        c.activate().unwrap();
        assert!(c.cancel_by_customer().is_err());
        assert_eq!(c.status, ContractStatus::Active);
    }

    #[test]
    fn test_signatures_one_at_a_time_start_the_rental_once_complete() {
        let mut c = new_contract();
        c.approve().unwrap();
        c.activate().unwrap();
        let staff = StaffId::new();

        assert!(!c.record_signatures(false, true, staff, Utc::now()));
        assert!(c.actual_start.is_none());
        assert!(c.signed_by_customer);
        assert!(!c.signed_by_staff);

        let started_at = Utc::now();
        assert!(c.record_signatures(true, false, staff, started_at));
        assert_eq!(c.actual_start, Some(started_at));
    }
}

// ============================================================================
mod conflict_predicate_tests {
    use super::*;

    #[test]
    fn test_overlap_within_ten_day_buffer_conflicts() {
        let vehicle = VehicleId::new();
        let mut winner = RentalContract::new(
            CustomerId::new(),
            StationId::new(),
            vehicle,
            period(10, 15),
        );
        winner.approve().unwrap();
        winner.activate().unwrap();

        let inside = RentalContract::new(
            CustomerId::new(),
            StationId::new(),
            vehicle,
            period(20, 22),
        );
        assert!(conflicts_with(&winner, &inside));

        let start = Utc.with_ymd_and_hms(2025, 6, 26, 0, 0, 0).unwrap();
        let outside = RentalContract::new(
            CustomerId::new(),
            StationId::new(),
            vehicle,
            RentalPeriod::new(start, start + Duration::days(2)).unwrap(),
        );
        assert!(!conflicts_with(&winner, &outside));
    }

    #[test]
    fn test_a_contract_never_conflicts_with_itself() {
        let c = new_contract();
        assert!(!conflicts_with(&c, &c));
    }
}

// ============================================================================
mod query_tests {
    use super::*;

    #[test]
    fn test_query_filters_compose() {
        let contract = new_contract();

        let all = ContractQuery::default();
        assert!(all.matches(&contract));

        let by_customer = ContractQuery {
            customer_id: Some(contract.customer_id),
            ..Default::default()
        };
        assert!(by_customer.matches(&contract));

        let wrong_station = ContractQuery {
            station_id: Some(StationId::new()),
            ..Default::default()
        };
        assert!(!wrong_station.matches(&contract));

        let by_status = ContractQuery {
            statuses: Some(vec![ContractStatus::RequestPending]),
            ..Default::default()
        };
        assert!(by_status.matches(&contract));

        let closed_only = ContractQuery {
            statuses: Some(vec![ContractStatus::Completed, ContractStatus::Cancelled]),
            ..Default::default()
        };
        assert!(!closed_only.matches(&contract));
    }
}
