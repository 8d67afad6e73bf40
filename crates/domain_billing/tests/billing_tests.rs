//! Tests for rental billing entities and fee math

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{ContractId, Currency, DomainError, InvoiceId, Money, Rate};
use domain_billing::{
    amount_due, invoice_subtotal, Deposit, DepositStatus, Invoice, InvoiceItem, InvoiceItemKind,
    InvoiceKind, PaymentMethod,
};

const CUR: Currency = Currency::USD;

fn usd(amount: Decimal) -> Money {
    Money::new(amount, CUR)
}

fn item(invoice_id: InvoiceId, kind: InvoiceItemKind, qty: i64, price: Decimal) -> InvoiceItem {
    InvoiceItem::new(
        invoice_id,
        kind,
        format!("{:?}", kind),
        Decimal::from(qty),
        usd(price),
    )
}

// ============================================================================
// Amount-due formula
// ============================================================================

mod amount_due_tests {
    use super::*;

    #[test]
    fn test_handover_due_is_subtotal_plus_tax_plus_deposit() {
        let invoice = Invoice::new(
            ContractId::new(),
            InvoiceKind::Handover,
            usd(dec!(100)),
            Rate::new(dec!(0.1)),
        );
        let deposit = Deposit::new(invoice.id, usd(dec!(100)));

        let due = amount_due(&invoice, &[], Some(&deposit)).unwrap();
        assert_eq!(due, usd(dec!(210)));
    }

    #[test]
    fn test_reservation_due_is_subtotal_only_with_zero_tax() {
        let invoice = Invoice::new(
            ContractId::new(),
            InvoiceKind::Reservation,
            usd(dec!(5)),
            Rate::zero(),
        );

        assert_eq!(amount_due(&invoice, &[], None).unwrap(), usd(dec!(5)));
    }

    #[test]
    fn test_return_due_counts_late_items_on_top_of_the_subtotal() {
        let contract_id = ContractId::new();
        let invoice_shell = Invoice::new(contract_id, InvoiceKind::Return, usd(dec!(0)), Rate::zero());
        let items = vec![
            item(invoice_shell.id, InvoiceItemKind::Cleaning, 1, dec!(15)),
            item(invoice_shell.id, InvoiceItemKind::Damage, 1, dec!(40)),
            item(invoice_shell.id, InvoiceItemKind::LateReturn, 2, dec!(8)),
        ];
        let mut invoice = invoice_shell;
        invoice.subtotal = invoice_subtotal(CUR, &items).unwrap();

        // subtotal 55 (cleaning + damage) + 16 late
        assert_eq!(amount_due(&invoice, &items, None).unwrap(), usd(dec!(71)));
    }

    #[test]
    fn test_refund_due_never_goes_negative() {
        let mut invoice = Invoice::new(ContractId::new(), InvoiceKind::Refund, usd(dec!(300)), Rate::zero());
        let items = vec![item(invoice.id, InvoiceItemKind::Refund, 1, dec!(500))];
        invoice.tax_rate = Rate::zero();

        assert_eq!(amount_due(&invoice, &items, None).unwrap(), usd(dec!(0)));
    }

    #[test]
    fn test_refund_due_subtracts_when_total_covers_it() {
        let invoice = Invoice::new(ContractId::new(), InvoiceKind::Refund, usd(dec!(500)), Rate::zero());
        let items = vec![item(invoice.id, InvoiceItemKind::Refund, 1, dec!(300))];

        assert_eq!(amount_due(&invoice, &items, None).unwrap(), usd(dec!(200)));
    }

    #[test]
    fn test_handover_without_deposit_falls_back_to_subtotal_plus_tax() {
        let invoice = Invoice::new(
            ContractId::new(),
            InvoiceKind::Handover,
            usd(dec!(100)),
            Rate::new(dec!(0.1)),
        );

        assert_eq!(amount_due(&invoice, &[], None).unwrap(), usd(dec!(110)));
    }
}

// ============================================================================
// Subtotal exclusion rule
// ============================================================================

mod subtotal_tests {
    use super::*;

    #[test]
    fn test_late_return_and_refund_items_are_excluded() {
        let id = InvoiceId::new();
        let items = vec![
            item(id, InvoiceItemKind::BaseRental, 5, dec!(20)),
            item(id, InvoiceItemKind::Other, 1, dec!(5)),
            item(id, InvoiceItemKind::LateReturn, 10, dec!(8)),
            item(id, InvoiceItemKind::Refund, 1, dec!(100)),
        ];

        assert_eq!(invoice_subtotal(CUR, &items).unwrap(), usd(dec!(105)));
    }

    #[test]
    fn test_empty_item_list_yields_zero() {
        assert_eq!(invoice_subtotal(CUR, &[]).unwrap(), Money::zero(CUR));
    }
}

// ============================================================================
// Invoice settlement
// ============================================================================

mod settlement_tests {
    use super::*;

    #[test]
    fn test_paying_a_cancelled_invoice_fails() {
        let mut invoice =
            Invoice::new(ContractId::new(), InvoiceKind::Reservation, usd(dec!(5)), Rate::zero());
        invoice.cancel().unwrap();

        let result = invoice.mark_paid(usd(dec!(5)), Utc::now(), Some(PaymentMethod::Cash));
        assert!(matches!(result, Err(DomainError::Business(_))));
    }

    #[test]
    fn test_payment_stamps_method_and_time() {
        let mut invoice =
            Invoice::new(ContractId::new(), InvoiceKind::Return, usd(dec!(55)), Rate::zero());
        invoice
            .mark_paid(usd(dec!(71)), Utc::now(), Some(PaymentMethod::OnlineWallet))
            .unwrap();

        assert!(invoice.is_paid());
        assert_eq!(invoice.payment_method, Some(PaymentMethod::OnlineWallet));
        assert_eq!(invoice.paid_amount, Some(usd(dec!(71))));
    }
}

// ============================================================================
// Deposit lifecycle
// ============================================================================

mod deposit_tests {
    use super::*;

    #[test]
    fn test_deposit_starts_pending() {
        let deposit = Deposit::new(InvoiceId::new(), usd(dec!(100)));
        assert_eq!(deposit.status, DepositStatus::Pending);
        assert!(deposit.is_pending());
    }

    #[test]
    fn test_forfeited_deposit_cannot_be_refunded() {
        let mut deposit = Deposit::new(InvoiceId::new(), usd(dec!(100)));
        deposit.forfeit().unwrap();

        assert_eq!(deposit.status, DepositStatus::Forfeited);
        assert!(matches!(deposit.refund(), Err(DomainError::Business(_))));
    }
}

// ============================================================================
// Properties
// ============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_refund_due_is_never_negative(
            subtotal in 0i64..100_000i64,
            refund in 0i64..200_000i64
        ) {
            let invoice = Invoice::new(
                ContractId::new(),
                InvoiceKind::Refund,
                usd(Decimal::from(subtotal)),
                Rate::zero(),
            );
            let items = vec![item(invoice.id, InvoiceItemKind::Refund, 1, Decimal::from(refund))];

            let due = amount_due(&invoice, &items, None).unwrap();
            prop_assert!(!due.is_negative());
        }

        #[test]
        fn test_subtotal_is_insensitive_to_excluded_items(
            base in 0i64..100_000i64,
            late in 0i64..100_000i64
        ) {
            let id = InvoiceId::new();
            let with_late = vec![
                item(id, InvoiceItemKind::BaseRental, 1, Decimal::from(base)),
                item(id, InvoiceItemKind::LateReturn, 1, Decimal::from(late)),
            ];
            let without = vec![
                item(id, InvoiceItemKind::BaseRental, 1, Decimal::from(base)),
            ];

            prop_assert_eq!(
                invoice_subtotal(CUR, &with_late).unwrap(),
                invoice_subtotal(CUR, &without).unwrap()
            );
        }
    }
}
