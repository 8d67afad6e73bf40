//! Customer-facing email content
//!
//! Plain HTML bodies with `{{placeholder}}` substitution. Senders pass the
//! rendered subject/body pair straight to the notification port; delivery
//! failures surface as port errors at the call site.

use core_kernel::render_template;
use domain_billing::Invoice;

use crate::contract::RentalContract;
use crate::party::Customer;

const APPROVED_SUBJECT: &str = "Your rental request was approved";
const APPROVED_BODY: &str = "<p>Hi {{name}},</p>\
<p>Your rental request {{contract}} has been approved. Please complete the \
payment to confirm your booking.</p>";

const REJECTED_SUBJECT: &str = "Your rental request was rejected";
const REJECTED_BODY: &str = "<p>Hi {{name}},</p>\
<p>Unfortunately your rental request {{contract}} was rejected.</p>\
<p>Reason: {{reason}}</p>";

const CONFLICT_SUBJECT: &str = "Your reservation was cancelled";
const CONFLICT_BODY: &str = "<p>Hi {{name}},</p>\
<p>Your reservation {{contract}} was cancelled because the vehicle has been \
booked by another confirmed rental. Any payment you made will be refunded.</p>";

const MAINTENANCE_CANCELLED_SUBJECT: &str = "Your reservation was cancelled";
const MAINTENANCE_CANCELLED_BODY: &str = "<p>Hi {{name}},</p>\
<p>Your reservation {{contract}} was cancelled because the vehicle is \
undergoing maintenance during your rental window. Any payment you made will \
be refunded.</p>";

const SWAPPED_SUBJECT: &str = "Your rental vehicle was replaced";
const SWAPPED_BODY: &str = "<p>Hi {{name}},</p>\
<p>The vehicle for your rental {{contract}} needed maintenance. We assigned \
you a replacement vehicle with license plate {{plate}}.</p>";

const RESOLUTION_SUBJECT: &str = "Action needed on your rental";
const RESOLUTION_BODY: &str = "<p>Hi {{name}},</p>\
<p>The vehicle for your rental {{contract}} became unavailable and no \
replacement could be assigned. Please choose between keeping a later \
replacement or requesting a refund.</p>";

const PAYMENT_CONFIRMED_SUBJECT: &str = "Payment received";
const PAYMENT_CONFIRMED_BODY: &str = "<p>Hi {{name}},</p>\
<p>We received your payment of {{amount}} for invoice {{invoice}}. Thank you.</p>";

const LATE_RETURN_SUBJECT: &str = "Your rental is overdue";
const LATE_RETURN_BODY: &str = "<p>Hi {{name}},</p>\
<p>The scheduled return time of your rental {{contract}} has passed. Please \
return the vehicle as soon as possible; late fees apply per hour.</p>";

const EXPIRED_SUBJECT: &str = "Your rental was cancelled";
const EXPIRED_BODY: &str = "<p>Hi {{name}},</p>\
<p>Your rental {{contract}} was cancelled because the vehicle was never \
picked up before the scheduled end of the rental window.</p>";

pub fn approved(customer: &Customer, contract: &RentalContract) -> (String, String) {
    (
        APPROVED_SUBJECT.to_string(),
        render_template(
            APPROVED_BODY,
            &[
                ("name", &customer.full_name),
                ("contract", &contract.id.to_string()),
            ],
        ),
    )
}

pub fn rejected(customer: &Customer, contract: &RentalContract, reason: &str) -> (String, String) {
    (
        REJECTED_SUBJECT.to_string(),
        render_template(
            REJECTED_BODY,
            &[
                ("name", &customer.full_name),
                ("contract", &contract.id.to_string()),
                ("reason", reason),
            ],
        ),
    )
}

pub fn conflict_cancelled(customer: &Customer, contract: &RentalContract) -> (String, String) {
    (
        CONFLICT_SUBJECT.to_string(),
        render_template(
            CONFLICT_BODY,
            &[
                ("name", &customer.full_name),
                ("contract", &contract.id.to_string()),
            ],
        ),
    )
}

pub fn maintenance_cancelled(customer: &Customer, contract: &RentalContract) -> (String, String) {
    (
        MAINTENANCE_CANCELLED_SUBJECT.to_string(),
        render_template(
            MAINTENANCE_CANCELLED_BODY,
            &[
                ("name", &customer.full_name),
                ("contract", &contract.id.to_string()),
            ],
        ),
    )
}

pub fn vehicle_swapped(
    customer: &Customer,
    contract: &RentalContract,
    plate: &str,
) -> (String, String) {
    (
        SWAPPED_SUBJECT.to_string(),
        render_template(
            SWAPPED_BODY,
            &[
                ("name", &customer.full_name),
                ("contract", &contract.id.to_string()),
                ("plate", plate),
            ],
        ),
    )
}

pub fn resolution_needed(customer: &Customer, contract: &RentalContract) -> (String, String) {
    (
        RESOLUTION_SUBJECT.to_string(),
        render_template(
            RESOLUTION_BODY,
            &[
                ("name", &customer.full_name),
                ("contract", &contract.id.to_string()),
            ],
        ),
    )
}

pub fn payment_confirmed(customer: &Customer, invoice: &Invoice) -> (String, String) {
    let amount = invoice
        .paid_amount
        .map(|m| m.to_string())
        .unwrap_or_default();
    (
        PAYMENT_CONFIRMED_SUBJECT.to_string(),
        render_template(
            PAYMENT_CONFIRMED_BODY,
            &[
                ("name", &customer.full_name),
                ("amount", &amount),
                ("invoice", &invoice.id.to_string()),
            ],
        ),
    )
}

pub fn late_return_warning(customer: &Customer, contract: &RentalContract) -> (String, String) {
    (
        LATE_RETURN_SUBJECT.to_string(),
        render_template(
            LATE_RETURN_BODY,
            &[
                ("name", &customer.full_name),
                ("contract", &contract.id.to_string()),
            ],
        ),
    )
}

pub fn expired_cancelled(customer: &Customer, contract: &RentalContract) -> (String, String) {
    (
        EXPIRED_SUBJECT.to_string(),
        render_template(
            EXPIRED_BODY,
            &[
                ("name", &customer.full_name),
                ("contract", &contract.id.to_string()),
            ],
        ),
    )
}
