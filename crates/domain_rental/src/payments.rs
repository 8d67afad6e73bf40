//! Invoice and payment engine
//!
//! Settles the four invoice kinds by cash, by gateway redirect plus
//! callback, or (for refunds) by attaching proof of payment. Side effects on
//! the owning contract and its sibling invoices happen in the same
//! transaction as the settlement itself.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use core_kernel::{
    ActingIdentity, ChecklistItemId, ContractId, DomainError, GatewayPaymentRequest,
    GatewayRedirect, InvoiceId, Money, NotificationSender, ObjectStorage, PaymentGateway, Rate,
    VariableCache,
};
use domain_billing::{
    amount_due, invoice_subtotal, Invoice, InvoiceItem, InvoiceItemKind, InvoiceKind,
    PaymentMethod,
};

use crate::conflict::activate_contract;
use crate::contract::ContractStatus;
use crate::notify;
use crate::ports::{PaymentLink, RentalStore, RentalTx};
use crate::services::finish_tx;

/// A line item supplied to ad-hoc invoice creation
#[derive(Debug, Clone)]
pub struct NewInvoiceItem {
    pub kind: InvoiceItemKind,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Money,
    pub checklist_item_id: Option<ChecklistItemId>,
}

/// Request payload for ad-hoc invoice creation (mainly refunds)
#[derive(Debug, Clone)]
pub struct CreateInvoiceRequest {
    pub contract_id: ContractId,
    pub kind: InvoiceKind,
    pub items: Vec<NewInvoiceItem>,
    pub notes: Option<String>,
}

/// Settles invoices and keeps contract and sibling state consistent
pub struct InvoiceService {
    store: Arc<dyn RentalStore>,
    notifier: Arc<dyn NotificationSender>,
    gateway: Arc<dyn PaymentGateway>,
    storage: Arc<dyn ObjectStorage>,
    variables: Arc<VariableCache>,
}

impl InvoiceService {
    pub fn new(
        store: Arc<dyn RentalStore>,
        notifier: Arc<dyn NotificationSender>,
        gateway: Arc<dyn PaymentGateway>,
        storage: Arc<dyn ObjectStorage>,
        variables: Arc<VariableCache>,
    ) -> Self {
        Self {
            store,
            notifier,
            gateway,
            storage,
            variables,
        }
    }

    /// Required settlement amount of an invoice, inside the caller's
    /// transaction
    async fn amount_due_in_tx(
        tx: &dyn RentalTx,
        invoice: &Invoice,
    ) -> Result<Money, DomainError> {
        let items = tx.find_invoice_items(invoice.id).await?;
        let deposit = if invoice.kind == InvoiceKind::Handover {
            tx.find_deposit_for_invoice(invoice.id).await?
        } else {
            None
        };
        amount_due(invoice, &items, deposit.as_ref())
    }

    /// Contract and sibling-invoice side effects of a settled invoice
    async fn settle_side_effects(
        &self,
        tx: &mut dyn RentalTx,
        invoice: &Invoice,
    ) -> Result<(), DomainError> {
        let mut contract = tx.get_contract(invoice.contract_id).await?;
        match invoice.kind {
            InvoiceKind::Handover => {
                for mut sibling in tx.find_invoices_for_contract(contract.id).await? {
                    if sibling.kind == InvoiceKind::Reservation && sibling.is_pending() {
                        sibling.cancel()?;
                        tx.save_invoice(&sibling).await?;
                    }
                }
                if contract.status == ContractStatus::PaymentPending {
                    activate_contract(tx, &mut contract, self.notifier.as_ref()).await?;
                }
            }
            InvoiceKind::Reservation => {
                if contract.status == ContractStatus::PaymentPending {
                    activate_contract(tx, &mut contract, self.notifier.as_ref()).await?;
                }
            }
            InvoiceKind::Return => {
                contract.complete()?;
                tx.save_contract(&contract).await?;
            }
            InvoiceKind::Refund => {
                if contract.status != ContractStatus::RefundPending {
                    return Err(DomainError::business(format!(
                        "contract {} is not awaiting a refund",
                        contract.id
                    )));
                }
                contract.complete()?;
                tx.save_contract(&contract).await?;
            }
        }
        Ok(())
    }

    /// Cash settlement at the counter
    ///
    /// The amount must cover the required total; a refund total can
    /// legitimately be zero.
    pub async fn pay_manual(
        &self,
        _actor: &ActingIdentity,
        invoice_id: InvoiceId,
        amount: Money,
    ) -> Result<Invoice, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = self.pay_manual_in_tx(&mut *tx, invoice_id, amount).await;
        finish_tx(tx, result).await
    }

    async fn pay_manual_in_tx(
        &self,
        tx: &mut dyn RentalTx,
        invoice_id: InvoiceId,
        amount: Money,
    ) -> Result<Invoice, DomainError> {
        let mut invoice = tx.get_invoice(invoice_id).await?;
        let due = Self::amount_due_in_tx(tx, &invoice).await?;
        if amount.checked_sub(&due)?.is_negative() {
            return Err(DomainError::bad_request(format!(
                "payment of {} does not cover the required {}",
                amount, due
            )));
        }

        invoice.mark_paid(amount, Utc::now(), Some(PaymentMethod::Cash))?;
        tx.save_invoice(&invoice).await?;
        self.settle_side_effects(tx, &invoice).await?;

        info!(invoice_id = %invoice.id, kind = ?invoice.kind, "invoice paid in cash");
        Ok(invoice)
    }

    /// Opens an online payment at the gateway and returns the redirect
    ///
    /// The only local write is the payment-link record; everything else
    /// waits for the callback.
    pub async fn pay_online(
        &self,
        _actor: &ActingIdentity,
        invoice_id: InvoiceId,
        fallback_url: &str,
    ) -> Result<GatewayRedirect, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = self.pay_online_in_tx(&mut *tx, invoice_id, fallback_url).await;
        finish_tx(tx, result).await
    }

    async fn pay_online_in_tx(
        &self,
        tx: &mut dyn RentalTx,
        invoice_id: InvoiceId,
        fallback_url: &str,
    ) -> Result<GatewayRedirect, DomainError> {
        let invoice = tx.get_invoice(invoice_id).await?;
        if !invoice.is_pending() {
            return Err(DomainError::business(format!(
                "invoice {} is already settled",
                invoice.id
            )));
        }
        let due = Self::amount_due_in_tx(tx, &invoice).await?;

        let order_id = format!(
            "{}-{}",
            Uuid::new_v4().simple(),
            Utc::now().timestamp_millis()
        );
        let redirect = self
            .gateway
            .create_payment(GatewayPaymentRequest {
                amount: due,
                order_id: order_id.clone(),
                description: format!("Invoice {}", invoice.id),
                fallback_url: fallback_url.to_string(),
            })
            .await?;

        let link = PaymentLink::new(invoice.id, order_id, due);
        tx.save_payment_link(&link).await?;

        info!(invoice_id = %invoice.id, order_id = %link.order_id, "online payment opened");
        Ok(redirect)
    }

    /// Handles a verified gateway callback
    ///
    /// A failed payment only removes the pending payment link; a successful
    /// one settles the invoice with the gateway-reported amount and time.
    pub async fn handle_gateway_callback(
        &self,
        payload: &serde_json::Value,
    ) -> Result<Invoice, DomainError> {
        let callback = self.gateway.verify_callback(payload)?;

        let mut tx = self.store.begin().await?;
        let link = match tx.find_payment_link_by_order(&callback.order_id).await {
            Ok(Some(link)) => link,
            Ok(None) => {
                let err = DomainError::not_found(format!(
                    "no payment link for order {}",
                    callback.order_id
                ));
                return finish_tx(tx, Err(err)).await;
            }
            Err(e) => return finish_tx(tx, Err(e.into())).await,
        };

        if !callback.success {
            let result = async {
                tx.delete_payment_link(link.id).await?;
                Ok(())
            }
            .await;
            finish_tx(tx, result).await?;
            warn!(order_id = %callback.order_id, "gateway reported a failed payment");
            return Err(DomainError::business("gateway payment failed"));
        }

        let result = self.callback_success_in_tx(&mut *tx, &link, &callback).await;
        finish_tx(tx, result).await
    }

    async fn callback_success_in_tx(
        &self,
        tx: &mut dyn RentalTx,
        link: &PaymentLink,
        callback: &core_kernel::GatewayCallbackResult,
    ) -> Result<Invoice, DomainError> {
        let mut invoice = tx.get_invoice(link.invoice_id).await?;
        invoice.mark_paid(
            callback.amount,
            callback.paid_at,
            Some(PaymentMethod::OnlineWallet),
        )?;
        tx.save_invoice(&invoice).await?;
        self.settle_side_effects(tx, &invoice).await?;
        tx.delete_payment_link(link.id).await?;

        let contract = tx.get_contract(invoice.contract_id).await?;
        let customer = tx.get_customer(contract.customer_id).await?;
        let (subject, body) = notify::payment_confirmed(&customer, &invoice);
        self.notifier
            .send_email(&customer.email, &subject, &body)
            .await?;

        info!(
            invoice_id = %invoice.id,
            transaction_ref = %callback.transaction_ref,
            "online payment settled"
        );
        Ok(invoice)
    }

    /// Ad-hoc invoice creation, mainly for refunds
    ///
    /// A refund invoice releases the deposit when items are supplied; an
    /// empty item list forfeits it instead.
    pub async fn create_invoice(
        &self,
        _actor: &ActingIdentity,
        request: CreateInvoiceRequest,
    ) -> Result<Invoice, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = self.create_invoice_in_tx(&mut *tx, request).await;
        finish_tx(tx, result).await
    }

    async fn create_invoice_in_tx(
        &self,
        tx: &mut dyn RentalTx,
        request: CreateInvoiceRequest,
    ) -> Result<Invoice, DomainError> {
        if matches!(
            request.kind,
            InvoiceKind::Handover | InvoiceKind::Reservation
        ) {
            return Err(DomainError::bad_request(
                "handover and reservation invoices are created with the contract",
            ));
        }
        let contract = tx.get_contract(request.contract_id).await?;

        let vars = self.variables.current();
        if request.kind == InvoiceKind::Refund && contract.status == ContractStatus::Returned {
            let delay_days = vars.refund_creation_delay_days()?;
            let actual_end = contract.actual_end.ok_or_else(|| {
                DomainError::business("returned contract has no actual end date")
            })?;
            let earliest = actual_end + chrono::Duration::days(delay_days);
            if Utc::now() < earliest {
                return Err(DomainError::business(format!(
                    "refund for contract {} may only be created after {}",
                    contract.id, earliest
                )));
            }
        }

        let mut invoice = Invoice::new(
            request.contract_id,
            request.kind,
            Money::zero(vars.currency()),
            Rate::zero(),
        );
        if let Some(notes) = &request.notes {
            invoice.append_note(notes);
        }

        let mut items = Vec::with_capacity(request.items.len());
        for new_item in &request.items {
            if let Some(checklist_item_id) = new_item.checklist_item_id {
                tx.get_checklist_item(checklist_item_id).await?;
            }
            let mut item = InvoiceItem::new(
                invoice.id,
                new_item.kind,
                new_item.description.clone(),
                new_item.quantity,
                new_item.unit_price,
            );
            item.checklist_item_id = new_item.checklist_item_id;
            items.push(item);
        }

        if request.kind == InvoiceKind::Refund {
            let handover = tx
                .find_invoices_for_contract(contract.id)
                .await?
                .into_iter()
                .find(|i| i.kind == InvoiceKind::Handover);
            if let Some(handover) = handover {
                if let Some(mut deposit) = tx.find_deposit_for_invoice(handover.id).await? {
                    if request.items.is_empty() {
                        deposit.forfeit()?;
                    } else {
                        items.push(InvoiceItem::new(
                            invoice.id,
                            InvoiceItemKind::Refund,
                            "Deposit release",
                            Decimal::ONE,
                            deposit.amount,
                        ));
                        deposit.refund()?;
                    }
                    tx.save_deposit(&deposit).await?;
                }
            }
        }

        invoice.subtotal = invoice_subtotal(vars.currency(), &items)?;
        tx.save_invoice(&invoice).await?;
        for item in &items {
            tx.save_invoice_item(item).await?;
        }

        info!(invoice_id = %invoice.id, kind = ?invoice.kind, "ad-hoc invoice created");
        Ok(invoice)
    }

    /// Appends to the invoice notes
    pub async fn update_note(
        &self,
        invoice_id: InvoiceId,
        note: &str,
    ) -> Result<Invoice, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let mut invoice = tx.get_invoice(invoice_id).await?;
            invoice.append_note(note);
            tx.save_invoice(&invoice).await?;
            Ok(invoice)
        }
        .await;
        finish_tx(tx, result).await
    }

    /// Attaches proof of payment to a pending refund invoice
    ///
    /// The attachment is the payment action: the invoice is marked Paid at
    /// the computed total, and a RefundPending contract completes. If the
    /// settlement fails after the object was stored, the stored object is
    /// deleted best-effort.
    pub async fn upload_image(
        &self,
        invoice_id: InvoiceId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, DomainError> {
        let mut tx = self.store.begin().await?;

        let prepared = async {
            let invoice = tx.get_invoice(invoice_id).await?;
            if invoice.kind != InvoiceKind::Refund || !invoice.is_pending() {
                return Err(DomainError::business(
                    "proof of payment applies only to pending refund invoices",
                ));
            }
            let due = Self::amount_due_in_tx(&*tx, &invoice).await?;
            Ok((invoice, due))
        }
        .await;
        let (mut invoice, due) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => return finish_tx(tx, Err(err)).await,
        };

        let stored = self.storage.upload(file_name, bytes).await?;

        let result = async {
            invoice.mark_paid(due, Utc::now(), None)?;
            invoice.append_note(&format!(
                "proof of payment: {} (object {})",
                stored.url, stored.storage_id
            ));
            tx.save_invoice(&invoice).await?;

            let mut contract = tx.get_contract(invoice.contract_id).await?;
            if contract.status == ContractStatus::RefundPending {
                contract.complete()?;
                tx.save_contract(&contract).await?;
            }
            Ok(stored.url.clone())
        }
        .await;

        match finish_tx(tx, result).await {
            Ok(url) => Ok(url),
            Err(err) => {
                if let Err(cleanup) = self.storage.delete(&stored.storage_id).await {
                    warn!(
                        storage_id = %stored.storage_id,
                        error = %cleanup,
                        "failed to delete orphaned proof-of-payment object"
                    );
                }
                Err(err)
            }
        }
    }

    /// Removes a stored evidence object and records the removal
    pub async fn delete_image(
        &self,
        invoice_id: InvoiceId,
        storage_id: &str,
    ) -> Result<(), DomainError> {
        self.storage.delete(storage_id).await?;

        let mut tx = self.store.begin().await?;
        let result = async {
            let mut invoice = tx.get_invoice(invoice_id).await?;
            invoice.append_note(&format!("evidence image {} removed", storage_id));
            tx.save_invoice(&invoice).await?;
            Ok(())
        }
        .await;
        finish_tx(tx, result).await
    }
}
