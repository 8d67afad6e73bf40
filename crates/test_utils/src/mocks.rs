//! Mock collaborators
//!
//! Recording doubles for the payment gateway, the notification sender, and
//! object storage. Each can be flipped into a failing mode to exercise
//! rollback and compensation paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use core_kernel::{
    GatewayCallbackResult, GatewayPaymentRequest, GatewayRedirect, Money, NotificationSender,
    ObjectStorage, PaymentGateway, PortError, StoredObject,
};

/// One recorded email
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Recording notification sender
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<SentEmail>>,
    fail: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().expect("notifier lock poisoned").clone()
    }

    pub fn sent_to(&self, address: &str) -> Vec<SentEmail> {
        self.sent()
            .into_iter()
            .filter(|e| e.to == address)
            .collect()
    }
}

#[async_trait]
impl NotificationSender for MockNotifier {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), PortError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::connection("smtp unreachable"));
        }
        self.sent.lock().expect("notifier lock poisoned").push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: html_body.to_string(),
        });
        Ok(())
    }
}

/// Recording payment gateway
///
/// `verify_callback` decodes the JSON shape produced by
/// [`MockGateway::callback_payload`], mirroring a verified real callback.
#[derive(Default)]
pub struct MockGateway {
    requests: Mutex<Vec<GatewayPaymentRequest>>,
    fail_create: AtomicBool,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next_payments(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<GatewayPaymentRequest> {
        self.requests.lock().expect("gateway lock poisoned").clone()
    }

    /// Builds a callback payload as the gateway would send it
    pub fn callback_payload(
        order_id: &str,
        success: bool,
        amount: Money,
        paid_at: DateTime<Utc>,
    ) -> serde_json::Value {
        serde_json::to_value(GatewayCallbackResult {
            order_id: order_id.to_string(),
            success,
            amount,
            paid_at,
            transaction_ref: Uuid::new_v4().to_string(),
        })
        .expect("callback payload serializes")
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_payment(
        &self,
        request: GatewayPaymentRequest,
    ) -> Result<GatewayRedirect, PortError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(PortError::rejected("gateway", "payment creation refused"));
        }
        let redirect_url = format!("https://pay.test/checkout/{}", request.order_id);
        self.requests
            .lock()
            .expect("gateway lock poisoned")
            .push(request);
        Ok(GatewayRedirect { redirect_url })
    }

    fn verify_callback(
        &self,
        payload: &serde_json::Value,
    ) -> Result<GatewayCallbackResult, PortError> {
        serde_json::from_value(payload.clone())
            .map_err(|e| PortError::rejected("gateway", format!("bad callback: {}", e)))
    }
}

/// Recording object storage
#[derive(Default)]
pub struct MockStorage {
    objects: Mutex<Vec<StoredObject>>,
    deleted: Mutex<Vec<String>>,
    fail_upload: AtomicBool,
    fail_delete: AtomicBool,
}

impl MockStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next_uploads(&self, fail: bool) {
        self.fail_upload.store(fail, Ordering::SeqCst);
    }

    pub fn fail_next_deletes(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().expect("storage lock poisoned").clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().expect("storage lock poisoned").clone()
    }
}

#[async_trait]
impl ObjectStorage for MockStorage {
    async fn upload(&self, name: &str, _bytes: Vec<u8>) -> Result<StoredObject, PortError> {
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(PortError::connection("storage unreachable"));
        }
        let stored = StoredObject {
            url: format!("https://storage.test/{}", name),
            storage_id: Uuid::new_v4().to_string(),
        };
        self.objects
            .lock()
            .expect("storage lock poisoned")
            .push(stored.clone());
        Ok(stored)
    }

    async fn delete(&self, storage_id: &str) -> Result<(), PortError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(PortError::connection("storage unreachable"));
        }
        self.deleted
            .lock()
            .expect("storage lock poisoned")
            .push(storage_id.to_string());
        Ok(())
    }
}
