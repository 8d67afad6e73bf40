//! Handover and return checklists
//!
//! Checklists are captured and finalized by a collaborator subsystem; the
//! rental core reads them to gate the handover and to price damage on the
//! return invoice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ChecklistId, ChecklistItemId, ContractId, Money};

/// When in the lifecycle the checklist was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecklistKind {
    Handover,
    Return,
}

/// Condition record for one vehicle component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: ChecklistItemId,
    pub component: String,
    pub is_damaged: bool,
    /// Assessed damage charge, present only for damaged components
    pub damage_fee: Option<Money>,
    pub note: Option<String>,
}

/// A per-contract condition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checklist {
    pub id: ChecklistId,
    pub contract_id: ContractId,
    pub kind: ChecklistKind,
    /// Set on return checklists when the vehicle needs extended maintenance
    pub maintained_until: Option<DateTime<Utc>>,
    pub items: Vec<ChecklistItem>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Checklist {
    /// Items that carry a damage charge
    pub fn damaged_items(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.items
            .iter()
            .filter(|item| item.is_damaged && item.damage_fee.is_some())
    }
}
