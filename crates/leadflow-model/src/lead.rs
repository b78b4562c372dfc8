//! Leads and their checklists
//!
//! A [`Lead`] is one customer engagement tracked through the workflow. Its
//! checklist shape is fixed at creation from the standard template; its
//! `stage` is always the derivation of that checklist.

use crate::stage::{derive_stage, Stage};
use crate::workflow::build_checklist;
use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique lead identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LeadId(pub Uuid);

impl LeadId {
    /// Generate a new lead ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LeadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique checklist item identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    /// Generate a new item ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completion state of one checklist item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Not yet done
    #[default]
    NotStarted,
    /// Done
    Done,
}

impl ItemStatus {
    /// Stable snake_case key
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            ItemStatus::NotStarted => "not_started",
            ItemStatus::Done => "done",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One fixed task instance on a lead's checklist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Item identity
    pub id: ItemId,
    /// Stage the task belongs to
    pub stage: Stage,
    /// Responsible role label
    pub responsible: String,
    /// Task name
    pub task: String,
    /// Step description
    pub steps: String,
    /// Completion state
    #[serde(default)]
    pub status: ItemStatus,
    /// Optional due date (ISO day string, empty when unset)
    #[serde(default)]
    pub due_iso: String,
    /// Optional free-text notes
    #[serde(default)]
    pub notes: String,
}

/// Mutable fields of a checklist item.
///
/// Item identity, stage, responsible, task and steps are fixed at creation;
/// only these three fields may change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    /// New status, if changing
    pub status: Option<ItemStatus>,
    /// New due date, if changing
    pub due_iso: Option<String>,
    /// New notes, if changing
    pub notes: Option<String>,
}

impl ItemPatch {
    /// Patch that only sets the status.
    #[inline]
    #[must_use]
    pub fn status(status: ItemStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Apply the patch to an item.
    pub fn apply(&self, item: &mut ChecklistItem) {
        if let Some(status) = self.status {
            item.status = status;
        }
        if let Some(due) = &self.due_iso {
            item.due_iso = due.clone();
        }
        if let Some(notes) = &self.notes {
            item.notes = notes.clone();
        }
    }

    /// Short human-readable description, used in activity details.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(status) = self.status {
            parts.push(format!("status={status}"));
        }
        if let Some(due) = &self.due_iso {
            parts.push(format!("due={due}"));
        }
        if let Some(notes) = &self.notes {
            parts.push(format!("notes={notes}"));
        }
        parts.join(", ")
    }
}

/// Today's date as an ISO day string (local time).
#[must_use]
pub fn today_iso() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// The current instant as an ISO-8601 timestamp (UTC).
#[must_use]
pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

/// A customer engagement tracked through the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    /// Lead identity
    pub id: LeadId,
    /// Customer name
    #[serde(default)]
    pub customer_name: String,
    /// Customer phone
    #[serde(default)]
    pub phone: String,
    /// Customer address
    #[serde(default)]
    pub address: String,
    /// Where the lead came from
    #[serde(default)]
    pub source: String,
    /// Creation date (ISO day string)
    #[serde(default)]
    pub created_iso: String,
    /// Derived workflow stage; never set directly
    #[serde(default)]
    pub stage: Stage,
    /// Free-text notes
    #[serde(default)]
    pub notes: String,
    /// Optional next-action label
    #[serde(default)]
    pub next_action_label: String,
    /// Optional next-action due date
    #[serde(default)]
    pub next_action_due_iso: String,
    /// Fixed-shape checklist, stamped from the template at creation
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    /// Assignment label (member display name or free text)
    #[serde(default)]
    pub assigned_to: String,
    /// Team label
    #[serde(default)]
    pub team: String,
    /// Van label
    #[serde(default)]
    pub van: String,
    /// Last-write timestamp, None until first stamped
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Lead {
    /// Create a blank lead with a fresh checklist, created today.
    #[must_use]
    pub fn new() -> Self {
        let checklist = build_checklist();
        let stage = derive_stage(&checklist);
        Self {
            id: LeadId::new(),
            customer_name: String::new(),
            phone: String::new(),
            address: String::new(),
            source: String::new(),
            created_iso: today_iso(),
            stage,
            notes: String::new(),
            next_action_label: String::new(),
            next_action_due_iso: String::new(),
            checklist,
            assigned_to: String::new(),
            team: String::new(),
            van: String::new(),
            updated_at: Some(now_iso()),
        }
    }

    /// Copy of this lead with a fresh identity and a reset checklist.
    ///
    /// Customer fields carry over; item ids are regenerated, every status
    /// returns to not_started, the stage returns to the first stage, and
    /// next-action fields are cleared.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        copy.id = LeadId::new();
        copy.created_iso = today_iso();
        copy.customer_name = if self.customer_name.is_empty() {
            "Copy".to_string()
        } else {
            format!("{} (copy)", self.customer_name)
        };
        for item in &mut copy.checklist {
            item.id = ItemId::new();
            item.status = ItemStatus::NotStarted;
        }
        copy.stage = Stage::first();
        copy.next_action_label.clear();
        copy.next_action_due_iso.clear();
        copy.updated_at = Some(now_iso());
        copy
    }

    /// Recompute the derived stage from the checklist.
    pub fn refresh_stage(&mut self) {
        self.stage = derive_stage(&self.checklist);
    }
}

impl Default for Lead {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_lead_starts_at_first_stage_with_full_checklist() {
        let lead = Lead::new();
        assert_eq!(lead.stage, Stage::LeadIn);
        assert_eq!(lead.checklist.len(), 14);
        assert!(lead.updated_at.is_some());
    }

    #[test]
    fn duplicate_resets_progress_and_identity() {
        let mut lead = Lead::new();
        lead.customer_name = "Mrs Penrose".to_string();
        lead.next_action_label = "Call back".to_string();
        for item in &mut lead.checklist {
            item.status = ItemStatus::Done;
        }
        lead.refresh_stage();
        assert_eq!(lead.stage, Stage::Aftercare);

        let copy = lead.duplicate();
        assert_ne!(copy.id, lead.id);
        assert_eq!(copy.customer_name, "Mrs Penrose (copy)");
        assert_eq!(copy.stage, Stage::LeadIn);
        assert!(copy.next_action_label.is_empty());
        assert!(copy
            .checklist
            .iter()
            .all(|i| i.status == ItemStatus::NotStarted));
        for (a, b) in copy.checklist.iter().zip(lead.checklist.iter()) {
            assert_ne!(a.id, b.id);
            assert_eq!(a.task, b.task);
        }
    }

    #[test]
    fn duplicate_of_unnamed_lead_is_called_copy() {
        let lead = Lead::new();
        assert_eq!(lead.duplicate().customer_name, "Copy");
    }

    #[test]
    fn item_patch_applies_only_named_fields() {
        let mut lead = Lead::new();
        let patch = ItemPatch {
            status: Some(ItemStatus::Done),
            due_iso: Some("2026-09-01".to_string()),
            notes: None,
        };
        let before_notes = lead.checklist[0].notes.clone();
        patch.apply(&mut lead.checklist[0]);
        assert_eq!(lead.checklist[0].status, ItemStatus::Done);
        assert_eq!(lead.checklist[0].due_iso, "2026-09-01");
        assert_eq!(lead.checklist[0].notes, before_notes);
        assert_eq!(patch.describe(), "status=done, due=2026-09-01");
    }

    #[test]
    fn lead_round_trips_through_json() {
        let lead = Lead::new();
        let json = serde_json::to_string(&lead).unwrap();
        let back: Lead = serde_json::from_str(&json).unwrap();
        assert_eq!(back, lead);
    }

    #[test]
    fn missing_optional_fields_deserialize_to_defaults() {
        let json = format!(r#"{{"id":"{}"}}"#, Uuid::new_v4());
        let lead: Lead = serde_json::from_str(&json).unwrap();
        assert_eq!(lead.stage, Stage::LeadIn);
        assert!(lead.checklist.is_empty());
        assert!(lead.updated_at.is_none());
    }
}
