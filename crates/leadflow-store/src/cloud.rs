//! The cloud store seam
//!
//! [`CloudStore`] models the logical tables of the shared backend (orgs,
//! org_members, leads, org_invites, lead_activity) plus the realtime
//! change channel. The engine is written against this trait; the in-memory
//! [`crate::MemoryCloud`] backs tests and local development, and a
//! production adapter implements it against the real service.
//!
//! Consistency contract: upserts are whole-record last-write-wins keyed by
//! lead id, there are no transactions, and the only operations the backend
//! must make atomic are the two conditional ones: `create_org_with_owner`
//! and `claim_invite`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadflow_model::{
    build_checklist, derive_stage, ActivityRecord, Invite, InviteCode, Lead, LeadId, Member,
    OrgId, UserId,
};
use tokio::sync::broadcast;

/// Errors from cloud operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CloudError {
    /// Transient backend failure (network, service)
    #[error("cloud backend error: {0}")]
    Backend(String),

    /// Conditional insert lost: the user already holds a membership
    #[error("membership already exists")]
    MembershipExists,

    /// No invite with that code
    #[error("invite code not found")]
    InviteNotFound,

    /// The invite's one-way claim has already happened
    #[error("invite code already used")]
    InviteRedeemed,
}

/// What kind of change a realtime event describes.
///
/// Consumers treat any event purely as a "re-pull now" trigger; the kind
/// exists for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A lead row was inserted or replaced
    Upsert,
    /// A lead row was removed
    Delete,
}

/// A change notification on an org's leads table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Org whose leads table changed
    pub org_id: OrgId,
    /// What happened
    pub kind: ChangeKind,
    /// The lead involved
    pub lead_id: LeadId,
}

/// Normalize a fetched lead row into the full Lead shape.
///
/// Defaults substitute for any absent optional field; in particular an
/// absent or empty checklist becomes a freshly built default checklist,
/// never null, and the stage is re-derived so the invariant holds even for
/// rows written by older clients.
#[must_use]
pub fn normalize_row(mut lead: Lead) -> Lead {
    if lead.checklist.is_empty() {
        lead.checklist = build_checklist();
    }
    if lead.created_iso.is_empty() {
        lead.created_iso = leadflow_model::today_iso();
    }
    lead.stage = derive_stage(&lead.checklist);
    lead
}

/// The cloud store's logical tables and realtime channel.
#[async_trait]
pub trait CloudStore: Send + Sync {
    /// All leads for an org, most-recently-updated first, normalized.
    async fn leads_for_org(&self, org_id: OrgId) -> Result<Vec<Lead>, CloudError>;

    /// Whole-record replace keyed by lead id (last-write-wins). Notifies
    /// the org's change channel.
    async fn upsert_lead(
        &self,
        org_id: OrgId,
        created_by: UserId,
        lead: &Lead,
    ) -> Result<(), CloudError>;

    /// Remove a lead, scoped by org and id. Notifies the change channel.
    async fn delete_lead(&self, org_id: OrgId, lead_id: LeadId) -> Result<(), CloudError>;

    /// The caller's membership row, if any.
    async fn membership_for_user(&self, user_id: UserId) -> Result<Option<Member>, CloudError>;

    /// Create an org owned by the user, inserting the owner membership row.
    ///
    /// Conditional: fails with [`CloudError::MembershipExists`] if the user
    /// concurrently acquired a membership, so two racing first-logins
    /// resolve to a single org. The backend must make this check-and-insert
    /// atomic.
    async fn create_org_with_owner(
        &self,
        name: &str,
        user_id: UserId,
        email: &str,
    ) -> Result<Member, CloudError>;

    /// Insert a membership row. Rejects duplicate (org, user) pairs with
    /// [`CloudError::MembershipExists`].
    async fn insert_member(&self, member: Member) -> Result<(), CloudError>;

    /// All members of an org. Callers must treat the result as unordered.
    async fn members_of(&self, org_id: OrgId) -> Result<Vec<Member>, CloudError>;

    /// Record a fresh, unredeemed invite.
    async fn insert_invite(&self, invite: Invite) -> Result<(), CloudError>;

    /// Atomically claim an invite: set redeemed_by/redeemed_at only if
    /// redeemed_by is currently null.
    ///
    /// # Errors
    /// - [`CloudError::InviteNotFound`] for an unknown code
    /// - [`CloudError::InviteRedeemed`] if the one-way claim already happened
    async fn claim_invite(
        &self,
        code: &InviteCode,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Invite, CloudError>;

    /// Append one activity record.
    async fn insert_activity(&self, record: ActivityRecord) -> Result<(), CloudError>;

    /// Most recent activity for a lead, newest first, at most `limit` rows.
    async fn recent_activity(
        &self,
        org_id: OrgId,
        lead_id: LeadId,
        limit: usize,
    ) -> Result<Vec<ActivityRecord>, CloudError>;

    /// Subscribe to change events on the org's leads table.
    ///
    /// The channel is lossy: a lagged receiver sees a `Lagged` error and
    /// should simply re-pull, which reconciles full state anyway.
    fn subscribe(&self, org_id: OrgId) -> broadcast::Receiver<ChangeEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadflow_model::Stage;

    #[test]
    fn normalize_fills_empty_checklist_and_rederives_stage() {
        let mut bare = Lead::new();
        bare.checklist.clear();
        bare.created_iso.clear();
        bare.stage = Stage::Payment; // stale persisted stage

        let normalized = normalize_row(bare);
        assert_eq!(normalized.checklist.len(), 14);
        assert!(!normalized.created_iso.is_empty());
        assert_eq!(normalized.stage, Stage::LeadIn);
    }

    #[test]
    fn normalize_preserves_populated_rows() {
        let lead = Lead::new();
        let normalized = normalize_row(lead.clone());
        assert_eq!(normalized, lead);
    }
}
