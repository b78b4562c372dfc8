//! In-memory reference backend
//!
//! Implements [`CloudStore`] over plain tables behind a single mutex. The
//! mutex is what makes the two conditional operations genuinely atomic,
//! standing in for the constraint the production backend must enforce.
//! Change notifications go out on bounded per-org broadcast channels, so
//! slow consumers lag and re-pull rather than block a writer.
//!
//! Supports one-shot failure injection and one-shot holds so tests can
//! exercise the non-fatal error paths and interleave competing calls.

use crate::cloud::{normalize_row, ChangeEvent, ChangeKind, CloudError, CloudStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use leadflow_model::{
    ActivityRecord, Invite, InviteCode, Lead, LeadId, Member, Org, OrgId, Role, UserId,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast, Notify};

const CHANGE_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Default)]
struct Tables {
    orgs: HashMap<OrgId, Org>,
    members: Vec<Member>,
    leads: HashMap<(OrgId, LeadId), StoredLead>,
    invites: HashMap<String, Invite>,
    activity: Vec<ActivityRecord>,
}

#[derive(Debug, Clone)]
struct StoredLead {
    #[allow(dead_code)]
    created_by: UserId,
    lead: Lead,
}

/// Handle for a one-shot hold placed by [`MemoryCloud::hold_next`].
///
/// `entered()` resolves once the held call has arrived and parked;
/// `release()` lets it proceed.
#[derive(Debug)]
pub struct HoldGate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl HoldGate {
    /// Wait until the held operation has arrived and parked.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the parked operation proceed.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// In-process [`CloudStore`] implementation.
#[derive(Debug, Default)]
pub struct MemoryCloud {
    tables: Mutex<Tables>,
    channels: DashMap<OrgId, broadcast::Sender<ChangeEvent>>,
    fail_once: Mutex<HashSet<&'static str>>,
    holds: Mutex<HashMap<&'static str, (Arc<Notify>, Arc<Notify>)>>,
}

impl MemoryCloud {
    /// Fresh, empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call to the named operation fail with a transient
    /// backend error. Operation names match the trait method names.
    pub fn fail_next(&self, op: &'static str) {
        self.fail_once.lock().insert(op);
    }

    /// Number of lead rows stored for an org.
    #[must_use]
    pub fn lead_row_count(&self, org_id: OrgId) -> usize {
        self.tables
            .lock()
            .leads
            .keys()
            .filter(|(org, _)| *org == org_id)
            .count()
    }

    /// Membership rows for a user across all orgs.
    #[must_use]
    pub fn memberships_of_user(&self, user_id: UserId) -> Vec<Member> {
        self.tables
            .lock()
            .members
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Number of orgs in existence.
    #[must_use]
    pub fn org_count(&self) -> usize {
        self.tables.lock().orgs.len()
    }

    /// Park the next call to the named operation until released, so a
    /// competing call can be interleaved while it is suspended. Operation
    /// names match the trait method names.
    pub fn hold_next(&self, op: &'static str) -> HoldGate {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        self.holds
            .lock()
            .insert(op, (Arc::clone(&entered), Arc::clone(&release)));
        HoldGate { entered, release }
    }

    fn check_fail(&self, op: &'static str) -> Result<(), CloudError> {
        if self.fail_once.lock().remove(op) {
            return Err(CloudError::Backend(format!("injected failure: {op}")));
        }
        Ok(())
    }

    async fn check_hold(&self, op: &'static str) {
        let hold = self.holds.lock().remove(op);
        if let Some((entered, release)) = hold {
            entered.notify_one();
            release.notified().await;
        }
    }

    fn notify(&self, org_id: OrgId, kind: ChangeKind, lead_id: LeadId) {
        if let Some(sender) = self.channels.get(&org_id) {
            // No receivers is fine; the next pull reconciles anyway
            let _ = sender.send(ChangeEvent {
                org_id,
                kind,
                lead_id,
            });
        }
    }
}

#[async_trait]
impl CloudStore for MemoryCloud {
    async fn leads_for_org(&self, org_id: OrgId) -> Result<Vec<Lead>, CloudError> {
        self.check_hold("leads_for_org").await;
        self.check_fail("leads_for_org")?;
        let tables = self.tables.lock();
        let mut leads: Vec<Lead> = tables
            .leads
            .iter()
            .filter(|((org, _), _)| *org == org_id)
            .map(|(_, row)| normalize_row(row.lead.clone()))
            .collect();
        // Most-recently-updated first; unstamped rows sink to the end
        leads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(leads)
    }

    async fn upsert_lead(
        &self,
        org_id: OrgId,
        created_by: UserId,
        lead: &Lead,
    ) -> Result<(), CloudError> {
        self.check_hold("upsert_lead").await;
        self.check_fail("upsert_lead")?;
        {
            let mut tables = self.tables.lock();
            tables.leads.insert(
                (org_id, lead.id),
                StoredLead {
                    created_by,
                    lead: lead.clone(),
                },
            );
        }
        self.notify(org_id, ChangeKind::Upsert, lead.id);
        Ok(())
    }

    async fn delete_lead(&self, org_id: OrgId, lead_id: LeadId) -> Result<(), CloudError> {
        self.check_hold("delete_lead").await;
        self.check_fail("delete_lead")?;
        {
            let mut tables = self.tables.lock();
            tables.leads.remove(&(org_id, lead_id));
        }
        self.notify(org_id, ChangeKind::Delete, lead_id);
        Ok(())
    }

    async fn membership_for_user(&self, user_id: UserId) -> Result<Option<Member>, CloudError> {
        self.check_hold("membership_for_user").await;
        self.check_fail("membership_for_user")?;
        Ok(self
            .tables
            .lock()
            .members
            .iter()
            .find(|m| m.user_id == user_id)
            .cloned())
    }

    async fn create_org_with_owner(
        &self,
        name: &str,
        user_id: UserId,
        email: &str,
    ) -> Result<Member, CloudError> {
        self.check_hold("create_org_with_owner").await;
        self.check_fail("create_org_with_owner")?;
        let mut tables = self.tables.lock();
        // Conditional insert: the membership check and the org creation
        // happen under one lock, which is the atomicity the backend owes us
        if tables.members.iter().any(|m| m.user_id == user_id) {
            return Err(CloudError::MembershipExists);
        }
        let org = Org {
            id: OrgId::new(),
            name: name.to_string(),
            created_by: user_id,
        };
        let member = Member {
            org_id: org.id,
            user_id,
            role: Role::Owner,
            email: email.to_string(),
            display_name: email.to_string(),
        };
        tables.orgs.insert(org.id, org);
        tables.members.push(member.clone());
        Ok(member)
    }

    async fn insert_member(&self, member: Member) -> Result<(), CloudError> {
        self.check_hold("insert_member").await;
        self.check_fail("insert_member")?;
        let mut tables = self.tables.lock();
        if tables
            .members
            .iter()
            .any(|m| m.org_id == member.org_id && m.user_id == member.user_id)
        {
            return Err(CloudError::MembershipExists);
        }
        tables.members.push(member);
        Ok(())
    }

    async fn members_of(&self, org_id: OrgId) -> Result<Vec<Member>, CloudError> {
        self.check_hold("members_of").await;
        self.check_fail("members_of")?;
        Ok(self
            .tables
            .lock()
            .members
            .iter()
            .filter(|m| m.org_id == org_id)
            .cloned()
            .collect())
    }

    async fn insert_invite(&self, invite: Invite) -> Result<(), CloudError> {
        self.check_hold("insert_invite").await;
        self.check_fail("insert_invite")?;
        self.tables
            .lock()
            .invites
            .insert(invite.code.as_str().to_string(), invite);
        Ok(())
    }

    async fn claim_invite(
        &self,
        code: &InviteCode,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Invite, CloudError> {
        self.check_hold("claim_invite").await;
        self.check_fail("claim_invite")?;
        let mut tables = self.tables.lock();
        let invite = tables
            .invites
            .get_mut(code.as_str())
            .ok_or(CloudError::InviteNotFound)?;
        // Set redeemed_by only if currently null; held under the table lock
        if invite.is_redeemed() {
            return Err(CloudError::InviteRedeemed);
        }
        invite.redeemed_by = Some(user_id);
        invite.redeemed_at = Some(at);
        Ok(invite.clone())
    }

    async fn insert_activity(&self, record: ActivityRecord) -> Result<(), CloudError> {
        self.check_hold("insert_activity").await;
        self.check_fail("insert_activity")?;
        self.tables.lock().activity.push(record);
        Ok(())
    }

    async fn recent_activity(
        &self,
        org_id: OrgId,
        lead_id: LeadId,
        limit: usize,
    ) -> Result<Vec<ActivityRecord>, CloudError> {
        self.check_hold("recent_activity").await;
        self.check_fail("recent_activity")?;
        let tables = self.tables.lock();
        let mut records: Vec<ActivityRecord> = tables
            .activity
            .iter()
            .filter(|r| r.org_id == org_id && r.lead_id == lead_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    fn subscribe(&self, org_id: OrgId) -> broadcast::Receiver<ChangeEvent> {
        self.channels
            .entry(org_id)
            .or_insert_with(|| broadcast::channel(CHANGE_CHANNEL_CAPACITY).0)
            .subscribe()
    }
}
