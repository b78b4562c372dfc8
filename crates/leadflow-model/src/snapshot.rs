//! The application snapshot and its reducer
//!
//! All observable state lives in one immutable [`Snapshot`] value. State
//! advances only through [`Snapshot::reduce`], which consumes a
//! [`Mutation`] and produces a new snapshot; nothing mutates in place.
//! The store layer persists whole snapshots, never partial fields.

use crate::lead::{Lead, LeadId};
use crate::tenant::{OrgId, Role, UserId};
use serde::{Deserialize, Serialize};

fn default_follow_up1() -> u32 {
    2
}

fn default_follow_up2() -> u32 {
    5
}

/// Follow-up cadence settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Days until the first follow-up call
    #[serde(default = "default_follow_up1")]
    pub follow_up1_days: u32,
    /// Days until the second follow-up call
    #[serde(default = "default_follow_up2")]
    pub follow_up2_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            follow_up1_days: default_follow_up1(),
            follow_up2_days: default_follow_up2(),
        }
    }
}

/// Cloud session fields mirrored into the snapshot.
///
/// All fields are None while signed out or in local-only mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CloudSession {
    /// Active org, once resolved
    #[serde(default)]
    pub org_id: Option<OrgId>,
    /// Caller's role in the active org
    #[serde(default)]
    pub role: Option<Role>,
    /// Signed-in email
    #[serde(default)]
    pub email: Option<String>,
    /// Signed-in user id
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Instant of the last successful full pull
    #[serde(default)]
    pub last_sync_at: Option<String>,
}

impl CloudSession {
    /// Whether a session with a resolved org is present.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.org_id.is_some() && self.user_id.is_some()
    }
}

/// The full application snapshot: leads, settings, cloud session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Snapshot {
    /// All known leads, most recent first
    #[serde(default)]
    pub leads: Vec<Lead>,
    /// Follow-up cadence
    #[serde(default)]
    pub settings: Settings,
    /// Cloud session mirror
    #[serde(default)]
    pub cloud: CloudSession,
}

/// A state transition applied through [`Snapshot::reduce`].
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Insert or replace one lead. Unknown ids are prepended; known ids
    /// are replaced in place, preserving list order otherwise.
    PutLead(Lead),
    /// Remove one lead by id; a miss is a no-op.
    RemoveLead(LeadId),
    /// Replace the whole lead list with a pull result.
    ReplaceLeads(Vec<Lead>),
    /// Install a cloud session after sign-in or invite redemption.
    SetSession {
        /// Resolved org
        org_id: OrgId,
        /// Caller's role in that org
        role: Role,
        /// Signed-in email
        email: String,
        /// Signed-in user id
        user_id: UserId,
    },
    /// Drop all session fields on sign-out.
    ClearSession,
    /// Stamp the last successful sync instant.
    MarkSynced(String),
    /// Replace the follow-up settings.
    SetSettings(Settings),
}

impl Snapshot {
    /// Produce the successor snapshot for a mutation.
    #[must_use]
    pub fn reduce(&self, mutation: Mutation) -> Snapshot {
        let mut next = self.clone();
        match mutation {
            Mutation::PutLead(lead) => {
                if let Some(slot) = next.leads.iter_mut().find(|l| l.id == lead.id) {
                    *slot = lead;
                } else {
                    next.leads.insert(0, lead);
                }
            }
            Mutation::RemoveLead(id) => {
                next.leads.retain(|l| l.id != id);
            }
            Mutation::ReplaceLeads(leads) => {
                next.leads = leads;
            }
            Mutation::SetSession {
                org_id,
                role,
                email,
                user_id,
            } => {
                next.cloud.org_id = Some(org_id);
                next.cloud.role = Some(role);
                next.cloud.email = Some(email);
                next.cloud.user_id = Some(user_id);
            }
            Mutation::ClearSession => {
                next.cloud = CloudSession {
                    last_sync_at: next.cloud.last_sync_at.clone(),
                    ..CloudSession::default()
                };
            }
            Mutation::MarkSynced(at) => {
                next.cloud.last_sync_at = Some(at);
            }
            Mutation::SetSettings(settings) => {
                next.settings = settings;
            }
        }
        next
    }

    /// Look up a lead by id.
    #[must_use]
    pub fn lead(&self, id: LeadId) -> Option<&Lead> {
        self.leads.iter().find(|l| l.id == id)
    }
}
