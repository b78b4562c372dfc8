//! Lead activity audit trail
//!
//! Append-only records describing changes to a lead. Logging is
//! best-effort telemetry: a failed insert is traced and swallowed, and
//! never rolls back the state change that triggered it.

use leadflow_model::{ActivityId, ActivityRecord, AuthUser, LeadId, OrgId};
use leadflow_store::{CloudError, CloudStore};
use std::sync::Arc;

/// Default number of records shown in a lead's audit view.
pub const DEFAULT_ACTIVITY_LIMIT: usize = 30;

/// Append and read activity records for leads.
#[derive(Debug)]
pub struct ActivityLogger<C> {
    cloud: Arc<C>,
}

impl<C: CloudStore> ActivityLogger<C> {
    /// Logger over the given backend.
    #[must_use]
    pub fn new(cloud: Arc<C>) -> Self {
        Self { cloud }
    }

    /// Append one immutable record. Never fails the caller: an insert
    /// error is traced at WARN and dropped.
    pub async fn log(
        &self,
        org_id: OrgId,
        lead_id: LeadId,
        actor: &AuthUser,
        action: &str,
        details: String,
    ) {
        let record = ActivityRecord {
            id: ActivityId::new(),
            org_id,
            lead_id,
            actor_id: actor.id,
            actor_email: actor.email.clone(),
            action: action.to_string(),
            details,
            created_at: chrono::Utc::now(),
        };
        if let Err(err) = self.cloud.insert_activity(record).await {
            tracing::warn!(%org_id, %lead_id, %err, "activity insert dropped");
        }
    }

    /// The most recent `limit` records for a lead, newest first.
    pub async fn recent(
        &self,
        org_id: OrgId,
        lead_id: LeadId,
        limit: usize,
    ) -> Result<Vec<ActivityRecord>, CloudError> {
        self.cloud.recent_activity(org_id, lead_id, limit).await
    }
}
