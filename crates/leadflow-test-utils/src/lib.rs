//! Testing utilities for LeadFlow workspace
//!
//! Shared test helpers, fixtures, and assertions.

#![allow(missing_docs)]

use leadflow_model::{AuthUser, ItemStatus, Lead, Member, Stage, UserId};
use leadflow_store::{CloudStore, LocalStore, MemoryCloud};
use std::sync::Arc;
use tempfile::TempDir;

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

pub fn test_user(email: &str) -> AuthUser {
    AuthUser::new(UserId::new(), email)
}

pub fn create_test_lead(name: &str) -> Lead {
    let mut lead = Lead::new();
    lead.customer_name = name.to_string();
    lead
}

/// A lead with every item in the given stage marked done.
pub fn lead_with_stage_done(name: &str, stage: Stage) -> Lead {
    let mut lead = create_test_lead(name);
    for item in lead.checklist.iter_mut().filter(|i| i.stage == stage) {
        item.status = ItemStatus::Done;
    }
    lead.refresh_stage();
    lead
}

/// A temp-dir backed local store. The directory guard must outlive the
/// store or the slot file disappears.
pub fn temp_local_store() -> (TempDir, LocalStore) {
    let dir = TempDir::new().expect("create temp dir");
    let store = LocalStore::new(dir.path().join("slot.json"));
    (dir, store)
}

/// A cloud seeded with one org and its owner membership.
pub async fn seeded_cloud(org_name: &str, owner_email: &str) -> (Arc<MemoryCloud>, Member) {
    let cloud = Arc::new(MemoryCloud::new());
    let owner = cloud
        .create_org_with_owner(org_name, UserId::new(), owner_email)
        .await
        .expect("seed org");
    (cloud, owner)
}
