//! LeadFlow Model - the shared data shapes
//!
//! Pure data for the lead-tracking core:
//! - Ten ordered workflow stages and the stage-derivation rule
//! - Leads with fixed-shape checklists stamped from the standard template
//! - Tenant types: orgs, members, roles, one-time invites, activity records
//! - The immutable application snapshot and its reducer
//! - Export row flattening
//!
//! No I/O, no async: everything here is total and deterministic apart from
//! id generation and timestamps.
//!
//! # Example
//!
//! ```rust
//! use leadflow_model::{derive_stage, ItemStatus, Lead, Stage};
//!
//! let mut lead = Lead::new();
//! assert_eq!(lead.stage, Stage::LeadIn);
//!
//! for item in lead.checklist.iter_mut().filter(|i| i.stage == Stage::LeadIn) {
//!     item.status = ItemStatus::Done;
//! }
//! lead.refresh_stage();
//! assert_eq!(lead.stage, Stage::Survey);
//! assert_eq!(lead.stage, derive_stage(&lead.checklist));
//! ```

#![warn(unreachable_pub)]

pub mod export;
pub mod lead;
pub mod snapshot;
pub mod stage;
pub mod tenant;
pub mod workflow;

// Re-exports for convenience
pub use export::{export_rows, to_csv, EXPORT_HEADER};
pub use lead::{
    now_iso, today_iso, ChecklistItem, ItemId, ItemPatch, ItemStatus, Lead, LeadId,
};
pub use snapshot::{CloudSession, Mutation, Settings, Snapshot};
pub use stage::{derive_stage, Stage, UnknownStage};
pub use tenant::{
    ActivityId, ActivityRecord, AuthUser, Invite, InviteCode, Member, Org, OrgId, Role, UserId,
    INVITE_CODE_LEN,
};
pub use workflow::{build_checklist, WorkflowEntry, STANDARD_WORKFLOW};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the LeadFlow model
    pub use crate::{
        derive_stage, build_checklist, AuthUser, ChecklistItem, Invite, InviteCode, ItemPatch,
        ItemStatus, Lead, LeadId, Member, Mutation, Org, OrgId, Role, Snapshot, Stage, UserId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
