//! LeadFlow Engine - sync orchestration over the model and stores
//!
//! The engine ties the pieces together:
//! - [`SyncEngine`] owns the immutable snapshot, commits optimistic local
//!   mutations, pushes whole-record upserts, and pulls full org state with
//!   generation-guarded staleness checks
//! - [`MembershipService`] runs the tenant protocol: org resolution on
//!   first login, invite issue and one-time redemption
//! - [`ActivityLogger`] appends the best-effort audit trail
//! - [`ConnectionStatus`] is the three-state connection machine
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use leadflow_engine::SyncEngine;
//! use leadflow_store::{LocalStore, MemoryCloud};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let dir = tempfile::tempdir().unwrap();
//! let local = LocalStore::new(dir.path().join("slot.json"));
//! let engine = SyncEngine::new(Some(Arc::new(MemoryCloud::new())), local, "Looe Roofing");
//!
//! let id = engine.create_lead();
//! assert!(engine.snapshot().lead(id).is_some());
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod activity;
pub mod engine;
pub mod error;
pub mod membership;
pub mod status;

// Re-exports for convenience
pub use activity::{ActivityLogger, DEFAULT_ACTIVITY_LIMIT};
pub use engine::SyncEngine;
pub use error::{EngineError, MembershipError};
pub use membership::MembershipService;
pub use status::{allowed_transitions, validate_transition, ConnectionStatus, IllegalTransition};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the LeadFlow engine
    pub use crate::{
        ConnectionStatus, EngineError, MembershipError, MembershipService, SyncEngine,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
