//! LeadFlow Store - persistence seams
//!
//! Two stores, one local and one shared:
//! - [`LocalStore`] holds the full application snapshot in one durable
//!   file slot: tolerant load, atomic total-overwrite save
//! - [`CloudStore`] is the async trait the engine syncs against, modelling
//!   the backend's logical tables and realtime change channel
//! - [`MemoryCloud`] implements the trait in-process for tests and
//!   local development
//!
//! The store layer owns no policy: who may write what, and when to pull,
//! is the engine's business.

#![warn(unreachable_pub)]

pub mod cloud;
pub mod config;
pub mod local;
pub mod memory;

// Re-exports for convenience
pub use cloud::{normalize_row, ChangeEvent, ChangeKind, CloudError, CloudStore};
pub use config::{CloudConfig, ENV_CLOUD_KEY, ENV_CLOUD_URL};
pub use local::{LocalStore, LocalStoreError};
pub use memory::MemoryCloud;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
