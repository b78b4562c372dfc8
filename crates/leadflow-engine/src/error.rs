//! Error taxonomy for the engine layer
//!
//! Three families, matching how they surface:
//! - transient cloud failures are caught per operation and stored as a
//!   dismissable banner string; they never unwind an optimistic local
//!   mutation and never propagate past the engine
//! - domain rule violations (invite not found, already redeemed,
//!   insufficient role) abort the operation before any mutation and carry
//!   a specific user-facing message
//! - illegal status transitions are programming-contract errors

use crate::status::IllegalTransition;
use leadflow_store::CloudError;

/// Membership protocol errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MembershipError {
    /// No invite with that code
    #[error("invite code not found")]
    InviteNotFound,

    /// The invite's one-way claim already happened
    #[error("invite code already used")]
    AlreadyRedeemed,

    /// Input was empty after normalization
    #[error("invite code is empty")]
    EmptyCode,

    /// The redeeming user already belongs to that org
    #[error("already a member of this workspace")]
    AlreadyMember,

    /// Caller's role may not perform this action
    #[error("only owners and admins may do this")]
    InsufficientRole,

    /// Transient backend failure
    #[error("cloud error: {0}")]
    Cloud(String),
}

impl From<CloudError> for MembershipError {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::InviteNotFound => MembershipError::InviteNotFound,
            CloudError::InviteRedeemed => MembershipError::AlreadyRedeemed,
            CloudError::MembershipExists => MembershipError::AlreadyMember,
            CloudError::Backend(msg) => MembershipError::Cloud(msg),
        }
    }
}

impl MembershipError {
    /// User-facing banner text.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            MembershipError::InviteNotFound => "Invite code not found.".to_string(),
            MembershipError::AlreadyRedeemed => "Invite code already used.".to_string(),
            MembershipError::EmptyCode => "Enter an invite code.".to_string(),
            MembershipError::AlreadyMember => {
                "You are already a member of this workspace.".to_string()
            }
            MembershipError::InsufficientRole => {
                "Only Owner/Admin can do this.".to_string()
            }
            MembershipError::Cloud(msg) => format!("Cloud error: {msg}"),
        }
    }

    /// Whether retrying the same call could succeed.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, MembershipError::Cloud(_))
    }
}

/// Engine-level errors returned to the application controller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Operation requires a signed-in session
    #[error("not signed in")]
    NotSignedIn,

    /// Caller's role may not perform this action
    #[error("insufficient role")]
    InsufficientRole,

    /// Referenced lead is not in the snapshot
    #[error("unknown lead")]
    UnknownLead,

    /// Referenced checklist item is not on the lead
    #[error("unknown checklist item")]
    UnknownItem,

    /// Membership protocol failure
    #[error(transparent)]
    Membership(#[from] MembershipError),

    /// Illegal connection status transition
    #[error(transparent)]
    Status(#[from] IllegalTransition),
}

impl EngineError {
    /// User-facing banner text.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            EngineError::NotSignedIn => "Sign in first.".to_string(),
            EngineError::InsufficientRole => "Only Owner/Admin can do this.".to_string(),
            EngineError::UnknownLead => "That lead no longer exists.".to_string(),
            EngineError::UnknownItem => "That checklist item no longer exists.".to_string(),
            EngineError::Membership(err) => err.user_message(),
            EngineError::Status(err) => err.to_string(),
        }
    }
}
