//! Connection status state machine
//!
//! A client is in exactly one of three connection states. `LocalOnly` is
//! terminal: it means no backend is configured, which is a supported mode,
//! not a failure. The other two flip on auth events.

use serde::{Deserialize, Serialize};

/// Connection status of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No backend configured; terminal for this client
    LocalOnly,
    /// Backend configured, no authenticated session
    SignedOut,
    /// Authenticated, org resolved, realtime eligible
    SignedIn,
}

/// Illegal status transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal status transition: {from:?} -> {to:?}")]
pub struct IllegalTransition {
    /// Current status
    pub from: ConnectionStatus,
    /// Requested status
    pub to: ConnectionStatus,
}

/// States reachable from a given status.
pub fn allowed_transitions(from: ConnectionStatus) -> Vec<ConnectionStatus> {
    use ConnectionStatus::*;
    match from {
        LocalOnly => vec![],
        SignedOut => vec![SignedIn],
        SignedIn => vec![SignedOut],
    }
}

/// Validates a status transition.
pub fn validate_transition(
    from: ConnectionStatus,
    to: ConnectionStatus,
) -> Result<(), IllegalTransition> {
    if allowed_transitions(from).into_iter().any(|s| s == to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}
