//! Tenant types: orgs, members, roles, invites, activity records
//!
//! An org is an isolated tenant scoping all leads, members, invites and
//! activity. Members enter either by creating the org (owner) or by
//! redeeming a one-time invite code that grants a fixed role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique org (tenant) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrgId(pub Uuid);

impl OrgId {
    /// Generate a new org ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrgId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique user identifier, issued by the auth layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new user ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the auth transport hands over on sign-in.
///
/// Magic-link delivery and session handling are outside the core; the
/// engine only ever sees this pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Authenticated user id
    pub id: UserId,
    /// Authenticated email
    pub email: String,
}

impl AuthUser {
    /// Build an auth user.
    #[must_use]
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

/// Role a member holds within an org. Immutable after join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Org creator
    Owner,
    /// Full management rights
    Admin,
    /// Day-to-day crew lead
    TeamLead,
}

impl Role {
    /// Whether this role may create invite codes.
    #[inline]
    #[must_use]
    pub fn can_invite(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    /// Whether this role may delete leads.
    #[inline]
    #[must_use]
    pub fn can_delete(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Role::Owner => "Owner",
            Role::Admin => "Admin",
            Role::TeamLead => "Team Lead",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An isolated tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Org {
    /// Org identity
    pub id: OrgId,
    /// Org display name
    pub name: String,
    /// Creating user
    pub created_by: UserId,
}

/// An (org, user) membership row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Org the membership belongs to
    pub org_id: OrgId,
    /// Member user id
    pub user_id: UserId,
    /// Role granted at join; immutable thereafter
    pub role: Role,
    /// Member email
    pub email: String,
    /// Display label
    pub display_name: String,
}

impl Member {
    /// Display label, falling back email then user id.
    #[must_use]
    pub fn display(&self) -> String {
        if !self.display_name.is_empty() {
            self.display_name.clone()
        } else if !self.email.is_empty() {
            self.email.clone()
        } else {
            self.user_id.to_string()
        }
    }
}

/// A short, human-typeable, one-time invite code.
///
/// Ten uppercase alphanumeric characters, derived from a random UUID with
/// separators stripped. Comparison is normalized: uppercase, trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InviteCode(String);

/// Length of an invite code in characters.
pub const INVITE_CODE_LEN: usize = 10;

impl InviteCode {
    /// Generate a fresh code.
    #[must_use]
    pub fn generate() -> Self {
        let raw = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
        Self(raw[..INVITE_CODE_LEN].to_string())
    }

    /// Normalize user input into code form.
    ///
    /// Returns None for input that is empty after trimming.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let normalized = input.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    /// The normalized code string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InviteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single-use token granting a role in an org.
///
/// The redeemed_by field is one-way: once set it never clears, and a
/// redeemed invite can never be claimed again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    /// The code itself (primary key)
    pub code: InviteCode,
    /// Org the invite admits into
    pub org_id: OrgId,
    /// Role granted on redemption
    pub role: Role,
    /// Issuing user
    pub created_by: UserId,
    /// Redeeming user, None while unclaimed
    pub redeemed_by: Option<UserId>,
    /// Redemption instant, None while unclaimed
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl Invite {
    /// Build a fresh, unredeemed invite.
    #[must_use]
    pub fn new(org_id: OrgId, role: Role, created_by: UserId) -> Self {
        Self {
            code: InviteCode::generate(),
            org_id,
            role,
            created_by,
            redeemed_by: None,
            redeemed_at: None,
        }
    }

    /// Whether the one-way claim has happened.
    #[inline]
    #[must_use]
    pub fn is_redeemed(&self) -> bool {
        self.redeemed_by.is_some()
    }
}

/// Unique activity record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActivityId(pub Uuid);

impl ActivityId {
    /// Generate a new activity ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActivityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One immutable audit entry describing a change to a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Record identity
    pub id: ActivityId,
    /// Org scope
    pub org_id: OrgId,
    /// Lead the record describes
    pub lead_id: crate::lead::LeadId,
    /// Acting user
    pub actor_id: UserId,
    /// Acting user's email
    pub actor_email: String,
    /// Action label, e.g. "Saved lead"
    pub action: String,
    /// Free-text details
    pub details: String,
    /// Creation instant
    pub created_at: DateTime<Utc>,
}
