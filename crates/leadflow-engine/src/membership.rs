//! Tenant membership protocol
//!
//! Resolves or creates the org for a first-time user, lists members, and
//! issues/redeems one-time invite codes. Role gates here are advisory
//! (client-side); the backend's access rules are the authoritative check.

use crate::error::MembershipError;
use chrono::Utc;
use leadflow_model::{AuthUser, Invite, InviteCode, Member, OrgId, Role};
use leadflow_store::{CloudError, CloudStore};
use std::sync::Arc;

/// Membership operations against a cloud store.
#[derive(Debug)]
pub struct MembershipService<C> {
    cloud: Arc<C>,
}

impl<C: CloudStore> MembershipService<C> {
    /// Service over the given backend.
    #[must_use]
    pub fn new(cloud: Arc<C>) -> Self {
        Self { cloud }
    }

    /// Resolve the user's org and role, creating an org on first login.
    ///
    /// Idempotent for a user with an existing membership: repeated calls
    /// return the same row without side effects. A first login creates an
    /// org owned by the user. Two racing first logins resolve to a single
    /// org: the backend's conditional insert rejects the loser, who then
    /// re-reads the winner's row.
    pub async fn ensure_org_and_membership(
        &self,
        user: &AuthUser,
        org_name: &str,
    ) -> Result<Member, MembershipError> {
        if let Some(member) = self.cloud.membership_for_user(user.id).await? {
            return Ok(member);
        }

        match self
            .cloud
            .create_org_with_owner(org_name, user.id, &user.email)
            .await
        {
            Ok(member) => {
                tracing::info!(org_id = %member.org_id, user_id = %user.id, "created org for first login");
                Ok(member)
            }
            Err(CloudError::MembershipExists) => {
                // Lost the first-login race; the winner's row is authoritative
                self.cloud
                    .membership_for_user(user.id)
                    .await?
                    .ok_or_else(|| {
                        MembershipError::Cloud("membership vanished after raced create".to_string())
                    })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// All members of an org. Order is unspecified.
    pub async fn list_members(&self, org_id: OrgId) -> Result<Vec<Member>, MembershipError> {
        Ok(self.cloud.members_of(org_id).await?)
    }

    /// Issue a one-time invite code granting `role` in `org_id`.
    ///
    /// Gated on the creator's role: only owners and admins may invite.
    pub async fn create_invite(
        &self,
        org_id: OrgId,
        role: Role,
        creator: &Member,
    ) -> Result<InviteCode, MembershipError> {
        if !creator.role.can_invite() {
            return Err(MembershipError::InsufficientRole);
        }
        let invite = Invite::new(org_id, role, creator.user_id);
        let code = invite.code.clone();
        self.cloud.insert_invite(invite).await?;
        tracing::info!(%org_id, %role, "invite code issued");
        Ok(code)
    }

    /// Redeem an invite code for the given user.
    ///
    /// The claim is atomic at the backend: exactly one redeemer wins, a
    /// second attempt fails with [`MembershipError::AlreadyRedeemed`] and
    /// creates no membership. On success the membership row is inserted
    /// and the claimed invite returned, so the caller can switch its
    /// session to the invite's org and refresh.
    pub async fn redeem_invite(
        &self,
        raw_code: &str,
        user: &AuthUser,
    ) -> Result<Invite, MembershipError> {
        let code = InviteCode::parse(raw_code).ok_or(MembershipError::EmptyCode)?;

        let invite = self.cloud.claim_invite(&code, user.id, Utc::now()).await?;

        let member = Member {
            org_id: invite.org_id,
            user_id: user.id,
            role: invite.role,
            email: user.email.clone(),
            display_name: user.email.clone(),
        };
        self.cloud.insert_member(member).await?;
        tracing::info!(org_id = %invite.org_id, user_id = %user.id, role = %invite.role, "invite redeemed");
        Ok(invite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadflow_model::UserId;
    use leadflow_store::MemoryCloud;

    fn service() -> MembershipService<MemoryCloud> {
        MembershipService::new(Arc::new(MemoryCloud::new()))
    }

    fn user() -> AuthUser {
        AuthUser::new(UserId::new(), "crew@example.com")
    }

    #[tokio::test]
    async fn first_login_creates_an_owner_membership() {
        let service = service();
        let user = user();
        let member = service
            .ensure_org_and_membership(&user, "Looe Roofing")
            .await
            .unwrap();
        assert_eq!(member.role, Role::Owner);
        assert_eq!(member.user_id, user.id);
    }

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let service = service();
        let user = user();
        let first = service
            .ensure_org_and_membership(&user, "Looe Roofing")
            .await
            .unwrap();
        let second = service
            .ensure_org_and_membership(&user, "Looe Roofing")
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn losing_the_first_login_race_returns_the_winning_row() {
        let cloud = Arc::new(MemoryCloud::new());
        let user = user();

        // Park the loser's create so the winner's membership lands between
        // the loser's lookup miss and its conditional insert
        let gate = cloud.hold_next("create_org_with_owner");
        let loser = tokio::spawn({
            let service = MembershipService::new(Arc::clone(&cloud));
            let user = user.clone();
            async move { service.ensure_org_and_membership(&user, "Looe Roofing").await }
        });
        gate.entered().await;

        let winner = cloud
            .create_org_with_owner("Looe Roofing", user.id, &user.email)
            .await
            .unwrap();
        gate.release();

        let recovered = loser.await.unwrap().unwrap();
        assert_eq!(recovered, winner);
        assert_eq!(cloud.org_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_redemption_admits_exactly_one_user() {
        let cloud = Arc::new(MemoryCloud::new());
        let service = MembershipService::new(Arc::clone(&cloud));
        let owner = service
            .ensure_org_and_membership(&user(), "Looe Roofing")
            .await
            .unwrap();
        let code = service
            .create_invite(owner.org_id, Role::TeamLead, &owner)
            .await
            .unwrap();

        let redeem = |email: &str| {
            let cloud = Arc::clone(&cloud);
            let code = code.clone();
            let joiner = AuthUser::new(UserId::new(), email);
            tokio::spawn(async move {
                MembershipService::new(cloud)
                    .redeem_invite(code.as_str(), &joiner)
                    .await
            })
        };
        let first = redeem("a@example.com");
        let second = redeem("b@example.com");
        let results = [first.await.unwrap(), second.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(MembershipError::AlreadyRedeemed)))
                .count(),
            1
        );
        // Only the winner joined; the org holds the owner plus one redeemer
        assert_eq!(service.list_members(owner.org_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn team_lead_may_not_invite() {
        let cloud = Arc::new(MemoryCloud::new());
        let service = MembershipService::new(Arc::clone(&cloud));
        let owner = service
            .ensure_org_and_membership(&user(), "Looe Roofing")
            .await
            .unwrap();

        let crew = Member {
            role: Role::TeamLead,
            user_id: UserId::new(),
            ..owner.clone()
        };
        let err = service
            .create_invite(owner.org_id, Role::TeamLead, &crew)
            .await
            .unwrap_err();
        assert_eq!(err, MembershipError::InsufficientRole);
    }

    #[tokio::test]
    async fn redeem_empty_code_fails_before_any_call() {
        let service = service();
        let err = service.redeem_invite("   ", &user()).await.unwrap_err();
        assert_eq!(err, MembershipError::EmptyCode);
    }

    #[tokio::test]
    async fn redeem_is_case_insensitive() {
        let cloud = Arc::new(MemoryCloud::new());
        let service = MembershipService::new(Arc::clone(&cloud));
        let owner_user = user();
        let owner = service
            .ensure_org_and_membership(&owner_user, "Looe Roofing")
            .await
            .unwrap();
        let code = service
            .create_invite(owner.org_id, Role::TeamLead, &owner)
            .await
            .unwrap();

        let joiner = AuthUser::new(UserId::new(), "new@example.com");
        let lowered = code.as_str().to_ascii_lowercase();
        let invite = service.redeem_invite(&lowered, &joiner).await.unwrap();
        assert_eq!(invite.org_id, owner.org_id);
        assert_eq!(invite.redeemed_by, Some(joiner.id));
    }
}
