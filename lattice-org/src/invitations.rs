//! Invitation lifecycle engine
//!
//! Drives the invitation state machine: creation with duplicate/resend
//! policy and per-inviter limits, acceptance producing a membership
//! atomically, rejection and cancellation, and lazy expiry. Each operation
//! is a request-scoped transaction against the store; the store's
//! compare-and-set transitions guarantee exactly one winner under
//! concurrency.

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::access::{action, authorize, require_member, resource};
use crate::clock::{Clock, SystemClock};
use crate::config::OrganizationOptions;
use crate::error::{LimitKind, OrgError, OrgResult};
use crate::invitation::{Invitation, InvitationStatus};
use crate::member::{Member, RoleSet};
use crate::notify::{InvitationEmail, InvitationNotifier};
use crate::organization::Organization;
use crate::session::Identity;
use crate::store::{OrganizationStore, StoreError, UNIQUE_MEMBER_USER_ORGANIZATION};
use crate::team::Team;
use lattice_rbac::AccessError;

/// Parameters for creating (or resending) an invitation.
#[derive(Debug, Clone)]
pub struct InviteRequest {
    /// Target organization.
    pub organization_id: Uuid,

    /// Email address to invite.
    pub email: String,

    /// Roles the resulting membership will hold.
    pub roles: RoleSet,

    /// Team the resulting membership joins, when teams are enabled.
    pub team_id: Option<Uuid>,

    /// Refresh and re-send an existing pending invitation instead of
    /// failing or replacing it.
    pub resend: bool,
}

impl InviteRequest {
    /// Invite `email` to `organization_id` with the given roles.
    pub fn new(organization_id: Uuid, email: impl Into<String>, roles: RoleSet) -> Self {
        Self {
            organization_id,
            email: email.into(),
            roles,
            team_id: None,
            resend: false,
        }
    }

    /// Assign the invited member to a team on acceptance.
    pub fn with_team(mut self, team_id: Uuid) -> Self {
        self.team_id = Some(team_id);
        self
    }

    /// Mark this request as a resend.
    pub fn resend(mut self) -> Self {
        self.resend = true;
        self
    }
}

/// The invitation lifecycle engine.
pub struct InvitationEngine {
    store: Arc<dyn OrganizationStore>,
    notifier: Arc<dyn InvitationNotifier>,
    options: Arc<OrganizationOptions>,
    clock: Arc<dyn Clock>,
}

impl InvitationEngine {
    /// Create an engine over a store and notifier, using the system clock.
    pub fn new(
        store: Arc<dyn OrganizationStore>,
        notifier: Arc<dyn InvitationNotifier>,
        options: Arc<OrganizationOptions>,
    ) -> Self {
        Self {
            store,
            notifier,
            options,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock (simulated time in tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Create an invitation, or refresh an existing pending one when
    /// `resend` is set.
    ///
    /// Requires the `invitation:create` permission in the target
    /// organization. Fails with `AlreadyMember` when the email already
    /// belongs to a member, `AlreadyInvited` when a pending invitation
    /// exists and neither `resend` nor the cancel-on-reinvite policy
    /// applies, and `LimitExceeded` when the inviter's outstanding
    /// invitation cap is reached. Notifier failures propagate; the
    /// invitation record is already persisted at that point, so the caller
    /// may resend.
    pub async fn create_invitation(
        &self,
        actor: &Identity,
        request: InviteRequest,
    ) -> OrgResult<Invitation> {
        let organization = self
            .store
            .organization(request.organization_id)
            .await?
            .ok_or(OrgError::NotFound("organization"))?;

        let inviter = require_member(self.store.as_ref(), organization.id, actor.user_id).await?;
        authorize(
            &self.options.access,
            &inviter,
            resource::INVITATION,
            action::CREATE,
        )?;

        // Assigned roles must exist in the registry; unknown roles would
        // fail every later permission check.
        for role in request.roles.iter() {
            if self.options.access.role(role).is_none() {
                return Err(AccessError::UnknownRole(role.to_string()).into());
            }
        }

        let email = request.email.trim().to_lowercase();
        if self
            .store
            .find_member_by_email(organization.id, &email)
            .await?
            .is_some()
        {
            return Err(OrgError::AlreadyMember { email });
        }

        let team = match request.team_id {
            Some(team_id) => Some(self.resolve_team(team_id, organization.id).await?),
            None => None,
        };

        if let Some(existing) = self
            .store
            .find_pending_invitation(organization.id, &email)
            .await?
        {
            if request.resend {
                let refreshed = self
                    .store
                    .refresh_invitation_expiry(
                        existing.id,
                        self.clock.now() + self.options.invitation_expires_in,
                    )
                    .await?;
                self.send_notification(actor, &organization, &refreshed)
                    .await?;
                debug!(invitation_id = %refreshed.id, email = %email, "invitation resent");
                return Ok(refreshed);
            }

            if !self.options.cancel_pending_invitations_on_reinvite {
                return Err(OrgError::AlreadyInvited { email });
            }

            // Policy: replace the pending invitation with a fresh record.
            self.store
                .transition_invitation(
                    existing.id,
                    InvitationStatus::Pending,
                    InvitationStatus::Canceled,
                )
                .await?;
            debug!(invitation_id = %existing.id, email = %email, "pending invitation canceled on re-invite");
        }

        let limit = self.options.invitation_limit.evaluate(actor.user_id);
        let outstanding = self
            .store
            .count_pending_invitations_by_inviter(actor.user_id)
            .await?;
        if outstanding >= limit {
            return Err(OrgError::LimitExceeded {
                kind: LimitKind::Invitations,
                limit,
            });
        }

        let mut invitation = Invitation::new(
            organization.id,
            email,
            actor.user_id,
            request.roles,
            self.clock.now(),
            self.options.invitation_expires_in,
        );
        if let Some(team) = team {
            invitation = invitation.with_team(team.id);
        }

        let invitation = self.store.insert_invitation(invitation).await?;
        self.send_notification(actor, &organization, &invitation)
            .await?;

        debug!(
            invitation_id = %invitation.id,
            organization_id = %organization.id,
            email = %invitation.email,
            "invitation created"
        );
        Ok(invitation)
    }

    /// Accept a pending invitation, creating the membership.
    ///
    /// The membership insert and the pending→accepted transition are one
    /// atomic store operation; a concurrent acceptance loses with
    /// `InvalidState`, never a double membership. Expired invitations fail
    /// with `Expired` regardless of stored status, persisting a
    /// pending→canceled marker when the invitation was still pending.
    pub async fn accept_invitation(
        &self,
        actor: &Identity,
        invitation_id: Uuid,
    ) -> OrgResult<(Invitation, Member)> {
        let invitation = self
            .store
            .invitation(invitation_id)
            .await?
            .ok_or(OrgError::NotFound("invitation"))?;

        if invitation.is_expired(self.clock.now()) {
            if invitation.status == InvitationStatus::Pending {
                // Terminal expiry marker; losing the race to another
                // transition leaves an equally terminal state.
                let _ = self
                    .store
                    .transition_invitation(
                        invitation.id,
                        InvitationStatus::Pending,
                        InvitationStatus::Canceled,
                    )
                    .await;
            }
            return Err(OrgError::Expired { id: invitation.id });
        }

        if invitation.status != InvitationStatus::Pending {
            return Err(OrgError::InvalidState {
                expected: InvitationStatus::Pending,
                actual: invitation.status,
            });
        }

        if !invitation.email_matches(&actor.email) {
            return Err(OrgError::EmailMismatch);
        }

        let limit = self
            .options
            .membership_limit
            .evaluate(invitation.organization_id);
        let members = self.store.count_members(invitation.organization_id).await?;
        if members >= limit {
            return Err(OrgError::LimitExceeded {
                kind: LimitKind::Members,
                limit,
            });
        }

        let mut member = Member::new(
            invitation.organization_id,
            actor.user_id,
            invitation.roles.clone(),
        );
        if let Some(team_id) = invitation.team_id {
            if self.options.teams.enabled {
                let cap = self.options.teams.maximum_members_per_team.evaluate(team_id);
                let assigned = self.store.count_team_members(team_id).await?;
                if assigned >= cap {
                    return Err(OrgError::LimitExceeded {
                        kind: LimitKind::TeamMembers,
                        limit: cap,
                    });
                }
                member = member.with_team(team_id);
            }
        }

        match self.store.accept_invitation(invitation.id, member).await {
            Ok((invitation, member)) => {
                debug!(
                    invitation_id = %invitation.id,
                    member_id = %member.id,
                    organization_id = %invitation.organization_id,
                    "invitation accepted"
                );
                Ok((invitation, member))
            }
            Err(StoreError::PreconditionFailed(_)) => {
                Err(self.invalid_state(invitation.id).await?)
            }
            Err(StoreError::Conflict {
                constraint: UNIQUE_MEMBER_USER_ORGANIZATION,
            }) => Err(OrgError::AlreadyMember {
                email: invitation.email,
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Reject a pending invitation. Only the invited email's owner may
    /// reject; a second call fails with `InvalidState`.
    pub async fn reject_invitation(
        &self,
        actor: &Identity,
        invitation_id: Uuid,
    ) -> OrgResult<Invitation> {
        let invitation = self
            .store
            .invitation(invitation_id)
            .await?
            .ok_or(OrgError::NotFound("invitation"))?;

        if !invitation.email_matches(&actor.email) {
            return Err(OrgError::EmailMismatch);
        }

        let rejected = self
            .transition(invitation.id, InvitationStatus::Rejected)
            .await?;
        debug!(invitation_id = %rejected.id, "invitation rejected");
        Ok(rejected)
    }

    /// Cancel a pending invitation. Requires the `invitation:cancel`
    /// permission in the invitation's organization; a second call fails
    /// with `InvalidState`.
    pub async fn cancel_invitation(
        &self,
        actor: &Identity,
        invitation_id: Uuid,
    ) -> OrgResult<Invitation> {
        let invitation = self
            .store
            .invitation(invitation_id)
            .await?
            .ok_or(OrgError::NotFound("invitation"))?;

        let member =
            require_member(self.store.as_ref(), invitation.organization_id, actor.user_id).await?;
        authorize(
            &self.options.access,
            &member,
            resource::INVITATION,
            action::CANCEL,
        )?;

        let canceled = self
            .transition(invitation.id, InvitationStatus::Canceled)
            .await?;
        debug!(invitation_id = %canceled.id, "invitation canceled");
        Ok(canceled)
    }

    /// Fetch an invitation by id. Pure read.
    pub async fn get_invitation(&self, invitation_id: Uuid) -> OrgResult<Option<Invitation>> {
        Ok(self.store.invitation(invitation_id).await?)
    }

    /// List invitations, optionally filtered to one organization. Pure
    /// read.
    pub async fn list_invitations(
        &self,
        organization_id: Option<Uuid>,
    ) -> OrgResult<Vec<Invitation>> {
        Ok(self.store.list_invitations(organization_id).await?)
    }

    async fn resolve_team(&self, team_id: Uuid, organization_id: Uuid) -> OrgResult<Team> {
        if !self.options.teams.enabled {
            return Err(OrgError::FeatureDisabled("team management"));
        }
        let team = self
            .store
            .team(team_id)
            .await?
            .ok_or(OrgError::NotFound("team"))?;
        if team.organization_id != organization_id {
            return Err(OrgError::NotFound("team"));
        }
        Ok(team)
    }

    async fn send_notification(
        &self,
        actor: &Identity,
        organization: &Organization,
        invitation: &Invitation,
    ) -> OrgResult<()> {
        let email = InvitationEmail {
            invitation_id: invitation.id,
            email: invitation.email.clone(),
            inviter: actor.display_name().to_string(),
            organization_name: organization.name.clone(),
            accept_link: self.options.accept_link(invitation.id),
        };
        self.notifier.send_invitation_email(&email).await?;
        Ok(())
    }

    /// CAS a pending invitation into `to`, translating a lost race or a
    /// terminal state into `InvalidState` with the observed status.
    async fn transition(&self, id: Uuid, to: InvitationStatus) -> OrgResult<Invitation> {
        match self
            .store
            .transition_invitation(id, InvitationStatus::Pending, to)
            .await
        {
            Ok(invitation) => Ok(invitation),
            Err(StoreError::PreconditionFailed(_)) => Err(self.invalid_state(id).await?),
            Err(err) => Err(err.into()),
        }
    }

    /// Build the `InvalidState` error for an invitation whose transition
    /// lost, reading back the status that was actually observed.
    async fn invalid_state(&self, id: Uuid) -> OrgResult<OrgError> {
        let actual = self
            .store
            .invitation(id)
            .await?
            .ok_or(OrgError::NotFound("invitation"))?
            .status;
        Ok(OrgError::InvalidState {
            expected: InvitationStatus::Pending,
            actual,
        })
    }
}
