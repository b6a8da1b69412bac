//! Team manager
//!
//! Teams are an optional sub-grouping of members, enabled through
//! configuration. Every operation checks the feature flag first, then the
//! caller's permission in the owning organization, then the configured
//! caps.

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::access::{action, authorize, require_member, resource};
use crate::config::OrganizationOptions;
use crate::error::{LimitKind, OrgError, OrgResult};
use crate::member::Member;
use crate::session::Identity;
use crate::store::OrganizationStore;
use crate::team::Team;

/// The team manager.
pub struct TeamManager {
    store: Arc<dyn OrganizationStore>,
    options: Arc<OrganizationOptions>,
}

impl TeamManager {
    /// Create a manager over a store.
    pub fn new(store: Arc<dyn OrganizationStore>, options: Arc<OrganizationOptions>) -> Self {
        Self { store, options }
    }

    fn require_enabled(&self) -> OrgResult<()> {
        if !self.options.teams.enabled {
            return Err(OrgError::FeatureDisabled("team management"));
        }
        Ok(())
    }

    /// Create a team. Requires `team:create`; enforces the per-organization
    /// `maximum_teams` cap.
    pub async fn create_team(
        &self,
        actor: &Identity,
        organization_id: Uuid,
        name: impl Into<String>,
    ) -> OrgResult<Team> {
        self.require_enabled()?;

        self.store
            .organization(organization_id)
            .await?
            .ok_or(OrgError::NotFound("organization"))?;

        let member = require_member(self.store.as_ref(), organization_id, actor.user_id).await?;
        authorize(&self.options.access, &member, resource::TEAM, action::CREATE)?;

        let limit = self.options.teams.maximum_teams.evaluate(organization_id);
        let count = self.store.count_teams(organization_id).await?;
        if count >= limit {
            return Err(OrgError::LimitExceeded {
                kind: LimitKind::Teams,
                limit,
            });
        }

        let team = self
            .store
            .insert_team(Team::new(organization_id, name))
            .await?;
        debug!(team_id = %team.id, organization_id = %organization_id, "team created");
        Ok(team)
    }

    /// Rename a team. Requires `team:update`.
    pub async fn update_team(
        &self,
        actor: &Identity,
        team_id: Uuid,
        name: impl Into<String>,
    ) -> OrgResult<Team> {
        self.require_enabled()?;

        let mut team = self
            .store
            .team(team_id)
            .await?
            .ok_or(OrgError::NotFound("team"))?;

        let member =
            require_member(self.store.as_ref(), team.organization_id, actor.user_id).await?;
        authorize(&self.options.access, &member, resource::TEAM, action::UPDATE)?;

        team.rename(name);
        let team = self.store.update_team(team).await?;
        debug!(team_id = %team.id, "team updated");
        Ok(team)
    }

    /// Remove a team, clearing the assignment of its members.
    ///
    /// Requires `team:delete`. When `allow_removing_all_teams` is false,
    /// removing the organization's last team fails with
    /// `InvariantViolation`.
    pub async fn remove_team(&self, actor: &Identity, team_id: Uuid) -> OrgResult<Team> {
        self.require_enabled()?;

        let team = self
            .store
            .team(team_id)
            .await?
            .ok_or(OrgError::NotFound("team"))?;

        let member =
            require_member(self.store.as_ref(), team.organization_id, actor.user_id).await?;
        authorize(&self.options.access, &member, resource::TEAM, action::DELETE)?;

        if !self.options.teams.allow_removing_all_teams {
            let count = self.store.count_teams(team.organization_id).await?;
            if count <= 1 {
                return Err(OrgError::InvariantViolation(
                    "cannot remove an organization's last team".into(),
                ));
            }
        }

        self.store.delete_team(team.id).await?;
        debug!(team_id = %team.id, organization_id = %team.organization_id, "team removed");
        Ok(team)
    }

    /// Assign a member to a team (or clear the assignment with `None`).
    ///
    /// Requires `member:update`. Assignment enforces the per-team
    /// `maximum_members_per_team` cap; the same cap also applies when a
    /// team invitation is accepted.
    pub async fn set_member_team(
        &self,
        actor: &Identity,
        member_id: Uuid,
        team_id: Option<Uuid>,
    ) -> OrgResult<Member> {
        self.require_enabled()?;

        let mut target = self
            .store
            .member(member_id)
            .await?
            .ok_or(OrgError::NotFound("member"))?;

        let caller =
            require_member(self.store.as_ref(), target.organization_id, actor.user_id).await?;
        authorize(
            &self.options.access,
            &caller,
            resource::MEMBER,
            action::UPDATE,
        )?;

        if let Some(team_id) = team_id {
            let team = self
                .store
                .team(team_id)
                .await?
                .ok_or(OrgError::NotFound("team"))?;
            if team.organization_id != target.organization_id {
                return Err(OrgError::NotFound("team"));
            }

            if target.team_id != Some(team_id) {
                let cap = self
                    .options
                    .teams
                    .maximum_members_per_team
                    .evaluate(team_id);
                let assigned = self.store.count_team_members(team_id).await?;
                if assigned >= cap {
                    return Err(OrgError::LimitExceeded {
                        kind: LimitKind::TeamMembers,
                        limit: cap,
                    });
                }
            }
        }

        target.team_id = team_id;
        let member = self.store.update_member(target).await?;
        debug!(member_id = %member.id, team_id = ?member.team_id, "member team assignment updated");
        Ok(member)
    }

    /// All teams of an organization. Pure read.
    pub async fn list_teams(&self, organization_id: Uuid) -> OrgResult<Vec<Team>> {
        self.require_enabled()?;
        Ok(self.store.list_teams(organization_id).await?)
    }
}
