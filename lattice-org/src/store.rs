//! Persistence store abstraction
//!
//! This module defines the [`OrganizationStore`] contract the services
//! read and write through, and an in-memory reference implementation.
//!
//! The contract carries the concurrency obligations of the system: unique
//! constraints (slug, one member per user per organization), compare-and-set
//! invitation status transitions, atomic create-organization-with-owner and
//! accept-invitation pairs, and cascading organization deletion. Backends
//! must provide transactional semantics for those operations; the services
//! never implement locking themselves.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::invitation::{Invitation, InvitationStatus};
use crate::member::Member;
use crate::organization::Organization;
use crate::team::Team;

/// Unique-constraint name: organization slug.
pub const UNIQUE_ORGANIZATION_SLUG: &str = "organization.slug";

/// Unique-constraint name: one member per (user, organization).
pub const UNIQUE_MEMBER_USER_ORGANIZATION: &str = "member.user_organization";

/// Persistence store error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed entity does not exist.
    #[error("{entity} not found")]
    NotFound {
        /// Entity kind that was missing.
        entity: &'static str,
    },

    /// A unique constraint was violated.
    #[error("unique constraint violated: {constraint}")]
    Conflict {
        /// Name of the violated constraint.
        constraint: &'static str,
    },

    /// A compare-and-set precondition did not hold (e.g. the invitation
    /// was no longer in the expected status).
    #[error("precondition failed: {0}")]
    PreconditionFailed(&'static str),

    /// The backend itself failed; the caller may retry.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD + query contract over organizations, members, invitations, and
/// teams.
///
/// Every method is a potential suspension point; callers treat them as
/// asynchronous units of work that are not internally retried.
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    // --- organizations ---

    /// Insert a new organization. Fails with
    /// [`StoreError::Conflict`]`(`[`UNIQUE_ORGANIZATION_SLUG`]`)` when the
    /// slug is taken.
    async fn insert_organization(&self, organization: Organization) -> StoreResult<Organization>;

    /// Fetch an organization by id.
    async fn organization(&self, id: Uuid) -> StoreResult<Option<Organization>>;

    /// Fetch an organization by slug.
    async fn organization_by_slug(&self, slug: &str) -> StoreResult<Option<Organization>>;

    /// Replace a stored organization. Slug uniqueness is re-checked.
    async fn update_organization(&self, organization: Organization) -> StoreResult<Organization>;

    /// Delete an organization and, atomically, all of its members,
    /// invitations, and teams.
    async fn delete_organization(&self, id: Uuid) -> StoreResult<()>;

    /// Organizations the user holds a membership in.
    async fn organizations_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Organization>>;

    /// Atomically insert an organization together with its creator
    /// membership. Neither is persisted if either constraint fails.
    async fn create_organization_with_owner(
        &self,
        organization: Organization,
        owner: Member,
    ) -> StoreResult<(Organization, Member)>;

    // --- members ---

    /// Insert a membership. Fails with [`StoreError::Conflict`] when the
    /// user already has a membership in the organization.
    async fn insert_member(&self, member: Member) -> StoreResult<Member>;

    /// Fetch a membership by id.
    async fn member(&self, id: Uuid) -> StoreResult<Option<Member>>;

    /// Fetch a user's membership in an organization.
    async fn find_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Member>>;

    /// Fetch the membership whose owning user has the given email, if any.
    async fn find_member_by_email(
        &self,
        organization_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<Member>>;

    /// Replace a stored membership.
    async fn update_member(&self, member: Member) -> StoreResult<Member>;

    /// All memberships of an organization.
    async fn list_members(&self, organization_id: Uuid) -> StoreResult<Vec<Member>>;

    /// Number of memberships in an organization.
    async fn count_members(&self, organization_id: Uuid) -> StoreResult<u32>;

    // --- invitations ---

    /// Insert an invitation.
    async fn insert_invitation(&self, invitation: Invitation) -> StoreResult<Invitation>;

    /// Fetch an invitation by id.
    async fn invitation(&self, id: Uuid) -> StoreResult<Option<Invitation>>;

    /// The pending invitation for `(organization, email)`, if one exists.
    async fn find_pending_invitation(
        &self,
        organization_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<Invitation>>;

    /// Invitations, optionally filtered to one organization.
    async fn list_invitations(
        &self,
        organization_id: Option<Uuid>,
    ) -> StoreResult<Vec<Invitation>>;

    /// Number of pending invitations issued by a user.
    async fn count_pending_invitations_by_inviter(&self, inviter_id: Uuid) -> StoreResult<u32>;

    /// Compare-and-set status transition. Fails with
    /// [`StoreError::PreconditionFailed`] when the stored status is not
    /// `from`; concurrent transitions on the same invitation serialize so
    /// that exactly one wins.
    async fn transition_invitation(
        &self,
        id: Uuid,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> StoreResult<Invitation>;

    /// Refresh a pending invitation's expiry. Fails with
    /// [`StoreError::PreconditionFailed`] when the invitation is not
    /// pending.
    async fn refresh_invitation_expiry(
        &self,
        id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Invitation>;

    /// Atomically transition a pending invitation to accepted and insert
    /// the resulting membership. Neither change is persisted if the
    /// status precondition or the membership constraint fails.
    async fn accept_invitation(
        &self,
        id: Uuid,
        member: Member,
    ) -> StoreResult<(Invitation, Member)>;

    // --- teams ---

    /// Insert a team.
    async fn insert_team(&self, team: Team) -> StoreResult<Team>;

    /// Fetch a team by id.
    async fn team(&self, id: Uuid) -> StoreResult<Option<Team>>;

    /// Replace a stored team.
    async fn update_team(&self, team: Team) -> StoreResult<Team>;

    /// Delete a team, clearing the team assignment of its members.
    async fn delete_team(&self, id: Uuid) -> StoreResult<()>;

    /// All teams of an organization.
    async fn list_teams(&self, organization_id: Uuid) -> StoreResult<Vec<Team>>;

    /// Number of teams in an organization.
    async fn count_teams(&self, organization_id: Uuid) -> StoreResult<u32>;

    /// Number of members assigned to a team.
    async fn count_team_members(&self, team_id: Uuid) -> StoreResult<u32>;
}

#[derive(Debug, Default)]
struct Tables {
    organizations: HashMap<Uuid, Organization>,
    members: HashMap<Uuid, Member>,
    invitations: HashMap<Uuid, Invitation>,
    teams: HashMap<Uuid, Team>,
    /// User directory (user id → email) backing email-keyed queries.
    user_emails: HashMap<Uuid, String>,
}

impl Tables {
    fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> bool {
        self.organizations
            .values()
            .any(|org| org.slug == slug && Some(org.id) != exclude)
    }

    fn membership_exists(&self, organization_id: Uuid, user_id: Uuid) -> bool {
        self.members
            .values()
            .any(|m| m.organization_id == organization_id && m.user_id == user_id)
    }

    fn user_by_email(&self, email: &str) -> Option<Uuid> {
        self.user_emails
            .iter()
            .find(|(_, stored)| stored.eq_ignore_ascii_case(email))
            .map(|(id, _)| *id)
    }
}

/// In-memory store, suitable for tests and single-process embedders.
///
/// A single `RwLock` over all tables makes every multi-entity operation
/// atomic and serializes compare-and-set transitions, which is exactly the
/// transactional contract the trait demands of real backends.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the user directory with a (user id, email) pair so that
    /// email-keyed queries can resolve it. Real backends answer those
    /// queries by joining against the embedding system's user table.
    pub async fn register_user(&self, user_id: Uuid, email: &str) {
        self.inner
            .write()
            .await
            .user_emails
            .insert(user_id, email.to_lowercase());
    }
}

#[async_trait]
impl OrganizationStore for InMemoryStore {
    async fn insert_organization(&self, organization: Organization) -> StoreResult<Organization> {
        let mut tables = self.inner.write().await;
        if tables.slug_taken(&organization.slug, None) {
            return Err(StoreError::Conflict {
                constraint: UNIQUE_ORGANIZATION_SLUG,
            });
        }
        tables
            .organizations
            .insert(organization.id, organization.clone());
        Ok(organization)
    }

    async fn organization(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        Ok(self.inner.read().await.organizations.get(&id).cloned())
    }

    async fn organization_by_slug(&self, slug: &str) -> StoreResult<Option<Organization>> {
        Ok(self
            .inner
            .read()
            .await
            .organizations
            .values()
            .find(|org| org.slug == slug)
            .cloned())
    }

    async fn update_organization(&self, organization: Organization) -> StoreResult<Organization> {
        let mut tables = self.inner.write().await;
        if !tables.organizations.contains_key(&organization.id) {
            return Err(StoreError::NotFound {
                entity: "organization",
            });
        }
        if tables.slug_taken(&organization.slug, Some(organization.id)) {
            return Err(StoreError::Conflict {
                constraint: UNIQUE_ORGANIZATION_SLUG,
            });
        }
        tables
            .organizations
            .insert(organization.id, organization.clone());
        Ok(organization)
    }

    async fn delete_organization(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.inner.write().await;
        if tables.organizations.remove(&id).is_none() {
            return Err(StoreError::NotFound {
                entity: "organization",
            });
        }
        tables.members.retain(|_, m| m.organization_id != id);
        tables.invitations.retain(|_, i| i.organization_id != id);
        tables.teams.retain(|_, t| t.organization_id != id);
        Ok(())
    }

    async fn organizations_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Organization>> {
        let tables = self.inner.read().await;
        let mut orgs: Vec<Organization> = tables
            .members
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| tables.organizations.get(&m.organization_id).cloned())
            .collect();
        orgs.sort_by_key(|org| org.created_at);
        Ok(orgs)
    }

    async fn create_organization_with_owner(
        &self,
        organization: Organization,
        owner: Member,
    ) -> StoreResult<(Organization, Member)> {
        let mut tables = self.inner.write().await;
        if tables.slug_taken(&organization.slug, None) {
            return Err(StoreError::Conflict {
                constraint: UNIQUE_ORGANIZATION_SLUG,
            });
        }
        if tables.membership_exists(owner.organization_id, owner.user_id) {
            return Err(StoreError::Conflict {
                constraint: UNIQUE_MEMBER_USER_ORGANIZATION,
            });
        }
        tables
            .organizations
            .insert(organization.id, organization.clone());
        tables.members.insert(owner.id, owner.clone());
        Ok((organization, owner))
    }

    async fn insert_member(&self, member: Member) -> StoreResult<Member> {
        let mut tables = self.inner.write().await;
        if tables.membership_exists(member.organization_id, member.user_id) {
            return Err(StoreError::Conflict {
                constraint: UNIQUE_MEMBER_USER_ORGANIZATION,
            });
        }
        tables.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn member(&self, id: Uuid) -> StoreResult<Option<Member>> {
        Ok(self.inner.read().await.members.get(&id).cloned())
    }

    async fn find_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Member>> {
        Ok(self
            .inner
            .read()
            .await
            .members
            .values()
            .find(|m| m.organization_id == organization_id && m.user_id == user_id)
            .cloned())
    }

    async fn find_member_by_email(
        &self,
        organization_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<Member>> {
        let tables = self.inner.read().await;
        let Some(user_id) = tables.user_by_email(email) else {
            return Ok(None);
        };
        Ok(tables
            .members
            .values()
            .find(|m| m.organization_id == organization_id && m.user_id == user_id)
            .cloned())
    }

    async fn update_member(&self, member: Member) -> StoreResult<Member> {
        let mut tables = self.inner.write().await;
        if !tables.members.contains_key(&member.id) {
            return Err(StoreError::NotFound { entity: "member" });
        }
        tables.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn list_members(&self, organization_id: Uuid) -> StoreResult<Vec<Member>> {
        let mut members: Vec<Member> = self
            .inner
            .read()
            .await
            .members
            .values()
            .filter(|m| m.organization_id == organization_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.created_at);
        Ok(members)
    }

    async fn count_members(&self, organization_id: Uuid) -> StoreResult<u32> {
        Ok(self
            .inner
            .read()
            .await
            .members
            .values()
            .filter(|m| m.organization_id == organization_id)
            .count() as u32)
    }

    async fn insert_invitation(&self, invitation: Invitation) -> StoreResult<Invitation> {
        let mut tables = self.inner.write().await;
        tables.invitations.insert(invitation.id, invitation.clone());
        Ok(invitation)
    }

    async fn invitation(&self, id: Uuid) -> StoreResult<Option<Invitation>> {
        Ok(self.inner.read().await.invitations.get(&id).cloned())
    }

    async fn find_pending_invitation(
        &self,
        organization_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<Invitation>> {
        Ok(self
            .inner
            .read()
            .await
            .invitations
            .values()
            .find(|i| {
                i.organization_id == organization_id
                    && i.status == InvitationStatus::Pending
                    && i.email_matches(email)
            })
            .cloned())
    }

    async fn list_invitations(
        &self,
        organization_id: Option<Uuid>,
    ) -> StoreResult<Vec<Invitation>> {
        let mut invitations: Vec<Invitation> = self
            .inner
            .read()
            .await
            .invitations
            .values()
            .filter(|i| organization_id.map_or(true, |org| i.organization_id == org))
            .cloned()
            .collect();
        invitations.sort_by_key(|i| i.created_at);
        Ok(invitations)
    }

    async fn count_pending_invitations_by_inviter(&self, inviter_id: Uuid) -> StoreResult<u32> {
        Ok(self
            .inner
            .read()
            .await
            .invitations
            .values()
            .filter(|i| i.inviter_id == inviter_id && i.status == InvitationStatus::Pending)
            .count() as u32)
    }

    async fn transition_invitation(
        &self,
        id: Uuid,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> StoreResult<Invitation> {
        let mut tables = self.inner.write().await;
        let invitation = tables.invitations.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "invitation",
        })?;
        if invitation.status != from {
            return Err(StoreError::PreconditionFailed("invitation.status"));
        }
        invitation.status = to;
        Ok(invitation.clone())
    }

    async fn refresh_invitation_expiry(
        &self,
        id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Invitation> {
        let mut tables = self.inner.write().await;
        let invitation = tables.invitations.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "invitation",
        })?;
        if invitation.status != InvitationStatus::Pending {
            return Err(StoreError::PreconditionFailed("invitation.status"));
        }
        invitation.expires_at = expires_at;
        Ok(invitation.clone())
    }

    async fn accept_invitation(
        &self,
        id: Uuid,
        member: Member,
    ) -> StoreResult<(Invitation, Member)> {
        let mut tables = self.inner.write().await;

        // Validate both halves before touching anything.
        let invitation = tables.invitations.get(&id).ok_or(StoreError::NotFound {
            entity: "invitation",
        })?;
        if invitation.status != InvitationStatus::Pending {
            return Err(StoreError::PreconditionFailed("invitation.status"));
        }
        if tables.membership_exists(member.organization_id, member.user_id) {
            return Err(StoreError::Conflict {
                constraint: UNIQUE_MEMBER_USER_ORGANIZATION,
            });
        }

        let invitation = tables
            .invitations
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                entity: "invitation",
            })?;
        invitation.status = InvitationStatus::Accepted;
        let invitation = invitation.clone();
        tables.members.insert(member.id, member.clone());
        Ok((invitation, member))
    }

    async fn insert_team(&self, team: Team) -> StoreResult<Team> {
        let mut tables = self.inner.write().await;
        tables.teams.insert(team.id, team.clone());
        Ok(team)
    }

    async fn team(&self, id: Uuid) -> StoreResult<Option<Team>> {
        Ok(self.inner.read().await.teams.get(&id).cloned())
    }

    async fn update_team(&self, team: Team) -> StoreResult<Team> {
        let mut tables = self.inner.write().await;
        if !tables.teams.contains_key(&team.id) {
            return Err(StoreError::NotFound { entity: "team" });
        }
        tables.teams.insert(team.id, team.clone());
        Ok(team)
    }

    async fn delete_team(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.inner.write().await;
        if tables.teams.remove(&id).is_none() {
            return Err(StoreError::NotFound { entity: "team" });
        }
        for member in tables.members.values_mut() {
            if member.team_id == Some(id) {
                member.team_id = None;
            }
        }
        Ok(())
    }

    async fn list_teams(&self, organization_id: Uuid) -> StoreResult<Vec<Team>> {
        let mut teams: Vec<Team> = self
            .inner
            .read()
            .await
            .teams
            .values()
            .filter(|t| t.organization_id == organization_id)
            .cloned()
            .collect();
        teams.sort_by_key(|t| t.created_at);
        Ok(teams)
    }

    async fn count_teams(&self, organization_id: Uuid) -> StoreResult<u32> {
        Ok(self
            .inner
            .read()
            .await
            .teams
            .values()
            .filter(|t| t.organization_id == organization_id)
            .count() as u32)
    }

    async fn count_team_members(&self, team_id: Uuid) -> StoreResult<u32> {
        Ok(self
            .inner
            .read()
            .await
            .members
            .values()
            .filter(|m| m.team_id == Some(team_id))
            .count() as u32)
    }
}
