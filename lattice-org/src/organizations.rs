//! Organization lifecycle manager
//!
//! Creation (gated, limited, hook-wrapped), update, cascading deletion,
//! and active-organization selection. `before_*` hooks fire ahead of
//! persistence and abort cleanly; `after_*` hooks fire once the change is
//! committed and their failures are reported via `tracing` without rolling
//! back.

use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::access::{action, authorize, require_member, resource};
use crate::config::{NoopHooks, OrganizationHooks, OrganizationOptions};
use crate::error::{LimitKind, OrgError, OrgResult};
use crate::member::{Member, RoleSet};
use crate::organization::{OrgSelector, Organization, OrganizationDraft, OrganizationUpdate};
use crate::session::{ActiveOrganizationSession, Identity};
use crate::store::{OrganizationStore, StoreError, UNIQUE_ORGANIZATION_SLUG};

/// The organization lifecycle manager.
pub struct OrganizationManager {
    store: Arc<dyn OrganizationStore>,
    options: Arc<OrganizationOptions>,
    hooks: Arc<dyn OrganizationHooks>,
}

impl OrganizationManager {
    /// Create a manager with no-op hooks.
    pub fn new(store: Arc<dyn OrganizationStore>, options: Arc<OrganizationOptions>) -> Self {
        Self {
            store,
            options,
            hooks: Arc::new(NoopHooks),
        }
    }

    /// Install lifecycle hooks.
    pub fn with_hooks(mut self, hooks: Arc<dyn OrganizationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Create an organization, persisting it together with a creator
    /// membership holding the configured `creator_role`.
    ///
    /// The creation gate and per-user organization limit are checked
    /// first; `before_create` may rewrite the draft or abort before
    /// anything is persisted. The organization and creator member are
    /// committed atomically; an `after_create` failure is logged and does
    /// not roll them back.
    pub async fn create_organization(
        &self,
        actor: &Identity,
        draft: OrganizationDraft,
    ) -> OrgResult<(Organization, Member)> {
        if self.options.organization_creation.disabled {
            return Err(OrgError::FeatureDisabled("organization creation"));
        }
        if !self
            .options
            .allow_user_to_create_organization
            .evaluate(actor.user_id)
        {
            return Err(OrgError::Forbidden(
                "user is not allowed to create organizations".into(),
            ));
        }

        let limit = self.options.organization_limit.evaluate(actor.user_id);
        let held = self.store.organizations_for_user(actor.user_id).await?.len() as u32;
        if held >= limit {
            return Err(OrgError::LimitExceeded {
                kind: LimitKind::Organizations,
                limit,
            });
        }

        if self
            .store
            .organization_by_slug(&draft.slug)
            .await?
            .is_some()
        {
            return Err(OrgError::SlugTaken(draft.slug));
        }

        // Fires before persistence: may rewrite the payload or abort with
        // nothing committed.
        let mut draft = draft;
        self.hooks.before_create(&mut draft).await?;

        let slug = draft.slug.clone();
        let organization = Organization::from_draft(draft);
        let creator = Member::new(
            organization.id,
            actor.user_id,
            RoleSet::single(&self.options.creator_role),
        );

        let (organization, creator) = match self
            .store
            .create_organization_with_owner(organization, creator)
            .await
        {
            Ok(pair) => pair,
            Err(StoreError::Conflict {
                constraint: UNIQUE_ORGANIZATION_SLUG,
            }) => {
                // Raced another creation with the same slug.
                return Err(OrgError::SlugTaken(slug));
            }
            Err(err) => return Err(err.into()),
        };

        if let Err(err) = self.hooks.after_create(&organization, &creator).await {
            warn!(
                organization_id = %organization.id,
                error = %err,
                "after_create hook failed; organization already committed"
            );
        }

        debug!(
            organization_id = %organization.id,
            slug = %organization.slug,
            creator = %creator.user_id,
            "organization created"
        );
        Ok((organization, creator))
    }

    /// Update an organization. Requires the `organization:update`
    /// permission; slug changes re-check uniqueness.
    pub async fn update_organization(
        &self,
        actor: &Identity,
        organization_id: Uuid,
        update: OrganizationUpdate,
    ) -> OrgResult<Organization> {
        let mut organization = self
            .store
            .organization(organization_id)
            .await?
            .ok_or(OrgError::NotFound("organization"))?;

        let member = require_member(self.store.as_ref(), organization_id, actor.user_id).await?;
        authorize(
            &self.options.access,
            &member,
            resource::ORGANIZATION,
            action::UPDATE,
        )?;

        if let Some(slug) = &update.slug {
            if *slug != organization.slug
                && self.store.organization_by_slug(slug).await?.is_some()
            {
                return Err(OrgError::SlugTaken(slug.clone()));
            }
        }

        update.apply_to(&mut organization);
        let organization = match self.store.update_organization(organization).await {
            Ok(org) => org,
            Err(StoreError::Conflict {
                constraint: UNIQUE_ORGANIZATION_SLUG,
            }) => {
                return Err(OrgError::SlugTaken(update.slug.unwrap_or_default()));
            }
            Err(err) => return Err(err.into()),
        };

        debug!(organization_id = %organization.id, "organization updated");
        Ok(organization)
    }

    /// Delete an organization and, atomically, all of its members,
    /// invitations, and teams.
    ///
    /// Requires the `organization:delete` permission. `before_delete`
    /// aborts with nothing removed; an `after_delete` failure is logged
    /// and does not resurrect anything.
    pub async fn delete_organization(
        &self,
        actor: &Identity,
        organization_id: Uuid,
    ) -> OrgResult<Organization> {
        if self.options.organization_deletion.disabled {
            return Err(OrgError::FeatureDisabled("organization deletion"));
        }

        let organization = self
            .store
            .organization(organization_id)
            .await?
            .ok_or(OrgError::NotFound("organization"))?;

        let member = require_member(self.store.as_ref(), organization_id, actor.user_id).await?;
        authorize(
            &self.options.access,
            &member,
            resource::ORGANIZATION,
            action::DELETE,
        )?;

        self.hooks.before_delete(&organization).await?;

        self.store.delete_organization(organization_id).await?;

        if let Err(err) = self.hooks.after_delete(&organization).await {
            warn!(
                organization_id = %organization.id,
                error = %err,
                "after_delete hook failed; deletion already committed"
            );
        }

        debug!(organization_id = %organization.id, "organization deleted");
        Ok(organization)
    }

    /// Resolve an organization by id or slug. Pure read.
    pub async fn find_organization(&self, selector: &OrgSelector) -> OrgResult<Option<Organization>> {
        let found = match selector {
            OrgSelector::Id(id) => self.store.organization(*id).await?,
            OrgSelector::Slug(slug) => self.store.organization_by_slug(slug).await?,
        };
        Ok(found)
    }

    /// Organizations the user belongs to. Pure read.
    pub async fn list_organizations(&self, user_id: Uuid) -> OrgResult<Vec<Organization>> {
        Ok(self.store.organizations_for_user(user_id).await?)
    }

    /// Select the active organization for the caller's session.
    ///
    /// Validates that the caller is a member of the target organization,
    /// then writes the pointer through the session provider. The external
    /// session store owns persistence of the pointer.
    pub async fn set_active_organization(
        &self,
        actor: &Identity,
        session: &dyn ActiveOrganizationSession,
        selector: impl Into<OrgSelector>,
    ) -> OrgResult<Organization> {
        let selector = selector.into();
        let organization = self
            .find_organization(&selector)
            .await?
            .ok_or(OrgError::NotFound("organization"))?;

        require_member(self.store.as_ref(), organization.id, actor.user_id).await?;

        session.set_active_organization(Some(organization.id)).await?;

        debug!(
            organization_id = %organization.id,
            user_id = %actor.user_id,
            "active organization set"
        );
        Ok(organization)
    }
}
