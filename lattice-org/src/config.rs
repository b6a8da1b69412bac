//! Configuration surface
//!
//! Everything the embedder tunes lives here: the fixed-or-computed
//! [`Setting`] evaluator, the option groups for creation/deletion/teams,
//! and the [`OrganizationHooks`] extension point. The configuration is
//! built once at startup and treated as immutable for the process lifetime.

use async_trait::async_trait;
use chrono::Duration;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::access::{default_access_control, role};
use crate::member::Member;
use crate::organization::{Organization, OrganizationDraft};
use lattice_rbac::AccessControl;

/// A configuration value that is either a constant or computed per scope.
///
/// The scope id is whatever entity the option is counted against: the user
/// for creation gates and per-user limits, the organization for membership
/// and team caps, the team for per-team caps. Callers evaluate both
/// variants uniformly instead of branching on the kind at each call site.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use lattice_org::Setting;
///
/// let fixed = Setting::fixed(5u32);
/// assert_eq!(fixed.evaluate(Uuid::now_v7()), 5);
///
/// let computed = Setting::computed(|_user| 20u32);
/// assert_eq!(computed.evaluate(Uuid::now_v7()), 20);
/// ```
pub enum Setting<T> {
    /// A constant value.
    Fixed(T),
    /// A value computed from the scope id.
    Computed(Arc<dyn Fn(Uuid) -> T + Send + Sync>),
}

impl<T: Clone> Setting<T> {
    /// A constant setting.
    pub fn fixed(value: T) -> Self {
        Setting::Fixed(value)
    }

    /// A computed setting.
    pub fn computed(f: impl Fn(Uuid) -> T + Send + Sync + 'static) -> Self {
        Setting::Computed(Arc::new(f))
    }

    /// Evaluate the setting for a scope.
    pub fn evaluate(&self, scope: Uuid) -> T {
        match self {
            Setting::Fixed(value) => value.clone(),
            Setting::Computed(f) => f(scope),
        }
    }
}

impl<T: Clone> Clone for Setting<T> {
    fn clone(&self) -> Self {
        match self {
            Setting::Fixed(value) => Setting::Fixed(value.clone()),
            Setting::Computed(f) => Setting::Computed(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Setting<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setting::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Setting::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// A hook callback failure. `before_*` failures abort the enclosing
/// operation; `after_*` failures are reported but not rolled back.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HookError(String);

impl HookError {
    /// Create a hook error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Lifecycle extension point around organization creation and deletion.
///
/// Injected at construction time and invoked synchronously within the
/// owning operation's control flow:
/// - `before_create` fires before persistence; it may rewrite the draft
///   (including metadata) or abort the creation by returning an error.
/// - `after_create` fires after the organization and creator member are
///   committed; failures are logged and do not roll back.
/// - `before_delete` fires before any removal; an error aborts cleanly.
/// - `after_delete` fires after the cascade committed; failures are logged
///   and do not roll back.
#[async_trait]
pub trait OrganizationHooks: Send + Sync {
    /// Rewrite or veto the organization payload before persistence.
    async fn before_create(&self, _draft: &mut OrganizationDraft) -> Result<(), HookError> {
        Ok(())
    }

    /// Observe the committed organization and creator membership.
    async fn after_create(
        &self,
        _organization: &Organization,
        _creator: &Member,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// Veto an organization deletion before anything is removed.
    async fn before_delete(&self, _organization: &Organization) -> Result<(), HookError> {
        Ok(())
    }

    /// Observe a committed deletion.
    async fn after_delete(&self, _organization: &Organization) -> Result<(), HookError> {
        Ok(())
    }
}

/// Hooks implementation that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

#[async_trait]
impl OrganizationHooks for NoopHooks {}

/// Options around organization creation.
#[derive(Debug, Clone, Default)]
pub struct CreationOptions {
    /// Disable organization creation entirely.
    pub disabled: bool,
}

/// Options around organization deletion.
#[derive(Debug, Clone, Default)]
pub struct DeletionOptions {
    /// Disable organization deletion entirely.
    pub disabled: bool,
}

/// Options for the optional teams feature.
#[derive(Debug, Clone)]
pub struct TeamOptions {
    /// Enable teams. When disabled, team operations fail and the `team_id`
    /// fields on members and invitations are unused.
    pub enabled: bool,

    /// Maximum teams per organization (scope: organization id).
    pub maximum_teams: Setting<u32>,

    /// Maximum members per team (scope: team id). Enforced at assignment
    /// time, including via invitation acceptance.
    pub maximum_members_per_team: Setting<u32>,

    /// Allow removing an organization's last team.
    pub allow_removing_all_teams: bool,
}

impl Default for TeamOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            maximum_teams: Setting::fixed(u32::MAX),
            maximum_members_per_team: Setting::fixed(u32::MAX),
            allow_removing_all_teams: false,
        }
    }
}

/// Top-level configuration for the organization services.
///
/// Built once at startup; the services hold it behind an `Arc` and never
/// mutate it.
#[derive(Debug, Clone)]
pub struct OrganizationOptions {
    /// Whether a user may create organizations (scope: user id).
    pub allow_user_to_create_organization: Setting<bool>,

    /// Maximum organizations a user may belong to (scope: user id).
    pub organization_limit: Setting<u32>,

    /// Role granted to the creator's membership. Defaults to `owner`.
    pub creator_role: String,

    /// Maximum members per organization (scope: organization id).
    pub membership_limit: Setting<u32>,

    /// Maximum outstanding (pending) invitations per inviting user
    /// (scope: user id).
    pub invitation_limit: Setting<u32>,

    /// Invitation time-to-live. `expires_at` is always
    /// `created_at + invitation_expires_in`. Defaults to 48 hours.
    pub invitation_expires_in: Duration,

    /// When a pending invitation exists for the same email and the new
    /// request is not a resend, cancel the old invitation and create a
    /// fresh record instead of rejecting. Defaults to true.
    pub cancel_pending_invitations_on_reinvite: bool,

    /// Prefix for the accept link placed in invitation notifications.
    /// `None` yields a bare `/accept-invitation/{id}` path.
    pub invite_link_base: Option<String>,

    /// Organization creation options.
    pub organization_creation: CreationOptions,

    /// Organization deletion options.
    pub organization_deletion: DeletionOptions,

    /// Teams feature options.
    pub teams: TeamOptions,

    /// Access-control registry: the statement schema plus the role
    /// registry the services authorize against. Defaults to the built-in
    /// organization statements and owner/admin/member roles; embedders
    /// merge custom statements and roles on top.
    pub access: AccessControl,
}

impl Default for OrganizationOptions {
    fn default() -> Self {
        Self {
            allow_user_to_create_organization: Setting::fixed(true),
            organization_limit: Setting::fixed(5),
            creator_role: role::OWNER.to_string(),
            membership_limit: Setting::fixed(100),
            invitation_limit: Setting::fixed(100),
            invitation_expires_in: Duration::seconds(172_800),
            cancel_pending_invitations_on_reinvite: true,
            invite_link_base: None,
            organization_creation: CreationOptions::default(),
            organization_deletion: DeletionOptions::default(),
            teams: TeamOptions::default(),
            access: default_access_control(),
        }
    }
}

impl OrganizationOptions {
    /// Options with every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// The accept link delivered with invitation notifications.
    pub fn accept_link(&self, invitation_id: Uuid) -> String {
        match &self.invite_link_base {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), invitation_id),
            None => format!("/accept-invitation/{invitation_id}"),
        }
    }
}
