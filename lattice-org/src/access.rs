//! Built-in access-control schema and roles
//!
//! The organization services authorize against a statement schema covering
//! the four managed resources. Embedders extend the schema and role
//! registry through [`OrganizationOptions::access`], merging on top of
//! these defaults rather than replacing them.
//!
//! Built-in roles:
//! - **owner**: every grant, including `organization:delete`
//! - **admin**: everything except `organization:delete`
//! - **member**: no management grants
//!
//! [`OrganizationOptions::access`]: crate::config::OrganizationOptions

use lattice_rbac::{AccessControl, AccessRequest, Role, Statements};

use crate::error::{OrgError, OrgResult};
use crate::member::Member;
use crate::store::OrganizationStore;
use uuid::Uuid;

/// Resource names of the built-in statement schema.
pub mod resource {
    /// The organization itself.
    pub const ORGANIZATION: &str = "organization";
    /// Organization memberships.
    pub const MEMBER: &str = "member";
    /// Invitations.
    pub const INVITATION: &str = "invitation";
    /// Teams.
    pub const TEAM: &str = "team";
}

/// Action names of the built-in statement schema.
pub mod action {
    /// Create a resource.
    pub const CREATE: &str = "create";
    /// Update a resource.
    pub const UPDATE: &str = "update";
    /// Delete a resource.
    pub const DELETE: &str = "delete";
    /// Cancel a pending invitation.
    pub const CANCEL: &str = "cancel";
}

/// Built-in role names.
pub mod role {
    /// Full organization control.
    pub const OWNER: &str = "owner";
    /// Management of members, invitations, and teams.
    pub const ADMIN: &str = "admin";
    /// Plain membership, no management grants.
    pub const MEMBER: &str = "member";
}

/// The built-in statement schema.
///
/// Never fails: the entries are static and well-formed; an error here is a
/// bug in this module.
pub fn default_statements() -> Statements {
    Statements::define([
        (
            resource::ORGANIZATION,
            vec![action::UPDATE, action::DELETE],
        ),
        (
            resource::MEMBER,
            vec![action::CREATE, action::UPDATE, action::DELETE],
        ),
        (resource::INVITATION, vec![action::CREATE, action::CANCEL]),
        (
            resource::TEAM,
            vec![action::CREATE, action::UPDATE, action::DELETE],
        ),
    ])
    .expect("built-in statement schema is well-formed")
}

/// The built-in registry: default statements plus owner/admin/member.
pub fn default_access_control() -> AccessControl {
    let statements = default_statements();

    let admin_grants = [
        (resource::ORGANIZATION, vec![action::UPDATE]),
        (
            resource::MEMBER,
            vec![action::CREATE, action::UPDATE, action::DELETE],
        ),
        (resource::INVITATION, vec![action::CREATE, action::CANCEL]),
        (
            resource::TEAM,
            vec![action::CREATE, action::UPDATE, action::DELETE],
        ),
    ];
    let owner_extra = [(resource::ORGANIZATION, vec![action::DELETE])];

    let admin =
        Role::new(&statements, admin_grants).expect("built-in admin role fits the schema");
    let owner = admin.merge(
        &Role::new(&statements, owner_extra).expect("built-in owner role fits the schema"),
    );

    let mut ac = AccessControl::new(statements);
    ac.register_role(role::OWNER, owner)
        .expect("built-in owner role fits the schema");
    ac.register_role(role::ADMIN, admin)
        .expect("built-in admin role fits the schema");
    ac.register_role(role::MEMBER, Role::empty())
        .expect("empty role fits any schema");
    ac
}

/// Load the caller's membership in an organization, or fail `Forbidden`.
pub(crate) async fn require_member(
    store: &dyn OrganizationStore,
    organization_id: Uuid,
    user_id: Uuid,
) -> OrgResult<Member> {
    store
        .find_member(organization_id, user_id)
        .await?
        .ok_or_else(|| OrgError::Forbidden("caller is not a member of this organization".into()))
}

/// Check that a member's roles grant `resource:action`.
pub(crate) fn authorize(
    access: &AccessControl,
    member: &Member,
    resource: &str,
    action: &str,
) -> OrgResult<()> {
    let request = AccessRequest::new().resource(resource, [action]);
    access.check(member.roles.iter(), &request)?;
    Ok(())
}
