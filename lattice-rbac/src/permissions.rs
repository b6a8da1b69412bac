//! # Permission evaluation
//!
//! The [`AccessControl`] registry holds the statement schema and the named
//! roles, and answers permission checks. Checks fail closed: an unknown
//! resource, action, or role is an error distinct from an ordinary denial,
//! so callers can tell a typo'd request apart from a missing grant.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::roles::Role;
use crate::statements::{SchemaError, Statements};

/// Permission check failures.
///
/// `UnknownResource`, `UnknownAction`, and `UnknownRole` mean the request or
/// the member's role assignment fell outside the configured schema; `Denied`
/// means the request was well-formed but no assigned role grants it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The request names a resource the schema does not declare.
    #[error("unknown permission: resource '{0}' is not declared")]
    UnknownResource(String),

    /// The request names an action the schema does not declare for that
    /// resource.
    #[error("unknown permission: action '{action}' is not declared for resource '{resource}'")]
    UnknownAction {
        /// The requested resource.
        resource: String,
        /// The undeclared action.
        action: String,
    },

    /// A role name that is not present in the registry.
    ///
    /// Unknown roles fail permission checks rather than being silently
    /// granted.
    #[error("unknown role '{0}'")]
    UnknownRole(String),

    /// The request is valid but not granted by any of the roles.
    #[error("permission denied: {resource}:{action}")]
    Denied {
        /// The requested resource.
        resource: String,
        /// The requested action.
        action: String,
    },
}

impl AccessError {
    /// Stable error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AccessError::UnknownResource(_) => "UNKNOWN_RESOURCE",
            AccessError::UnknownAction { .. } => "UNKNOWN_ACTION",
            AccessError::UnknownRole(_) => "UNKNOWN_ROLE",
            AccessError::Denied { .. } => "PERMISSION_DENIED",
        }
    }
}

/// A requested permission set: resource → actions the caller wants to
/// perform.
///
/// # Examples
///
/// ```
/// use lattice_rbac::AccessRequest;
///
/// let request = AccessRequest::new()
///     .resource("project", ["create", "update"])
///     .resource("report", ["read"]);
/// assert_eq!(request.entries().count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl AccessRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add requested actions for a resource. Repeated calls for the same
    /// resource accumulate.
    pub fn resource<A>(mut self, resource: impl Into<String>, actions: impl IntoIterator<Item = A>) -> Self
    where
        A: Into<String>,
    {
        self.entries
            .entry(resource.into())
            .or_default()
            .extend(actions.into_iter().map(Into::into));
        self
    }

    /// Iterate over `(resource, actions)` entries.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.entries.iter().map(|(r, a)| (r.as_str(), a))
    }

    /// Whether no permissions were requested.
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(BTreeSet::is_empty)
    }
}

/// The process-wide access-control registry: a statement schema plus named
/// roles.
///
/// Configured once at startup and read-only afterwards; concurrent reads
/// need no locking.
///
/// # Examples
///
/// ```
/// use lattice_rbac::{AccessControl, AccessRequest, Statements};
///
/// let statements = Statements::define([
///     ("project", vec!["create", "update", "delete"]),
/// ]).unwrap();
///
/// let mut ac = AccessControl::new(statements);
/// ac.define_role("member", [("project", vec!["create"])]).unwrap();
/// ac.define_role("admin", [("project", vec!["create", "update", "delete"])]).unwrap();
///
/// let create = AccessRequest::new().resource("project", ["create"]);
/// assert!(ac.check(["member"], &create).is_ok());
///
/// let delete = AccessRequest::new().resource("project", ["delete"]);
/// assert!(ac.check(["member"], &delete).is_err());
/// assert!(ac.check(["member", "admin"], &delete).is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct AccessControl {
    statements: Statements,
    roles: BTreeMap<String, Role>,
}

impl AccessControl {
    /// Create a registry over a statement schema with no roles.
    pub fn new(statements: Statements) -> Self {
        Self {
            statements,
            roles: BTreeMap::new(),
        }
    }

    /// The statement schema this registry validates against.
    pub fn statements(&self) -> &Statements {
        &self.statements
    }

    /// Build a role from grant entries and register it under `name`.
    ///
    /// Replaces any existing role with the same name. Fails with
    /// [`SchemaError`] when a grant falls outside the schema.
    pub fn define_role<R, A>(
        &mut self,
        name: impl Into<String>,
        grants: impl IntoIterator<Item = (R, Vec<A>)>,
    ) -> Result<(), SchemaError>
    where
        R: Into<String>,
        A: Into<String>,
    {
        let role = Role::new(&self.statements, grants)?;
        self.roles.insert(name.into(), role);
        Ok(())
    }

    /// Register a pre-built role under `name`, re-validating its grants
    /// against this registry's schema.
    ///
    /// Needed when a role was built against a different (for example,
    /// pre-merge) schema.
    pub fn register_role(
        &mut self,
        name: impl Into<String>,
        role: Role,
    ) -> Result<(), SchemaError> {
        self.statements.validate_grants(role.grants())?;
        self.roles.insert(name.into(), role);
        Ok(())
    }

    /// Look up a role by name.
    pub fn role(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    /// Iterate over the registered role names.
    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    /// Check a permission request against the union of the named roles.
    ///
    /// Passes iff, for every requested resource, every requested action is
    /// present in the union of grants across all of the given roles.
    /// Fails closed on unknown roles, resources, or actions.
    pub fn check<I, S>(&self, role_names: I, request: &AccessRequest) -> Result<(), AccessError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // Resolve every role first so an unknown assignment fails the whole
        // check, even for permissions another role would have granted.
        let mut roles = Vec::new();
        for name in role_names {
            let name = name.as_ref();
            let role = self
                .roles
                .get(name)
                .ok_or_else(|| AccessError::UnknownRole(name.to_string()))?;
            roles.push(role);
        }

        for (resource, actions) in request.entries() {
            let declared = self
                .statements
                .actions(resource)
                .ok_or_else(|| AccessError::UnknownResource(resource.to_string()))?;

            for action in actions {
                if !declared.contains(action) {
                    return Err(AccessError::UnknownAction {
                        resource: resource.to_string(),
                        action: action.clone(),
                    });
                }
                if !roles.iter().any(|role| role.allows(resource, action)) {
                    return Err(AccessError::Denied {
                        resource: resource.to_string(),
                        action: action.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Check a request against a single named role.
    ///
    /// Semantically identical to [`AccessControl::check`] with that one
    /// role; useful for pre-checks where no live member is at hand.
    pub fn check_role(&self, role_name: &str, request: &AccessRequest) -> Result<(), AccessError> {
        self.check([role_name], request)
    }

    /// Boolean convenience over [`AccessControl::check`].
    pub fn is_allowed<I, S>(&self, role_names: I, request: &AccessRequest) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.check(role_names, request).is_ok()
    }
}
