//! Role definitions
//!
//! A role is a named, composable set of resource→action grants. Roles are
//! pure data: they are validated against a statement schema at construction
//! time and immutable afterwards. Extending a role never mutates it; `merge`
//! returns a new role whose grants are the per-resource union of both inputs.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::statements::{SchemaError, Statements};

/// An immutable set of resource→granted-actions statements.
///
/// # Examples
///
/// ```
/// use lattice_rbac::{Role, Statements};
///
/// let statements = Statements::define([
///     ("project", vec!["create", "update", "delete"]),
/// ]).unwrap();
///
/// let member = Role::new(&statements, [("project", vec!["create"])]).unwrap();
/// assert!(member.allows("project", "create"));
/// assert!(!member.allows("project", "delete"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    grants: BTreeMap<String, BTreeSet<String>>,
}

impl Role {
    /// Build a role from `(resource, actions)` grant entries, validated
    /// against the given schema.
    ///
    /// Fails with [`SchemaError::UndeclaredResource`] or
    /// [`SchemaError::UndeclaredAction`] when a grant falls outside the
    /// schema. Granting a role more than its schema allows is always a
    /// configuration bug, never a runtime condition.
    pub fn new<R, A>(
        statements: &Statements,
        grants: impl IntoIterator<Item = (R, Vec<A>)>,
    ) -> Result<Self, SchemaError>
    where
        R: Into<String>,
        A: Into<String>,
    {
        let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (resource, actions) in grants {
            let slot = map.entry(resource.into()).or_default();
            for action in actions {
                slot.insert(action.into());
            }
        }

        statements.validate_grants(&map)?;
        Ok(Self { grants: map })
    }

    /// A role with no grants.
    ///
    /// Useful as the base for roles that only exist so members can be
    /// enumerated (the built-in `member` role is one).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Return a role whose grants are the per-resource union of `self` and
    /// `extra`.
    ///
    /// This is how default roles are extended without losing built-in
    /// grants; neither input is modified.
    ///
    /// # Examples
    ///
    /// ```
    /// use lattice_rbac::{Role, Statements};
    ///
    /// let statements = Statements::define([
    ///     ("project", vec!["create", "delete"]),
    /// ]).unwrap();
    ///
    /// let base = Role::new(&statements, [("project", vec!["create"])]).unwrap();
    /// let extra = Role::new(&statements, [("project", vec!["delete"])]).unwrap();
    ///
    /// let merged = base.merge(&extra);
    /// assert!(merged.allows("project", "create"));
    /// assert!(merged.allows("project", "delete"));
    /// assert!(!base.allows("project", "delete"));
    /// ```
    pub fn merge(&self, extra: &Role) -> Role {
        let mut grants = self.grants.clone();
        for (resource, actions) in &extra.grants {
            grants
                .entry(resource.clone())
                .or_default()
                .extend(actions.iter().cloned());
        }
        Role { grants }
    }

    /// Check whether this role grants an action on a resource.
    pub fn allows(&self, resource: &str, action: &str) -> bool {
        self.grants
            .get(resource)
            .is_some_and(|actions| actions.contains(action))
    }

    /// The raw grants map.
    pub fn grants(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.grants
    }

    /// Whether this role grants nothing.
    pub fn is_empty(&self) -> bool {
        self.grants.values().all(BTreeSet::is_empty)
    }
}
