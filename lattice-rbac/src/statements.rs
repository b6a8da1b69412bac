//! # Statements
//!
//! The statement schema declares which actions are valid for each resource.
//! Roles and permission checks are both validated against it, so a typo'd
//! resource or action is a hard error instead of a silently ignored grant.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors raised while building or validating against a statement schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The schema declares no resources at all.
    #[error("statement schema is empty")]
    EmptySchema,

    /// A resource was declared with an empty name.
    #[error("statement schema contains a resource with an empty name")]
    EmptyResourceName,

    /// A resource was declared without any actions.
    #[error("resource '{0}' declares no actions")]
    NoActions(String),

    /// An action was declared with an empty name.
    #[error("resource '{0}' declares an action with an empty name")]
    EmptyActionName(String),

    /// A role grant references a resource the schema does not declare.
    #[error("grant references undeclared resource '{0}'")]
    UndeclaredResource(String),

    /// A role grant references an action the schema does not declare
    /// for that resource.
    #[error("grant references undeclared action '{action}' on resource '{resource}'")]
    UndeclaredAction {
        /// The resource the grant was made under.
        resource: String,
        /// The action that is not part of the schema.
        action: String,
    },
}

/// The closed resource→allowed-actions schema.
///
/// A `Statements` value is immutable after construction and is safe to share
/// across threads for the lifetime of the process; the access-control
/// configuration is read-only after startup.
///
/// # Examples
///
/// ```
/// use lattice_rbac::Statements;
///
/// let statements = Statements::define([
///     ("project", vec!["create", "update", "delete"]),
///     ("report", vec!["read", "export"]),
/// ]).unwrap();
///
/// assert!(statements.allows("project", "create"));
/// assert!(!statements.allows("project", "export"));
/// assert!(!statements.allows("pipeline", "create"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statements {
    resources: BTreeMap<String, BTreeSet<String>>,
}

impl Statements {
    /// Build a schema from `(resource, actions)` entries.
    ///
    /// Fails with [`SchemaError`] if the schema is empty, a resource name is
    /// blank, a resource declares no actions, or an action name is blank.
    /// Duplicate entries for the same resource are unioned.
    pub fn define<R, A>(entries: impl IntoIterator<Item = (R, Vec<A>)>) -> Result<Self, SchemaError>
    where
        R: Into<String>,
        A: Into<String>,
    {
        let mut resources: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for (resource, actions) in entries {
            let resource = resource.into();
            if resource.trim().is_empty() {
                return Err(SchemaError::EmptyResourceName);
            }
            if actions.is_empty() {
                return Err(SchemaError::NoActions(resource));
            }

            let slot = resources.entry(resource.clone()).or_default();
            for action in actions {
                let action = action.into();
                if action.trim().is_empty() {
                    return Err(SchemaError::EmptyActionName(resource));
                }
                slot.insert(action);
            }
        }

        if resources.is_empty() {
            return Err(SchemaError::EmptySchema);
        }

        Ok(Self { resources })
    }

    /// Check whether a resource is declared.
    pub fn contains_resource(&self, resource: &str) -> bool {
        self.resources.contains_key(resource)
    }

    /// Check whether an action is declared for a resource.
    pub fn allows(&self, resource: &str, action: &str) -> bool {
        self.resources
            .get(resource)
            .is_some_and(|actions| actions.contains(action))
    }

    /// Get the declared actions for a resource.
    pub fn actions(&self, resource: &str) -> Option<&BTreeSet<String>> {
        self.resources.get(resource)
    }

    /// Iterate over the declared resource names.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Number of declared resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the schema declares no resources.
    ///
    /// A schema built through [`Statements::define`] is never empty; this is
    /// kept for symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Union another schema into this one.
    ///
    /// Used to extend the built-in organization statements with
    /// embedder-defined resources without redeclaring the defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use lattice_rbac::Statements;
    ///
    /// let base = Statements::define([("team", vec!["create"])]).unwrap();
    /// let extra = Statements::define([("project", vec!["create"])]).unwrap();
    /// let merged = base.merge(extra);
    ///
    /// assert!(merged.allows("team", "create"));
    /// assert!(merged.allows("project", "create"));
    /// ```
    pub fn merge(mut self, other: Statements) -> Statements {
        for (resource, actions) in other.resources {
            self.resources.entry(resource).or_default().extend(actions);
        }
        self
    }

    /// Validate a grants map against this schema.
    ///
    /// Every granted resource must be declared, and every granted action must
    /// be part of that resource's declared actions.
    pub fn validate_grants(
        &self,
        grants: &BTreeMap<String, BTreeSet<String>>,
    ) -> Result<(), SchemaError> {
        for (resource, actions) in grants {
            let declared = self
                .resources
                .get(resource)
                .ok_or_else(|| SchemaError::UndeclaredResource(resource.clone()))?;
            for action in actions {
                if !declared.contains(action) {
                    return Err(SchemaError::UndeclaredAction {
                        resource: resource.clone(),
                        action: action.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
