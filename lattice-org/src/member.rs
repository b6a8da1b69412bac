//! Membership domain models
//!
//! A member links a user to an organization with one or more roles. Roles
//! are held as a proper set in memory; the comma-delimited string form used
//! by persistence layers exists only at the serialization boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// An order-irrelevant set of role names.
///
/// Serialized as a comma-delimited string (`"admin,member"`), which is also
/// the persisted form; in memory it is a set, so duplicate or reordered
/// inputs compare equal.
///
/// # Examples
///
/// ```
/// use lattice_org::RoleSet;
///
/// let roles: RoleSet = ["admin", "member"].into_iter().collect();
/// assert!(roles.contains("admin"));
/// assert_eq!(roles.to_delimited(), "admin,member");
/// assert_eq!(RoleSet::from_delimited("member, admin"), roles);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    /// An empty role set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding a single role.
    pub fn single(role: impl Into<String>) -> Self {
        let mut set = BTreeSet::new();
        set.insert(role.into());
        Self(set)
    }

    /// Parse the delimited persistence form. Blank segments are dropped and
    /// surrounding whitespace is trimmed.
    pub fn from_delimited(s: &str) -> Self {
        Self(
            s.split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    /// Render the delimited persistence form (comma-joined, sorted).
    pub fn to_delimited(&self) -> String {
        self.0.iter().cloned().collect::<Vec<_>>().join(",")
    }

    /// Add a role.
    pub fn insert(&mut self, role: impl Into<String>) {
        self.0.insert(role.into());
    }

    /// Check whether a role is present.
    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    /// Iterate over the role names.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of roles.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set holds no roles.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_delimited())
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl Serialize for RoleSet {
    fn serialize<Ser>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error>
    where
        Ser: Serializer,
    {
        serializer.serialize_str(&self.to_delimited())
    }
}

impl<'de> Deserialize<'de> for RoleSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(RoleSet::from_delimited(&s))
    }
}

/// Membership linking a user to an organization.
///
/// A member always belongs to exactly one organization and one user; a user
/// may hold memberships across many organizations, but at most one per
/// organization.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use lattice_org::{Member, RoleSet};
///
/// let org_id = Uuid::now_v7();
/// let user_id = Uuid::now_v7();
/// let member = Member::new(org_id, user_id, RoleSet::single("member"));
/// assert!(member.has_role("member"));
/// assert!(member.team_id.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    /// Unique membership id
    pub id: Uuid,

    /// Organization id (owning relation)
    pub organization_id: Uuid,

    /// User id (weak reference, not ownership)
    pub user_id: Uuid,

    /// Roles held within the organization
    pub roles: RoleSet,

    /// Team assignment, when the teams feature is enabled
    pub team_id: Option<Uuid>,

    /// When the membership was created
    pub created_at: DateTime<Utc>,
}

impl Member {
    /// Creates a new membership with a generated UUID v7 id and the current
    /// timestamp.
    pub fn new(organization_id: Uuid, user_id: Uuid, roles: RoleSet) -> Self {
        Self {
            id: Uuid::now_v7(),
            organization_id,
            user_id,
            roles,
            team_id: None,
            created_at: Utc::now(),
        }
    }

    /// Set the team assignment.
    pub fn with_team(mut self, team_id: Uuid) -> Self {
        self.team_id = Some(team_id);
        self
    }

    /// Check whether this member holds a role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}
