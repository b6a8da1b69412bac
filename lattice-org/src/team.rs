//! Team domain models
//!
//! Teams are an optional sub-grouping of members within an organization,
//! enabled through configuration. When the feature is disabled, the
//! `team_id` fields on members and invitations are unused.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sub-grouping of members within an organization.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use lattice_org::Team;
///
/// let org_id = Uuid::now_v7();
/// let team = Team::new(org_id, "Platform");
/// assert_eq!(team.organization_id, org_id);
/// assert_eq!(team.name, "Platform");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    /// Unique team id
    pub id: Uuid,

    /// Organization this team belongs to
    pub organization_id: Uuid,

    /// Team name
    pub name: String,

    /// When the team was created
    pub created_at: DateTime<Utc>,

    /// When the team was last updated
    pub updated_at: DateTime<Utc>,
}

impl Team {
    /// Creates a new team with a generated UUID v7 id and current
    /// timestamps.
    pub fn new(organization_id: Uuid, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            organization_id,
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rename the team, bumping `updated_at`.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.updated_at = Utc::now();
    }
}
