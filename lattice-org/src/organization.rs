//! Organization domain models
//!
//! This module provides the core Organization entity for multi-tenant
//! organization management, plus the payload types used around it: the
//! pre-persistence draft (which creation hooks may rewrite), the partial
//! update, and the id-or-slug selector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// An organization represents a tenant in the multi-tenant system.
///
/// Users can belong to multiple organizations with different roles.
/// Deleting an organization removes its members, invitations, and teams.
///
/// # Examples
///
/// ```
/// use lattice_org::Organization;
///
/// let org = Organization::new("Acme Corp", "acme-corp");
/// assert_eq!(org.name, "Acme Corp");
/// assert_eq!(org.slug, "acme-corp");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// Unique identifier for the organization
    pub id: Uuid,

    /// Human-readable name
    pub name: String,

    /// URL-friendly slug (unique across the platform)
    pub slug: String,

    /// Logo URL for branding
    pub logo: Option<String>,

    /// Custom metadata for extensibility
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    /// When the organization was created
    pub created_at: DateTime<Utc>,
}

impl Organization {
    /// Creates a new organization.
    ///
    /// The organization is created with a newly generated UUID v7 id, the
    /// current timestamp, no logo, and empty metadata.
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            slug: slug.into(),
            logo: None,
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Build an organization from a (possibly hook-rewritten) draft.
    pub fn from_draft(draft: OrganizationDraft) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: draft.name,
            slug: draft.slug,
            logo: draft.logo,
            metadata: draft.metadata,
            created_at: Utc::now(),
        }
    }
}

/// The organization payload as submitted by a caller, before persistence.
///
/// The `before_create` hook receives a mutable draft and may rewrite any
/// field, including metadata, before anything is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationDraft {
    /// Human-readable name
    pub name: String,

    /// URL-friendly slug (must be unique)
    pub slug: String,

    /// Logo URL for branding
    pub logo: Option<String>,

    /// Custom metadata for extensibility
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl OrganizationDraft {
    /// Creates a draft with the given name and slug.
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            logo: None,
            metadata: HashMap::new(),
        }
    }

    /// Set the logo URL.
    pub fn with_logo(mut self, logo: impl Into<String>) -> Self {
        self.logo = Some(logo.into());
        self
    }

    /// Set a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A partial organization update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationUpdate {
    /// New name, if changing
    #[serde(default)]
    pub name: Option<String>,

    /// New slug, if changing (uniqueness is re-checked)
    #[serde(default)]
    pub slug: Option<String>,

    /// New logo URL, if changing
    #[serde(default)]
    pub logo: Option<String>,

    /// Replacement metadata, if changing
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl OrganizationUpdate {
    /// Apply this update to an organization in place.
    pub fn apply_to(&self, organization: &mut Organization) {
        if let Some(name) = &self.name {
            organization.name = name.clone();
        }
        if let Some(slug) = &self.slug {
            organization.slug = slug.clone();
        }
        if let Some(logo) = &self.logo {
            organization.logo = Some(logo.clone());
        }
        if let Some(metadata) = &self.metadata {
            organization.metadata = metadata.clone();
        }
    }
}

/// Lookup key for an organization: its id or its slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrgSelector {
    /// Look up by unique id.
    Id(Uuid),
    /// Look up by unique slug.
    Slug(String),
}

impl From<Uuid> for OrgSelector {
    fn from(id: Uuid) -> Self {
        OrgSelector::Id(id)
    }
}

impl From<&str> for OrgSelector {
    fn from(slug: &str) -> Self {
        OrgSelector::Slug(slug.to_string())
    }
}

impl From<String> for OrgSelector {
    fn from(slug: String) -> Self {
        OrgSelector::Slug(slug)
    }
}
