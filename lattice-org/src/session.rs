//! Session and identity seam
//!
//! The session/identity provider is external: it authenticates users and
//! persists session state. This module defines the narrow view the
//! organization services consume — the request-scoped [`Identity`] and the
//! per-session active-organization pointer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Session backend failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session backend failed to read or write.
    #[error("session backend error: {0}")]
    Backend(String),
}

/// The authenticated identity behind the current request, as supplied by
/// the external session provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User id
    pub user_id: Uuid,

    /// Verified email address
    pub email: String,

    /// Display name, when the provider knows one
    pub name: Option<String>,
}

impl Identity {
    /// Create an identity from a user id and email.
    pub fn new(user_id: Uuid, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            name: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name to show in messages: the display name if known, else the email.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

/// The session-scoped active-organization pointer.
///
/// At most one organization is active per session, defaulting to none. The
/// external session store owns persistence; the organization manager only
/// validates membership and writes the new value through this trait.
#[async_trait]
pub trait ActiveOrganizationSession: Send + Sync {
    /// Read the active organization, if one is set.
    async fn active_organization(&self) -> Result<Option<Uuid>, SessionError>;

    /// Set or clear the active organization.
    async fn set_active_organization(
        &self,
        organization_id: Option<Uuid>,
    ) -> Result<(), SessionError>;
}

/// In-memory session, for tests and single-process embedders.
#[derive(Debug, Default)]
pub struct InMemorySession {
    active: RwLock<Option<Uuid>>,
}

impl InMemorySession {
    /// Create a session with no active organization.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActiveOrganizationSession for InMemorySession {
    async fn active_organization(&self) -> Result<Option<Uuid>, SessionError> {
        Ok(*self.active.read().await)
    }

    async fn set_active_organization(
        &self,
        organization_id: Option<Uuid>,
    ) -> Result<(), SessionError> {
        *self.active.write().await = organization_id;
        Ok(())
    }
}
