//! Error types for organization operations
//!
//! This module defines the domain error taxonomy for the organization,
//! invitation, and team services. Every rejected operation carries a
//! structured kind plus a human-readable message; no operation fails
//! silently. Domain failures are never retried internally — transient
//! store, notification, and session failures are distinct variants the
//! caller may retry.

use thiserror::Error;
use uuid::Uuid;

use crate::config::HookError;
use crate::invitation::{InvalidTransition, InvitationStatus};
use crate::notify::NotifyError;
use crate::session::SessionError;
use crate::store::StoreError;
use lattice_rbac::AccessError;

/// The resource class whose configured cap was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    /// Organizations per user.
    Organizations,
    /// Members per organization.
    Members,
    /// Outstanding invitations per inviting user.
    Invitations,
    /// Teams per organization.
    Teams,
    /// Members per team.
    TeamMembers,
}

impl LimitKind {
    /// Human-readable noun for messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitKind::Organizations => "organization",
            LimitKind::Members => "member",
            LimitKind::Invitations => "invitation",
            LimitKind::Teams => "team",
            LimitKind::TeamMembers => "team member",
        }
    }
}

impl std::fmt::Display for LimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Organization domain error types.
#[derive(Debug, Error)]
pub enum OrgError {
    /// Permission check failed (denied, or unknown resource/action/role).
    #[error(transparent)]
    Access(#[from] AccessError),

    /// The caller is not allowed to perform this operation (gate predicate
    /// failed, or the caller is not a member of the organization).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The invited email already belongs to a member of the organization.
    #[error("'{email}' is already a member of this organization")]
    AlreadyMember {
        /// The email that is already a member.
        email: String,
    },

    /// A pending invitation for this email already exists.
    #[error("'{email}' has already been invited to this organization")]
    AlreadyInvited {
        /// The email that was already invited.
        email: String,
    },

    /// A configured cap was reached.
    #[error("{kind} limit of {limit} reached")]
    LimitExceeded {
        /// Which cap was hit.
        kind: LimitKind,
        /// The configured limit value.
        limit: u32,
    },

    /// An invitation transition was attempted from a non-pending state.
    #[error("invitation is {actual}, expected {expected}")]
    InvalidState {
        /// The status the operation required.
        expected: InvitationStatus,
        /// The status actually observed.
        actual: InvitationStatus,
    },

    /// The invitation passed its expiry before acceptance.
    #[error("invitation {id} has expired")]
    Expired {
        /// The expired invitation's id.
        id: Uuid,
    },

    /// The accepting user's email does not match the invited email.
    #[error("invitation email does not match the current user")]
    EmailMismatch,

    /// The operation is disabled by configuration.
    #[error("{0} is disabled")]
    FeatureDisabled(&'static str),

    /// A structural invariant would be violated (e.g. removing the last
    /// team when that is disallowed).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The requested slug is already taken by another organization.
    #[error("slug '{0}' is already taken")]
    SlugTaken(String),

    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A `before_*` hook aborted the operation.
    #[error("hook failed: {0}")]
    Hook(#[from] HookError),

    /// The invitation notification could not be delivered.
    #[error("notification failed: {0}")]
    Notification(#[from] NotifyError),

    /// The session backend failed while updating the active organization.
    #[error("session failed: {0}")]
    Session(#[from] SessionError),

    /// The persistence store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<InvalidTransition> for OrgError {
    fn from(err: InvalidTransition) -> Self {
        OrgError::InvalidState {
            expected: InvitationStatus::Pending,
            actual: err.actual,
        }
    }
}

/// Result type for organization operations.
pub type OrgResult<T> = Result<T, OrgError>;

impl OrgError {
    /// Stable error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            OrgError::Access(err) => err.error_code(),
            OrgError::Forbidden(_) => "FORBIDDEN",
            OrgError::AlreadyMember { .. } => "ALREADY_MEMBER",
            OrgError::AlreadyInvited { .. } => "ALREADY_INVITED",
            OrgError::LimitExceeded { .. } => "LIMIT_EXCEEDED",
            OrgError::InvalidState { .. } => "INVALID_STATE",
            OrgError::Expired { .. } => "INVITATION_EXPIRED",
            OrgError::EmailMismatch => "EMAIL_MISMATCH",
            OrgError::FeatureDisabled(_) => "FEATURE_DISABLED",
            OrgError::InvariantViolation(_) => "INVARIANT_VIOLATION",
            OrgError::SlugTaken(_) => "SLUG_TAKEN",
            OrgError::NotFound(_) => "NOT_FOUND",
            OrgError::Hook(_) => "HOOK_FAILED",
            OrgError::Notification(_) => "NOTIFICATION_FAILED",
            OrgError::Session(_) => "SESSION_FAILED",
            OrgError::Store(_) => "STORE_ERROR",
        }
    }

    /// Whether this is an infrastructure failure the caller may retry, as
    /// opposed to a business-rule rejection that will not change on retry.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            OrgError::Store(_) | OrgError::Notification(_) | OrgError::Session(_)
        )
    }
}
