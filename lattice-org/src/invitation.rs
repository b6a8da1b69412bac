//! Invitation domain models
//!
//! An invitation is a time-bounded offer of membership sent to an email
//! address. Its lifecycle is monotonic: `pending` may transition to exactly
//! one of the terminal states (`accepted`, `rejected`, `canceled`), and no
//! transition leaves a terminal state. Re-inviting after a terminal outcome
//! creates a new invitation record; the old one is never resurrected.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::member::RoleSet;

/// Lifecycle status of an invitation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    /// Awaiting a decision from the invited email's owner.
    Pending,

    /// Accepted; a membership was created.
    Accepted,

    /// Rejected by the invited user.
    Rejected,

    /// Canceled by the inviting organization (including expiry markers and
    /// cancel-on-reinvite).
    Canceled,
}

impl InvitationStatus {
    /// Whether this status permits no further transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }

    /// Get the string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Rejected => "rejected",
            InvitationStatus::Canceled => "canceled",
        }
    }

    /// Parse a status from its string representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected lifecycle transition.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invitation is {actual}, cannot transition to {attempted}")]
pub struct InvalidTransition {
    /// The status the invitation actually held.
    pub actual: InvitationStatus,
    /// The status the transition attempted to reach.
    pub attempted: InvitationStatus,
}

/// A pending offer of membership sent to an email address.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use uuid::Uuid;
/// use lattice_org::{Invitation, InvitationStatus, RoleSet};
///
/// let now = Utc::now();
/// let invitation = Invitation::new(
///     Uuid::now_v7(),
///     "bob@example.com",
///     Uuid::now_v7(),
///     RoleSet::single("member"),
///     now,
///     Duration::hours(48),
/// );
/// assert_eq!(invitation.status, InvitationStatus::Pending);
/// assert_eq!(invitation.expires_at, now + Duration::hours(48));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    /// Unique invitation id
    pub id: Uuid,

    /// Invited email address (stored lowercased)
    pub email: String,

    /// User id of the inviting member
    pub inviter_id: Uuid,

    /// Organization the invitation grants membership in
    pub organization_id: Uuid,

    /// Roles the resulting membership will hold
    pub roles: RoleSet,

    /// Team assignment for the resulting membership, if any
    pub team_id: Option<Uuid>,

    /// Lifecycle status
    pub status: InvitationStatus,

    /// When the invitation stops being acceptable
    pub expires_at: DateTime<Utc>,

    /// When the invitation was created
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    /// Creates a pending invitation issued at `issued_at`, expiring after
    /// `expires_in`.
    ///
    /// The email is lowercased so matching against the accepting user is
    /// case-insensitive.
    pub fn new(
        organization_id: Uuid,
        email: impl Into<String>,
        inviter_id: Uuid,
        roles: RoleSet,
        issued_at: DateTime<Utc>,
        expires_in: Duration,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            email: email.into().to_lowercase(),
            inviter_id,
            organization_id,
            roles,
            team_id: None,
            status: InvitationStatus::Pending,
            expires_at: issued_at + expires_in,
            created_at: issued_at,
        }
    }

    /// Set the team assignment carried by the invitation.
    pub fn with_team(mut self, team_id: Uuid) -> Self {
        self.team_id = Some(team_id);
        self
    }

    /// Whether the invitation has passed its expiry at `now`.
    ///
    /// Expiry is a logical timeout evaluated at the moment of use; nothing
    /// sweeps invitations in the background.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether the invited email matches `other`, case-insensitively.
    pub fn email_matches(&self, other: &str) -> bool {
        self.email.eq_ignore_ascii_case(other.trim())
    }

    /// Apply a lifecycle transition.
    ///
    /// Only `pending` invitations may transition, and only to a terminal
    /// status; everything else fails with [`InvalidTransition`]. Calling a
    /// transition twice therefore fails on the second call.
    pub fn transition(&mut self, to: InvitationStatus) -> Result<(), InvalidTransition> {
        if self.status != InvitationStatus::Pending || !to.is_terminal() {
            return Err(InvalidTransition {
                actual: self.status,
                attempted: to,
            });
        }
        self.status = to;
        Ok(())
    }
}
