//! Invitation notification seam
//!
//! Delivery (email, SMS, whatever the embedder wires up) happens out of
//! band behind [`InvitationNotifier`]. Failures are surfaced to the caller
//! of `create_invitation`, never silently swallowed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Notification delivery failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The delivery channel rejected or failed to send the message.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Everything a delivery channel needs to render an invitation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationEmail {
    /// The invitation being delivered.
    pub invitation_id: Uuid,

    /// Recipient email address.
    pub email: String,

    /// Display info for the inviting user (name if known, else email).
    pub inviter: String,

    /// Name of the inviting organization.
    pub organization_name: String,

    /// Pre-built link the recipient follows to accept.
    pub accept_link: String,
}

/// Out-of-band delivery of invitation messages.
#[async_trait]
pub trait InvitationNotifier: Send + Sync {
    /// Deliver an invitation message.
    async fn send_invitation_email(&self, email: &InvitationEmail) -> Result<(), NotifyError>;
}

/// A notifier that drops every message.
///
/// Useful for embedders that deliver invitations through a channel of their
/// own and only want the engine's bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

#[async_trait]
impl InvitationNotifier for NullNotifier {
    async fn send_invitation_email(&self, _email: &InvitationEmail) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// A notifier that records every message, for tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: RwLock<Vec<InvitationEmail>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every message sent so far, in order.
    pub async fn sent(&self) -> Vec<InvitationEmail> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl InvitationNotifier for RecordingNotifier {
    async fn send_invitation_email(&self, email: &InvitationEmail) -> Result<(), NotifyError> {
        self.sent.write().await.push(email.clone());
        Ok(())
    }
}
