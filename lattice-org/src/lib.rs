//! # Lattice Organization Management
//!
//! This crate provides multi-tenant organization management for the Lattice
//! platform: organizations with members and optional teams, a statement-
//! driven role model, and a time-bounded, state-tracked invitation
//! workflow.
//!
//! ## Overview
//!
//! The lattice-org crate handles:
//! - **Organizations**: top-level tenant entities with slug, logo, metadata
//! - **Memberships**: user-organization relationships holding role sets
//! - **Invitations**: pending → accepted/rejected/canceled lifecycle with
//!   expiry, resend, and cancel-on-reinvite semantics
//! - **Teams**: optional sub-grouping of members, enabled via configuration
//! - **Configuration**: fixed-or-computed limits, lifecycle hooks, custom
//!   access-control statements and roles
//!
//! ## Architecture
//!
//! ```text
//! User
//!   ├─ Member ─→ Organization
//!   │               ├─ Invitations (pending offers by email)
//!   │               └─ Teams (optional)
//!   └─ ActiveOrganizationSession (current org pointer)
//!
//! OrganizationManager / InvitationEngine / TeamManager
//!   ├─ authorize against OrganizationOptions::access (lattice-rbac)
//!   ├─ read/write through OrganizationStore
//!   └─ call OrganizationHooks / InvitationNotifier
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lattice_org::{
//!     Identity, InMemoryStore, InvitationEngine, InviteRequest, NullNotifier,
//!     OrganizationDraft, OrganizationManager, OrganizationOptions, RoleSet,
//! };
//! use uuid::Uuid;
//!
//! # async fn demo() -> Result<(), lattice_org::OrgError> {
//! let store = Arc::new(InMemoryStore::new());
//! let options = Arc::new(OrganizationOptions::default());
//!
//! let orgs = OrganizationManager::new(store.clone(), options.clone());
//! let invitations =
//!     InvitationEngine::new(store.clone(), Arc::new(NullNotifier), options.clone());
//!
//! let alice = Identity::new(Uuid::now_v7(), "alice@acme.example");
//! let (org, _owner) = orgs
//!     .create_organization(&alice, OrganizationDraft::new("Acme Corp", "acme-corp"))
//!     .await?;
//!
//! let request = InviteRequest::new(org.id, "bob@acme.example", RoleSet::single("member"));
//! invitations.create_invitation(&alice, request).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency model
//!
//! Operations are independent request-scoped transactions. The only
//! process-wide shared state is the configuration (options, role registry,
//! statement schema), which is read-only after initialization. Uniqueness
//! and status-transition races are resolved by the store's transactional
//! contract: exactly one concurrent acceptance of an invitation wins, the
//! loser observes `InvalidState`.
//!
//! ## Cross-crate integration
//!
//! This crate is designed to work with:
//! - `lattice-rbac`: statement schema, roles, permission evaluation
//!
//! ## Feature Flags
//!
//! - `serde`: serialization support (enabled by default)

pub mod access;
pub mod clock;
pub mod config;
pub mod error;
pub mod invitation;
pub mod invitations;
pub mod member;
pub mod notify;
pub mod organization;
pub mod organizations;
pub mod session;
pub mod store;
pub mod team;
pub mod teams;

// Re-export main types for convenience
pub use access::{default_access_control, default_statements};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    CreationOptions, DeletionOptions, HookError, NoopHooks, OrganizationHooks,
    OrganizationOptions, Setting, TeamOptions,
};
pub use error::{LimitKind, OrgError, OrgResult};
pub use invitation::{InvalidTransition, Invitation, InvitationStatus};
pub use invitations::{InvitationEngine, InviteRequest};
pub use member::{Member, RoleSet};
pub use notify::{InvitationEmail, InvitationNotifier, NotifyError, NullNotifier, RecordingNotifier};
pub use organization::{OrgSelector, Organization, OrganizationDraft, OrganizationUpdate};
pub use organizations::OrganizationManager;
pub use session::{ActiveOrganizationSession, Identity, InMemorySession, SessionError};
pub use store::{InMemoryStore, OrganizationStore, StoreError, StoreResult};
pub use team::Team;
pub use teams::TeamManager;
