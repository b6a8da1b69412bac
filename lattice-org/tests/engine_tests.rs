//! End-to-end tests for the organization, invitation, and team services.
//!
//! These tests drive the services over the in-memory store the way an
//! embedding application would: identities come from the session provider,
//! notifications land in a recording notifier, and time is driven by a
//! manual clock so expiry can be simulated without sleeping.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use lattice_org::{
    ActiveOrganizationSession, HookError, Identity, InMemorySession, InMemoryStore,
    InvitationEngine, InvitationStatus, InviteRequest, LimitKind, ManualClock, NoopHooks,
    OrgError, Organization, OrganizationDraft, OrganizationHooks, OrganizationManager,
    OrganizationOptions, OrganizationUpdate, RecordingNotifier, RoleSet, Setting, TeamManager,
};

/// Test fixture wiring the services over shared in-memory collaborators.
struct TestFixture {
    store: Arc<InMemoryStore>,
    notifier: Arc<RecordingNotifier>,
    clock: Arc<ManualClock>,
    options: Arc<OrganizationOptions>,
}

impl TestFixture {
    /// Create a fixture with the given options.
    fn new(options: OrganizationOptions) -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            notifier: Arc::new(RecordingNotifier::new()),
            clock: Arc::new(ManualClock::new(Utc::now())),
            options: Arc::new(options),
        }
    }

    /// Create a fixture with default options.
    fn with_defaults() -> Self {
        Self::new(OrganizationOptions::default())
    }

    fn organizations(&self) -> OrganizationManager {
        OrganizationManager::new(self.store.clone(), self.options.clone())
    }

    fn organizations_with_hooks(&self, hooks: Arc<dyn OrganizationHooks>) -> OrganizationManager {
        OrganizationManager::new(self.store.clone(), self.options.clone()).with_hooks(hooks)
    }

    fn invitations(&self) -> InvitationEngine {
        InvitationEngine::new(self.store.clone(), self.notifier.clone(), self.options.clone())
            .with_clock(self.clock.clone())
    }

    fn teams(&self) -> TeamManager {
        TeamManager::new(self.store.clone(), self.options.clone())
    }

    /// Register a user with the store's directory and return their
    /// identity, the way the session provider would supply it.
    async fn identity(&self, email: &str) -> Identity {
        let user_id = Uuid::now_v7();
        self.store.register_user(user_id, email).await;
        Identity::new(user_id, email)
    }
}

fn team_options() -> OrganizationOptions {
    let mut options = OrganizationOptions::default();
    options.teams.enabled = true;
    options
}

// =============================================================================
// Scenario A: statement schema and role evaluation
// =============================================================================

#[test]
fn test_member_role_grants_exactly_its_statements() {
    use lattice_rbac::{AccessControl, AccessRequest, Statements};

    let statements =
        Statements::define([("project", vec!["create", "update", "delete"])]).unwrap();
    let mut ac = AccessControl::new(statements);
    ac.define_role("member", [("project", vec!["create"])])
        .unwrap();

    let create = AccessRequest::new().resource("project", ["create"]);
    assert!(ac.check(["member"], &create).is_ok());

    let delete = AccessRequest::new().resource("project", ["delete"]);
    assert!(ac.check(["member"], &delete).is_err());

    // Single-role pre-check agrees with the member-shaped check.
    assert_eq!(ac.check_role("member", &create), ac.check(["member"], &create));
    assert_eq!(ac.check_role("member", &delete), ac.check(["member"], &delete));
}

// =============================================================================
// Scenario B: organization creation and slug uniqueness
// =============================================================================

#[tokio::test]
async fn test_create_organization_persists_owner_membership() {
    let fixture = TestFixture::with_defaults();
    let orgs = fixture.organizations();
    let alice = fixture.identity("alice@acme.example").await;

    let (org, member) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    assert_eq!(org.name, "Acme");
    assert_eq!(org.slug, "acme");
    assert_eq!(member.organization_id, org.id);
    assert_eq!(member.user_id, alice.user_id);
    assert!(member.has_role("owner"));

    let listed = orgs.list_organizations(alice.user_id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, org.id);
}

#[tokio::test]
async fn test_duplicate_slug_fails_for_other_user() {
    let fixture = TestFixture::with_defaults();
    let orgs = fixture.organizations();
    let alice = fixture.identity("alice@acme.example").await;
    let mallory = fixture.identity("mallory@other.example").await;

    orgs.create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let err = orgs
        .create_organization(&mallory, OrganizationDraft::new("Acme Two", "acme"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::SlugTaken(slug) if slug == "acme"));
}

#[tokio::test]
async fn test_organization_limit_boundary() {
    let mut options = OrganizationOptions::default();
    options.organization_limit = Setting::fixed(2);
    let fixture = TestFixture::new(options);
    let orgs = fixture.organizations();
    let alice = fixture.identity("alice@acme.example").await;

    // Creating up to the limit succeeds.
    orgs.create_organization(&alice, OrganizationDraft::new("One", "one"))
        .await
        .unwrap();
    orgs.create_organization(&alice, OrganizationDraft::new("Two", "two"))
        .await
        .unwrap();

    // The next one fails.
    let err = orgs
        .create_organization(&alice, OrganizationDraft::new("Three", "three"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrgError::LimitExceeded {
            kind: LimitKind::Organizations,
            limit: 2,
        }
    ));
}

#[tokio::test]
async fn test_creation_gate_predicate() {
    let mut options = OrganizationOptions::default();
    options.allow_user_to_create_organization = Setting::computed(|_| false);
    let fixture = TestFixture::new(options);
    let orgs = fixture.organizations();
    let alice = fixture.identity("alice@acme.example").await;

    let err = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::Forbidden(_)));
}

// =============================================================================
// Scenario C: invitation expiry under simulated time
// =============================================================================

#[tokio::test]
async fn test_expired_invitation_cannot_be_accepted() {
    let mut options = OrganizationOptions::default();
    options.invitation_expires_in = Duration::seconds(10);
    let fixture = TestFixture::new(options);
    let orgs = fixture.organizations();
    let invitations = fixture.invitations();

    let alice = fixture.identity("alice@acme.example").await;
    let bob = fixture.identity("bob@x.com").await;

    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let invitation = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "bob@x.com", RoleSet::single("member")),
        )
        .await
        .unwrap();

    fixture.clock.advance(Duration::seconds(11));

    let err = invitations
        .accept_invitation(&bob, invitation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::Expired { id } if id == invitation.id));

    // Expiry persisted a terminal marker; later attempts still fail.
    let stored = invitations
        .get_invitation(invitation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, InvitationStatus::Canceled);

    let err = invitations
        .accept_invitation(&bob, invitation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::Expired { .. }));
}

// =============================================================================
// Scenario D: duplicate invitations and resend
// =============================================================================

#[tokio::test]
async fn test_duplicate_invite_rejected_when_policy_disabled() {
    let mut options = OrganizationOptions::default();
    options.cancel_pending_invitations_on_reinvite = false;
    let fixture = TestFixture::new(options);
    let orgs = fixture.organizations();
    let invitations = fixture.invitations();

    let alice = fixture.identity("alice@acme.example").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "bob@x.com", RoleSet::single("member")),
        )
        .await
        .unwrap();

    let err = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "bob@x.com", RoleSet::single("member")),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::AlreadyInvited { email } if email == "bob@x.com"));
}

#[tokio::test]
async fn test_resend_refreshes_same_invitation() {
    let mut options = OrganizationOptions::default();
    options.cancel_pending_invitations_on_reinvite = false;
    let fixture = TestFixture::new(options);
    let orgs = fixture.organizations();
    let invitations = fixture.invitations();

    let alice = fixture.identity("alice@acme.example").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let first = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "bob@x.com", RoleSet::single("member")),
        )
        .await
        .unwrap();

    fixture.clock.advance(Duration::hours(1));

    let resent = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "bob@x.com", RoleSet::single("member")).resend(),
        )
        .await
        .unwrap();

    // Same record, refreshed expiry, notification re-sent.
    assert_eq!(resent.id, first.id);
    assert_eq!(resent.expires_at, first.expires_at + Duration::hours(1));
    assert_eq!(fixture.notifier.sent().await.len(), 2);
}

#[tokio::test]
async fn test_reinvite_cancels_pending_by_default() {
    let fixture = TestFixture::with_defaults();
    let orgs = fixture.organizations();
    let invitations = fixture.invitations();

    let alice = fixture.identity("alice@acme.example").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let first = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "bob@x.com", RoleSet::single("member")),
        )
        .await
        .unwrap();

    let second = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "bob@x.com", RoleSet::single("member")),
        )
        .await
        .unwrap();

    assert_ne!(second.id, first.id);

    let first = invitations.get_invitation(first.id).await.unwrap().unwrap();
    assert_eq!(first.status, InvitationStatus::Canceled);
    let second = invitations.get_invitation(second.id).await.unwrap().unwrap();
    assert_eq!(second.status, InvitationStatus::Pending);
}

// =============================================================================
// Invitation acceptance, rejection, and state machine
// =============================================================================

#[tokio::test]
async fn test_accept_creates_membership_and_settles_state() {
    let fixture = TestFixture::with_defaults();
    let orgs = fixture.organizations();
    let invitations = fixture.invitations();

    let alice = fixture.identity("alice@acme.example").await;
    let bob = fixture.identity("bob@x.com").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let invitation = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "Bob@X.com", RoleSet::single("member")),
        )
        .await
        .unwrap();

    // Email matching is case-insensitive.
    let (accepted, member) = invitations
        .accept_invitation(&bob, invitation.id)
        .await
        .unwrap();

    assert_eq!(accepted.status, InvitationStatus::Accepted);
    assert_eq!(member.organization_id, org.id);
    assert_eq!(member.user_id, bob.user_id);
    assert!(member.has_role("member"));

    // The loser of a second acceptance observes InvalidState, and no
    // second membership appears.
    let err = invitations
        .accept_invitation(&bob, invitation.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrgError::InvalidState {
            actual: InvitationStatus::Accepted,
            ..
        }
    ));

    let members = orgs.list_organizations(bob.user_id).await.unwrap();
    assert_eq!(members.len(), 1);
}

#[tokio::test]
async fn test_accept_with_wrong_email_fails() {
    let fixture = TestFixture::with_defaults();
    let orgs = fixture.organizations();
    let invitations = fixture.invitations();

    let alice = fixture.identity("alice@acme.example").await;
    let eve = fixture.identity("eve@x.com").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let invitation = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "bob@x.com", RoleSet::single("member")),
        )
        .await
        .unwrap();

    let err = invitations
        .accept_invitation(&eve, invitation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::EmailMismatch));

    // Still pending for the right user.
    let stored = invitations
        .get_invitation(invitation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, InvitationStatus::Pending);
}

#[tokio::test]
async fn test_reject_twice_fails_second_time() {
    let fixture = TestFixture::with_defaults();
    let orgs = fixture.organizations();
    let invitations = fixture.invitations();

    let alice = fixture.identity("alice@acme.example").await;
    let bob = fixture.identity("bob@x.com").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let invitation = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "bob@x.com", RoleSet::single("member")),
        )
        .await
        .unwrap();

    let rejected = invitations
        .reject_invitation(&bob, invitation.id)
        .await
        .unwrap();
    assert_eq!(rejected.status, InvitationStatus::Rejected);

    let err = invitations
        .reject_invitation(&bob, invitation.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrgError::InvalidState {
            actual: InvitationStatus::Rejected,
            ..
        }
    ));
}

#[tokio::test]
async fn test_cancel_requires_permission_and_is_not_idempotent() {
    let fixture = TestFixture::with_defaults();
    let orgs = fixture.organizations();
    let invitations = fixture.invitations();

    let alice = fixture.identity("alice@acme.example").await;
    let bob = fixture.identity("bob@x.com").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let invitation = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "bob@x.com", RoleSet::single("member")),
        )
        .await
        .unwrap();

    // A non-member cannot cancel.
    let outsider = fixture.identity("outsider@other.example").await;
    let err = invitations
        .cancel_invitation(&outsider, invitation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::Forbidden(_)));

    let canceled = invitations
        .cancel_invitation(&alice, invitation.id)
        .await
        .unwrap();
    assert_eq!(canceled.status, InvitationStatus::Canceled);

    let err = invitations
        .cancel_invitation(&alice, invitation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::InvalidState { .. }));
}

#[tokio::test]
async fn test_inviting_an_existing_member_fails() {
    let fixture = TestFixture::with_defaults();
    let orgs = fixture.organizations();
    let invitations = fixture.invitations();

    let alice = fixture.identity("alice@acme.example").await;
    let bob = fixture.identity("bob@x.com").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let invitation = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "bob@x.com", RoleSet::single("member")),
        )
        .await
        .unwrap();
    invitations
        .accept_invitation(&bob, invitation.id)
        .await
        .unwrap();

    let err = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "bob@x.com", RoleSet::single("member")),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::AlreadyMember { email } if email == "bob@x.com"));
}

#[tokio::test]
async fn test_invitation_limit_per_inviter() {
    let mut options = OrganizationOptions::default();
    options.invitation_limit = Setting::fixed(2);
    let fixture = TestFixture::new(options);
    let orgs = fixture.organizations();
    let invitations = fixture.invitations();

    let alice = fixture.identity("alice@acme.example").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    for email in ["one@x.com", "two@x.com"] {
        invitations
            .create_invitation(
                &alice,
                InviteRequest::new(org.id, email, RoleSet::single("member")),
            )
            .await
            .unwrap();
    }

    let err = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "three@x.com", RoleSet::single("member")),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrgError::LimitExceeded {
            kind: LimitKind::Invitations,
            limit: 2,
        }
    ));
}

#[tokio::test]
async fn test_invitation_with_unknown_role_fails_closed() {
    let fixture = TestFixture::with_defaults();
    let orgs = fixture.organizations();
    let invitations = fixture.invitations();

    let alice = fixture.identity("alice@acme.example").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let err = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "bob@x.com", RoleSet::single("superuser")),
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "UNKNOWN_ROLE");
}

#[tokio::test]
async fn test_notification_carries_accept_link_and_inviter() {
    let mut options = OrganizationOptions::default();
    options.invite_link_base = Some("https://acme.example/join".to_string());
    let fixture = TestFixture::new(options);
    let orgs = fixture.organizations();
    let invitations = fixture.invitations();

    let alice = fixture.identity("alice@acme.example").await.with_name("Alice");
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let invitation = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "bob@x.com", RoleSet::single("member")),
        )
        .await
        .unwrap();

    let sent = fixture.notifier.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].invitation_id, invitation.id);
    assert_eq!(sent[0].email, "bob@x.com");
    assert_eq!(sent[0].inviter, "Alice");
    assert_eq!(sent[0].organization_name, "Acme");
    assert_eq!(
        sent[0].accept_link,
        format!("https://acme.example/join/{}", invitation.id)
    );
}

// =============================================================================
// Scenario E: teams
// =============================================================================

#[tokio::test]
async fn test_removing_last_team_honours_configuration() {
    // Disallowed by default.
    let fixture = TestFixture::new(team_options());
    let orgs = fixture.organizations();
    let teams = fixture.teams();

    let alice = fixture.identity("alice@acme.example").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let team = teams.create_team(&alice, org.id, "Platform").await.unwrap();
    let err = teams.remove_team(&alice, team.id).await.unwrap_err();
    assert!(matches!(err, OrgError::InvariantViolation(_)));

    // Allowed when configured.
    let mut options = team_options();
    options.teams.allow_removing_all_teams = true;
    let fixture = TestFixture::new(options);
    let orgs = fixture.organizations();
    let teams = fixture.teams();

    let alice = fixture.identity("alice@acme.example").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let team = teams.create_team(&alice, org.id, "Platform").await.unwrap();
    teams.remove_team(&alice, team.id).await.unwrap();
    assert!(teams.list_teams(org.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_team_operations_fail_when_feature_disabled() {
    let fixture = TestFixture::with_defaults();
    let orgs = fixture.organizations();
    let teams = fixture.teams();

    let alice = fixture.identity("alice@acme.example").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let err = teams.create_team(&alice, org.id, "Platform").await.unwrap_err();
    assert!(matches!(err, OrgError::FeatureDisabled(_)));
}

#[tokio::test]
async fn test_maximum_teams_cap() {
    let mut options = team_options();
    options.teams.maximum_teams = Setting::fixed(1);
    let fixture = TestFixture::new(options);
    let orgs = fixture.organizations();
    let teams = fixture.teams();

    let alice = fixture.identity("alice@acme.example").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    teams.create_team(&alice, org.id, "Platform").await.unwrap();
    let err = teams.create_team(&alice, org.id, "Infra").await.unwrap_err();
    assert!(matches!(
        err,
        OrgError::LimitExceeded {
            kind: LimitKind::Teams,
            limit: 1,
        }
    ));
}

#[tokio::test]
async fn test_team_member_cap_applies_on_acceptance() {
    let mut options = team_options();
    options.teams.maximum_members_per_team = Setting::fixed(1);
    let fixture = TestFixture::new(options);
    let orgs = fixture.organizations();
    let invitations = fixture.invitations();
    let teams = fixture.teams();

    let alice = fixture.identity("alice@acme.example").await;
    let bob = fixture.identity("bob@x.com").await;
    let carol = fixture.identity("carol@x.com").await;
    let (org, owner) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let team = teams.create_team(&alice, org.id, "Platform").await.unwrap();

    // The owner takes the only slot.
    teams
        .set_member_team(&alice, owner.id, Some(team.id))
        .await
        .unwrap();

    // Bob's team invitation is created but cannot be accepted.
    let invitation = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "bob@x.com", RoleSet::single("member"))
                .with_team(team.id),
        )
        .await
        .unwrap();
    let err = invitations
        .accept_invitation(&bob, invitation.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrgError::LimitExceeded {
            kind: LimitKind::TeamMembers,
            limit: 1,
        }
    ));

    // A plain (team-less) invitation still works.
    let invitation = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "carol@x.com", RoleSet::single("member")),
        )
        .await
        .unwrap();
    invitations
        .accept_invitation(&carol, invitation.id)
        .await
        .unwrap();
}

// =============================================================================
// Lifecycle hooks and deletion
// =============================================================================

struct MetadataHooks;

#[async_trait]
impl OrganizationHooks for MetadataHooks {
    async fn before_create(&self, draft: &mut OrganizationDraft) -> Result<(), HookError> {
        draft
            .metadata
            .insert("plan".to_string(), serde_json::json!("trial"));
        Ok(())
    }
}

struct VetoHooks;

#[async_trait]
impl OrganizationHooks for VetoHooks {
    async fn before_create(&self, _draft: &mut OrganizationDraft) -> Result<(), HookError> {
        Err(HookError::new("tenant provisioning rejected"))
    }

    async fn before_delete(&self, _organization: &Organization) -> Result<(), HookError> {
        Err(HookError::new("retention policy holds this tenant"))
    }
}

#[tokio::test]
async fn test_before_create_hook_rewrites_payload() {
    let fixture = TestFixture::with_defaults();
    let orgs = fixture.organizations_with_hooks(Arc::new(MetadataHooks));
    let alice = fixture.identity("alice@acme.example").await;

    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();
    assert_eq!(org.metadata["plan"], serde_json::json!("trial"));
}

#[tokio::test]
async fn test_failing_before_create_leaves_nothing_behind() {
    let fixture = TestFixture::with_defaults();
    let orgs = fixture.organizations_with_hooks(Arc::new(VetoHooks));
    let alice = fixture.identity("alice@acme.example").await;

    let err = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::Hook(_)));

    // Nothing was persisted; the slug is free for a clean retry.
    let clean = fixture.organizations_with_hooks(Arc::new(NoopHooks));
    clean
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_cascades_members_invitations_teams() {
    let fixture = TestFixture::new(team_options());
    let orgs = fixture.organizations();
    let invitations = fixture.invitations();
    let teams = fixture.teams();

    let alice = fixture.identity("alice@acme.example").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    teams.create_team(&alice, org.id, "Platform").await.unwrap();
    invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "bob@x.com", RoleSet::single("member")),
        )
        .await
        .unwrap();

    orgs.delete_organization(&alice, org.id).await.unwrap();

    assert!(orgs.list_organizations(alice.user_id).await.unwrap().is_empty());
    assert!(invitations.list_invitations(Some(org.id)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_disabled_by_configuration() {
    let mut options = OrganizationOptions::default();
    options.organization_deletion.disabled = true;
    let fixture = TestFixture::new(options);
    let orgs = fixture.organizations();

    let alice = fixture.identity("alice@acme.example").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let err = orgs.delete_organization(&alice, org.id).await.unwrap_err();
    assert!(matches!(err, OrgError::FeatureDisabled(_)));
}

#[tokio::test]
async fn test_admin_cannot_delete_organization() {
    let fixture = TestFixture::with_defaults();
    let orgs = fixture.organizations();
    let invitations = fixture.invitations();

    let alice = fixture.identity("alice@acme.example").await;
    let bob = fixture.identity("bob@x.com").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let invitation = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "bob@x.com", RoleSet::single("admin")),
        )
        .await
        .unwrap();
    invitations
        .accept_invitation(&bob, invitation.id)
        .await
        .unwrap();

    // Admin may update but not delete.
    orgs.update_organization(
        &bob,
        org.id,
        OrganizationUpdate {
            name: Some("Acme Inc".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let err = orgs.delete_organization(&bob, org.id).await.unwrap_err();
    assert_eq!(err.error_code(), "PERMISSION_DENIED");
}

// =============================================================================
// Active organization selection
// =============================================================================

#[tokio::test]
async fn test_set_active_organization_by_slug() {
    let fixture = TestFixture::with_defaults();
    let orgs = fixture.organizations();
    let session = InMemorySession::new();

    let alice = fixture.identity("alice@acme.example").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    assert_eq!(session.active_organization().await.unwrap(), None);

    let selected = orgs
        .set_active_organization(&alice, &session, "acme")
        .await
        .unwrap();
    assert_eq!(selected.id, org.id);
    assert_eq!(session.active_organization().await.unwrap(), Some(org.id));
}

#[tokio::test]
async fn test_set_active_organization_requires_membership() {
    let fixture = TestFixture::with_defaults();
    let orgs = fixture.organizations();
    let session = InMemorySession::new();

    let alice = fixture.identity("alice@acme.example").await;
    let mallory = fixture.identity("mallory@other.example").await;
    orgs.create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();

    let err = orgs
        .set_active_organization(&mallory, &session, "acme")
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::Forbidden(_)));
    assert_eq!(session.active_organization().await.unwrap(), None);
}

// =============================================================================
// Read idempotence
// =============================================================================

#[tokio::test]
async fn test_reads_are_idempotent() {
    let fixture = TestFixture::with_defaults();
    let orgs = fixture.organizations();
    let invitations = fixture.invitations();

    let alice = fixture.identity("alice@acme.example").await;
    let (org, _) = orgs
        .create_organization(&alice, OrganizationDraft::new("Acme", "acme"))
        .await
        .unwrap();
    let invitation = invitations
        .create_invitation(
            &alice,
            InviteRequest::new(org.id, "bob@x.com", RoleSet::single("member")),
        )
        .await
        .unwrap();

    let first_get = invitations.get_invitation(invitation.id).await.unwrap();
    let first_list = invitations.list_invitations(Some(org.id)).await.unwrap();
    for _ in 0..3 {
        let get = invitations.get_invitation(invitation.id).await.unwrap();
        assert_eq!(
            get.as_ref().map(|i| (i.id, i.status, i.expires_at)),
            first_get.as_ref().map(|i| (i.id, i.status, i.expires_at))
        );
        let list = invitations.list_invitations(Some(org.id)).await.unwrap();
        assert_eq!(list.len(), first_list.len());
    }
}
