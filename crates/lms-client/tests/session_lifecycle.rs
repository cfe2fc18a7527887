//! Session actor lifecycle tests against the in-memory collaborators.
//!
//! Every test goes through `spawn_session` and the public handle, the same
//! way the CLI drives it.

use std::sync::Arc;

use async_trait::async_trait;
use lms_client::{
    BackendResult, MemoryCredentialStore, MemoryRoleDirectory, RoleDirectory, Route,
    SessionConfig, SessionEvent, SessionHandle, route, spawn_session,
};
use lms_types::{
    Identity, Role, RoleDocument, RoleRecord, Session, SessionError, SessionPhase, UserId,
};
use tokio::sync::Notify;

// ============================================================================
// Shared test setup
// ============================================================================

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Harness {
    credentials: Arc<MemoryCredentialStore>,
    directory: Arc<MemoryRoleDirectory>,
    handle: SessionHandle,
}

fn harness_with(config: SessionConfig) -> Harness {
    init_logging();
    let credentials = Arc::new(MemoryCredentialStore::new());
    let directory = Arc::new(MemoryRoleDirectory::new());
    let handle = spawn_session(credentials.clone(), directory.clone(), config);
    Harness {
        credentials,
        directory,
        handle,
    }
}

fn harness() -> Harness {
    harness_with(SessionConfig::default())
}

impl Harness {
    /// Seed an account, optionally with a role record.
    async fn account(&self, email: &str, password: &str, role: Option<Role>) -> Identity {
        let identity = self.credentials.with_account(email, password).unwrap();
        if let Some(role) = role {
            self.directory
                .put(&identity, &RoleRecord::new(role, email))
                .await
                .unwrap();
        }
        identity
    }
}

fn assert_settled(session: &Session) {
    assert!(!session.loading, "loading left on: {session:?}");
    assert!(session.is_consistent());
}

/// Role directory that holds lookups for one account until released.
struct GatedDirectory {
    inner: MemoryRoleDirectory,
    gated: UserId,
    entered: Notify,
    release: Notify,
}

impl GatedDirectory {
    fn new(gated: UserId) -> Self {
        Self {
            inner: MemoryRoleDirectory::new(),
            gated,
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl RoleDirectory for GatedDirectory {
    async fn get(&self, identity: &Identity) -> BackendResult<Option<RoleDocument>> {
        if identity.uid == self.gated {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.get(identity).await
    }

    async fn put(&self, identity: &Identity, record: &RoleRecord) -> BackendResult<()> {
        self.inner.put(identity, record).await
    }

    async fn count_with_role(&self, role: Role) -> BackendResult<u64> {
        self.inner.count_with_role(role).await
    }
}

// ============================================================================
// Sign-in and role resolution
// ============================================================================

#[tokio::test]
async fn sign_in_resolves_stored_role() {
    let h = harness();
    let alice = h.account("alice@x.com", "alice-pw", Some(Role::Admin)).await;

    let session = h.handle.sign_in("alice@x.com", "alice-pw").await.unwrap();

    assert_settled(&session);
    assert_eq!(session.identity, Some(alice));
    assert!(session.authenticated);
    assert_eq!(session.role, Role::Admin);
    assert_eq!(session.trusted_role(), Some(Role::Admin));
    assert_eq!(route(&session), Route::Admin(Default::default()));
    assert_eq!(h.handle.snapshot(), session);
}

#[tokio::test]
async fn missing_role_record_means_user() {
    let h = harness();
    h.account("bob@x.com", "bob-pw1", None).await;

    let session = h.handle.sign_in("bob@x.com", "bob-pw1").await.unwrap();

    assert_settled(&session);
    assert_eq!(session.role, Role::User);
    assert!(session.role_resolved);
    assert_eq!(session.last_error, None);
    assert_eq!(route(&session), Route::Member);
}

#[tokio::test]
async fn unknown_role_string_is_ignored() {
    let h = harness();
    let carol = h.account("carol@x.com", "carol-pw", None).await;
    h.directory.insert_document(
        carol.uid,
        RoleDocument {
            role: "superuser".into(),
            email: Some("carol@x.com".into()),
            created_at: None,
        },
    );

    let session = h.handle.sign_in("carol@x.com", "carol-pw").await.unwrap();

    assert_eq!(session.role, Role::User);
    assert!(session.role_resolved);
    assert_eq!(session.last_error, None);
}

#[tokio::test]
async fn wrong_password_fails_authentication() {
    let h = harness();
    h.account("alice@x.com", "alice-pw", Some(Role::Admin)).await;

    let session = h.handle.sign_in("alice@x.com", "nope").await.unwrap();

    assert_settled(&session);
    assert!(!session.authenticated);
    assert_eq!(session.identity, None);
    assert!(matches!(
        session.last_error,
        Some(SessionError::AuthenticationFailed(_))
    ));
    assert!(matches!(session.phase(), SessionPhase::Error(_)));
    assert_eq!(route(&session), Route::Onboarding);
}

#[tokio::test]
async fn unknown_account_fails_with_default_role() {
    let h = harness();

    let session = h.handle.sign_in("bad@x.com", "wrong").await.unwrap();

    assert!(!session.authenticated);
    assert_eq!(session.role, Role::User);
    assert!(!session.loading);
    assert!(matches!(
        session.last_error,
        Some(SessionError::AuthenticationFailed(_))
    ));
}

#[tokio::test]
async fn role_lookup_failure_keeps_authentication() {
    let h = harness();
    h.account("alice@x.com", "alice-pw", Some(Role::Admin)).await;
    h.directory.set_offline(true);

    let session = h.handle.sign_in("alice@x.com", "alice-pw").await.unwrap();

    assert_settled(&session);
    assert!(session.authenticated);
    assert_eq!(session.role, Role::User);
    assert_eq!(session.trusted_role(), None);
    assert!(matches!(
        session.last_error,
        Some(SessionError::RoleLookupFailed(_))
    ));

    // Directory back; retry clears the error and picks up the role.
    h.directory.set_offline(false);
    let session = h.handle.resolve_role().await.unwrap();
    assert_eq!(session.role, Role::Admin);
    assert_eq!(session.last_error, None);
}

#[tokio::test]
async fn resolve_role_when_signed_out_is_a_no_op() {
    let h = harness();
    let session = h.handle.resolve_role().await.unwrap();
    assert_eq!(session, Session::signed_out());
}

#[tokio::test]
async fn late_lookup_never_leaks_into_next_session() {
    init_logging();
    let credentials = Arc::new(MemoryCredentialStore::new());
    let alice = credentials.with_account("alice@x.com", "alice-pw").unwrap();
    let bob = credentials.with_account("bob@x.com", "bob-pw1").unwrap();
    let directory = Arc::new(GatedDirectory::new(alice.uid));
    directory
        .put(&alice, &RoleRecord::new(Role::Admin, "alice@x.com"))
        .await
        .unwrap();
    directory
        .put(&bob, &RoleRecord::new(Role::Librarian, "bob@x.com"))
        .await
        .unwrap();
    let handle = spawn_session(credentials, directory.clone(), SessionConfig::default());

    let first = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.sign_in("alice@x.com", "alice-pw").await })
    };
    directory.entered.notified().await;
    assert_eq!(handle.snapshot().phase(), SessionPhase::ResolvingRole);

    let signed_out = handle.sign_out().await.unwrap();
    assert_eq!(signed_out, Session::signed_out());

    let second = handle.sign_in("bob@x.com", "bob-pw1").await.unwrap();
    directory.release.notify_one();
    let first = first.await.unwrap().unwrap();

    assert_ne!(first.role, Role::Admin);
    assert_eq!(second.identity, Some(bob.clone()));
    assert_eq!(second.role, Role::Librarian);
    tokio::task::yield_now().await;
    let now = handle.snapshot();
    assert_eq!(now.identity, Some(bob));
    assert_eq!(now.role, Role::Librarian);
    assert_settled(&now);
}

// ============================================================================
// Sign-up
// ============================================================================

#[tokio::test]
async fn sign_up_writes_role_record() {
    let h = harness();

    let session = h
        .handle
        .sign_up("new@x.com", "secret1", Role::Librarian)
        .await
        .unwrap();

    assert_settled(&session);
    assert!(session.authenticated);
    assert_eq!(session.role, Role::Librarian);
    let identity = session.identity.unwrap();
    let stored = h.directory.document(identity.uid).unwrap();
    assert_eq!(stored.role, "librarian");
    assert_eq!(stored.email.as_deref(), Some("new@x.com"));
    assert!(stored.created_at.is_some());
}

#[tokio::test]
async fn sign_up_admin_is_trusted_immediately() {
    let h = harness();

    let session = h
        .handle
        .sign_up("a@x.com", "pw123", Role::Admin)
        .await
        .unwrap();

    assert!(session.authenticated);
    assert_eq!(session.role, Role::Admin);
    assert!(!session.loading);
    assert_eq!(session.last_error, None);
    let uid = session.identity.unwrap().uid;
    assert_eq!(h.directory.document(uid).unwrap().role, "admin");
}

#[tokio::test]
async fn sign_up_weak_password_is_the_store_s_call() {
    let h = harness();
    h.credentials.set_min_password_len(lms_client::MIN_PASSWORD_LEN);

    let session = h
        .handle
        .sign_up("a@x.com", "pw123", Role::Admin)
        .await
        .unwrap();

    assert!(!session.authenticated);
    assert!(matches!(
        session.last_error,
        Some(SessionError::AuthenticationFailed(_))
    ));
}

#[tokio::test]
async fn sign_up_duplicate_email_fails() {
    let h = harness();
    h.account("taken@x.com", "secret1", None).await;

    let session = h
        .handle
        .sign_up("taken@x.com", "secret2", Role::User)
        .await
        .unwrap();

    assert_settled(&session);
    assert!(!session.authenticated);
    assert_eq!(
        session.last_error_message().as_deref(),
        Some("The email address is already in use by another account.")
    );
}

#[tokio::test]
async fn failed_role_write_rolls_back_account() {
    let h = harness();
    h.directory.set_fail_writes(true);

    let session = h
        .handle
        .sign_up("new@x.com", "secret1", Role::Admin)
        .await
        .unwrap();

    assert_settled(&session);
    assert!(!session.authenticated);
    assert_eq!(session.identity, None);
    assert!(matches!(
        session.last_error,
        Some(SessionError::RoleWriteFailed(_))
    ));
    assert!(!h.credentials.has_account("new@x.com"));
    assert_eq!(h.credentials.current(), None);
}

#[tokio::test]
async fn failed_rollback_keeps_session() {
    let h = harness();
    h.directory.set_fail_writes(true);
    h.credentials.set_fail_unregister(true);

    let session = h
        .handle
        .sign_up("new@x.com", "secret1", Role::Admin)
        .await
        .unwrap();

    assert_settled(&session);
    assert!(session.authenticated);
    assert_eq!(session.role, Role::Admin);
    assert!(matches!(
        session.last_error,
        Some(SessionError::RoleWriteFailed(_))
    ));
    assert!(h.credentials.has_account("new@x.com"));
}

#[tokio::test]
async fn split_phase_sign_up_keeps_requested_role() {
    let h = harness_with(SessionConfig {
        rollback_failed_signup: false,
        ..SessionConfig::default()
    });
    h.directory.set_fail_writes(true);

    let session = h
        .handle
        .sign_up("new@x.com", "secret1", Role::Librarian)
        .await
        .unwrap();

    assert!(session.authenticated);
    assert_eq!(session.role, Role::Librarian);
    assert!(matches!(
        session.last_error,
        Some(SessionError::RoleWriteFailed(_))
    ));
    assert!(h.credentials.has_account("new@x.com"));
}

// ============================================================================
// Sign-out, bootstrap, errors
// ============================================================================

#[tokio::test]
async fn sign_out_resets_to_defaults() {
    let h = harness();
    h.account("alice@x.com", "alice-pw", Some(Role::Admin)).await;
    h.handle.sign_in("alice@x.com", "alice-pw").await.unwrap();

    let session = h.handle.sign_out().await.unwrap();

    assert_eq!(session, Session::signed_out());
    assert_eq!(h.credentials.current(), None);
}

#[tokio::test]
async fn failed_sign_out_changes_nothing_else() {
    let h = harness();
    h.account("alice@x.com", "alice-pw", Some(Role::Admin)).await;
    let before = h.handle.sign_in("alice@x.com", "alice-pw").await.unwrap();
    h.credentials.set_fail_invalidate(true);

    let after = h.handle.sign_out().await.unwrap();

    assert!(matches!(
        after.last_error,
        Some(SessionError::SignOutFailed(_))
    ));
    assert_eq!(after.identity, before.identity);
    assert_eq!(after.role, Role::Admin);
    assert!(after.authenticated);
    assert!(!after.loading);
}

#[tokio::test]
async fn bootstrap_restores_persisted_credential() {
    let h = harness();
    let alice = h.account("alice@x.com", "alice-pw", Some(Role::Librarian)).await;
    h.credentials.restore_current(alice.clone());

    let first = h.handle.bootstrap().await.unwrap();
    let second = h.handle.bootstrap().await.unwrap();

    assert_settled(&first);
    assert_eq!(first.identity, Some(alice));
    assert_eq!(first.role, Role::Librarian);
    assert_eq!(first, second);
}

#[tokio::test]
async fn bootstrap_without_credential_stays_signed_out() {
    let h = harness();
    let session = h.handle.bootstrap().await.unwrap();
    assert_eq!(session, Session::signed_out());
    assert_eq!(route(&session), Route::Onboarding);
}

#[tokio::test]
async fn next_operation_clears_previous_error() {
    let h = harness();
    h.account("alice@x.com", "alice-pw", None).await;

    let failed = h.handle.sign_in("alice@x.com", "wrong").await.unwrap();
    assert!(failed.last_error.is_some());
    let cleared = h.handle.clear_error().await.unwrap();
    assert_eq!(cleared.last_error, None);

    h.handle.sign_in("alice@x.com", "wrong").await.unwrap();
    let ok = h.handle.sign_in("alice@x.com", "alice-pw").await.unwrap();
    assert_eq!(ok.last_error, None);
    assert!(ok.authenticated);
}

#[tokio::test]
async fn events_follow_the_lifecycle() {
    let h = harness();
    let alice = h.account("alice@x.com", "alice-pw", Some(Role::Admin)).await;
    let mut events = h.handle.subscribe_events();

    h.handle.sign_in("alice@x.com", "alice-pw").await.unwrap();
    h.handle.sign_out().await.unwrap();

    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::Authenticated {
            identity: alice.clone()
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::RoleResolved {
            identity: alice,
            role: Role::Admin
        }
    );
    assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedOut);
}

#[tokio::test]
async fn watchers_see_the_final_snapshot() {
    let h = harness();
    h.account("alice@x.com", "alice-pw", Some(Role::Librarian)).await;
    let mut rx = h.handle.subscribe();

    h.handle.sign_in("alice@x.com", "alice-pw").await.unwrap();

    assert!(rx.has_changed().unwrap());
    let seen = rx.borrow_and_update().clone();
    assert_settled(&seen);
    assert_eq!(route(&seen), Route::Librarian);
}
