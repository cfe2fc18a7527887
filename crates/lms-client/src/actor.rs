//! Session actor: the single owner of the session record.
//!
//! Provides a `Send+Sync` [`SessionHandle`]. The actor runs in a spawned
//! task, processing commands sequentially from an mpsc channel. Role lookups
//! are the one thing it does not await inline: each runs in its own task and
//! reports back through a second channel, so a sign-out or a new sign-in can
//! be processed while a slow lookup is still outstanding.
//!
//! ```text
//!   SessionHandle (Clone)       mpsc      SessionActor (tokio::spawn)
//!   ┌─────────────────────┐  ────────▶  ┌──────────────────────────────┐
//!   │ .sign_in()          │             │ Session (authoritative)      │
//!   │ .sign_out()         │  ◀────────  │ epoch + lookup ticket        │
//!   │ .subscribe()        │   oneshot   │ CredentialStore, RoleDir     │
//!   └─────────────────────┘             └──────────────┬───────────────┘
//!            ▲  watch<Session>                         │ spawn
//!            └──────────────────── publish             ▼
//!                                             role lookup task ──▶ Resolution
//! ```
//!
//! Every identity change bumps the epoch and cancels the outstanding lookup.
//! A lookup result is applied only if its ticket is still current and the
//! identity it was started for is still the session's identity; anything
//! else is dropped, so a late answer can never leak one account's role
//! into another account's session.

use std::sync::Arc;

use lms_types::{Identity, Role, RoleDecode, RoleDocument, RoleRecord, Session, SessionError};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::backend::{BackendError, BackendResult, CredentialStore, RoleDirectory};
use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::subscriptions::SessionEvent;

// ============================================================================
// Error Type
// ============================================================================

/// Errors from the actor system.
///
/// Operation failures are not errors here; they are reported through
/// `Session::last_error` in the returned snapshot.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    #[error("session actor shut down")]
    Shutdown,
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Delete a freshly registered account when its role record cannot be
    /// written, leaving the session signed out. When false the session stays
    /// signed in with the requested role and only `RoleWriteFailed` is set.
    pub rollback_failed_signup: bool,
    /// Broadcast buffer for [`SessionEvent`]s.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rollback_failed_signup: true,
            event_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}

// ============================================================================
// Commands (internal)
// ============================================================================

type Reply = oneshot::Sender<Session>;

/// Internal command sent from SessionHandle → SessionActor via mpsc.
enum SessionCommand {
    Bootstrap {
        reply: Reply,
    },
    SignUp {
        email: String,
        password: String,
        role: Role,
        reply: Reply,
    },
    SignIn {
        email: String,
        password: String,
        reply: Reply,
    },
    ResolveRole {
        reply: Reply,
    },
    SignOut {
        reply: Reply,
    },
    ClearError {
        reply: Reply,
    },
}

/// Identifies one role lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Ticket {
    epoch: u64,
    lookup: u64,
}

/// A finished role lookup, posted back to the actor by its task.
struct Resolution {
    ticket: Ticket,
    identity: Identity,
    /// `None` when the lookup was cancelled before the directory answered.
    outcome: Option<BackendResult<Option<RoleDocument>>>,
    reply: Reply,
}

// ============================================================================
// SessionHandle (Send + Sync public API)
// ============================================================================

/// Send+Sync handle to a session actor.
///
/// Each operation sends a command via mpsc and awaits the oneshot reply,
/// which carries the session snapshot as of the operation's completion.
/// The handle can be cloned and shared across tasks; the actor stops once
/// every clone is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
    state: watch::Receiver<Session>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    async fn request(
        &self,
        command: impl FnOnce(Reply) -> SessionCommand,
    ) -> Result<Session, ActorError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(command(reply)).map_err(|_| ActorError::Shutdown)?;
        rx.await.map_err(|_| ActorError::Shutdown)
    }

    /// Adopt a credential persisted by a previous run, then resolve its role.
    ///
    /// Safe to call more than once: the same identity keeps its role while
    /// it is re-resolved.
    pub async fn bootstrap(&self) -> Result<Session, ActorError> {
        self.request(|reply| SessionCommand::Bootstrap { reply }).await
    }

    /// Register a new account and write its role record.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<Session, ActorError> {
        self.request(|reply| SessionCommand::SignUp {
            email: email.to_string(),
            password: password.to_string(),
            role,
            reply,
        })
        .await
    }

    /// Authenticate and resolve the role. Returns once the role is known
    /// (or the lookup failed, or was superseded).
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ActorError> {
        self.request(|reply| SessionCommand::SignIn {
            email: email.to_string(),
            password: password.to_string(),
            reply,
        })
        .await
    }

    /// Re-read the role for the current identity. No-op when signed out.
    pub async fn resolve_role(&self) -> Result<Session, ActorError> {
        self.request(|reply| SessionCommand::ResolveRole { reply }).await
    }

    pub async fn sign_out(&self) -> Result<Session, ActorError> {
        self.request(|reply| SessionCommand::SignOut { reply }).await
    }

    /// Dismiss the displayed error.
    pub async fn clear_error(&self) -> Result<Session, ActorError> {
        self.request(|reply| SessionCommand::ClearError { reply }).await
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Watch snapshots. Every mutation publishes a new one.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

// ============================================================================
// SessionActor (internal)
// ============================================================================

struct SessionActor {
    credentials: Arc<dyn CredentialStore>,
    directory: Arc<dyn RoleDirectory>,
    config: SessionConfig,
    session: Session,
    /// Bumped on every identity change.
    epoch: u64,
    /// Bumped on every lookup start.
    lookup: u64,
    in_flight: Option<CancellationToken>,
    resolved_tx: mpsc::UnboundedSender<Resolution>,
    state_tx: watch::Sender<Session>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionActor {
    fn new(
        credentials: Arc<dyn CredentialStore>,
        directory: Arc<dyn RoleDirectory>,
        config: SessionConfig,
        resolved_tx: mpsc::UnboundedSender<Resolution>,
        state_tx: watch::Sender<Session>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            credentials,
            directory,
            config,
            session: Session::signed_out(),
            epoch: 0,
            lookup: 0,
            in_flight: None,
            resolved_tx,
            state_tx,
            events,
        }
    }

    /// Process commands and lookup results until every handle is dropped.
    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<SessionCommand>,
        mut resolved_rx: mpsc::UnboundedReceiver<Resolution>,
    ) {
        loop {
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => break,
                },
                Some(done) = resolved_rx.recv() => self.finish_resolution(done),
            }
        }
        self.cancel_lookup();
        log::debug!("Session actor shutting down: channel closed");
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Bootstrap { reply } => self.bootstrap(reply).await,
            SessionCommand::SignUp {
                email,
                password,
                role,
                reply,
            } => self.sign_up(&email, &password, role, reply).await,
            SessionCommand::SignIn {
                email,
                password,
                reply,
            } => self.sign_in(&email, &password, reply).await,
            SessionCommand::ResolveRole { reply } => {
                self.begin();
                self.start_resolution(reply);
            }
            SessionCommand::SignOut { reply } => self.sign_out(reply).await,
            SessionCommand::ClearError { reply } => {
                self.session.last_error = None;
                self.publish();
                self.respond(reply);
            }
        }
    }

    // ── Operations ───────────────────────────────────────────────────────

    async fn bootstrap(&mut self, reply: Reply) {
        self.begin();
        self.session.loading = true;
        self.publish();

        match self.credentials.current_identity().await {
            Ok(Some(identity)) => {
                if self.session.identity.as_ref() != Some(&identity) {
                    log::info!("Restored session for {identity}");
                    self.adopt(identity);
                }
                self.start_resolution(reply);
            }
            Ok(None) => {
                if self.session.authenticated {
                    self.reset();
                    self.emit(SessionEvent::SignedOut);
                }
                self.finish(reply);
            }
            Err(e) => {
                self.fail(SessionError::AuthenticationFailed(e.to_string()));
                self.finish(reply);
            }
        }
    }

    async fn sign_up(&mut self, email: &str, password: &str, role: Role, reply: Reply) {
        self.begin();
        self.session.loading = true;
        self.publish();

        let identity = match self.credentials.register(email, password).await {
            Ok(identity) => identity,
            Err(e) => {
                self.fail(SessionError::AuthenticationFailed(e.to_string()));
                self.finish(reply);
                return;
            }
        };

        self.adopt(identity.clone());
        self.session.role = role;
        self.session.role_resolved = true;
        self.publish();

        let record = RoleRecord::new(role, identity.email.clone());
        match self.directory.put(&identity, &record).await {
            Ok(()) => {
                log::info!("Registered {identity} as {role}");
                self.emit(SessionEvent::RoleResolved { identity, role });
            }
            Err(e) => self.recover_failed_sign_up(&identity, e).await,
        }
        self.finish(reply);
    }

    async fn recover_failed_sign_up(&mut self, identity: &Identity, cause: BackendError) {
        log::warn!("Role record for {identity} not written: {cause}");
        if !self.config.rollback_failed_signup {
            self.fail(SessionError::RoleWriteFailed(cause.to_string()));
            return;
        }
        match self.credentials.unregister(identity).await {
            Ok(()) => {
                log::info!("Rolled back account {identity}");
                self.reset();
                self.emit(SessionEvent::SignedOut);
                self.fail(SessionError::RoleWriteFailed(cause.to_string()));
            }
            Err(rollback) => {
                log::error!("Could not roll back account {identity}: {rollback}");
                self.fail(SessionError::RoleWriteFailed(format!(
                    "{cause} (the account was created but could not be removed: {rollback})"
                )));
            }
        }
    }

    async fn sign_in(&mut self, email: &str, password: &str, reply: Reply) {
        self.begin();
        self.session.loading = true;
        self.publish();

        match self.credentials.authenticate(email, password).await {
            Ok(identity) => {
                log::info!("Signed in {identity}");
                self.adopt(identity);
                // Stays loading straight through to the role lookup.
                self.start_resolution(reply);
            }
            Err(e) => {
                self.fail(SessionError::AuthenticationFailed(e.to_string()));
                self.finish(reply);
            }
        }
    }

    async fn sign_out(&mut self, reply: Reply) {
        self.begin();
        match self.credentials.invalidate().await {
            Ok(()) => {
                if let Some(identity) = &self.session.identity {
                    log::info!("Signed out {identity}");
                }
                self.reset();
                self.emit(SessionEvent::SignedOut);
            }
            Err(e) => self.fail(SessionError::SignOutFailed(e.to_string())),
        }
        self.publish();
        self.respond(reply);
    }

    // ── Role resolution ──────────────────────────────────────────────────

    fn current_ticket(&self) -> Ticket {
        Ticket {
            epoch: self.epoch,
            lookup: self.lookup,
        }
    }

    /// Spawn a lookup for the current identity. `reply` is answered when it
    /// finishes, or immediately if there is nobody to resolve.
    fn start_resolution(&mut self, reply: Reply) {
        let Some(identity) = self.session.identity.clone() else {
            self.finish(reply);
            return;
        };

        self.cancel_lookup();
        self.lookup += 1;
        let ticket = self.current_ticket();
        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());
        self.session.loading = true;
        self.publish();

        log::debug!("Resolving role for {identity} (epoch {})", ticket.epoch);
        let directory = Arc::clone(&self.directory);
        let resolved_tx = self.resolved_tx.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => None,
                result = directory.get(&identity) => Some(result),
            };
            // Actor gone means nobody is waiting.
            let _ = resolved_tx.send(Resolution {
                ticket,
                identity,
                outcome,
                reply,
            });
        });
    }

    fn finish_resolution(&mut self, done: Resolution) {
        let Resolution {
            ticket,
            identity,
            outcome,
            reply,
        } = done;

        let current = ticket == self.current_ticket()
            && self.session.identity.as_ref() == Some(&identity);
        let result = match (current, outcome) {
            (true, Some(result)) => result,
            _ => {
                log::debug!("Dropping stale role lookup for {identity}");
                self.emit(SessionEvent::StaleResolutionDiscarded { identity });
                self.respond(reply);
                return;
            }
        };

        self.in_flight = None;
        match result {
            Ok(Some(document)) => {
                match document.decode_role() {
                    RoleDecode::Known(role) => self.session.role = role,
                    RoleDecode::Unknown(raw) => {
                        log::warn!(
                            "Unrecognised role {raw:?} for {identity}; keeping {}",
                            self.session.role
                        );
                    }
                }
                self.session.role_resolved = true;
                self.emit(SessionEvent::RoleResolved {
                    identity,
                    role: self.session.role,
                });
            }
            Ok(None) => {
                log::info!("No role record for {identity}; using {}", Role::User);
                self.session.role = Role::User;
                self.session.role_resolved = true;
                self.emit(SessionEvent::RoleResolved {
                    identity,
                    role: Role::User,
                });
            }
            Err(e) => self.fail(SessionError::RoleLookupFailed(e.to_string())),
        }
        self.finish(reply);
    }

    fn cancel_lookup(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
    }

    // ── Record mutation ──────────────────────────────────────────────────

    /// Start of an operation: the previous error is no longer relevant.
    fn begin(&mut self) {
        self.session.last_error = None;
    }

    /// Replace the identity. Outstanding lookups for the previous one become stale.
    fn adopt(&mut self, identity: Identity) {
        self.epoch += 1;
        self.cancel_lookup();
        self.session.identity = Some(identity.clone());
        self.session.authenticated = true;
        self.session.role = Role::User;
        self.session.role_resolved = false;
        self.emit(SessionEvent::Authenticated { identity });
    }

    /// Back to signed-out defaults.
    fn reset(&mut self) {
        self.epoch += 1;
        self.cancel_lookup();
        self.session = Session::signed_out();
    }

    fn fail(&mut self, err: SessionError) {
        log::warn!("Session operation failed ({}): {err}", err.kind());
        self.session.last_error = Some(err.clone());
        self.emit(SessionEvent::Failed(err));
    }

    /// End of an operation: loading stays on only while a lookup is out.
    fn finish(&mut self, reply: Reply) {
        self.session.loading = self.in_flight.is_some();
        self.publish();
        self.respond(reply);
    }

    fn publish(&self) {
        debug_assert!(self.session.is_consistent());
        self.state_tx.send_replace(self.session.clone());
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn respond(&self, reply: Reply) {
        let _ = reply.send(self.session.clone());
    }
}

// ============================================================================
// Spawn
// ============================================================================

/// Spawn a session actor on the current tokio runtime.
pub fn spawn_session(
    credentials: Arc<dyn CredentialStore>,
    directory: Arc<dyn RoleDirectory>,
    config: SessionConfig,
) -> SessionHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let (resolved_tx, resolved_rx) = mpsc::unbounded_channel();
    let (state_tx, state) = watch::channel(Session::signed_out());
    let (events, _) = broadcast::channel(config.event_capacity.max(1));
    let actor = SessionActor::new(
        credentials,
        directory,
        config,
        resolved_tx,
        state_tx,
        events.clone(),
    );
    tokio::spawn(actor.run(rx, resolved_rx));
    SessionHandle { tx, state, events }
}
