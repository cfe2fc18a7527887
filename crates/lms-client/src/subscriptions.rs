//! Session lifecycle events.
//!
//! Snapshots are the source of truth for rendering (see
//! [`SessionHandle::subscribe`](crate::SessionHandle::subscribe)); events are
//! for consumers that care about transitions, like logging or analytics.

use lms_types::{Identity, Role, SessionError};

/// Transitions pushed from the session actor via broadcast.
///
/// Subscribe via [`SessionHandle::subscribe_events()`](crate::SessionHandle::subscribe_events).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// The credential store confirmed an identity (sign-in, sign-up, or bootstrap).
    Authenticated { identity: Identity },
    /// A role was resolved (or written at sign-up) for the current identity.
    RoleResolved { identity: Identity, role: Role },
    /// A role lookup finished after its identity was replaced; result dropped.
    StaleResolutionDiscarded { identity: Identity },
    /// The session was reset to signed-out defaults.
    SignedOut,
    /// An operation failed; the same error is in `Session::last_error`.
    Failed(SessionError),
}
