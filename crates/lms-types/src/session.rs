//! Session state snapshots.
//!
//! A `Session` is the client's view of who is signed in and with what role.
//! Exactly one authoritative copy lives inside the session actor in
//! `lms-client`; everything else sees clones published after each mutation.

use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::role::Role;

/// Displayable, non-fatal failure of a session operation.
///
/// The payload is the human-readable message the presentation layer shows.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message")]
pub enum SessionError {
    /// Bad credentials, duplicate account, weak password, backend fault.
    #[error("{0}")]
    AuthenticationFailed(String),
    /// Directory unreachable or malformed record.
    #[error("{0}")]
    RoleLookupFailed(String),
    /// The role record for a new account could not be written.
    #[error("{0}")]
    RoleWriteFailed(String),
    /// The credential store could not be reached to end the session.
    #[error("{0}")]
    SignOutFailed(String),
}

impl SessionError {
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::AuthenticationFailed(_) => "authentication_failed",
            SessionError::RoleLookupFailed(_) => "role_lookup_failed",
            SessionError::RoleWriteFailed(_) => "role_write_failed",
            SessionError::SignOutFailed(_) => "sign_out_failed",
        }
    }
}

/// Lifecycle state, derived from a [`Session`] snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    SignedOut,
    Authenticating,
    ResolvingRole,
    SignedIn(Role),
    /// Transient: the next operation moves to `SignedOut` or `Authenticating`.
    Error(String),
}

/// Point-in-time copy of the session record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Absent means signed out.
    pub identity: Option<Identity>,
    /// True iff `identity` is present and confirmed by the credential store.
    pub authenticated: bool,
    /// Meaningful only while authenticated; `user` until resolved.
    pub role: Role,
    /// Set once the role has been resolved (or written) for the current identity.
    pub role_resolved: bool,
    /// An authentication or role resolution is in flight.
    pub loading: bool,
    /// Set by the most recent failed operation.
    pub last_error: Option<SessionError>,
}

impl Default for Session {
    fn default() -> Self {
        Self::signed_out()
    }
}

impl Session {
    /// Signed-out defaults.
    pub fn signed_out() -> Self {
        Self {
            identity: None,
            authenticated: false,
            role: Role::User,
            role_resolved: false,
            loading: false,
            last_error: None,
        }
    }

    /// The role, but only once it can be used for authorization decisions.
    pub fn trusted_role(&self) -> Option<Role> {
        (self.authenticated && self.role_resolved).then_some(self.role)
    }

    pub fn last_error_message(&self) -> Option<String> {
        self.last_error.as_ref().map(|e| e.to_string())
    }

    pub fn phase(&self) -> SessionPhase {
        match (&self.identity, self.authenticated, self.loading) {
            (None, _, true) => SessionPhase::Authenticating,
            (Some(_), true, true) if !self.role_resolved => SessionPhase::ResolvingRole,
            (Some(_), true, _) => SessionPhase::SignedIn(self.role),
            _ => match &self.last_error {
                Some(err) => SessionPhase::Error(err.to_string()),
                None => SessionPhase::SignedOut,
            },
        }
    }

    /// Check the record's structural invariant.
    pub fn is_consistent(&self) -> bool {
        !self.authenticated || self.identity.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UserId;

    fn signed_in(role: Role, resolved: bool) -> Session {
        Session {
            identity: Some(Identity::new(UserId::new(), "a@x.com")),
            authenticated: true,
            role,
            role_resolved: resolved,
            loading: false,
            last_error: None,
        }
    }

    #[test]
    fn test_signed_out_defaults() {
        let s = Session::signed_out();
        assert_eq!(s.identity, None);
        assert!(!s.authenticated);
        assert_eq!(s.role, Role::User);
        assert!(!s.loading);
        assert_eq!(s.last_error, None);
        assert_eq!(s.phase(), SessionPhase::SignedOut);
        assert!(s.is_consistent());
    }

    #[test]
    fn test_trusted_role_requires_resolution() {
        assert_eq!(signed_in(Role::Admin, false).trusted_role(), None);
        assert_eq!(signed_in(Role::Admin, true).trusted_role(), Some(Role::Admin));
        assert_eq!(Session::signed_out().trusted_role(), None);
    }

    #[test]
    fn test_phases() {
        let mut s = Session::signed_out();
        s.loading = true;
        assert_eq!(s.phase(), SessionPhase::Authenticating);

        let mut s = signed_in(Role::User, false);
        s.loading = true;
        assert_eq!(s.phase(), SessionPhase::ResolvingRole);

        let s = signed_in(Role::Librarian, true);
        assert_eq!(s.phase(), SessionPhase::SignedIn(Role::Librarian));

        let mut s = Session::signed_out();
        s.last_error = Some(SessionError::AuthenticationFailed("wrong password".into()));
        assert_eq!(s.phase(), SessionPhase::Error("wrong password".into()));
    }

    #[test]
    fn test_error_keeps_signed_in_phase_when_authenticated() {
        let mut s = signed_in(Role::Admin, true);
        s.last_error = Some(SessionError::SignOutFailed("offline".into()));
        assert_eq!(s.phase(), SessionPhase::SignedIn(Role::Admin));
        assert_eq!(s.last_error_message().as_deref(), Some("offline"));
    }

    #[test]
    fn test_inconsistent_record_detected() {
        let mut s = Session::signed_out();
        s.authenticated = true;
        assert!(!s.is_consistent());
    }

    #[test]
    fn test_error_json_shape() {
        let err = SessionError::RoleLookupFailed("directory offline".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "RoleLookupFailed");
        assert_eq!(json["message"], "directory offline");
        assert_eq!(err.kind(), "role_lookup_failed");
    }
}
