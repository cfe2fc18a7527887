//! Authenticated identity handles.

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Opaque handle the credential store issues on successful authentication.
///
/// Immutable for the lifetime of a session. Two identities are the same
/// person iff they compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub uid: UserId,
    pub email: String,
}

impl Identity {
    pub fn new(uid: UserId, email: impl Into<String>) -> Self {
        Self {
            uid,
            email: email.into(),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.email, self.uid.short())
    }
}
