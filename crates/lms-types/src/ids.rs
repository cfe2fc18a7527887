//! Typed identifiers for user accounts and librarian profiles.
//!
//! Both wrap UUIDv7 (time-ordered, globally unique) and display as standard
//! UUID text for logging. The `short()` form (first 8 hex chars) is for
//! human-facing output only, never for lookups.
//!
//! Books are keyed by ISBN instead, see [`crate::catalog::BookRecord`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// A user account identifier issued by the credential store.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(uuid::Uuid);

/// A librarian profile identifier.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LibrarianId(uuid::Uuid);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Create a new time-ordered ID (UUIDv7).
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// First 8 hex characters, for human display only (not lookup).
            pub fn short(&self) -> String {
                self.0.as_simple().to_string()[..8].to_string()
            }

            /// Parse from a hex string (32 chars, no hyphens) or standard UUID format.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                uuid::Uuid::parse_str(s).map(Self)
            }

            /// A nil / zero ID, for sentinel values only.
            pub fn nil() -> Self {
                Self(uuid::Uuid::nil())
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<uuid::Uuid> for $T {
            fn from(u: uuid::Uuid) -> Self {
                Self(u)
            }
        }

        impl From<$T> for uuid::Uuid {
            fn from(id: $T) -> uuid::Uuid {
                id.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                // Full UUID with hyphens for log readability
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

impl_typed_id!(UserId, "UserId");
impl_typed_id!(LibrarianId, "LibrarianId");

// ── Deterministic account IDs ───────────────────────────────────────────────

/// Fixed namespace for deriving deterministic UserIds via UUIDv5.
const LMS_ACCOUNT_NS: uuid::Uuid = uuid::uuid!("3f1d2a9c-6b47-4e15-9c2e-8a0b7d5e41f3");

impl UserId {
    /// Derive a stable ID from a normalized email address.
    ///
    /// Used by fixtures and seeded accounts so the same email always maps to
    /// the same account across runs. Live registrations use [`UserId::new`].
    pub fn from_email(email: &str) -> Self {
        Self(uuid::Uuid::new_v5(
            &LMS_ACCOUNT_NS,
            email.trim().to_ascii_lowercase().as_bytes(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_unique() {
        assert_ne!(UserId::new(), UserId::new());
        assert_ne!(LibrarianId::new(), LibrarianId::new());
    }

    #[test]
    fn test_short_is_prefix_of_hex() {
        let id = UserId::new();
        assert_eq!(id.short().len(), 8);
        assert!(id.to_string().replace('-', "").starts_with(&id.short()));
    }

    #[test]
    fn test_parse_accepts_display_form() {
        let id = LibrarianId::new();
        let parsed = LibrarianId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        let simple = id.to_string().replace('-', "");
        assert_eq!(LibrarianId::parse(&simple).unwrap(), id);
    }

    #[test]
    fn test_from_email_is_deterministic_and_normalized() {
        let a = UserId::from_email("A@X.com");
        let b = UserId::from_email("  a@x.com ");
        assert_eq!(a, b);
        assert_ne!(a, UserId::from_email("b@x.com"));
    }

    #[test]
    fn test_debug_uses_short_form() {
        let id = UserId::nil();
        assert_eq!(format!("{id:?}"), "UserId(00000000)");
    }
}
