//! Shared identity, role, session, and catalog types for the library client.
//!
//! A pure leaf crate: no I/O, no async. The session actor, collaborator
//! traits, and stores build on these.
//!
//! # Key Types
//!
//! |-----------------|------------------------------------------------------|
//! | Type            | Purpose                                              |
//! |-----------------|------------------------------------------------------|
//! | [`Identity`]    | Who is signed in (issued by the credential store)    |
//! | [`Role`]        | admin / librarian / user                             |
//! | [`RoleDecode`]  | Strict decode of an untyped role string              |
//! | [`RoleRecord`]  | `{ role, email, createdAt }` written at sign-up      |
//! | [`Session`]     | Snapshot of authentication + role state              |
//! | [`BookRecord`]  | Catalog entry keyed by ISBN                          |
//! | [`AdminStats`]  | Admin dashboard counters                             |
//! |-----------------|------------------------------------------------------|

pub mod catalog;
pub mod identity;
pub mod ids;
pub mod role;
pub mod session;

pub use catalog::{
    AdminStats, BookDraft, BookRecord, LibrarianDraft, LibrarianRecord, format_thousands,
    increment_count_label,
};
pub use identity::Identity;
pub use ids::{LibrarianId, UserId};
pub use role::{Role, RoleDecode, RoleDocument, RoleRecord};
pub use session::{Session, SessionError, SessionPhase};

/// Current time as Unix milliseconds. Used by constructors throughout the crate.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
