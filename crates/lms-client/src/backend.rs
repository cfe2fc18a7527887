//! Collaborator traits: credential store, role directory, catalog store, blob store.
//!
//! The session actor and catalog service only ever talk to these traits.
//! `lms-client` ships in-memory implementations ([`crate::memory`]);
//! `lms-store` provides SQLite and filesystem ones.
//!
//! Paths are always relative to the blob store's root, e.g.
//! `bookCovers/9780141439518.jpg`.

use async_trait::async_trait;
use lms_types::{AdminStats, BookRecord, Identity, LibrarianId, LibrarianRecord, Role};
use lms_types::{RoleDocument, RoleRecord};

/// Failures reported by collaborators.
///
/// Messages are user-facing; they end up in `Session::last_error`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("The email or password is incorrect.")]
    InvalidCredentials,

    #[error("The email address is already in use by another account.")]
    EmailInUse,

    #[error("The email address is badly formatted.")]
    InvalidEmail,

    #[error("The password must be 6 characters long or more.")]
    WeakPassword,

    #[error("No account is signed in.")]
    NotSignedIn,

    /// Network or service outage.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The backing store failed to read or write.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Other(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Minimum password length enforced by the sign-up form and the SQLite store.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Authentication backend.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Verify email/password and make that account the current credential.
    async fn authenticate(&self, email: &str, password: &str) -> BackendResult<Identity>;

    /// Create an account and make it the current credential.
    async fn register(&self, email: &str, password: &str) -> BackendResult<Identity>;

    /// The credential persisted from a previous run, if any.
    async fn current_identity(&self) -> BackendResult<Option<Identity>>;

    /// End the current credential.
    async fn invalidate(&self) -> BackendResult<()>;

    /// Delete an account. Used to roll back a sign-up whose role record
    /// could not be written.
    async fn unregister(&self, identity: &Identity) -> BackendResult<()>;
}

/// Identity → role document store.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn get(&self, identity: &Identity) -> BackendResult<Option<RoleDocument>>;

    async fn put(&self, identity: &Identity, record: &RoleRecord) -> BackendResult<()>;

    /// Number of documents whose role decodes to `role`.
    async fn count_with_role(&self, role: Role) -> BackendResult<u64>;
}

/// Books, librarian profiles, and the admin counters document.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_book(&self, isbn: &str) -> BackendResult<Option<BookRecord>>;

    /// Insert or overwrite by ISBN.
    async fn put_book(&self, book: &BookRecord) -> BackendResult<()>;

    async fn list_books(&self) -> BackendResult<Vec<BookRecord>>;

    async fn get_librarian(&self, id: LibrarianId) -> BackendResult<Option<LibrarianRecord>>;

    /// Insert or overwrite by ID.
    async fn put_librarian(&self, librarian: &LibrarianRecord) -> BackendResult<()>;

    async fn list_librarians(&self) -> BackendResult<Vec<LibrarianRecord>>;

    /// Returns whether a profile was removed.
    async fn delete_librarian(&self, id: LibrarianId) -> BackendResult<bool>;

    /// Atomically increment the stored librarians counter and return the new label.
    async fn bump_librarian_count(&self) -> BackendResult<String>;

    /// Stored counters. `members_count` is left for the caller to fill in.
    async fn stats(&self) -> BackendResult<AdminStats>;
}

/// An image selected for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl ImageUpload {
    pub fn jpeg(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: "image/jpeg".to_string(),
        }
    }
}

/// File storage for cover images and profile photos.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, upload: &ImageUpload) -> BackendResult<()>;

    /// A URL the stored object can be fetched from.
    async fn download_url(&self, path: &str) -> BackendResult<String>;
}
