//! In-memory collaborators.
//!
//! Used for tests and the `--ephemeral` mode of the CLI. All data is lost
//! when dropped. Each store has switches to simulate outages so failure
//! paths can be exercised without a network.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use lms_types::{
    AdminStats, BookRecord, Identity, LibrarianId, LibrarianRecord, Role, RoleDecode,
    RoleDocument, RoleRecord, UserId, increment_count_label,
};
use parking_lot::Mutex;

use crate::backend::{
    BackendError, BackendResult, BlobStore, CatalogStore, CredentialStore, ImageUpload,
    RoleDirectory,
};
use crate::forms::is_valid_email;
use crate::password::{hash_password, hash_password_blocking, verify_password};

fn outage(offline: &AtomicBool, what: &str) -> BackendResult<()> {
    if offline.load(Ordering::SeqCst) {
        Err(BackendError::Unavailable(format!("{what} is offline")))
    } else {
        Ok(())
    }
}

fn account_key(email: &str) -> String {
    email.trim().to_lowercase()
}

// ============================================================================
// Credential store
// ============================================================================

struct Account {
    identity: Identity,
    password_hash: String,
}

/// Email/password accounts held in a map.
///
/// Only an empty password is rejected unless a minimum length is set with
/// [`set_min_password_len`](Self::set_min_password_len).
#[derive(Default)]
pub struct MemoryCredentialStore {
    accounts: DashMap<String, Account>,
    current: Mutex<Option<Identity>>,
    min_password_len: AtomicUsize,
    offline: AtomicBool,
    fail_invalidate: AtomicBool,
    fail_unregister: AtomicBool,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account with a deterministic ID. Returns its identity.
    pub fn with_account(&self, email: &str, password: &str) -> BackendResult<Identity> {
        let identity = Identity::new(UserId::from_email(email), email.trim());
        let password_hash = hash_password_blocking(password)?;
        self.accounts.insert(
            account_key(email),
            Account {
                identity: identity.clone(),
                password_hash,
            },
        );
        Ok(identity)
    }

    /// Pretend `identity` was left signed in by a previous run.
    pub fn restore_current(&self, identity: Identity) {
        *self.current.lock() = Some(identity);
    }

    pub fn current(&self) -> Option<Identity> {
        self.current.lock().clone()
    }

    pub fn has_account(&self, email: &str) -> bool {
        self.accounts.contains_key(&account_key(email))
    }

    /// Reject shorter passwords at registration with `WeakPassword`.
    pub fn set_min_password_len(&self, len: usize) {
        self.min_password_len.store(len, Ordering::SeqCst);
    }

    /// Every call fails with `Unavailable` while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Only `invalidate` fails while set.
    pub fn set_fail_invalidate(&self, fail: bool) {
        self.fail_invalidate.store(fail, Ordering::SeqCst);
    }

    /// Only `unregister` fails while set.
    pub fn set_fail_unregister(&self, fail: bool) {
        self.fail_unregister.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn authenticate(&self, email: &str, password: &str) -> BackendResult<Identity> {
        outage(&self.offline, "credential store")?;
        let (identity, password_hash) = self
            .accounts
            .get(&account_key(email))
            .map(|account| (account.identity.clone(), account.password_hash.clone()))
            .ok_or(BackendError::InvalidCredentials)?;
        if !verify_password(&password_hash, password).await? {
            return Err(BackendError::InvalidCredentials);
        }
        *self.current.lock() = Some(identity.clone());
        Ok(identity)
    }

    async fn register(&self, email: &str, password: &str) -> BackendResult<Identity> {
        outage(&self.offline, "credential store")?;
        if !is_valid_email(email.trim()) {
            return Err(BackendError::InvalidEmail);
        }
        let min_len = self.min_password_len.load(Ordering::SeqCst).max(1);
        if password.chars().count() < min_len {
            return Err(BackendError::WeakPassword);
        }
        let password_hash = hash_password(password).await?;
        let identity = match self.accounts.entry(account_key(email)) {
            Entry::Occupied(_) => return Err(BackendError::EmailInUse),
            Entry::Vacant(slot) => {
                let identity = Identity::new(UserId::new(), email.trim());
                slot.insert(Account {
                    identity: identity.clone(),
                    password_hash,
                });
                identity
            }
        };
        *self.current.lock() = Some(identity.clone());
        Ok(identity)
    }

    async fn current_identity(&self) -> BackendResult<Option<Identity>> {
        outage(&self.offline, "credential store")?;
        Ok(self.current.lock().clone())
    }

    async fn invalidate(&self) -> BackendResult<()> {
        outage(&self.offline, "credential store")?;
        if self.fail_invalidate.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("sign-out rejected".into()));
        }
        *self.current.lock() = None;
        Ok(())
    }

    async fn unregister(&self, identity: &Identity) -> BackendResult<()> {
        outage(&self.offline, "credential store")?;
        if self.fail_unregister.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("account deletion rejected".into()));
        }
        self.accounts
            .remove_if(&account_key(&identity.email), |_, a| a.identity == *identity);
        let mut current = self.current.lock();
        if current.as_ref() == Some(identity) {
            *current = None;
        }
        Ok(())
    }
}

// ============================================================================
// Role directory
// ============================================================================

/// Role documents keyed by account ID.
#[derive(Default)]
pub struct MemoryRoleDirectory {
    documents: DashMap<UserId, RoleDocument>,
    offline: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryRoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw document, bypassing the typed record (e.g. a legacy role string).
    pub fn insert_document(&self, uid: UserId, document: RoleDocument) {
        self.documents.insert(uid, document);
    }

    pub fn document(&self, uid: UserId) -> Option<RoleDocument> {
        self.documents.get(&uid).map(|d| d.value().clone())
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Only `put` fails while set.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RoleDirectory for MemoryRoleDirectory {
    async fn get(&self, identity: &Identity) -> BackendResult<Option<RoleDocument>> {
        outage(&self.offline, "role directory")?;
        Ok(self.document(identity.uid))
    }

    async fn put(&self, identity: &Identity, record: &RoleRecord) -> BackendResult<()> {
        outage(&self.offline, "role directory")?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Storage("permission denied".into()));
        }
        self.documents.insert(identity.uid, RoleDocument::from(record));
        Ok(())
    }

    async fn count_with_role(&self, role: Role) -> BackendResult<u64> {
        outage(&self.offline, "role directory")?;
        let count = self
            .documents
            .iter()
            .filter(|d| d.decode_role() == RoleDecode::Known(role))
            .count();
        Ok(count as u64)
    }
}

// ============================================================================
// Catalog store
// ============================================================================

#[derive(Default)]
struct CatalogState {
    books: BTreeMap<String, BookRecord>,
    librarians: BTreeMap<LibrarianId, LibrarianRecord>,
    librarians_count: Option<String>,
    revenue: Option<String>,
}

/// Books and librarian profiles behind a single lock.
#[derive(Default)]
pub struct MemoryCatalog {
    state: Mutex<CatalogState>,
    offline: AtomicBool,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Overwrite the stored revenue label.
    pub fn set_revenue(&self, label: impl Into<String>) {
        self.state.lock().revenue = Some(label.into());
    }

    /// Overwrite the stored librarians counter, as another writer might.
    pub fn set_librarians_count(&self, label: Option<&str>) {
        self.state.lock().librarians_count = label.map(String::from);
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn get_book(&self, isbn: &str) -> BackendResult<Option<BookRecord>> {
        outage(&self.offline, "catalog")?;
        Ok(self.state.lock().books.get(isbn).cloned())
    }

    async fn put_book(&self, book: &BookRecord) -> BackendResult<()> {
        outage(&self.offline, "catalog")?;
        self.state.lock().books.insert(book.isbn.clone(), book.clone());
        Ok(())
    }

    async fn list_books(&self) -> BackendResult<Vec<BookRecord>> {
        outage(&self.offline, "catalog")?;
        Ok(self.state.lock().books.values().cloned().collect())
    }

    async fn get_librarian(&self, id: LibrarianId) -> BackendResult<Option<LibrarianRecord>> {
        outage(&self.offline, "catalog")?;
        Ok(self.state.lock().librarians.get(&id).cloned())
    }

    async fn put_librarian(&self, librarian: &LibrarianRecord) -> BackendResult<()> {
        outage(&self.offline, "catalog")?;
        self.state
            .lock()
            .librarians
            .insert(librarian.id, librarian.clone());
        Ok(())
    }

    async fn list_librarians(&self) -> BackendResult<Vec<LibrarianRecord>> {
        outage(&self.offline, "catalog")?;
        Ok(self.state.lock().librarians.values().cloned().collect())
    }

    async fn delete_librarian(&self, id: LibrarianId) -> BackendResult<bool> {
        outage(&self.offline, "catalog")?;
        Ok(self.state.lock().librarians.remove(&id).is_some())
    }

    async fn bump_librarian_count(&self) -> BackendResult<String> {
        outage(&self.offline, "catalog")?;
        let mut state = self.state.lock();
        let next = increment_count_label(state.librarians_count.as_deref());
        state.librarians_count = Some(next.clone());
        Ok(next)
    }

    async fn stats(&self) -> BackendResult<AdminStats> {
        outage(&self.offline, "catalog")?;
        let state = self.state.lock();
        Ok(AdminStats {
            books_count: state.books.len() as u64,
            librarians_count: state.librarians_count.clone().unwrap_or_else(|| "0".into()),
            members_count: 0,
            revenue: state.revenue.clone().unwrap_or_else(|| "$0".into()),
        })
    }
}

// ============================================================================
// Blob store
// ============================================================================

/// Uploaded objects held in a map, addressed as `memory://{path}`.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: DashMap<String, ImageUpload>,
    fail_uploads: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, path: &str) -> Option<ImageUpload> {
        self.objects.get(path).map(|o| o.value().clone())
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, upload: &ImageUpload) -> BackendResult<()> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("upload quota exceeded".into()));
        }
        self.objects.insert(path.to_string(), upload.clone());
        Ok(())
    }

    async fn download_url(&self, path: &str) -> BackendResult<String> {
        if self.objects.contains_key(path) {
            Ok(format!("memory://{path}"))
        } else {
            Err(BackendError::Storage(format!("object not found: {path}")))
        }
    }
}
