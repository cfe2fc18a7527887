//! Catalog service: books, librarian profiles, and admin statistics.
//!
//! Every operation takes the caller's session snapshot and checks it before
//! touching a store. Only a resolved role counts (`Session::trusted_role`),
//! so a session still waiting on its role lookup is treated as unprivileged.

use std::sync::Arc;

use lms_types::{
    AdminStats, BookDraft, BookRecord, LibrarianDraft, LibrarianId, LibrarianRecord, Role,
    Session,
};
use tracing::{info, warn};

use crate::backend::{BackendError, BlobStore, CatalogStore, ImageUpload, RoleDirectory};
use crate::constants::{BOOK_COVERS_PREFIX, LIBRARIAN_PROFILES_PREFIX};
use crate::forms::is_valid_email;
use crate::password::hash_password;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Sign in to continue.")]
    NotSignedIn,

    #[error("Only {required} accounts can do this.")]
    Forbidden { required: Role },

    /// Form input rejected; the message is user-facing.
    #[error("{0}")]
    Invalid(String),

    #[error("A book with this ISBN already exists.")]
    DuplicateIsbn,

    #[error("no librarian with id {0}")]
    NotFound(LibrarianId),

    #[error("Image upload failed: {0}")]
    Upload(BackendError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

fn require_signed_in(session: &Session) -> CatalogResult<()> {
    if session.authenticated {
        Ok(())
    } else {
        Err(CatalogError::NotSignedIn)
    }
}

fn require_role(session: &Session, required: Role) -> CatalogResult<()> {
    require_signed_in(session)?;
    match session.trusted_role() {
        Some(role) if role == required => Ok(()),
        _ => Err(CatalogError::Forbidden { required }),
    }
}

pub struct Catalog {
    store: Arc<dyn CatalogStore>,
    blobs: Arc<dyn BlobStore>,
    directory: Arc<dyn RoleDirectory>,
}

impl Catalog {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        blobs: Arc<dyn BlobStore>,
        directory: Arc<dyn RoleDirectory>,
    ) -> Self {
        Self {
            store,
            blobs,
            directory,
        }
    }

    /// Store an image and return the URL it can be fetched from.
    async fn upload(&self, path: &str, image: &ImageUpload) -> CatalogResult<String> {
        self.blobs
            .put(path, image)
            .await
            .map_err(CatalogError::Upload)?;
        self.blobs
            .download_url(path)
            .await
            .map_err(CatalogError::Upload)
    }

    // ── Books ────────────────────────────────────────────────────────────

    /// Add a book, uploading its cover first when one is given.
    pub async fn add_book(
        &self,
        session: &Session,
        mut draft: BookDraft,
        cover: Option<ImageUpload>,
    ) -> CatalogResult<BookRecord> {
        require_role(session, Role::Admin)?;

        draft.isbn = draft.isbn.trim().to_string();
        if draft.title.trim().is_empty() || draft.author.trim().is_empty() || draft.isbn.is_empty()
        {
            return Err(CatalogError::Invalid(
                "Please fill in at least the title, author, and ISBN fields.".into(),
            ));
        }
        if self.store.get_book(&draft.isbn).await?.is_some() {
            return Err(CatalogError::DuplicateIsbn);
        }

        let cover_image_url = match &cover {
            Some(image) => {
                let path = format!("{BOOK_COVERS_PREFIX}/{}.jpg", draft.isbn);
                Some(self.upload(&path, image).await?)
            }
            None => None,
        };

        let book = BookRecord::from_draft(draft, cover_image_url);
        self.store.put_book(&book).await?;
        info!(isbn = %book.isbn, title = %book.title, "book added");
        Ok(book)
    }

    pub async fn list_books(&self, session: &Session) -> CatalogResult<Vec<BookRecord>> {
        require_signed_in(session)?;
        Ok(self.store.list_books().await?)
    }

    // ── Librarians ───────────────────────────────────────────────────────

    /// Create a librarian profile. The password is stored hashed.
    ///
    /// A failure to bump the librarians counter is logged and otherwise
    /// ignored; the profile is already saved by then.
    pub async fn add_librarian(
        &self,
        session: &Session,
        draft: LibrarianDraft,
        photo: Option<ImageUpload>,
    ) -> CatalogResult<LibrarianRecord> {
        require_role(session, Role::Admin)?;

        let email = draft.email.trim();
        if draft.name.trim().is_empty() || email.is_empty() || draft.password.is_empty() {
            return Err(CatalogError::Invalid(
                "Please fill in all required fields.".into(),
            ));
        }
        if !is_valid_email(email) {
            return Err(CatalogError::Invalid(
                "Please enter a valid email address".into(),
            ));
        }

        let id = LibrarianId::new();
        let profile_image_url = match &photo {
            Some(image) => {
                let path = format!("{LIBRARIAN_PROFILES_PREFIX}/{id}.jpg");
                Some(self.upload(&path, image).await?)
            }
            None => None,
        };

        let password_hash = hash_password(&draft.password).await?;
        let librarian = LibrarianRecord {
            id,
            name: draft.name.trim().to_string(),
            designation: draft.designation,
            salary: draft.salary,
            contact: draft.contact,
            email: email.to_string(),
            password_hash,
            profile_image_url,
            approved: false,
            created_at: lms_types::now_millis(),
        };
        self.store.put_librarian(&librarian).await?;
        info!(librarian = %id.short(), name = %librarian.name, "librarian added");

        match self.store.bump_librarian_count().await {
            Ok(count) => info!(%count, "librarians count updated"),
            Err(e) => warn!("librarians count not updated: {e}"),
        }
        Ok(librarian)
    }

    /// Librarians whose name contains `search`, ignoring case. Empty matches all.
    pub async fn librarians(
        &self,
        session: &Session,
        search: &str,
    ) -> CatalogResult<Vec<LibrarianRecord>> {
        require_role(session, Role::Admin)?;
        let search = search.trim();
        let mut found: Vec<_> = self
            .store
            .list_librarians()
            .await?
            .into_iter()
            .filter(|l| l.matches_name(search))
            .collect();
        found.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(found)
    }

    pub async fn approve_librarian(
        &self,
        session: &Session,
        id: LibrarianId,
    ) -> CatalogResult<LibrarianRecord> {
        require_role(session, Role::Admin)?;
        let mut librarian = self
            .store
            .get_librarian(id)
            .await?
            .ok_or(CatalogError::NotFound(id))?;
        if !librarian.approved {
            librarian.approved = true;
            self.store.put_librarian(&librarian).await?;
            info!(librarian = %id.short(), "librarian approved");
        }
        Ok(librarian)
    }

    pub async fn remove_librarian(&self, session: &Session, id: LibrarianId) -> CatalogResult<()> {
        require_role(session, Role::Admin)?;
        if !self.store.delete_librarian(id).await? {
            return Err(CatalogError::NotFound(id));
        }
        info!(librarian = %id.short(), "librarian removed");
        Ok(())
    }

    // ── Stats ────────────────────────────────────────────────────────────

    /// Stored counters plus a live count of member accounts.
    pub async fn admin_stats(&self, session: &Session) -> CatalogResult<AdminStats> {
        require_role(session, Role::Admin)?;
        let mut stats = self.store.stats().await?;
        stats.members_count = self.directory.count_with_role(Role::User).await?;
        Ok(stats)
    }
}
