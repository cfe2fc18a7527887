//! Client configuration constants.

/// Buffered session events per subscriber before it starts lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Blob path prefix for book cover images (`bookCovers/{isbn}.jpg`).
pub const BOOK_COVERS_PREFIX: &str = "bookCovers";

/// Blob path prefix for librarian profile photos (`librarianProfiles/{id}.jpg`).
pub const LIBRARIAN_PROFILES_PREFIX: &str = "librarianProfiles";
