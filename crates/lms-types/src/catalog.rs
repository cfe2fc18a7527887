//! Catalog records: books, librarian profiles, and admin statistics.
//!
//! Drafts are what an admin fills in; records are what the catalog store
//! keeps. Books are keyed by ISBN, librarians by [`LibrarianId`].

use serde::{Deserialize, Serialize};

use crate::ids::LibrarianId;

/// Book details entered by an admin.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDraft {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    /// Free-form release date as entered, e.g. `2019-04-23`.
    pub release_date: String,
    pub language: String,
    pub pages: u32,
    pub total_copies: u32,
    /// Shelf location.
    pub location: String,
    pub summary: String,
}

/// A book as stored in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub release_date: String,
    pub language: String,
    pub pages: u32,
    pub total_copies: u32,
    pub available_copies: u32,
    pub location: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    /// Unix millis.
    pub created_at: u64,
}

impl BookRecord {
    /// Build a fresh record. Every copy starts out available.
    pub fn from_draft(draft: BookDraft, cover_image_url: Option<String>) -> Self {
        Self {
            available_copies: draft.total_copies,
            isbn: draft.isbn,
            title: draft.title,
            author: draft.author,
            genre: draft.genre,
            release_date: draft.release_date,
            language: draft.language,
            pages: draft.pages,
            total_copies: draft.total_copies,
            location: draft.location,
            summary: draft.summary,
            cover_image_url,
            created_at: crate::now_millis(),
        }
    }
}

/// Librarian details entered by an admin.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LibrarianDraft {
    pub name: String,
    pub designation: String,
    pub salary: String,
    pub contact: String,
    pub email: String,
    /// Plain text, only until the catalog hashes it.
    pub password: String,
}

/// A librarian profile as stored in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibrarianRecord {
    pub id: LibrarianId,
    pub name: String,
    pub designation: String,
    pub salary: String,
    pub contact: String,
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub approved: bool,
    /// Unix millis.
    pub created_at: u64,
}

impl LibrarianRecord {
    pub fn matches_name(&self, search: &str) -> bool {
        search.is_empty() || self.name.to_lowercase().contains(&search.to_lowercase())
    }
}

/// Dashboard counters shown on the admin summary tab.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub books_count: u64,
    /// Stored pre-formatted, e.g. `"1,176"`.
    pub librarians_count: String,
    pub members_count: u64,
    /// Stored pre-formatted, e.g. `"$4,134"`.
    pub revenue: String,
}

/// Increment a stored, formatted counter.
///
/// Digits are extracted from `previous` (so `"1,175"` reads as 1175), bumped
/// by one and re-formatted with thousands separators. A missing or
/// digit-free value restarts the count at `"1"`.
pub fn increment_count_label(previous: Option<&str>) -> String {
    let digits: String = previous
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    match digits.parse::<u64>() {
        Ok(n) => format_thousands(n.saturating_add(1)),
        Err(_) => "1".to_string(),
    }
}

/// Format with `,` every three digits.
pub fn format_thousands(n: u64) -> String {
    let raw = n.to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, ch) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
