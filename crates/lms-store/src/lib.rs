//! Durable backends for the library client.
//!
//! - [`SqliteStore`]: accounts, the persisted current credential, role
//!   documents, books, librarian profiles, and admin counters in one SQLite
//!   file. Implements `CredentialStore`, `RoleDirectory`, and `CatalogStore`.
//! - [`FsBlobStore`]: images on the local filesystem.

mod accounts;
mod blob;
mod catalog;
pub mod db;

pub use blob::FsBlobStore;
pub use db::SqliteStore;
