//! Library client core.
//!
//! Owns the session (who is signed in, with what role) through a single
//! actor, routes snapshots to top-level screens, and runs catalog operations
//! on behalf of a signed-in admin. Storage is behind the traits in
//! [`backend`]; in-memory implementations live in [`memory`].

pub mod actor;
pub mod backend;
pub mod catalog;
pub mod constants;
pub mod forms;
pub mod memory;
pub mod password;
pub mod router;
pub mod subscriptions;

pub use actor::{ActorError, SessionConfig, SessionHandle, spawn_session};
pub use backend::{
    BackendError, BackendResult, BlobStore, CatalogStore, CredentialStore, ImageUpload,
    MIN_PASSWORD_LEN, RoleDirectory,
};
pub use catalog::{Catalog, CatalogError, CatalogResult};
pub use forms::{FormError, check_sign_in, check_sign_up, is_valid_email};
pub use memory::{MemoryBlobStore, MemoryCatalog, MemoryCredentialStore, MemoryRoleDirectory};
pub use router::{AdminTab, Route, Router, route};
pub use subscriptions::SessionEvent;
