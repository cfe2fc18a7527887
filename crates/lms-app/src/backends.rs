//! Collaborator wiring: durable (SQLite + filesystem) or ephemeral (memory).

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use lms_client::{
    BlobStore, CatalogStore, CredentialStore, MemoryBlobStore, MemoryCatalog,
    MemoryCredentialStore, MemoryRoleDirectory, RoleDirectory,
};
use lms_store::{FsBlobStore, SqliteStore};

pub const DATABASE_FILE: &str = "lms.db";
pub const BLOBS_DIR: &str = "blobs";

#[derive(Clone)]
pub struct Backends {
    pub credentials: Arc<dyn CredentialStore>,
    pub directory: Arc<dyn RoleDirectory>,
    pub catalog: Arc<dyn CatalogStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl Backends {
    /// Open (or create) the database and blob directory under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("creating data directory {}", data_dir.display()))?;
        let db_path = data_dir.join(DATABASE_FILE);
        let store = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("opening database {}", db_path.display()))?,
        );
        tracing::info!(db = %db_path.display(), "using durable store");
        Ok(Self {
            credentials: store.clone(),
            directory: store.clone(),
            catalog: store,
            blobs: Arc::new(FsBlobStore::new(data_dir.join(BLOBS_DIR))),
        })
    }

    /// In-memory collaborators; everything is lost on exit.
    pub fn ephemeral() -> Self {
        tracing::info!("using in-memory store");
        Self {
            credentials: Arc::new(MemoryCredentialStore::new()),
            directory: Arc::new(MemoryRoleDirectory::new()),
            catalog: Arc::new(MemoryCatalog::new()),
            blobs: Arc::new(MemoryBlobStore::new()),
        }
    }
}
