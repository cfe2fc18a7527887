//! The session actor and catalog service running on the SQLite store,
//! across a simulated restart.

use std::sync::Arc;

use lms_client::{Catalog, ImageUpload, SessionConfig, spawn_session};
use lms_store::{FsBlobStore, SqliteStore};
use lms_types::{BookDraft, Role, Session};

#[tokio::test]
async fn signed_in_account_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("lms.db");

    {
        let store = Arc::new(SqliteStore::open(&db_path).unwrap());
        let session = spawn_session(store.clone(), store, SessionConfig::default());
        let signed_up = session
            .sign_up("head@library.org", "stacks12", Role::Admin)
            .await
            .unwrap();
        assert_eq!(signed_up.role, Role::Admin);
        assert_eq!(signed_up.last_error, None);
    }

    let store = Arc::new(SqliteStore::open(&db_path).unwrap());
    let session = spawn_session(store.clone(), store, SessionConfig::default());
    let restored = session.bootstrap().await.unwrap();

    assert!(restored.authenticated);
    assert_eq!(restored.role, Role::Admin);
    assert_eq!(
        restored.identity.as_ref().map(|i| i.email.as_str()),
        Some("head@library.org")
    );
    assert!(!restored.loading);

    let signed_out = session.sign_out().await.unwrap();
    assert_eq!(signed_out, Session::signed_out());
    assert_eq!(session.bootstrap().await.unwrap(), Session::signed_out());
}

#[tokio::test]
async fn admin_adds_book_with_cover_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(dir.path().join("lms.db")).unwrap());
    let blobs = Arc::new(FsBlobStore::new(dir.path().join("blobs")));
    let session = spawn_session(store.clone(), store.clone(), SessionConfig::default());
    let catalog = Catalog::new(store.clone(), blobs, store);

    let admin = session
        .sign_up("head@library.org", "stacks12", Role::Admin)
        .await
        .unwrap();
    let draft = BookDraft {
        isbn: "9780060512750".into(),
        title: "The Dispossessed".into(),
        author: "Ursula K. Le Guin".into(),
        total_copies: 5,
        ..Default::default()
    };
    let book = catalog
        .add_book(&admin, draft, Some(ImageUpload::jpeg(vec![0xff, 0xd8, 0xff])))
        .await
        .unwrap();

    assert_eq!(book.available_copies, 5);
    let url = book.cover_image_url.clone().unwrap();
    assert!(url.ends_with("bookCovers/9780060512750.jpg"));
    assert!(dir.path().join("blobs/bookCovers/9780060512750.jpg").exists());
    assert_eq!(catalog.list_books(&admin).await.unwrap(), vec![book]);

    let stats = catalog.admin_stats(&admin).await.unwrap();
    assert_eq!(stats.books_count, 1);
    assert_eq!(stats.members_count, 0);
}
