//! Accounts, the persisted current credential, and role documents.

use async_trait::async_trait;
use lms_client::password::{hash_password, verify_password};
use lms_client::{
    BackendError, BackendResult, CredentialStore, MIN_PASSWORD_LEN, RoleDirectory,
    is_valid_email,
};
use lms_types::{Identity, Role, RoleDocument, RoleRecord, UserId, now_millis};
use rusqlite::{OptionalExtension, params};
use tracing::{debug, info};

use crate::db::{
    SqliteStore, from_sql_millis, is_unique_violation, parsed_column, storage, to_sql_millis,
};

/// `uid, email` in the first two columns.
fn identity_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Identity> {
    Ok(Identity::new(
        parsed_column(row, 0, UserId::parse)?,
        row.get::<_, String>(1)?,
    ))
}

impl SqliteStore {
    fn set_current(&self, uid: UserId) -> BackendResult<()> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO current_session (id, uid, signed_in_at) VALUES (1, ?1, ?2)",
                params![uid.to_string(), to_sql_millis(now_millis())],
            )
            .map_err(storage)?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn authenticate(&self, email: &str, password: &str) -> BackendResult<Identity> {
        let account = self
            .conn()
            .query_row(
                "SELECT uid, email, password_hash FROM accounts WHERE email = ?1",
                [email.trim()],
                |row| Ok((identity_from_row(row)?, row.get::<_, String>(2)?)),
            )
            .optional()
            .map_err(storage)?;

        // Verify outside the lock; hashing is slow.
        let (identity, password_hash) = account.ok_or(BackendError::InvalidCredentials)?;
        if !verify_password(&password_hash, password).await? {
            return Err(BackendError::InvalidCredentials);
        }
        self.set_current(identity.uid)?;
        info!(account = %identity, "authenticated");
        Ok(identity)
    }

    async fn register(&self, email: &str, password: &str) -> BackendResult<Identity> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(BackendError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BackendError::WeakPassword);
        }
        let password_hash = hash_password(password).await?;
        let identity = Identity::new(UserId::new(), email);
        let now = to_sql_millis(now_millis());

        let mut conn = self.conn();
        let tx = conn.transaction().map_err(storage)?;
        let inserted = tx.execute(
            "INSERT INTO accounts (uid, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![identity.uid.to_string(), identity.email, password_hash, now],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(BackendError::EmailInUse),
            Err(e) => return Err(storage(e)),
        }
        tx.execute(
            "INSERT OR REPLACE INTO current_session (id, uid, signed_in_at) VALUES (1, ?1, ?2)",
            params![identity.uid.to_string(), now],
        )
        .map_err(storage)?;
        tx.commit().map_err(storage)?;

        info!(account = %identity, "registered");
        Ok(identity)
    }

    async fn current_identity(&self) -> BackendResult<Option<Identity>> {
        self.conn()
            .query_row(
                "SELECT a.uid, a.email FROM current_session s
                 JOIN accounts a ON a.uid = s.uid WHERE s.id = 1",
                [],
                identity_from_row,
            )
            .optional()
            .map_err(storage)
    }

    async fn invalidate(&self) -> BackendResult<()> {
        self.conn()
            .execute("DELETE FROM current_session", [])
            .map_err(storage)?;
        debug!("current session cleared");
        Ok(())
    }

    async fn unregister(&self, identity: &Identity) -> BackendResult<()> {
        let uid = identity.uid.to_string();
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(storage)?;
        tx.execute("DELETE FROM current_session WHERE uid = ?1", [&uid])
            .map_err(storage)?;
        tx.execute("DELETE FROM accounts WHERE uid = ?1", [&uid])
            .map_err(storage)?;
        tx.commit().map_err(storage)?;
        info!(account = %identity, "unregistered");
        Ok(())
    }
}

#[async_trait]
impl RoleDirectory for SqliteStore {
    async fn get(&self, identity: &Identity) -> BackendResult<Option<RoleDocument>> {
        self.conn()
            .query_row(
                "SELECT role, email, created_at FROM roles WHERE uid = ?1",
                [identity.uid.to_string()],
                |row| {
                    Ok(RoleDocument {
                        role: row.get(0)?,
                        email: row.get(1)?,
                        created_at: row.get::<_, Option<i64>>(2)?.map(from_sql_millis),
                    })
                },
            )
            .optional()
            .map_err(storage)
    }

    async fn put(&self, identity: &Identity, record: &RoleRecord) -> BackendResult<()> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO roles (uid, role, email, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    identity.uid.to_string(),
                    record.role.as_str(),
                    record.email,
                    to_sql_millis(record.created_at),
                ],
            )
            .map_err(storage)?;
        Ok(())
    }

    async fn count_with_role(&self, role: Role) -> BackendResult<u64> {
        // Decoding is exact, so string equality matches the same documents.
        let count: i64 = self
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM roles WHERE role = ?1",
                [role.as_str()],
                |row| row.get(0),
            )
            .map_err(storage)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

impl SqliteStore {
    /// Store a raw role string for an account, bypassing the typed record.
    pub fn put_raw_role(&self, uid: UserId, role: &str) -> BackendResult<()> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO roles (uid, role) VALUES (?1, ?2)",
                params![uid.to_string(), role],
            )
            .map_err(storage)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_authenticate_invalidate() {
        let store = SqliteStore::in_memory().unwrap();
        let registered = store.register("Ada@x.com", "engine1").await.unwrap();
        assert_eq!(store.current_identity().await.unwrap(), Some(registered.clone()));

        store.invalidate().await.unwrap();
        assert_eq!(store.current_identity().await.unwrap(), None);

        let signed_in = store.authenticate("ada@X.com", "engine1").await.unwrap();
        assert_eq!(signed_in, registered);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_bad_input() {
        let store = SqliteStore::in_memory().unwrap();
        store.register("ada@x.com", "engine1").await.unwrap();
        assert_eq!(
            store.register("ADA@x.com", "engine2").await,
            Err(BackendError::EmailInUse)
        );
        assert_eq!(store.register("ada", "engine1").await, Err(BackendError::InvalidEmail));
        assert_eq!(
            store.register("bob@x.com", "short").await,
            Err(BackendError::WeakPassword)
        );
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let store = SqliteStore::in_memory().unwrap();
        store.register("ada@x.com", "engine1").await.unwrap();
        store.invalidate().await.unwrap();
        assert_eq!(
            store.authenticate("ada@x.com", "nope").await,
            Err(BackendError::InvalidCredentials)
        );
        assert_eq!(store.current_identity().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unregister() {
        let store = SqliteStore::in_memory().unwrap();
        let ada = store.register("ada@x.com", "engine1").await.unwrap();
        store.unregister(&ada).await.unwrap();
        assert_eq!(store.current_identity().await.unwrap(), None);
        assert_eq!(
            store.authenticate("ada@x.com", "engine1").await,
            Err(BackendError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_role_documents() {
        let store = SqliteStore::in_memory().unwrap();
        let ada = Identity::new(UserId::new(), "ada@x.com");
        assert_eq!(store.get(&ada).await.unwrap(), None);

        let record = RoleRecord::new(Role::Librarian, "ada@x.com");
        store.put(&ada, &record).await.unwrap();
        assert_eq!(store.get(&ada).await.unwrap(), Some(RoleDocument::from(&record)));

        store.put_raw_role(UserId::new(), "Admin").unwrap();
        assert_eq!(store.count_with_role(Role::Librarian).await.unwrap(), 1);
        assert_eq!(store.count_with_role(Role::Admin).await.unwrap(), 0);
    }
}
