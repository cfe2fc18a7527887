//! Books, librarian profiles, and admin counters.

use async_trait::async_trait;
use lms_client::{BackendResult, CatalogStore};
use lms_types::{
    AdminStats, BookRecord, LibrarianId, LibrarianRecord, increment_count_label,
};
use rusqlite::{OptionalExtension, Row, params};

use crate::db::{SqliteStore, from_sql_millis, parsed_column, storage, to_sql_millis};

const BOOK_COLUMNS: &str = "isbn, title, author, genre, release_date, language, pages, \
     total_copies, available_copies, location, summary, cover_image_url, created_at";

const LIBRARIAN_COLUMNS: &str = "id, name, designation, salary, contact, email, password_hash, \
     profile_image_url, approved, created_at";

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<BookRecord> {
    Ok(BookRecord {
        isbn: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        genre: row.get(3)?,
        release_date: row.get(4)?,
        language: row.get(5)?,
        pages: row.get(6)?,
        total_copies: row.get(7)?,
        available_copies: row.get(8)?,
        location: row.get(9)?,
        summary: row.get(10)?,
        cover_image_url: row.get(11)?,
        created_at: from_sql_millis(row.get(12)?),
    })
}

fn librarian_from_row(row: &Row<'_>) -> rusqlite::Result<LibrarianRecord> {
    Ok(LibrarianRecord {
        id: parsed_column(row, 0, LibrarianId::parse)?,
        name: row.get(1)?,
        designation: row.get(2)?,
        salary: row.get(3)?,
        contact: row.get(4)?,
        email: row.get(5)?,
        password_hash: row.get(6)?,
        profile_image_url: row.get(7)?,
        approved: row.get(8)?,
        created_at: from_sql_millis(row.get(9)?),
    })
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn get_book(&self, isbn: &str) -> BackendResult<Option<BookRecord>> {
        self.conn()
            .query_row(
                &format!("SELECT {BOOK_COLUMNS} FROM books WHERE isbn = ?1"),
                [isbn],
                book_from_row,
            )
            .optional()
            .map_err(storage)
    }

    async fn put_book(&self, book: &BookRecord) -> BackendResult<()> {
        self.conn()
            .execute(
                &format!(
                    "INSERT OR REPLACE INTO books ({BOOK_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
                ),
                params![
                    book.isbn,
                    book.title,
                    book.author,
                    book.genre,
                    book.release_date,
                    book.language,
                    book.pages,
                    book.total_copies,
                    book.available_copies,
                    book.location,
                    book.summary,
                    book.cover_image_url,
                    to_sql_millis(book.created_at),
                ],
            )
            .map_err(storage)?;
        Ok(())
    }

    async fn list_books(&self) -> BackendResult<Vec<BookRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {BOOK_COLUMNS} FROM books ORDER BY title COLLATE NOCASE, isbn"
            ))
            .map_err(storage)?;
        let rows = stmt.query_map([], book_from_row).map_err(storage)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(storage)
    }

    async fn get_librarian(&self, id: LibrarianId) -> BackendResult<Option<LibrarianRecord>> {
        self.conn()
            .query_row(
                &format!("SELECT {LIBRARIAN_COLUMNS} FROM librarians WHERE id = ?1"),
                [id.to_string()],
                librarian_from_row,
            )
            .optional()
            .map_err(storage)
    }

    async fn put_librarian(&self, librarian: &LibrarianRecord) -> BackendResult<()> {
        self.conn()
            .execute(
                &format!(
                    "INSERT OR REPLACE INTO librarians ({LIBRARIAN_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    librarian.id.to_string(),
                    librarian.name,
                    librarian.designation,
                    librarian.salary,
                    librarian.contact,
                    librarian.email,
                    librarian.password_hash,
                    librarian.profile_image_url,
                    librarian.approved,
                    to_sql_millis(librarian.created_at),
                ],
            )
            .map_err(storage)?;
        Ok(())
    }

    async fn list_librarians(&self) -> BackendResult<Vec<LibrarianRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {LIBRARIAN_COLUMNS} FROM librarians ORDER BY created_at"
            ))
            .map_err(storage)?;
        let rows = stmt.query_map([], librarian_from_row).map_err(storage)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(storage)
    }

    async fn delete_librarian(&self, id: LibrarianId) -> BackendResult<bool> {
        let removed = self
            .conn()
            .execute("DELETE FROM librarians WHERE id = ?1", [id.to_string()])
            .map_err(storage)?;
        Ok(removed > 0)
    }

    async fn bump_librarian_count(&self) -> BackendResult<String> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(storage)?;
        let previous: Option<String> = tx
            .query_row(
                "SELECT librarians_count FROM admin_stats WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage)?
            .flatten();
        let next = increment_count_label(previous.as_deref());
        tx.execute(
            "INSERT INTO admin_stats (id, librarians_count) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET librarians_count = excluded.librarians_count",
            [&next],
        )
        .map_err(storage)?;
        tx.commit().map_err(storage)?;
        Ok(next)
    }

    async fn stats(&self) -> BackendResult<AdminStats> {
        let conn = self.conn();
        let books_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
            .map_err(storage)?;
        let (librarians_count, revenue) = conn
            .query_row(
                "SELECT librarians_count, revenue FROM admin_stats WHERE id = 1",
                [],
                |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()
            .map_err(storage)?
            .unwrap_or_default();
        Ok(AdminStats {
            books_count: u64::try_from(books_count).unwrap_or(0),
            librarians_count: librarians_count.unwrap_or_else(|| "0".into()),
            members_count: 0,
            revenue: revenue.unwrap_or_else(|| "$0".into()),
        })
    }
}
