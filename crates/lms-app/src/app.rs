//! Runs one CLI command against a session actor and the catalog service.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use lms_client::{
    Catalog, ImageUpload, Router, SessionConfig, SessionHandle, check_sign_in, check_sign_up,
    spawn_session,
};
use lms_types::{BookDraft, LibrarianDraft, LibrarianId, LibrarianRecord, Session};

use crate::backends::Backends;
use crate::cli::{BookArgs, BookCommand, Command, LibrarianArgs, LibrarianCommand};

pub struct App {
    session: SessionHandle,
    catalog: Catalog,
}

/// Turn a failed session operation into a command error.
fn ensure_ok(session: &Session) -> Result<()> {
    match session.last_error_message() {
        Some(message) => bail!(message),
        None => Ok(()),
    }
}

fn describe(session: &Session) -> String {
    match (&session.identity, session.authenticated) {
        (Some(identity), true) if session.role_resolved => {
            format!("signed in as {} ({})", identity.email, session.role)
        }
        (Some(identity), true) => format!("signed in as {} (role unresolved)", identity.email),
        _ => "signed out".to_string(),
    }
}

async fn read_image(path: &Path) -> Result<ImageUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading image {}", path.display()))?;
    Ok(ImageUpload::jpeg(bytes))
}

fn print_librarian(out: &mut dyn Write, l: &LibrarianRecord) -> Result<()> {
    let status = if l.approved { "approved" } else { "pending" };
    writeln!(out, "{}  {:<24} {:<28} {status}", l.id, l.name, l.email)?;
    Ok(())
}

impl App {
    /// Spawn the session actor over `backends`. Must run inside a tokio runtime.
    pub fn start(backends: Backends, config: SessionConfig) -> Self {
        let session = spawn_session(backends.credentials, backends.directory.clone(), config);
        let catalog = Catalog::new(backends.catalog, backends.blobs, backends.directory);
        Self { session, catalog }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Restore any persisted credential, then run `command`, writing results to `out`.
    ///
    /// A restore that ends with an error (an unreachable role directory, say)
    /// is only a warning; the command still runs against whatever session
    /// the restore left behind.
    pub async fn run(&self, command: Command, out: &mut dyn Write) -> Result<()> {
        let current = self.session.bootstrap().await?;
        if let Some(message) = current.last_error_message() {
            tracing::warn!(%message, "session restore incomplete");
        }

        match command {
            Command::Status => {
                let router = Router::new(self.session.subscribe());
                writeln!(out, "{}", describe(&current))?;
                writeln!(out, "screen: {}", router.current())?;
                if let Some(message) = current.last_error_message() {
                    writeln!(out, "warning: {message}")?;
                }
            }
            Command::SignUp {
                name,
                email,
                password,
                role,
            } => {
                check_sign_up(&name, &email, &password)?;
                let session = self.session.sign_up(email.trim(), &password, role).await?;
                ensure_ok(&session)?;
                tracing::info!(%name, %role, "account created");
                writeln!(out, "Welcome, {}. {}", name.trim(), describe(&session))?;
            }
            Command::SignIn { email, password } => {
                check_sign_in(email.trim(), &password)?;
                let session = self.session.sign_in(email.trim(), &password).await?;
                ensure_ok(&session)?;
                writeln!(out, "{}", describe(&session))?;
            }
            Command::SignOut => {
                if !current.authenticated {
                    writeln!(out, "not signed in")?;
                    return Ok(());
                }
                let session = self.session.sign_out().await?;
                ensure_ok(&session)?;
                writeln!(out, "signed out")?;
            }
            Command::Book(BookCommand::Add(args)) => self.add_book(&current, args, out).await?,
            Command::Book(BookCommand::List) => {
                let books = self.catalog.list_books(&current).await?;
                if books.is_empty() {
                    writeln!(out, "no books")?;
                }
                for b in books {
                    writeln!(
                        out,
                        "{:<14} {} by {}  ({}/{} available)",
                        b.isbn, b.title, b.author, b.available_copies, b.total_copies
                    )?;
                }
            }
            Command::Librarian(cmd) => self.librarian(&current, cmd, out).await?,
            Command::Stats => {
                let stats = self.catalog.admin_stats(&current).await?;
                writeln!(out, "books:      {}", stats.books_count)?;
                writeln!(out, "librarians: {}", stats.librarians_count)?;
                writeln!(out, "members:    {}", stats.members_count)?;
                writeln!(out, "revenue:    {}", stats.revenue)?;
            }
        }
        Ok(())
    }

    async fn add_book(&self, session: &Session, args: BookArgs, out: &mut dyn Write) -> Result<()> {
        let cover = match &args.cover {
            Some(path) => Some(read_image(path).await?),
            None => None,
        };
        let draft = BookDraft {
            isbn: args.isbn,
            title: args.title,
            author: args.author,
            genre: args.genre,
            release_date: args.release_date,
            language: args.language,
            pages: args.pages,
            total_copies: args.copies,
            location: args.location,
            summary: args.summary,
        };
        let book = self.catalog.add_book(session, draft, cover).await?;
        writeln!(out, "added {} ({})", book.title, book.isbn)?;
        if let Some(url) = &book.cover_image_url {
            writeln!(out, "cover: {url}")?;
        }
        Ok(())
    }

    async fn librarian(
        &self,
        session: &Session,
        cmd: LibrarianCommand,
        out: &mut dyn Write,
    ) -> Result<()> {
        match cmd {
            LibrarianCommand::Add(args) => {
                let librarian = self.add_librarian(session, args).await?;
                writeln!(out, "added librarian {} ({})", librarian.name, librarian.id)?;
            }
            LibrarianCommand::List { search } => {
                let found = self.catalog.librarians(session, &search).await?;
                if found.is_empty() {
                    writeln!(out, "no librarians")?;
                }
                for l in &found {
                    print_librarian(out, l)?;
                }
            }
            LibrarianCommand::Approve { id } => {
                let librarian = self.catalog.approve_librarian(session, parse_id(&id)?).await?;
                writeln!(out, "approved {}", librarian.name)?;
            }
            LibrarianCommand::Remove { id } => {
                self.catalog.remove_librarian(session, parse_id(&id)?).await?;
                writeln!(out, "removed {id}")?;
            }
        }
        Ok(())
    }

    async fn add_librarian(
        &self,
        session: &Session,
        args: LibrarianArgs,
    ) -> Result<LibrarianRecord> {
        let photo = match &args.photo {
            Some(path) => Some(read_image(path).await?),
            None => None,
        };
        let draft = LibrarianDraft {
            name: args.name,
            designation: args.designation,
            salary: args.salary,
            contact: args.contact,
            email: args.email,
            password: args.password,
        };
        Ok(self.catalog.add_librarian(session, draft, photo).await?)
    }
}

fn parse_id(raw: &str) -> Result<LibrarianId> {
    LibrarianId::parse(raw.trim()).with_context(|| format!("invalid librarian id {raw:?}"))
}
