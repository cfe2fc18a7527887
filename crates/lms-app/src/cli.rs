//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lms_types::Role;

/// Library management client.
#[derive(Parser, Debug)]
#[command(name = "lms")]
#[command(about = "Sign in and manage the library catalog")]
pub struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/lms/config.ron)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory, overriding the config file
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Keep everything in memory; nothing survives this invocation
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Log filter directives, overriding the config file
    #[arg(long, global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show who is signed in and which screen they land on
    Status,

    /// Create an account and sign in
    SignUp {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// admin, librarian, or user
        #[arg(long, default_value_t = Role::User)]
        role: Role,
    },

    /// Sign in with email and password
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// End the current session
    SignOut,

    /// Catalog books
    #[command(subcommand)]
    Book(BookCommand),

    /// Librarian profiles (admin only)
    #[command(subcommand)]
    Librarian(LibrarianCommand),

    /// Admin dashboard counters
    Stats,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum BookCommand {
    /// Add a book (admin only)
    Add(BookArgs),
    /// List all books
    List,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct BookArgs {
    #[arg(long)]
    pub isbn: String,
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub author: String,
    #[arg(long, default_value = "")]
    pub genre: String,
    #[arg(long, default_value = "")]
    pub release_date: String,
    #[arg(long, default_value = "")]
    pub language: String,
    #[arg(long, default_value_t = 0)]
    pub pages: u32,
    #[arg(long, default_value_t = 1)]
    pub copies: u32,
    /// Shelf location
    #[arg(long, default_value = "")]
    pub location: String,
    #[arg(long, default_value = "")]
    pub summary: String,
    /// JPEG cover image to upload
    #[arg(long)]
    pub cover: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum LibrarianCommand {
    /// Add a librarian profile
    Add(LibrarianArgs),
    /// List librarians, optionally filtered by name
    List {
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Approve a librarian by ID
    Approve { id: String },
    /// Remove a librarian by ID
    Remove { id: String },
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct LibrarianArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
    #[arg(long, default_value = "")]
    pub designation: String,
    #[arg(long, default_value = "")]
    pub salary: String,
    #[arg(long, default_value = "")]
    pub contact: String,
    /// JPEG profile photo to upload
    #[arg(long)]
    pub photo: Option<PathBuf>,
}
