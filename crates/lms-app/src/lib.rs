//! Library client command-line front end.
//!
//! Usage:
//!   # Durable mode (SQLite + images under the data dir)
//!   lms sign-up --name Asha --email asha@library.org --password ******** --role admin
//!   lms book add --isbn 9780141439518 --title "Pride and Prejudice" --author "Jane Austen"
//!   lms status
//!
//!   # In-memory mode (ephemeral)
//!   lms --ephemeral status

pub mod app;
pub mod backends;
pub mod cli;
pub mod config;

pub use app::App;
pub use backends::Backends;
pub use cli::{Cli, Command};
pub use config::{AppConfig, ConfigError};
