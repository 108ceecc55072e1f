//! SQLite persistence for FormDesk documents.
//!
//! Reads go through the r2d2 pool; every write is serialized through the
//! single writer actor so each operation runs in one immediate transaction.

pub mod db;
pub mod documents;
pub mod errors;
pub mod schema;

pub use db::{create_pool, get_connection, init, run_migrations, spawn_writer, DbPool, WriteHandle};
pub use documents::SqliteDocumentRepository;
pub use errors::StorageError;
