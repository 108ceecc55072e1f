//! SQLite-backed dual-tier document store.

mod model;
mod repository;

pub use model::DocumentDB;
pub use repository::SqliteDocumentRepository;
