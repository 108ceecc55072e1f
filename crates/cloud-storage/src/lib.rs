//! REST adapter for the cloud document store: folder listing, upload,
//! download and delete over bearer-authenticated HTTP.

mod client;
mod error;
mod token;
mod types;

pub use client::CloudStorageClient;
pub use error::{CloudStorageError, Result};
pub use token::TokenStore;
pub use types::{ApiErrorResponse, FileEntry, FileListResponse};
