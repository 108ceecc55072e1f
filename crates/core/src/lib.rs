//! Domain layer for FormDesk: document model, dual-tier storage services,
//! per-form document context, the current-document session and cloud sync.

pub mod constants;
pub mod context;
pub mod documents;
pub mod errors;
pub mod session;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_support;

pub use errors::{Error, Result};
