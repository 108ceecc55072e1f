//! Documents domain: model, dual-tier repository contract and form-scoped storage.

mod documents_model;
mod documents_scope;
mod documents_service;
mod documents_traits;

pub use documents_model::*;
pub use documents_scope::*;
pub use documents_service::*;
pub use documents_traits::*;
