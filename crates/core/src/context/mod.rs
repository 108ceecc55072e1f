//! Per-form document context tracking.

mod context_manager;
mod context_model;

pub use context_manager::*;
pub use context_model::*;
