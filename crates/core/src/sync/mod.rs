//! Cloud sync: status board, collaborator contracts and the orchestrator.

mod sync_model;
mod sync_orchestrator;
mod sync_status;
mod sync_traits;

pub use sync_model::*;
pub use sync_orchestrator::*;
pub use sync_status::*;
pub use sync_traits::*;
