//! Current-document session: the central initialization protocol and the
//! document commands built on it.

mod session_model;
mod session_service;

pub use session_model::*;
pub use session_service::*;
