//! Domain layer for the contact store
//!
//! Models, repository ports and the errors they share.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
