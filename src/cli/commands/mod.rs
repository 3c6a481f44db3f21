//! CLI command implementations.

pub mod info;
pub mod reset;
pub mod rollback;
pub mod run;
pub mod status;
