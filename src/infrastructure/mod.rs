//! Ambient services shared by the CLI and library callers: layered
//! configuration and tracing setup.

pub mod config;
pub mod logging;
