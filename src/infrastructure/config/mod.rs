//! Layered configuration for tgcontacts.
//!
//! Defaults, then `tgcontacts.yaml`, then `tgcontacts.local.yaml`, then
//! `TGCONTACTS_*` environment variables, merged with figment and checked
//! by [`ConfigLoader::validate`].

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
