//! tgcontacts - local contact store for Telegram
//!
//! A SQLite-backed store for contacts, tags, groups and message history,
//! with a small versioned migration engine that owns the schema.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and repository ports
//! - **Adapters** (`adapters`): the SQLite connection, migrations and repositories
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): the `tgcontacts` migration tool
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tgcontacts::{DatabaseHandle, MigrationManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseHandle::in_memory());
//!     let manager = MigrationManager::with_builtin_migrations(db)?;
//!     manager.apply_pending().await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use adapters::sqlite::{
    initialize_database, DatabaseError, DatabaseHandle, DatabaseLocation, InitialSchema, Migration,
    MigrationError, MigrationManager, SqlMigration, SqliteContactRepository, SqliteTagRepository,
};
pub use domain::models::{
    Config, Contact, DatabaseConfig, LedgerEntry, LedgerReadPolicy, LoggingConfig, MigrationStatus, NewContact,
    NewTag, Tag,
};
pub use domain::ports::{ContactRepository, TagRepository};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
