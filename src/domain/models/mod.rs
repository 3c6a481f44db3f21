pub mod config;
pub mod contact;
pub mod migration;
pub mod tag;

pub use config::{Config, DatabaseConfig, LedgerReadPolicy, LoggingConfig, MigrationsConfig};
pub use contact::{Contact, NewContact};
pub use migration::{LedgerEntry, MigrationStatus, TableRowCount};
pub use tag::{NewTag, Tag};
