//! SQLite storage for the contact store: the connection handle, the
//! migration engine with its bootstrap schema, and the repositories.

pub mod connection;
pub mod contact_repository;
pub mod maintenance;
pub mod migrations;
pub mod schema;
pub mod tag_repository;

pub use connection::{
    quote_identifier, DatabaseError, DatabaseHandle, DatabaseLocation, DatabaseResult, HandleConfig, SqlValue,
};
pub use contact_repository::SqliteContactRepository;
pub use maintenance::{drop_all_tables, get_database_stats, get_schema_version, reset_database, verify_schema};
pub use migrations::{builtin_migrations, compare_versions, Migration, MigrationError, MigrationManager, SqlMigration};
pub use schema::InitialSchema;
pub use tag_repository::SqliteTagRepository;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::domain::models::{DatabaseConfig, LedgerReadPolicy};
use crate::domain::DomainError;

/// `SQLite`'s `CURRENT_TIMESTAMP` layout, optionally with fractional seconds.
const SQLITE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Parse a timestamp column. Accepts RFC 3339 as well as the text `SQLite`
/// writes for `CURRENT_TIMESTAMP` (UTC, no offset).
pub fn parse_timestamp(s: &str) -> DatabaseResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, SQLITE_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Decode(format!("invalid timestamp '{s}': {e}")))
}

/// Whether the error is a UNIQUE or PRIMARY KEY constraint violation.
pub fn is_unique_violation(err: &DatabaseError) -> bool {
    match err {
        DatabaseError::QueryFailed(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
        _ => false,
    }
}

impl From<DatabaseError> for DomainError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Decode(msg) => Self::SerializationError(msg),
            other => Self::DatabaseError(other.to_string()),
        }
    }
}

/// Build a handle from the database section of the configuration.
pub fn database_from_config(config: &DatabaseConfig) -> DatabaseHandle {
    DatabaseHandle::with_config(
        DatabaseLocation::parse(&config.path),
        HandleConfig {
            open_timeout: Duration::from_secs(config.open_timeout_secs),
            busy_timeout: Duration::from_secs(config.busy_timeout_secs),
        },
    )
}

/// Connect and bring the schema up to date with the built-in migrations.
pub async fn initialize_database(
    db: Arc<DatabaseHandle>,
    policy: LedgerReadPolicy,
) -> Result<MigrationManager, MigrationError> {
    db.connect().await?;
    let manager = MigrationManager::with_builtin_migrations(db)?.with_ledger_read_policy(policy);
    manager.apply_pending().await?;
    Ok(manager)
}

/// In-memory database with every built-in migration applied.
pub async fn create_migrated_test_db() -> Result<Arc<DatabaseHandle>, MigrationError> {
    let db = Arc::new(DatabaseHandle::in_memory());
    initialize_database(Arc::clone(&db), LedgerReadPolicy::Strict).await?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc = parse_timestamp("2024-03-05T10:20:30.123456Z").unwrap();
        assert_eq!(rfc.day(), 5);
        assert_eq!(rfc.nanosecond(), 123_456_000);

        let sqlite = parse_timestamp("2024-03-05 10:20:30").unwrap();
        assert_eq!(sqlite.hour(), 10);
        assert_eq!(sqlite.second(), 30);

        assert!(matches!(parse_timestamp("yesterday"), Err(DatabaseError::Decode(_))));
    }

    #[tokio::test]
    async fn test_unique_violation_detection() {
        let db = DatabaseHandle::in_memory();
        db.execute("CREATE TABLE t (name TEXT UNIQUE)", &[]).await.unwrap();
        db.execute("INSERT INTO t VALUES ('a')", &[]).await.unwrap();

        let err = db.execute("INSERT INTO t VALUES ('a')", &[]).await.unwrap_err();
        assert!(is_unique_violation(&err));

        let err = db.execute("INSERT INTO missing VALUES (1)", &[]).await.unwrap_err();
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn test_database_error_into_domain_error() {
        let decode = DomainError::from(DatabaseError::Decode("bad date".to_string()));
        assert!(matches!(decode, DomainError::SerializationError(ref msg) if msg == "bad date"));

        let other = DomainError::from(DatabaseError::TransactionAlreadyOpen);
        assert!(matches!(other, DomainError::DatabaseError(_)));
    }

    #[tokio::test]
    async fn test_create_migrated_test_db() {
        let db = create_migrated_test_db().await.unwrap();
        assert!(verify_schema(&db).await.unwrap());
    }
}
