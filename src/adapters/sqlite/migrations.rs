//! Versioned schema migrations tracked in the `_migrations` ledger.
//!
//! The ledger records what has run; registered [`Migration`]s describe what
//! each version does. [`MigrationManager`] reconciles the two and applies
//! the difference in ascending version order, one transaction per
//! migration.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::FutureExt;
use sqlx::FromRow;
use thiserror::Error;
use tracing::{error, info, warn};

use super::connection::{DatabaseError, DatabaseHandle, DatabaseResult};
use super::parse_timestamp;
use super::schema::InitialSchema;
use crate::domain::models::{LedgerEntry, LedgerReadPolicy, MigrationStatus};

/// Name of the ledger table.
pub const LEDGER_TABLE: &str = "_migrations";

const CREATE_LEDGER_SQL: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    version TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    checksum TEXT
)";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration version {0} is already registered")]
    DuplicateVersion(String),
    #[error("Failed to apply migration {version}: {source}")]
    Apply {
        version: String,
        #[source]
        source: DatabaseError,
    },
    #[error("Failed to revert migration {version}: {source}")]
    Revert {
        version: String,
        #[source]
        source: DatabaseError,
    },
    #[error("Failed to read migration ledger: {0}")]
    LedgerRead(#[source] DatabaseError),
    #[error("Failed to write migration ledger: {0}")]
    LedgerWrite(#[source] DatabaseError),
    #[error("Ledger references migration {0}, which is not registered")]
    UnknownVersion(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// One versioned, reversible schema change.
///
/// `apply` must be safe to re-run from scratch: a failed run leaves no
/// ledger row, so the next run starts the same migration again.
#[async_trait]
pub trait Migration: Send + Sync {
    fn version(&self) -> &str;

    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn apply(&self, db: &DatabaseHandle) -> DatabaseResult<()>;

    async fn revert(&self, db: &DatabaseHandle) -> DatabaseResult<()>;
}

/// A migration expressed as plain SQL scripts.
#[derive(Debug, Clone)]
pub struct SqlMigration {
    pub version: String,
    pub name: String,
    pub description: String,
    pub up: String,
    pub down: String,
}

impl SqlMigration {
    pub fn new(version: impl Into<String>, name: impl Into<String>, up: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            name: name.into(),
            description: String::new(),
            up: up.into(),
            down: String::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_down(mut self, down: impl Into<String>) -> Self {
        self.down = down.into();
        self
    }
}

#[async_trait]
impl Migration for SqlMigration {
    fn version(&self) -> &str {
        &self.version
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn apply(&self, db: &DatabaseHandle) -> DatabaseResult<()> {
        db.execute_batch(&self.up).await?;
        Ok(())
    }

    async fn revert(&self, db: &DatabaseHandle) -> DatabaseResult<()> {
        if self.down.trim().is_empty() {
            return Ok(());
        }
        db.execute_batch(&self.down).await?;
        Ok(())
    }
}

/// Every migration this build knows about, in version order.
pub fn builtin_migrations() -> Vec<Box<dyn Migration>> {
    vec![Box::new(InitialSchema)]
}

/// Order two versions numerically when both are integers, otherwise
/// lexicographically.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}

#[derive(FromRow)]
struct LedgerRow {
    version: String,
    name: String,
    description: Option<String>,
    applied_at: String,
    checksum: Option<String>,
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = DatabaseError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            applied_at: parse_timestamp(&row.applied_at)?,
            version: row.version,
            name: row.name,
            description: row.description.unwrap_or_default(),
            checksum: row.checksum,
        })
    }
}

/// Reconciles registered migrations against the ledger.
pub struct MigrationManager {
    db: Arc<DatabaseHandle>,
    migrations: Vec<Box<dyn Migration>>,
    ledger_read_policy: LedgerReadPolicy,
}

impl MigrationManager {
    pub fn new(db: Arc<DatabaseHandle>) -> Self {
        Self {
            db,
            migrations: Vec::new(),
            ledger_read_policy: LedgerReadPolicy::default(),
        }
    }

    /// Manager with [`builtin_migrations`] registered.
    pub fn with_builtin_migrations(db: Arc<DatabaseHandle>) -> Result<Self, MigrationError> {
        let mut manager = Self::new(db);
        for migration in builtin_migrations() {
            manager.register(migration)?;
        }
        Ok(manager)
    }

    #[must_use]
    pub const fn with_ledger_read_policy(mut self, policy: LedgerReadPolicy) -> Self {
        self.ledger_read_policy = policy;
        self
    }

    pub const fn database(&self) -> &Arc<DatabaseHandle> {
        &self.db
    }

    pub const fn ledger_read_policy(&self) -> LedgerReadPolicy {
        self.ledger_read_policy
    }

    /// Registered migrations in execution order.
    pub fn migrations(&self) -> impl Iterator<Item = &dyn Migration> + '_ {
        self.migrations.iter().map(|m| &**m as &dyn Migration)
    }

    pub fn find(&self, version: &str) -> Option<&dyn Migration> {
        self.migrations().find(|m| m.version() == version)
    }

    pub fn register(&mut self, migration: Box<dyn Migration>) -> Result<(), MigrationError> {
        if self.find(migration.version()).is_some() {
            return Err(MigrationError::DuplicateVersion(migration.version().to_string()));
        }
        self.migrations.push(migration);
        self.migrations
            .sort_by(|a, b| compare_versions(a.version(), b.version()));
        Ok(())
    }

    pub async fn ensure_ledger(&self) -> Result<(), MigrationError> {
        self.db
            .execute(CREATE_LEDGER_SQL, &[])
            .await
            .map_err(MigrationError::LedgerWrite)
            .map(|_| ())
    }

    /// Versions recorded in the ledger with their `applied_at`.
    ///
    /// A missing ledger table means nothing has been applied and yields an
    /// empty map. Any other failure is reported as
    /// [`MigrationError::LedgerRead`], regardless of the read policy.
    pub async fn applied_versions(&self) -> Result<BTreeMap<String, DateTime<Utc>>, MigrationError> {
        if !self.ledger_exists().await? {
            return Ok(BTreeMap::new());
        }

        let rows = self
            .db
            .fetch_all("SELECT version, applied_at FROM _migrations ORDER BY version", &[])
            .await
            .map_err(MigrationError::LedgerRead)?;

        rows.iter()
            .map(|row| -> DatabaseResult<(String, DateTime<Utc>)> {
                let version: String = sqlx::Row::try_get(row, "version")?;
                let applied_at: String = sqlx::Row::try_get(row, "applied_at")?;
                Ok((version, parse_timestamp(&applied_at)?))
            })
            .collect::<DatabaseResult<_>>()
            .map_err(MigrationError::LedgerRead)
    }

    async fn applied_versions_per_policy(&self) -> Result<BTreeMap<String, DateTime<Utc>>, MigrationError> {
        match self.applied_versions().await {
            Err(MigrationError::LedgerRead(err)) if self.ledger_read_policy == LedgerReadPolicy::Lenient => {
                warn!(error = %err, "Could not read migration ledger, treating it as empty");
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    async fn ledger_exists(&self) -> Result<bool, MigrationError> {
        self.db
            .table_exists(LEDGER_TABLE)
            .await
            .map_err(MigrationError::LedgerRead)
    }

    pub async fn is_applied(&self, version: &str) -> Result<bool, MigrationError> {
        if !self.ledger_exists().await? {
            return Ok(false);
        }
        let row = self
            .db
            .fetch_one("SELECT version FROM _migrations WHERE version = ?", &[version.into()])
            .await
            .map_err(MigrationError::LedgerRead)?;
        Ok(row.is_some())
    }

    /// Registered migrations without a ledger row, ascending.
    pub async fn pending(&self) -> Result<Vec<&dyn Migration>, MigrationError> {
        let applied = self.applied_versions_per_policy().await?;
        Ok(self
            .migrations()
            .filter(|m| !applied.contains_key(m.version()))
            .collect())
    }

    /// Apply every pending migration in order and return the versions
    /// applied. Stops at the first failure; migrations applied before it
    /// stay applied.
    pub async fn apply_pending(&self) -> Result<Vec<String>, MigrationError> {
        self.ensure_ledger().await?;

        let pending = self.pending().await?;
        if pending.is_empty() {
            info!("No pending migrations to run");
            return Ok(Vec::new());
        }

        info!(count = pending.len(), "Found pending migrations to run");

        let mut applied = Vec::with_capacity(pending.len());
        for migration in pending {
            self.apply_one(migration).await?;
            applied.push(migration.version().to_string());
        }

        info!(count = applied.len(), "All migrations completed successfully");
        Ok(applied)
    }

    /// Apply pending migrations, reporting only success or failure.
    /// Failures are logged with the version that failed.
    pub async fn run_pending(&self) -> bool {
        info!("Starting migration process");
        match self.apply_pending().await {
            Ok(_) => true,
            Err(err) => {
                error!(error = %err, "Migration process failed");
                false
            }
        }
    }

    async fn apply_one(&self, migration: &dyn Migration) -> Result<(), MigrationError> {
        let version = migration.version();
        info!(version, name = migration.name(), "Running migration");

        let result = self
            .db
            .transaction(|db| {
                async move {
                    migration
                        .apply(db)
                        .await
                        .map_err(|source| MigrationError::Apply {
                            version: version.to_string(),
                            source,
                        })?;
                    record_applied(db, migration).await
                }
                .boxed()
            })
            .await;

        match result {
            Ok(()) => {
                info!(version, "✓ Successfully applied migration");
                Ok(())
            }
            Err(err) => {
                error!(version, error = %err, "✗ Failed to apply migration");
                Err(err)
            }
        }
    }

    /// Every registered migration with its applied state, in version order.
    pub async fn status(&self) -> Result<Vec<MigrationStatus>, MigrationError> {
        let applied = self.applied_versions_per_policy().await?;
        Ok(self
            .migrations()
            .map(|m| MigrationStatus {
                version: m.version().to_string(),
                name: m.name().to_string(),
                description: m.description().to_string(),
                applied: applied.contains_key(m.version()),
                applied_at: applied.get(m.version()).copied(),
            })
            .collect())
    }

    /// The most recently applied ledger row. Rows sharing an `applied_at`
    /// are ordered by insertion.
    pub async fn latest_applied(&self) -> Result<Option<LedgerEntry>, MigrationError> {
        if !self.ledger_exists().await? {
            return Ok(None);
        }

        let row = self
            .db
            .fetch_one(
                "SELECT version, name, description, applied_at, checksum FROM _migrations
                 ORDER BY applied_at DESC, rowid DESC LIMIT 1",
                &[],
            )
            .await
            .map_err(MigrationError::LedgerRead)?;

        row.map(|row| {
            LedgerRow::from_row(&row)
                .map_err(DatabaseError::from)
                .and_then(LedgerEntry::try_from)
        })
        .transpose()
        .map_err(MigrationError::LedgerRead)
    }

    pub async fn applied_count(&self) -> Result<i64, MigrationError> {
        if !self.ledger_exists().await? {
            return Ok(0);
        }
        self.db
            .get_table_count(LEDGER_TABLE)
            .await
            .map_err(MigrationError::LedgerRead)
    }

    /// Revert the most recently applied migration and drop its ledger row.
    ///
    /// Returns `Ok(None)` when nothing is applied. If `revert` fails the
    /// ledger row is kept.
    pub async fn rollback_last(&self) -> Result<Option<LedgerEntry>, MigrationError> {
        let Some(entry) = self.latest_applied().await? else {
            warn!("No migrations to roll back");
            return Ok(None);
        };

        let Some(migration) = self.find(&entry.version) else {
            error!(version = %entry.version, "Migration not found in registered migrations");
            return Err(MigrationError::UnknownVersion(entry.version));
        };

        let version = entry.version.as_str();
        warn!(version, name = migration.name(), "Rolling back migration");

        self.db
            .transaction(|db| {
                async move {
                    migration
                        .revert(db)
                        .await
                        .map_err(|source| MigrationError::Revert {
                            version: version.to_string(),
                            source,
                        })?;
                    db.execute("DELETE FROM _migrations WHERE version = ?", &[version.into()])
                        .await
                        .map_err(MigrationError::LedgerWrite)?;
                    Ok::<_, MigrationError>(())
                }
                .boxed()
            })
            .await
            .inspect_err(|err: &MigrationError| {
                error!(version, error = %err, "✗ Failed to roll back migration");
            })?;

        info!(version, "✓ Successfully rolled back migration");
        Ok(Some(entry))
    }
}

async fn record_applied(db: &DatabaseHandle, migration: &dyn Migration) -> Result<(), MigrationError> {
    let applied_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    db.execute(
        "INSERT INTO _migrations (version, name, description, applied_at) VALUES (?, ?, ?, ?)",
        &[
            migration.version().into(),
            migration.name().into(),
            migration.description().into(),
            applied_at.into(),
        ],
    )
    .await
    .map_err(MigrationError::LedgerWrite)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::adapters::sqlite::DatabaseLocation;

    fn table_migration(version: &str, table: &str) -> Box<dyn Migration> {
        Box::new(
            SqlMigration::new(version, format!("create_{table}"), format!("CREATE TABLE IF NOT EXISTS {table} (id INTEGER)"))
                .with_down(format!("DROP TABLE IF EXISTS {table}")),
        )
    }

    fn manager() -> MigrationManager {
        MigrationManager::new(Arc::new(DatabaseHandle::in_memory()))
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("001", "002"), Ordering::Less);
        assert_eq!(compare_versions("10", "9"), Ordering::Greater);
        assert_eq!(compare_versions("006", "006"), Ordering::Equal);
        assert_eq!(compare_versions("a", "b"), Ordering::Less);
    }

    #[test]
    fn test_register_keeps_version_order() {
        let mut manager = manager();
        manager.register(table_migration("002", "b")).unwrap();
        manager.register(table_migration("001", "a")).unwrap();
        manager.register(table_migration("006", "f")).unwrap();

        let versions: Vec<_> = manager.migrations().map(|m| m.version().to_string()).collect();
        assert_eq!(versions, vec!["001", "002", "006"]);
    }

    #[test]
    fn test_register_rejects_duplicate_version() {
        let mut manager = manager();
        manager.register(table_migration("001", "a")).unwrap();
        let result = manager.register(table_migration("001", "b"));
        assert!(matches!(result, Err(MigrationError::DuplicateVersion(v)) if v == "001"));
    }

    proptest! {
        #[test]
        fn test_registration_order_is_irrelevant(mut versions in prop::collection::btree_set(0u16..500, 1..20)
            .prop_map(|set| set.into_iter().map(|v| format!("{v:03}")).collect::<Vec<_>>())
            .prop_shuffle())
        {
            let mut manager = manager();
            for version in &versions {
                manager.register(table_migration(version, &format!("t{version}"))).unwrap();
            }

            versions.sort_by(|a, b| compare_versions(a, b));
            let registered: Vec<_> = manager.migrations().map(|m| m.version().to_string()).collect();
            prop_assert_eq!(registered, versions);
        }
    }

    #[tokio::test]
    async fn test_ensure_ledger_is_repeatable() {
        let manager = manager();
        manager.ensure_ledger().await.unwrap();
        manager.ensure_ledger().await.unwrap();
        assert!(manager.database().table_exists(LEDGER_TABLE).await.unwrap());
    }

    #[tokio::test]
    async fn test_applied_versions_without_ledger_is_empty() {
        let manager = manager();
        assert!(manager.applied_versions().await.unwrap().is_empty());
        assert!(!manager.is_applied("001").await.unwrap());
    }

    #[tokio::test]
    async fn test_apply_pending_records_ledger_rows() {
        let mut manager = manager();
        manager.register(table_migration("002", "b")).unwrap();
        manager.register(table_migration("001", "a")).unwrap();

        let applied = manager.apply_pending().await.unwrap();
        assert_eq!(applied, vec!["001", "002"]);

        assert!(manager.is_applied("001").await.unwrap());
        assert!(manager.is_applied("002").await.unwrap());
        assert_eq!(manager.applied_count().await.unwrap(), 2);

        let again = manager.apply_pending().await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_failed_apply_leaves_no_ledger_row() {
        let mut manager = manager();
        manager.register(table_migration("001", "a")).unwrap();
        manager
            .register(Box::new(SqlMigration::new(
                "002",
                "broken",
                "CREATE TABLE half_done (id INTEGER); INSERT INTO no_such_table VALUES (1);",
            )))
            .unwrap();
        manager.register(table_migration("003", "c")).unwrap();

        assert!(!manager.run_pending().await);

        assert!(manager.is_applied("001").await.unwrap());
        assert!(!manager.is_applied("002").await.unwrap());
        assert!(!manager.is_applied("003").await.unwrap());

        let db = manager.database();
        assert!(!db.table_exists("half_done").await.unwrap(), "partial apply should roll back");
        assert!(!db.table_exists("c").await.unwrap(), "later migrations are not attempted");
    }

    /// Commits halfway through, then fails.
    struct CommitsMidway;

    #[async_trait]
    impl Migration for CommitsMidway {
        fn version(&self) -> &str {
            "002"
        }

        fn name(&self) -> &str {
            "commits_midway"
        }

        async fn apply(&self, db: &DatabaseHandle) -> DatabaseResult<()> {
            db.execute("CREATE TABLE first_half (id INTEGER)", &[]).await?;
            db.commit().await?;
            db.execute("INSERT INTO no_such_table VALUES (1)", &[]).await?;
            Ok(())
        }

        async fn revert(&self, _db: &DatabaseHandle) -> DatabaseResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_commit_inside_apply_does_not_escape_transaction() {
        let mut manager = manager();
        manager.register(table_migration("001", "a")).unwrap();
        manager.register(Box::new(CommitsMidway)).unwrap();

        assert!(!manager.run_pending().await);

        assert!(!manager.database().table_exists("first_half").await.unwrap());
        let status = manager.status().await.unwrap();
        assert!(status[0].applied);
        assert!(!status[1].applied, "failed migration stays pending");
    }

    #[tokio::test]
    async fn test_ensure_ledger_leaves_caller_transaction_open() {
        let manager = manager();
        let db = manager.database();
        db.execute("CREATE TABLE t (id INTEGER)", &[]).await.unwrap();

        db.begin().await.unwrap();
        db.execute("INSERT INTO t VALUES (1)", &[]).await.unwrap();
        manager.ensure_ledger().await.unwrap();
        assert!(db.in_transaction().await);
        db.rollback().await.unwrap();

        assert_eq!(db.get_table_count("t").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_ledger_reports_ledger_read() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let db = DatabaseHandle::new(DatabaseLocation::File(dir.path().to_path_buf()));
        let manager = MigrationManager::new(Arc::new(db));

        assert!(matches!(manager.is_applied("001").await, Err(MigrationError::LedgerRead(_))));
        assert!(matches!(manager.latest_applied().await, Err(MigrationError::LedgerRead(_))));
        assert!(matches!(manager.applied_count().await, Err(MigrationError::LedgerRead(_))));
    }

    #[tokio::test]
    async fn test_rollback_last_reverts_newest() {
        let mut manager = manager();
        manager.register(table_migration("001", "a")).unwrap();
        manager.register(table_migration("002", "b")).unwrap();
        assert!(manager.run_pending().await);

        let rolled_back = manager.rollback_last().await.unwrap().unwrap();
        assert_eq!(rolled_back.version, "002");
        assert!(!manager.database().table_exists("b").await.unwrap());
        assert!(manager.database().table_exists("a").await.unwrap());
        assert!(!manager.is_applied("002").await.unwrap());
    }

    #[tokio::test]
    async fn test_rollback_with_empty_ledger() {
        let manager = manager();
        assert!(manager.rollback_last().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rollback_tie_break_uses_insertion_order() {
        let manager = manager();
        manager.ensure_ledger().await.unwrap();
        let db = manager.database();
        for version in ["002", "001"] {
            db.execute(
                "INSERT INTO _migrations (version, name, applied_at) VALUES (?, 'x', '2024-01-01T00:00:00.000000Z')",
                &[version.into()],
            )
            .await
            .unwrap();
        }

        let latest = manager.latest_applied().await.unwrap().unwrap();
        assert_eq!(latest.version, "001");
    }

    #[tokio::test]
    async fn test_rollback_of_unregistered_version_fails() {
        let manager = manager();
        manager.ensure_ledger().await.unwrap();
        manager
            .database()
            .execute(
                "INSERT INTO _migrations (version, name, applied_at) VALUES ('042', 'ghost', '2024-01-01 00:00:00')",
                &[],
            )
            .await
            .unwrap();

        let result = manager.rollback_last().await;
        assert!(matches!(result, Err(MigrationError::UnknownVersion(v)) if v == "042"));
        assert!(manager.is_applied("042").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_revert_keeps_ledger_row() {
        let mut manager = manager();
        manager
            .register(Box::new(
                SqlMigration::new("001", "bad_down", "CREATE TABLE a (id INTEGER)")
                    .with_down("DROP TABLE a; DROP TABLE no_such_table;"),
            ))
            .unwrap();
        assert!(manager.run_pending().await);

        let result = manager.rollback_last().await;
        assert!(matches!(result, Err(MigrationError::Revert { .. })));
        assert!(manager.is_applied("001").await.unwrap());
        assert!(manager.database().table_exists("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_status_reports_every_registered_migration() {
        let mut manager = manager();
        manager.register(table_migration("001", "a")).unwrap();
        assert!(manager.run_pending().await);
        manager.register(table_migration("002", "b")).unwrap();

        let status = manager.status().await.unwrap();
        assert_eq!(status.len(), 2);
        assert!(status[0].applied);
        assert!(status[0].applied_at.is_some());
        assert!(!status[1].applied);
        assert!(status[1].applied_at.is_none());
    }

    #[tokio::test]
    async fn test_ledger_read_policy() {
        let manager = manager().with_ledger_read_policy(LedgerReadPolicy::Strict);
        // A ledger whose applied_at cannot be parsed
        manager.ensure_ledger().await.unwrap();
        manager
            .database()
            .execute("INSERT INTO _migrations (version, name, applied_at) VALUES ('001', 'x', 'garbage')", &[])
            .await
            .unwrap();

        assert!(matches!(manager.status().await, Err(MigrationError::LedgerRead(_))));

        let lenient = MigrationManager::new(Arc::clone(manager.database()))
            .with_ledger_read_policy(LedgerReadPolicy::Lenient);
        assert!(lenient.status().await.unwrap().is_empty());
        assert!(matches!(lenient.applied_versions().await, Err(MigrationError::LedgerRead(_))));
    }
}
