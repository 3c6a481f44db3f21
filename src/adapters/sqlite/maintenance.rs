//! Whole-database inspection and destructive maintenance.

use futures::FutureExt;
use tracing::{error, info, warn};

use super::connection::{DatabaseError, DatabaseHandle, DatabaseResult};
use super::migrations::{MigrationError, MigrationManager, LEDGER_TABLE};
use super::schema::BASE_TABLES;
use crate::domain::models::TableRowCount;

/// Tables reported by [`get_database_stats`].
pub const STATS_TABLES: [&str; 5] = ["contacts", "groups", "tags", "messages", "sync_log"];

/// Row counts per content table. A table whose count fails is reported
/// with `rows: None` instead of failing the whole report.
pub async fn get_database_stats(db: &DatabaseHandle) -> Vec<TableRowCount> {
    let mut stats = Vec::with_capacity(STATS_TABLES.len());
    for table in STATS_TABLES {
        let rows = match db.get_table_count(table).await {
            Ok(count) => Some(count),
            Err(err) => {
                error!(table, error = %err, "Error getting row count");
                None
            }
        };
        stats.push(TableRowCount {
            table: table.to_string(),
            rows,
        });
    }
    stats
}

/// Whether every base table exists.
pub async fn verify_schema(db: &DatabaseHandle) -> DatabaseResult<bool> {
    for table in BASE_TABLES {
        if !db.table_exists(table).await? {
            error!(table, "Required table missing");
            return Ok(false);
        }
    }
    info!("Database schema verification passed");
    Ok(true)
}

/// Highest applied integer version, or 0 when nothing is applied or the
/// ledger cannot be read.
pub async fn get_schema_version(manager: &MigrationManager) -> u64 {
    match manager.applied_versions().await {
        Ok(applied) => applied
            .keys()
            .filter_map(|version| version.parse::<u64>().ok())
            .max()
            .unwrap_or(0),
        Err(err) => {
            warn!(error = %err, "Could not get schema version");
            0
        }
    }
}

/// Drop every base table and the ledger. All data is lost.
pub async fn drop_all_tables(db: &DatabaseHandle) -> DatabaseResult<()> {
    warn!("Dropping all database tables");
    db.transaction(|db| {
        async move {
            for table in super::schema::DROP_ORDER.iter().chain(&[LEDGER_TABLE]) {
                db.execute(&format!("DROP TABLE IF EXISTS {table}"), &[]).await?;
            }
            Ok::<_, DatabaseError>(())
        }
        .boxed()
    })
    .await?;
    warn!("All tables dropped");
    Ok(())
}

/// Drop everything and re-run all registered migrations.
pub async fn reset_database(manager: &MigrationManager) -> Result<Vec<String>, MigrationError> {
    warn!("Resetting database");
    drop_all_tables(manager.database()).await?;
    manager.apply_pending().await
}
