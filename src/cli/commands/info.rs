//! `info`: file size, row counts and migration summary.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::adapters::sqlite::{get_database_stats, get_schema_version};
use crate::cli::output::table::TableFormatter;
use crate::cli::output::{banner, format_size, output, CommandOutput};
use crate::cli::CommandContext;
use crate::domain::models::{LedgerEntry, TableRowCount};

#[derive(Debug, Serialize)]
pub struct InfoOutput {
    pub database: String,
    /// `None` for in-memory or not-yet-created databases
    pub size_bytes: Option<u64>,
    pub tables: Vec<TableRowCount>,
    pub applied_migrations: i64,
    pub latest_migration: Option<LatestMigration>,
    pub schema_version: u64,
}

#[derive(Debug, Serialize)]
pub struct LatestMigration {
    pub version: String,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

impl From<LedgerEntry> for LatestMigration {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            version: entry.version,
            name: entry.name,
            applied_at: entry.applied_at,
        }
    }
}

impl CommandOutput for InfoOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![banner("DATABASE INFORMATION"), String::new()];

        lines.push(format!("Database: {}", self.database));
        lines.push(match self.size_bytes {
            Some(bytes) => format!("Size: {}", format_size(bytes)),
            None => "Status: Database file does not exist".to_string(),
        });
        lines.push(String::new());

        lines.push("Table Row Counts:".to_string());
        lines.push(TableFormatter::new().format_row_counts(&self.tables));
        lines.push(String::new());

        lines.push(format!("Applied migrations: {}", self.applied_migrations));
        if let Some(latest) = &self.latest_migration {
            lines.push(format!("Latest migration: {} - {}", latest.version, latest.name));
            lines.push(format!("Applied at: {}", latest.applied_at.to_rfc3339()));
        }
        lines.push(format!("Schema version: {}", self.schema_version));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn info(ctx: &CommandContext) -> Result<InfoOutput> {
    // Before connecting, which would create the file.
    let size_bytes = match ctx.db.location().path() {
        Some(path) => tokio::fs::metadata(path).await.ok().map(|m| m.len()),
        None => None,
    };

    ctx.db.connect().await.context("Failed to open database")?;
    let manager = ctx.manager()?;

    Ok(InfoOutput {
        database: ctx.db.location().to_string(),
        size_bytes,
        tables: get_database_stats(&ctx.db).await,
        applied_migrations: manager.applied_count().await?,
        latest_migration: manager.latest_applied().await?.map(LatestMigration::from),
        schema_version: get_schema_version(&manager).await,
    })
}

pub async fn execute(ctx: &CommandContext, json_mode: bool) -> Result<()> {
    let result = info(ctx).await?;
    output(&result, json_mode);
    Ok(())
}
