//! `status`: every registered migration and whether it is applied.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::output::table::TableFormatter;
use crate::cli::output::{banner, output, CommandOutput};
use crate::cli::CommandContext;
use crate::domain::models::MigrationStatus;

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub migrations: Vec<MigrationStatus>,
    pub total: usize,
    pub applied: usize,
    pub pending: usize,
}

impl StatusOutput {
    pub fn new(migrations: Vec<MigrationStatus>) -> Self {
        let applied = migrations.iter().filter(|m| m.applied).count();
        Self {
            total: migrations.len(),
            pending: migrations.len() - applied,
            applied,
            migrations,
        }
    }
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![banner("MIGRATION STATUS"), String::new()];

        if self.migrations.is_empty() {
            lines.push("No migrations registered.".to_string());
        } else {
            lines.push(TableFormatter::new().format_migrations(&self.migrations));
            for m in self.migrations.iter().filter(|m| !m.description.is_empty()) {
                lines.push(format!("  {}: {}", m.version, m.description));
            }
        }

        let rule = "-".repeat(70);
        lines.push(String::new());
        lines.push(rule.clone());
        lines.push(format!("Total migrations: {}", self.total));
        lines.push(format!("Applied: {} | Pending: {}", self.applied, self.pending));
        lines.push(rule);
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn status(ctx: &CommandContext) -> Result<StatusOutput> {
    ctx.db.connect().await.context("Failed to open database")?;
    let manager = ctx.manager()?;
    let migrations = manager.status().await.context("Failed to read migration status")?;
    Ok(StatusOutput::new(migrations))
}

pub async fn execute(ctx: &CommandContext, json_mode: bool) -> Result<()> {
    let result = status(ctx).await?;
    output(&result, json_mode);
    Ok(())
}
