//! `run`: apply every pending migration.

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::cli::output::progress::{create_spinner_with_message, hidden_spinner, ProgressBarExt};
use crate::cli::output::{banner, output, success_mark, CommandOutput};
use crate::cli::CommandContext;

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub success: bool,
    pub applied: Vec<String>,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![banner("RUNNING MIGRATIONS"), String::new()];
        if self.applied.is_empty() {
            lines.push("No pending migrations.".to_string());
        } else {
            for version in &self.applied {
                lines.push(format!("{} Applied migration {version}", success_mark()));
            }
        }
        lines.push(String::new());
        lines.push(format!("{} All migrations completed successfully!", success_mark()));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn run(ctx: &CommandContext, json_mode: bool) -> Result<RunOutput> {
    ctx.db.connect().await.context("Failed to open database")?;
    let manager = ctx.manager()?;

    let spinner = if json_mode {
        hidden_spinner()
    } else {
        create_spinner_with_message("Applying pending migrations")
    };

    match manager.apply_pending().await {
        Ok(applied) => {
            spinner.finish_success(format!("{} migration(s) applied", applied.len()));
            Ok(RunOutput {
                success: true,
                applied,
            })
        }
        Err(err) => {
            spinner.finish_error("Migration failed");
            bail!("Migration failed. Check logs for details: {err}")
        }
    }
}

pub async fn execute(ctx: &CommandContext, json_mode: bool) -> Result<()> {
    let result = run(ctx, json_mode).await?;
    output(&result, json_mode);
    Ok(())
}
