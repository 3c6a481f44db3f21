//! `rollback`: revert the most recently applied migration.

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::cli::output::{banner, output, success_mark, CommandOutput};
use crate::cli::prompt::{confirm_rollback, Prompter, TermPrompter};
use crate::cli::{CommandContext, ConfirmArgs};
use crate::domain::models::LedgerEntry;

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RollbackOutput {
    NothingToRollBack,
    Cancelled { version: String, name: String },
    RolledBack { version: String, name: String },
}

impl CommandOutput for RollbackOutput {
    fn to_human(&self) -> String {
        let body = match self {
            Self::NothingToRollBack => "No migrations to roll back.".to_string(),
            Self::Cancelled { .. } => "Rollback cancelled.".to_string(),
            Self::RolledBack { version, name } => {
                format!("{} Rolled back migration {version} - {name}", success_mark())
            }
        };
        format!("{}\n\n{body}", banner("ROLLBACK MIGRATION"))
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn rollback(ctx: &CommandContext, args: &ConfirmArgs, prompter: &mut dyn Prompter) -> Result<RollbackOutput> {
    ctx.db.connect().await.context("Failed to open database")?;
    let manager = ctx.manager()?;

    let Some(LedgerEntry { version, name, .. }) = manager.latest_applied().await? else {
        return Ok(RollbackOutput::NothingToRollBack);
    };

    if !args.yes {
        eprintln!("Rolling back migration: {version} - {name}");
        if !confirm_rollback(prompter).context("Failed to read confirmation")? {
            return Ok(RollbackOutput::Cancelled { version, name });
        }
    }

    match manager.rollback_last().await? {
        Some(entry) => Ok(RollbackOutput::RolledBack {
            version: entry.version,
            name: entry.name,
        }),
        None => bail!("Migration ledger changed while rolling back"),
    }
}

pub async fn execute(ctx: &CommandContext, args: ConfirmArgs, json_mode: bool) -> Result<()> {
    if json_mode && !args.yes {
        bail!("Rollback needs confirmation; pass --yes together with --json");
    }
    let result = rollback(ctx, &args, &mut TermPrompter::new()).await?;
    output(&result, json_mode);
    Ok(())
}
