//! `reset`: drop everything and re-run all migrations.

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::adapters::sqlite::reset_database;
use crate::cli::output::progress::{create_spinner_with_message, hidden_spinner, ProgressBarExt};
use crate::cli::output::{banner, output, success_mark, CommandOutput};
use crate::cli::prompt::{confirm_reset, Prompter, TermPrompter};
use crate::cli::{CommandContext, ConfirmArgs};

#[derive(Debug, Serialize)]
pub struct ResetOutput {
    pub reset: bool,
    pub applied: Vec<String>,
}

impl CommandOutput for ResetOutput {
    fn to_human(&self) -> String {
        let body = if self.reset {
            format!("{} Database reset complete!", success_mark())
        } else {
            "Reset cancelled.".to_string()
        };
        format!("{}\n\n{body}", banner("RESET DATABASE"))
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn reset(
    ctx: &CommandContext,
    args: &ConfirmArgs,
    prompter: &mut dyn Prompter,
    json_mode: bool,
) -> Result<ResetOutput> {
    if !args.yes {
        eprintln!("WARNING: This will DELETE ALL DATA in the database!");
        eprintln!("All tables will be dropped and recreated.\n");
        if !confirm_reset(prompter).context("Failed to read confirmation")? {
            return Ok(ResetOutput {
                reset: false,
                applied: Vec::new(),
            });
        }
    }

    ctx.db.connect().await.context("Failed to open database")?;
    let manager = ctx.manager()?;

    let spinner = if json_mode {
        hidden_spinner()
    } else {
        create_spinner_with_message("Resetting database")
    };

    match reset_database(&manager).await {
        Ok(applied) => {
            spinner.finish_success("Schema recreated");
            Ok(ResetOutput { reset: true, applied })
        }
        Err(err) => {
            spinner.finish_error("Reset failed");
            bail!("Database reset failed. Check logs for details: {err}")
        }
    }
}

pub async fn execute(ctx: &CommandContext, args: ConfirmArgs, json_mode: bool) -> Result<()> {
    if json_mode && !args.yes {
        bail!("Reset needs confirmation; pass --yes together with --json");
    }
    let result = reset(ctx, &args, &mut TermPrompter::new(), json_mode).await?;
    output(&result, json_mode);
    Ok(())
}
