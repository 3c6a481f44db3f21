//! Command-line interface for inspecting and migrating the contact database.

pub mod commands;
pub mod output;
pub mod prompt;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;

pub use types::{Cli, Commands, ConfirmArgs};

use crate::adapters::sqlite::{database_from_config, DatabaseHandle, MigrationManager};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

/// Everything a command needs: the effective configuration and the
/// database handle built from it.
pub struct CommandContext {
    pub config: Config,
    pub db: Arc<DatabaseHandle>,
}

impl CommandContext {
    pub fn new(config: Config) -> Self {
        let db = Arc::new(database_from_config(&config.database));
        Self { config, db }
    }

    /// A manager over the built-in migrations, honoring the configured
    /// ledger read policy.
    pub fn manager(&self) -> Result<MigrationManager> {
        Ok(MigrationManager::with_builtin_migrations(Arc::clone(&self.db))?
            .with_ledger_read_policy(self.config.migrations.ledger_read_policy))
    }
}

/// Load configuration per the CLI flags. `--database` wins over every
/// other source.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    if let Some(path) = &cli.database {
        config.database.path.clone_from(path);
        ConfigLoader::validate(&config).context("Invalid --database value")?;
    }

    Ok(config)
}

/// Report a failed command and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({ "success": false, "error": format!("{err:#}") });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("\n{} {} {err:#}\n", output::failure_mark(), style("Error:").red().bold());
    }
    std::process::exit(1)
}
