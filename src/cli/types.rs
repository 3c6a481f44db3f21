//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tgcontacts")]
#[command(about = "Manage the tgcontacts database schema", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Database file to operate on (`:memory:` for a throwaway database)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Configuration file to load instead of tgcontacts.yaml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show migration status
    Status,

    /// Run pending migrations
    Run,

    /// Roll back the last applied migration
    Rollback(ConfirmArgs),

    /// Show database information
    Info,

    /// Reset database (WARNING: deletes all data)
    Reset(ConfirmArgs),
}

#[derive(Args, Debug, Default)]
pub struct ConfirmArgs {
    /// Skip the interactive confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_global_flags() {
        let cli = Cli::try_parse_from(["tgcontacts", "run", "--json", "--database", "/tmp/x.db"]).unwrap();
        assert!(matches!(cli.command, Commands::Run));
        assert!(cli.json);
        assert_eq!(cli.database.as_deref(), Some("/tmp/x.db"));
    }

    #[test]
    fn test_parse_reset_yes() {
        let cli = Cli::try_parse_from(["tgcontacts", "reset", "--yes"]).unwrap();
        assert!(matches!(cli.command, Commands::Reset(ConfirmArgs { yes: true })));
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["tgcontacts", "migrate"]).is_err());
        assert!(Cli::try_parse_from(["tgcontacts"]).is_err());
    }
}
