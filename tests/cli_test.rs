//! CLI parsing and command behavior against real databases.

mod common;

use clap::Parser;
use tgcontacts::cli::commands::{info, rollback, run, status};
use tgcontacts::cli::prompt::ScriptedPrompter;
use tgcontacts::cli::{load_config, Cli, CommandContext, Commands, ConfirmArgs};

fn file_context(path: &std::path::Path) -> CommandContext {
    let cli = Cli::try_parse_from(["tgcontacts", "--database", &path.display().to_string(), "status"]).unwrap();
    let config = load_config(&cli).expect("config should load from defaults");
    CommandContext::new(config)
}

#[test]
fn test_parse_every_subcommand() {
    for (arg, expected) in [("status", "Status"), ("run", "Run"), ("info", "Info")] {
        let cli = Cli::try_parse_from(["tgcontacts", arg]).unwrap();
        assert_eq!(format!("{:?}", cli.command), expected);
    }

    let cli = Cli::try_parse_from(["tgcontacts", "rollback", "--yes"]).unwrap();
    assert!(matches!(cli.command, Commands::Rollback(ConfirmArgs { yes: true })));

    let cli = Cli::try_parse_from(["tgcontacts", "reset"]).unwrap();
    assert!(matches!(cli.command, Commands::Reset(ConfirmArgs { yes: false })));
}

#[test]
fn test_unknown_command_is_rejected() {
    assert!(Cli::try_parse_from(["tgcontacts", "migrate"]).is_err());
    assert!(Cli::try_parse_from(["tgcontacts"]).is_err());
}

#[test]
fn test_database_flag_overrides_config() {
    let cli = Cli::try_parse_from(["tgcontacts", "info", "-d", ":memory:"]).unwrap();
    let config = load_config(&cli).unwrap();
    assert_eq!(config.database.path, ":memory:");
}

#[tokio::test]
async fn test_run_then_status_then_info() {
    let (_dir, path) = common::temp_db_path();
    let ctx = file_context(&path);

    let before = status::status(&ctx).await.unwrap();
    assert_eq!((before.total, before.applied, before.pending), (1, 0, 1));

    let ran = run::run(&ctx, true).await.unwrap();
    assert_eq!(ran.applied, vec!["001"]);

    let after = status::status(&ctx).await.unwrap();
    assert_eq!((after.total, after.applied, after.pending), (1, 1, 0));

    let summary = info::info(&ctx).await.unwrap();
    assert_eq!(summary.schema_version, 1);
    assert!(summary.size_bytes.is_some());

    ctx.db.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_rollback_with_yes_skips_prompt() {
    let (_dir, path) = common::temp_db_path();
    let ctx = file_context(&path);
    run::run(&ctx, true).await.unwrap();

    let mut prompter = ScriptedPrompter::default();
    let result = rollback::rollback(&ctx, &ConfirmArgs { yes: true }, &mut prompter)
        .await
        .unwrap();

    assert!(prompter.asked.is_empty());
    assert!(matches!(result, rollback::RollbackOutput::RolledBack { .. }));

    let after = status::status(&ctx).await.unwrap();
    assert_eq!(after.applied, 0);
}

#[tokio::test]
async fn test_json_rollback_requires_yes() {
    let cli = Cli::try_parse_from(["tgcontacts", "-d", ":memory:", "--json", "rollback"]).unwrap();
    let ctx = CommandContext::new(load_config(&cli).unwrap());

    let err = rollback::execute(&ctx, ConfirmArgs::default(), true).await.unwrap_err();
    assert!(err.to_string().contains("--yes"));
}
