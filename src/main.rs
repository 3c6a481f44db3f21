//! tgcontacts CLI entry point.

use clap::Parser;

use tgcontacts::cli::{commands, handle_error, load_config, Cli, CommandContext, Commands};
use tgcontacts::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let ctx = CommandContext::new(config);

    let result = match cli.command {
        Commands::Status => commands::status::execute(&ctx, cli.json).await,
        Commands::Run => commands::run::execute(&ctx, cli.json).await,
        Commands::Rollback(args) => commands::rollback::execute(&ctx, args, cli.json).await,
        Commands::Info => commands::info::execute(&ctx, cli.json).await,
        Commands::Reset(args) => commands::reset::execute(&ctx, args, cli.json).await,
    };

    if let Err(err) = ctx.db.disconnect().await {
        tracing::warn!(error = %err, "Failed to close database cleanly");
    }

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
