//! calman CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use calman_core::tracing::{TracingConfig, init_tracing};
use calman_google::GoogleSession;

use calman_cli::cli::{Cli, Command, ConfigAction};
use calman_cli::config::CliConfig;
use calman_cli::error::{CliError, CliResult};
use calman_cli::menu::{CommandContext, CommandRegistry, run_menu};
use calman_cli::prompt::TtyPrompt;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::interactive()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = if let Some(ref path) = cli.config {
        CliConfig::load_from(path).map_err(CliError::Config)?
    } else {
        CliConfig::load().unwrap_or_default()
    };

    match cli.command {
        Some(Command::Auth {
            client_id,
            client_secret,
            credentials_file,
            force,
        }) => {
            calman_cli::commands::auth::run(
                client_id,
                client_secret,
                credentials_file,
                force,
                &config,
            )
            .await
        }
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => calman_cli::commands::config::dump(&config),
            ConfigAction::Validate => calman_cli::commands::config::validate(&config),
            ConfigAction::Path => calman_cli::commands::config::path(),
        },
        None => run_interactive(&cli, &config).await,
    }
}

/// Connects a session and runs the menu until the user exits.
async fn run_interactive(cli: &Cli, config: &CliConfig) -> CliResult<()> {
    let google_config = config.google_config().map_err(CliError::Config)?;
    let session = GoogleSession::connect(google_config)?;

    if session.needs_reauth() {
        return Err(CliError::AuthRequired(
            "no stored Google tokens for the configured scopes - run 'calman auth' first"
                .to_string(),
        ));
    }

    let calendar_id = cli.calendar.as_deref().unwrap_or(&config.calendar_id);
    let ctx = CommandContext {
        api: &session,
        calendar_id,
        dedupe_attendees: config.dedupe_attendees,
    };

    let registry = CommandRegistry::standard();
    let mut prompt = TtyPrompt::new();
    run_menu(&registry, &ctx, &mut prompt).await
}
