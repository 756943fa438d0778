//! The `calman auth` command.

use std::path::{Path, PathBuf};

use tracing::info;

use calman_google::{GoogleConfig, GoogleSession, OAuthCredentials};

use crate::config::{CliConfig, GoogleSettings};
use crate::error::{CliError, CliResult};

/// Runs the Google authentication flow.
///
/// Resolves credentials from CLI flags, a `--credentials-file`, or
/// `config.toml`, then runs the OAuth 2.0 PKCE flow. Credentials that
/// arrived on the command line are persisted to `config.toml` so later
/// runs find them.
pub async fn run(
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<PathBuf>,
    force: bool,
    config: &CliConfig,
) -> CliResult<()> {
    let (final_client_id, final_client_secret, source) =
        resolve_credentials(client_id, client_secret, credentials_file, config.google.as_ref())?;

    let credentials = OAuthCredentials::new(&final_client_id, &final_client_secret);
    credentials
        .validate()
        .map_err(|e| CliError::Config(format!("invalid Google credentials: {}", e)))?;

    let mut google_config = GoogleConfig::new(credentials);
    if let Some(ref google) = config.google
        && let Some(ref path) = google.token_path
    {
        google_config = google_config.with_token_path(path);
    }

    let session = GoogleSession::connect(google_config)?;

    if force {
        session.clear_tokens()?;
    } else if session.is_authenticated() {
        save_credentials_to_config(&final_client_id, &final_client_secret, &source);
        println!("Already authenticated with Google Calendar.");
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    println!("Starting Google Calendar authentication...");
    println!();
    println!("A browser window will open for you to authorize access.");
    println!("If the browser doesn't open, check the terminal for a URL to copy.");
    println!();

    session.authenticate().await?;

    save_credentials_to_config(&final_client_id, &final_client_secret, &source);

    info!(tokens = %session.token_path().display(), "Google authentication successful");
    println!();
    println!("Authentication successful!");
    println!("Your Google Calendar tokens have been saved.");
    println!();
    println!("You can now run calman to manage your calendar.");

    Ok(())
}

/// Where the credentials were resolved from.
#[derive(Debug, PartialEq)]
enum CredentialSource {
    /// From CLI flags (--client-id/--client-secret or --credentials-file).
    Cli,
    /// From config.toml (already persisted).
    Config,
}

/// Resolves Google credentials from multiple sources.
///
/// Priority (highest to lowest):
/// 1. CLI `--client-id` + `--client-secret`
/// 2. CLI `--credentials-file` (Google Cloud Console JSON)
/// 3. `config.toml` `[google]` section
fn resolve_credentials(
    cli_client_id: Option<String>,
    cli_client_secret: Option<String>,
    cli_credentials_file: Option<PathBuf>,
    config_google: Option<&GoogleSettings>,
) -> CliResult<(String, String, CredentialSource)> {
    if let (Some(id), Some(secret)) = (&cli_client_id, &cli_client_secret) {
        return Ok((id.clone(), secret.clone(), CredentialSource::Cli));
    }

    if let Some(ref path) = cli_credentials_file {
        let creds = OAuthCredentials::from_file(path).map_err(|e| {
            CliError::Config(format!(
                "failed to load credentials from {}: {}",
                path.display(),
                e
            ))
        })?;
        return Ok((creds.client_id, creds.client_secret, CredentialSource::Cli));
    }

    if let Some(google) = config_google
        && let (Some(id), Some(secret)) = (&google.client_id, &google.client_secret)
    {
        return Ok((id.clone(), secret.clone(), CredentialSource::Config));
    }

    // Partial CLI args (only id or only secret) deserve a pointed message.
    if cli_client_id.is_some() || cli_client_secret.is_some() {
        return Err(CliError::Config(
            "both --client-id and --client-secret are required when providing credentials directly"
                .to_string(),
        ));
    }

    let config_path = CliConfig::default_path();
    Err(CliError::Config(format!(
        "Google credentials are required. Provide via:\n  \
         - client_id + client_secret in {}\n  \
         - --client-id and --client-secret flags\n  \
         - --credentials-file flag (path to Google Cloud Console JSON)\n  \
         - GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET env vars",
        config_path.display()
    )))
}

/// Persists credentials to `config.toml` under `[google]`.
///
/// Only writes when the credentials came from a transient source (CLI flags
/// or `--credentials-file`); when they already live in config.toml this is
/// a no-op. A write failure is logged, not fatal: the tokens are stored
/// either way, only the next `auth` run would prompt for credentials again.
fn save_credentials_to_config(client_id: &str, client_secret: &str, source: &CredentialSource) {
    if *source == CredentialSource::Config {
        return;
    }

    let config_path = CliConfig::default_path();
    match write_credentials(&config_path, client_id, client_secret) {
        Ok(()) => {
            info!("credentials saved to {}", config_path.display());
            println!("Credentials saved to {}", config_path.display());
        }
        Err(e) => info!(
            "could not save credentials to {}: {}",
            config_path.display(),
            e
        ),
    }
}

/// Edits (or creates) a config file, setting `[google]` client_id and
/// client_secret while preserving everything else in the document.
fn write_credentials(path: &Path, client_id: &str, client_secret: &str) -> Result<(), String> {
    let content = if path.exists() {
        std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?
    } else {
        String::new()
    };

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| format!("failed to parse config: {}", e))?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    if let Some(google) = doc["google"].as_table_mut() {
        google["client_id"] = toml_edit::value(client_id);
        google["client_secret"] = toml_edit::value(client_secret);
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create {}: {}", parent.display(), e))?;
    }

    std::fs::write(path, doc.to_string()).map_err(|e| format!("failed to write config: {}", e))
}
