//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// calman - manage a Google Calendar from the terminal
#[derive(Debug, Parser)]
#[command(name = "calman")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALMAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Target calendar id (overrides the configured one)
    #[arg(long, env = "CALMAN_CALENDAR")]
    pub calendar: Option<String>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands. Without one, the interactive menu runs.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authenticate with Google Calendar
    Auth {
        /// OAuth client ID (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_ID")]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
        client_secret: Option<String>,

        /// Path to Google Cloud Console credentials JSON file
        ///
        /// This is the JSON file downloaded from the Google Cloud Console
        /// OAuth 2.0 credentials page. Alternative to providing client_id
        /// and client_secret separately.
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,

        /// Force re-authentication even if already authenticated
        #[arg(long, short)]
        force: bool,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
