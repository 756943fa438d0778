//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/calman/config.toml` by default:
//!
//! ```toml
//! calendar_id = "primary"
//! dedupe_attendees = false
//!
//! [google]
//! client_id = "YOUR_ID.apps.googleusercontent.com"
//! client_secret = "YOUR_SECRET"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use calman_google::{GoogleConfig, OAuthCredentials};

/// Configuration for the calman CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Calendar every operation targets unless `--calendar` overrides it.
    pub calendar_id: String,

    /// When set, inviting an address already on an event is a no-op
    /// instead of adding a duplicate attendee entry.
    pub dedupe_attendees: bool,

    /// Google credentials and token storage.
    pub google: Option<GoogleSettings>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            calendar_id: "primary".to_string(),
            dedupe_attendees: false,
            google: None,
        }
    }
}

/// The `[google]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleSettings {
    /// OAuth client ID.
    pub client_id: Option<String>,

    /// OAuth client secret.
    pub client_secret: Option<String>,

    /// Path to token storage.
    pub token_path: Option<PathBuf>,
}

impl CliConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calman")
    }

    /// Builds the session configuration from the `[google]` section.
    ///
    /// Both `client_id` and `client_secret` must be set; `token_path`
    /// overrides the session default when present.
    pub fn google_config(&self) -> Result<GoogleConfig, String> {
        let google = self
            .google
            .as_ref()
            .ok_or_else(missing_credentials_message)?;

        let (Some(client_id), Some(client_secret)) =
            (google.client_id.as_deref(), google.client_secret.as_deref())
        else {
            return Err(missing_credentials_message());
        };

        let credentials = OAuthCredentials::new(client_id, client_secret);
        credentials
            .validate()
            .map_err(|e| format!("invalid Google credentials: {}", e))?;

        let mut config = GoogleConfig::new(credentials);
        if let Some(ref path) = google.token_path {
            config = config.with_token_path(path);
        }

        Ok(config)
    }
}

fn missing_credentials_message() -> String {
    format!(
        "Google credentials not found. Add to {}:\n  \
         [google]\n  \
         client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
         client_secret = \"YOUR_SECRET\"\n\n  \
         Or run: calman auth --credentials-file <path>",
        CliConfig::default_path().display()
    )
}
