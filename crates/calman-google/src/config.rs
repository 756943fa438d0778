//! Google Calendar session configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// OAuth 2.0 credentials for Google API access.
///
/// Users must provide their own OAuth client ID and secret, as Google
/// requires registered applications for API access.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
}

/// Structure of Google's OAuth credentials JSON file.
///
/// Supports both the Google Cloud Console download (an "installed" or
/// "web" section) and the flat format written by gcloud, with client_id
/// and client_secret at the root level.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads OAuth credentials from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("failed to read credentials file: {}", e))?;
        Self::from_json(&content)
    }

    /// Parses OAuth credentials from a Google credentials JSON string.
    ///
    /// Accepts either the Cloud Console format
    /// (`{"installed": {"client_id": ..., "client_secret": ...}}`, or
    /// `"web"` in place of `"installed"`) or a flat object with the two
    /// fields at the root.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let file: CredentialsFile = serde_json::from_str(json)
            .map_err(|e| format!("failed to parse credentials JSON: {}", e))?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err("credentials file must contain 'installed'/'web' section or 'client_id'/'client_secret' at root level".to_string())
    }

    /// Validates that the credentials appear to be correctly formatted.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Configuration for a Google Calendar session.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth credentials for API access.
    pub credentials: OAuthCredentials,

    /// Path to store OAuth tokens.
    ///
    /// Defaults to `~/.local/share/calman/google-tokens.json`.
    pub token_path: PathBuf,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string for API requests.
    pub user_agent: String,

    /// Port range for the loopback OAuth server.
    ///
    /// The OAuth flow will try to bind to ports in this range.
    /// Defaults to (8080, 8090).
    pub loopback_port_range: (u16, u16),

    /// OAuth scopes to request.
    ///
    /// Defaults to `["https://www.googleapis.com/auth/calendar"]`; the
    /// suite creates, updates and deletes events, so read-only access
    /// is not enough.
    pub scopes: Vec<String>,
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default OAuth scope for read-write calendar access.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    /// Creates a new Google configuration with the given credentials.
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            token_path: Self::default_token_path(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("calman/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: (8080, 8090),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
        }
    }

    /// Returns the default token storage path.
    pub fn default_token_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".local").join("share"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calman")
            .join("google-tokens.json")
    }

    /// Sets the token storage path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the loopback port range for OAuth.
    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }

        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err("invalid loopback port range".to_string());
        }

        Ok(())
    }
}
