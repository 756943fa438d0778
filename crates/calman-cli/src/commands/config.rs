//! The `calman config` subcommands.

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// Dumps the current configuration to stdout.
pub fn dump(config: &CliConfig) -> CliResult<()> {
    println!("# config.toml ({})", CliConfig::default_path().display());
    println!("{}", rendered(config)?);

    Ok(())
}

/// Renders the configuration as pretty TOML.
fn rendered(config: &CliConfig) -> CliResult<String> {
    toml::to_string_pretty(config)
        .map_err(|e| CliError::Config(format!("failed to serialize config: {}", e)))
}

/// Validates the configuration.
pub fn validate(config: &CliConfig) -> CliResult<()> {
    if config.calendar_id.trim().is_empty() {
        return Err(CliError::Config(
            "calendar_id must not be empty".to_string(),
        ));
    }

    if let Some(ref google) = config.google
        && (google.client_id.is_some() || google.client_secret.is_some())
    {
        config.google_config().map_err(CliError::Config)?;
        println!("Google credentials are valid.");
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Shows the configuration file path.
pub fn path() -> CliResult<()> {
    println!("config: {}", CliConfig::default_path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GoogleSettings;

    #[test]
    fn validate_accepts_defaults() {
        assert!(validate(&CliConfig::default()).is_ok());
    }

    #[test]
    fn validate_rejects_blank_calendar() {
        let mut config = CliConfig::default();
        config.calendar_id = "  ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn validate_rejects_partial_credentials() {
        let config: CliConfig = toml::from_str(
            r#"
[google]
client_id = "test.apps.googleusercontent.com"
"#,
        )
        .unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("credentials"));
    }

    #[test]
    fn dump_round_trips() {
        let mut config = CliConfig::default();
        config.calendar_id = "team@example.com".to_string();
        config.dedupe_attendees = true;
        config.google = Some(GoogleSettings {
            client_id: Some("id.apps.googleusercontent.com".to_string()),
            client_secret: Some("secret".to_string()),
            token_path: None,
        });

        let parsed: CliConfig = toml::from_str(&rendered(&config).unwrap()).unwrap();
        assert_eq!(parsed.calendar_id, "team@example.com");
        assert!(parsed.dedupe_attendees);
        let google = parsed.google.unwrap();
        assert_eq!(
            google.client_id.as_deref(),
            Some("id.apps.googleusercontent.com")
        );
        assert_eq!(google.client_secret.as_deref(), Some("secret"));
    }
}
