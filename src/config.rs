//! Configuration — read once from the environment at startup.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Port for the HTTP/WebSocket server.
    pub port: u16,
    /// Path to the local database file.
    pub db_path: String,
    /// HS256 signing secret for access tokens.
    pub secret_key: SecretString,
    /// Access token lifetime in minutes.
    pub token_ttl_minutes: i64,
    /// Base URL of the recommender service. None disables
    /// recommendations entirely.
    pub recommender_url: Option<String>,
}

impl ServiceConfig {
    /// Load from `INTAKE_*` environment variables.
    ///
    /// `INTAKE_SECRET_KEY` is required; everything else has defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port: u16 = match std::env::var("INTAKE_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "INTAKE_PORT".into(),
                message: format!("not a port number: {raw}"),
            })?,
            Err(_) => 8080,
        };

        let db_path = std::env::var("INTAKE_DB_PATH")
            .unwrap_or_else(|_| "./data/career-intake.db".to_string());

        let secret_key = std::env::var("INTAKE_SECRET_KEY")
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingEnvVar("INTAKE_SECRET_KEY".into()))?;

        let token_ttl_minutes: i64 = match std::env::var("INTAKE_TOKEN_TTL_MIN") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "INTAKE_TOKEN_TTL_MIN".into(),
                message: format!("not a number of minutes: {raw}"),
            })?,
            Err(_) => 30,
        };

        let recommender_url = std::env::var("INTAKE_RECOMMENDER_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Ok(Self {
            port,
            db_path,
            secret_key,
            token_ttl_minutes,
            recommender_url,
        })
    }
}
