use std::env;
use std::time::Duration;

// ============================================================================
// Configuration
// ============================================================================
//
// Everything comes from the environment (optionally via a .env file):
//
//   BIND_ADDR            listen address        (default 127.0.0.1)
//   BIND_PORT            listen port           (default 8083)
//   DATABASE_URL         Postgres URL          (required)
//   ACCOUNT_SERVICE_URL  Account service base  (required)
//   CATALOG_SERVICE_URL  Catalog service base  (required)
//   CALL_DEADLINE_MS     outbound call bound   (default 3000)
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable '{0}'")]
    Missing(String),

    #[error("invalid value for '{0}': {1}")]
    Invalid(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub bind_port: u16,
    pub database_url: String,
    pub account_service_url: String,
    pub catalog_service_url: String,
    pub call_deadline: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let required =
            |name: &str| env::var(name).map_err(|_| ConfigError::Missing(name.to_string()));

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
        let bind_port = env::var("BIND_PORT")
            .unwrap_or_else(|_| "8083".to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::Invalid("BIND_PORT".to_string(), e.to_string()))?;

        let database_url = required("DATABASE_URL")?;
        let account_service_url = required("ACCOUNT_SERVICE_URL")?;
        let catalog_service_url = required("CATALOG_SERVICE_URL")?;

        let call_deadline_ms = env::var("CALL_DEADLINE_MS")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u64>()
            .map_err(|e| ConfigError::Invalid("CALL_DEADLINE_MS".to_string(), e.to_string()))?;

        Ok(Self {
            bind_addr,
            bind_port,
            database_url,
            account_service_url,
            catalog_service_url,
            call_deadline: Duration::from_millis(call_deadline_ms),
        })
    }
}
