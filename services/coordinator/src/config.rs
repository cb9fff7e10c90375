//! Type-safe configuration with validation.
//!
//! All settings come from environment variables (a `.env` file is honored in
//! development). Every mandatory option that is missing or malformed is a
//! fatal startup condition; the process refuses to run degraded.

use secrecy::SecretString;
use std::env;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Missing required option
    #[error("missing required configuration: {0}")]
    MissingRequired(&'static str),

    /// Invalid URL format
    #[error("invalid URL for {field}: {reason}")]
    InvalidUrl {
        /// Option name
        field: &'static str,
        /// Parse failure
        reason: String,
    },

    /// Invalid port number
    #[error("invalid port for {0}: must be between 1 and 65535")]
    InvalidPort(&'static str),

    /// Zero or unparsable duration
    #[error("invalid duration for {0}: must be greater than 0")]
    InvalidDuration(&'static str),

    /// Environment variable parse error
    #[error("failed to parse {name}: {reason}")]
    ParseError {
        /// Option name
        name: &'static str,
        /// Parse failure
        reason: String,
    },
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address for both listeners
    pub host: String,
    /// Vault authority address
    pub vault_addr: Url,
    /// This service's own long-lived Vault token
    pub vault_token: SecretString,
    /// Request timeout for every Vault call, seconds
    pub vault_request_timeout_secs: u64,
    /// Lease duration requested for minted tokens, seconds
    pub token_ttl_secs: u64,
    /// Policy template file
    pub policy_template_path: PathBuf,
    /// TLS certificate for the retrieval listener (PEM)
    pub tls_cert_path: PathBuf,
    /// TLS private key for the retrieval listener (PEM)
    pub tls_key_path: PathBuf,
    /// Port of the TLS retrieval listener
    pub secret_port: u16,
    /// Port of the plain event-ingestion listener
    pub events_port: u16,
    /// Deadline for a blocked retrieval request, seconds
    pub retrieval_timeout_secs: u64,
    /// Orchestrator REST endpoint for team-label lookup; first path segment
    /// of the identity is used when unset
    pub orchestrator_endpoint: Option<Url>,
    /// Basic-auth username for the orchestrator API
    pub orchestrator_username: Option<String>,
    /// Basic-auth password for the orchestrator API
    pub orchestrator_password: Option<SecretString>,
    /// Graceful shutdown window, seconds
    pub shutdown_timeout_secs: u64,
    /// Also register the log-only debug backend
    pub debug_backend_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables with validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            vault_addr: require_url_env("VAULT_ADDR")?,
            vault_token: SecretString::from(require_env("VAULT_TOKEN")?),
            vault_request_timeout_secs: parse_env("VAULT_REQUEST_TIMEOUT_SECS", 30)?,
            token_ttl_secs: require_parsed_env("TOKEN_TTL_SECS")?,
            policy_template_path: PathBuf::from(require_env("POLICY_TEMPLATE_PATH")?),
            tls_cert_path: PathBuf::from(require_env("TLS_CERT_PATH")?),
            tls_key_path: PathBuf::from(require_env("TLS_KEY_PATH")?),
            secret_port: require_parsed_env("SECRET_PORT")?,
            events_port: parse_env("EVENTS_PORT", 8080)?,
            retrieval_timeout_secs: parse_env("RETRIEVAL_TIMEOUT_SECS", 60)?,
            orchestrator_endpoint: optional_url_env("ORCHESTRATOR_ENDPOINT")?,
            orchestrator_username: env::var("ORCHESTRATOR_USERNAME").ok(),
            orchestrator_password: env::var("ORCHESTRATOR_PASSWORD")
                .ok()
                .map(SecretString::from),
            shutdown_timeout_secs: parse_env("SHUTDOWN_TIMEOUT_SECS", 30)?,
            debug_backend_enabled: parse_env("DEBUG_BACKEND_ENABLED", false)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate field constraints that plain parsing cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_port == 0 {
            return Err(ConfigError::InvalidPort("SECRET_PORT"));
        }
        if self.events_port == 0 {
            return Err(ConfigError::InvalidPort("EVENTS_PORT"));
        }
        if self.token_ttl_secs == 0 {
            return Err(ConfigError::InvalidDuration("TOKEN_TTL_SECS"));
        }
        if self.retrieval_timeout_secs == 0 {
            return Err(ConfigError::InvalidDuration("RETRIEVAL_TIMEOUT_SECS"));
        }
        if self.vault_request_timeout_secs == 0 {
            return Err(ConfigError::InvalidDuration("VAULT_REQUEST_TIMEOUT_SECS"));
        }
        Ok(())
    }
}

/// Read a mandatory environment variable.
fn require_env(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingRequired(name))
}

/// Read and parse a mandatory environment variable.
fn require_parsed_env<T: std::str::FromStr>(name: &'static str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    require_env(name)?
        .parse()
        .map_err(|e: T::Err| ConfigError::ParseError {
            name,
            reason: e.to_string(),
        })
}

/// Read and parse a mandatory URL.
fn require_url_env(name: &'static str) -> Result<Url, ConfigError> {
    Url::parse(&require_env(name)?).map_err(|e| ConfigError::InvalidUrl {
        field: name,
        reason: e.to_string(),
    })
}

/// Read and parse an optional URL.
fn optional_url_env(name: &'static str) -> Result<Option<Url>, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Url::parse(&value)
            .map(Some)
            .map_err(|e| ConfigError::InvalidUrl {
                field: name,
                reason: e.to_string(),
            }),
        _ => Ok(None),
    }
}

/// Parse an environment variable with a default value.
fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.parse().map_err(|e: T::Err| ConfigError::ParseError {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
