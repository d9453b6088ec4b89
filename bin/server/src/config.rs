//! Centralized server configuration.
//!
//! Settings are loaded via the `config` crate from environment variables
//! (`__` separates nested keys, e.g. `IDENTITY__SERVICE_KEY`). Required
//! values are optional at load time and checked once by
//! [`ServerConfig::validate`], so a misconfigured process can still start and
//! answer every auth route with a configuration error.

use medigate_gateway::GatewayConfig;
use medigate_identity::IdentityConfig;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Server configuration composed from library configs.
#[derive(Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// PostgreSQL database connection URL.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Maximum size of the database pool.
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    /// Identity provider connection settings.
    #[serde(default)]
    pub identity: IdentitySettings,

    /// Login and registration tunables.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Cross-origin settings.
    #[serde(default)]
    pub cors: CorsConfig,
}

/// Raw identity provider settings.
#[derive(Clone, Deserialize)]
pub struct IdentitySettings {
    /// Provider base URL.
    #[serde(default)]
    pub url: Option<String>,

    /// Privileged service key.
    #[serde(default)]
    pub service_key: Option<String>,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_identity_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Cross-origin settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed to call the API. Empty allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_database_max_connections() -> u32 {
    5
}

fn default_identity_timeout_seconds() -> u64 {
    10
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            url: None,
            service_key: None,
            timeout_seconds: default_identity_timeout_seconds(),
        }
    }
}

impl fmt::Debug for IdentitySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentitySettings")
            .field("url", &self.url)
            .field("service_key", &self.service_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Configuration whose required values are known to be present.
pub struct ValidatedConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub identity: IdentityConfig,
    pub gateway: GatewayConfig,
    pub cors: CorsConfig,
}

/// Required configuration keys that were absent or empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingConfig {
    pub keys: Vec<&'static str>,
}

impl fmt::Display for MissingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing required configuration: {}", self.keys.join(", "))
    }
}

impl std::error::Error for MissingConfig {}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a present value cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins"),
            )
            .build()?
            .try_deserialize()
    }

    /// Checks that every required value is present.
    ///
    /// # Errors
    ///
    /// Returns the environment names of all missing values.
    pub fn validate(self) -> Result<ValidatedConfig, MissingConfig> {
        let database_url = required(self.database_url);
        let url = required(self.identity.url);
        let service_key = required(self.identity.service_key);

        match (database_url, url, service_key) {
            (Some(database_url), Some(url), Some(service_key)) => Ok(ValidatedConfig {
                listen_addr: self.listen_addr,
                database_url,
                database_max_connections: self.database_max_connections,
                identity: IdentityConfig::new(url, service_key)
                    .with_timeout(Duration::from_secs(self.identity.timeout_seconds)),
                gateway: self.gateway,
                cors: self.cors,
            }),
            (database_url, url, service_key) => {
                let keys = [
                    ("DATABASE_URL", database_url.is_none()),
                    ("IDENTITY__URL", url.is_none()),
                    ("IDENTITY__SERVICE_KEY", service_key.is_none()),
                ]
                .into_iter()
                .filter_map(|(key, missing)| missing.then_some(key))
                .collect();
                Err(MissingConfig { keys })
            }
        }
    }
}
