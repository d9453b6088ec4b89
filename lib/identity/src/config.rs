//! Connection settings for the identity provider.

use std::fmt;
use std::time::Duration;

/// Configuration for the HTTP identity provider client.
///
/// Built by the server once its raw settings have been validated; both the
/// base URL and the service key are therefore always present here.
#[derive(Clone)]
pub struct IdentityConfig {
    /// Provider base URL (e.g. "https://project.example.co").
    base_url: String,
    /// Privileged service key sent as `apikey` and bearer credential.
    service_key: String,
    /// Upper bound for a single provider request.
    timeout: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

impl IdentityConfig {
    /// Creates a configuration with the default request timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            service_key: service_key.into(),
            timeout: default_timeout(),
        }
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Returns the service key.
    #[must_use]
    pub fn service_key(&self) -> &str {
        &self.service_key
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("base_url", &self.base_url)
            .field("service_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_strips_trailing_slash() {
        let config = IdentityConfig::new("https://id.example.com/", "key");
        assert_eq!(config.base_url(), "https://id.example.com");
    }

    #[test]
    fn default_timeout_is_ten_seconds() {
        let config = IdentityConfig::new("https://id.example.com", "key");
        assert_eq!(config.timeout(), Duration::from_secs(10));

        let config = config.with_timeout(Duration::from_secs(3));
        assert_eq!(config.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn debug_redacts_service_key() {
        let config = IdentityConfig::new("https://id.example.com", "super-secret");
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
