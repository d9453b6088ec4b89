//! Gateway behaviour settings.

use serde::Deserialize;
use std::time::Duration;

/// Tunables for the login and registration flows.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Lifetime of a newly issued refresh credential, in days.
    #[serde(default = "default_refresh_validity_days")]
    pub refresh_validity_days: i64,

    /// Length of the default schedule created by an OAuth login, in minutes.
    #[serde(default = "default_schedule_window_minutes")]
    pub schedule_window_minutes: i64,

    /// Upper bound for any single identity provider or repository call.
    #[serde(default = "default_call_timeout_millis")]
    pub call_timeout_millis: u64,

    /// `expires_in` reported when the provider did not supply one.
    #[serde(default = "default_expires_in_seconds")]
    pub default_expires_in_seconds: u64,
}

fn default_refresh_validity_days() -> i64 {
    7
}

fn default_schedule_window_minutes() -> i64 {
    60
}

fn default_call_timeout_millis() -> u64 {
    10_000
}

fn default_expires_in_seconds() -> u64 {
    3600
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            refresh_validity_days: default_refresh_validity_days(),
            schedule_window_minutes: default_schedule_window_minutes(),
            call_timeout_millis: default_call_timeout_millis(),
            default_expires_in_seconds: default_expires_in_seconds(),
        }
    }
}

impl GatewayConfig {
    /// Returns the refresh credential lifetime.
    #[must_use]
    pub fn refresh_validity(&self) -> chrono::Duration {
        chrono::Duration::days(self.refresh_validity_days)
    }

    /// Returns the default schedule length.
    #[must_use]
    pub fn schedule_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.schedule_window_minutes)
    }

    /// Returns the per-call timeout.
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.refresh_validity(), chrono::Duration::days(7));
        assert_eq!(config.schedule_window(), chrono::Duration::hours(1));
        assert_eq!(config.call_timeout(), Duration::from_secs(10));
        assert_eq!(config.default_expires_in_seconds, 3600);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"refresh_validity_days": 30}"#).expect("deserialize");
        assert_eq!(config.refresh_validity_days, 30);
        assert_eq!(config.schedule_window_minutes, 60);
        assert_eq!(config.call_timeout_millis, 10_000);
    }
}
