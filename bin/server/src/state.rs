//! Shared application state.

use crate::config::MissingConfig;
use crate::error::ApiError;
use medigate_gateway::{AuthGateway, GatewayError};
use std::sync::Arc;

/// State handed to every handler.
///
/// A process that started without its required configuration still serves
/// requests; each auth route then fails with a configuration error before
/// looking at the request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

enum Inner {
    Ready(AuthGateway),
    Misconfigured(MissingConfig),
}

impl AppState {
    /// Creates state around a fully configured gateway.
    #[must_use]
    pub fn ready(gateway: AuthGateway) -> Self {
        Self {
            inner: Arc::new(Inner::Ready(gateway)),
        }
    }

    /// Creates state for a process missing required configuration.
    #[must_use]
    pub fn misconfigured(missing: MissingConfig) -> Self {
        Self {
            inner: Arc::new(Inner::Misconfigured(missing)),
        }
    }

    /// Returns the gateway.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the process is misconfigured.
    pub fn gateway(&self) -> Result<&AuthGateway, ApiError> {
        match self.inner.as_ref() {
            Inner::Ready(gateway) => Ok(gateway),
            Inner::Misconfigured(missing) => Err(GatewayError::Configuration {
                missing: missing.keys.iter().map(|key| (*key).to_string()).collect(),
            }
            .into()),
        }
    }
}
