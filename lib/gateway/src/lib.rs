//! Authentication and session-issuance gateway.
//!
//! This crate provides:
//! - Login path selection and the three login flows (`AuthGateway::login`)
//! - Customer registration (`AuthGateway::register`)
//! - Staff provisioning for OAuth logins (`AuthGateway::provision_staff`)
//! - The error taxonomy and session payloads shared with the HTTP layer
//!
//! The gateway owns no storage and verifies no credentials itself; it drives
//! an [`IdentityProvider`](medigate_identity::IdentityProvider) and the
//! repositories from `medigate-accounts`.

pub mod config;
pub mod error;
pub mod gateway;
pub mod provisioning;
pub mod registration;
pub mod request;
pub mod response;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::GatewayConfig;
pub use error::{GatewayError, Operation};
pub use gateway::AuthGateway;
pub use provisioning::ProvisionedStaff;
pub use request::{
    LoginPresentation, LoginRequest, OAuthCallbackRequest, OAuthPresentation, Registration,
    RegistrationRequest,
};
pub use response::{Envelope, LoginData};
