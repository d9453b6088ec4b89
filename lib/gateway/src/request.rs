//! Inbound request bodies and login path selection.

use crate::error::GatewayError;
use medigate_accounts::StaffRole;
use medigate_identity::Contact;
use serde::Deserialize;
use serde_json::json;
use std::fmt;

/// Required prefix of a JWT-shaped access token.
const ACCESS_TOKEN_PREFIX: &str = "eyJ";

/// Body of a login request. Which fields are present decides the path.
#[derive(Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, rename = "codeVerifier", alias = "code_verifier")]
    pub code_verifier: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("phone", &self.phone)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("code", &self.code.as_ref().map(|_| "<redacted>"))
            .field("code_verifier", &self.code_verifier.as_ref().map(|_| "<redacted>"))
            .field("role", &self.role)
            .finish()
    }
}

/// Body of the dedicated OAuth callback request.
#[derive(Default, Deserialize)]
pub struct OAuthCallbackRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, rename = "codeVerifier", alias = "code_verifier")]
    pub code_verifier: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Body of a registration request.
#[derive(Default, Deserialize)]
pub struct RegistrationRequest {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub sex_identify: Option<String>,
}

/// A validated OAuth code presentation.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthPresentation {
    pub code: String,
    pub code_verifier: String,
    pub role: StaffRole,
}

/// The login path chosen for a request.
#[derive(Clone, PartialEq, Eq)]
pub enum LoginPresentation {
    OAuthCode(OAuthPresentation),
    AccessToken(String),
    Password { contact: Contact, password: String },
}

impl fmt::Debug for OAuthPresentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthPresentation")
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for LoginPresentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OAuthCode(oauth) => f.debug_tuple("OAuthCode").field(oauth).finish(),
            Self::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
            Self::Password { contact, .. } => f
                .debug_struct("Password")
                .field("contact", contact)
                .finish_non_exhaustive(),
        }
    }
}

impl LoginPresentation {
    /// Short name of the path, for logs.
    #[must_use]
    pub fn path(&self) -> &'static str {
        match self {
            Self::OAuthCode(_) => "oauth_code",
            Self::AccessToken(_) => "access_token",
            Self::Password { .. } => "password",
        }
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl LoginRequest {
    /// Selects the login path from the presented fields.
    ///
    /// A complete code and verifier pair wins over an access token, which
    /// wins over a password credential.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if no path can be selected or the role is
    /// unknown.
    pub fn into_presentation(self) -> Result<LoginPresentation, GatewayError> {
        if let (Some(code), Some(code_verifier)) =
            (present(self.code), present(self.code_verifier))
        {
            return Ok(LoginPresentation::OAuthCode(OAuthPresentation {
                code,
                code_verifier,
                role: parse_role(self.role.as_deref())?,
            }));
        }

        if let Some(token) = present(self.access_token) {
            return Ok(LoginPresentation::AccessToken(token));
        }

        let password = present(self.password);
        let contact = match (present(self.phone), present(self.email)) {
            (Some(_), Some(_)) => {
                return Err(GatewayError::invalid_input(
                    "Provide either phone or email, not both",
                ));
            }
            (Some(phone), None) => Some(Contact::Phone(phone)),
            (None, Some(email)) => Some(Contact::Email(email)),
            (None, None) => None,
        };

        match (contact, password) {
            (Some(contact), Some(password)) => Ok(LoginPresentation::Password { contact, password }),
            _ => Err(GatewayError::invalid_input(
                "Phone or email, and password are required",
            )),
        }
    }
}

impl OAuthCallbackRequest {
    /// Validates the callback fields.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the code or verifier is missing or the role
    /// is unknown.
    pub fn into_presentation(self) -> Result<OAuthPresentation, GatewayError> {
        match (present(self.code), present(self.code_verifier)) {
            (Some(code), Some(code_verifier)) => Ok(OAuthPresentation {
                code,
                code_verifier,
                role: parse_role(self.role.as_deref())?,
            }),
            (code, verifier) => Err(GatewayError::InvalidInput {
                message: "Missing code or codeVerifier",
                details: Some(json!({
                    "codeProvided": code.is_some(),
                    "codeVerifierProvided": verifier.is_some(),
                })),
            }),
        }
    }
}

/// Parses an optional role, defaulting to `staff`.
///
/// # Errors
///
/// Returns `InvalidInput` with the accepted roles if the value is unknown.
pub fn parse_role(role: Option<&str>) -> Result<StaffRole, GatewayError> {
    let Some(role) = role else {
        return Ok(StaffRole::default());
    };

    role.parse().map_err(|_| GatewayError::InvalidInput {
        message: "Invalid role provided",
        details: Some(json!({
            "role": role,
            "validRoles": StaffRole::ALL.iter().map(StaffRole::as_str).collect::<Vec<_>>(),
        })),
    })
}

/// Checks that an access token looks like a JWT.
///
/// # Errors
///
/// Returns `Authentication` with a format hint otherwise.
pub fn check_access_token_shape(token: &str) -> Result<(), GatewayError> {
    let segments = token.split('.').count();
    if token.starts_with(ACCESS_TOKEN_PREFIX) && segments == 3 {
        Ok(())
    } else {
        Err(GatewayError::Authentication {
            message: "Invalid access token format - should be JWT",
            details: Some(json!({
                "hint": "Access token should start with 'eyJ'",
            })),
        })
    }
}

/// A validated registration.
#[derive(Clone, PartialEq, Eq)]
pub struct Registration {
    pub phone: String,
    pub password: String,
    pub full_name: Option<String>,
    pub sex_identify: Option<String>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("phone", &self.phone)
            .field("full_name", &self.full_name)
            .field("sex_identify", &self.sex_identify)
            .finish_non_exhaustive()
    }
}

impl RegistrationRequest {
    /// Validates the registration fields.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the phone or password is missing.
    pub fn into_registration(self) -> Result<Registration, GatewayError> {
        match (present(self.phone), present(self.password)) {
            (Some(phone), Some(password)) => Ok(Registration {
                phone,
                password,
                full_name: present(self.full_name),
                sex_identify: present(self.sex_identify),
            }),
            _ => Err(GatewayError::invalid_input(
                "Phone and password are required",
            )),
        }
    }
}
