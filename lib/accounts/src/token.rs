//! Random values for refresh tokens and licence numbers.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Number of random bytes in a refresh token.
const REFRESH_TOKEN_BYTES: usize = 32;

/// Generates an unpredictable refresh token (256 bits, base64url).
///
/// # Errors
///
/// Returns an error if the operating system entropy source fails.
pub fn generate_refresh_token() -> Result<String, getrandom::Error> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    getrandom::fill(&mut bytes)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Generates a licence number of the form `LIC-XXXXXXXX`.
///
/// # Errors
///
/// Returns an error if the operating system entropy source fails.
pub fn generate_license_no() -> Result<String, getrandom::Error> {
    let mut bytes = [0u8; 4];
    getrandom::fill(&mut bytes)?;
    let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
    Ok(format!("LIC-{hex}"))
}
