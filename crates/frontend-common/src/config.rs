//! Frontend configuration

use std::time::Duration;

/// Authentication configuration
pub struct AuthConfig;

impl AuthConfig {
    /// How often an active session should be re-validated
    pub const TOKEN_VALIDATION_INTERVAL: Duration = Duration::from_secs(60);

    /// Shown when validation finds the session past its expiry
    pub const SESSION_EXPIRED_MESSAGE: &'static str = "Session expired. Please login again.";

    /// Shown when the server rejects a token the client still believed valid
    pub const REAUTH_REQUIRED_MESSAGE: &'static str =
        "Your session has expired. Please re-authenticate to continue.";
}
