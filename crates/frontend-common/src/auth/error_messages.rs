//! User-friendly error message mappings

use portal_core::Error;

/// Convert a login failure into something fit for the login form
pub fn get_user_friendly_error(error: &Error) -> String {
    match error {
        Error::InvalidGrant(_) => {
            "The server did not return a usable session. Please try again.".to_string()
        }
        Error::SerializationError(_) | Error::InvalidTimestamp(_) => {
            "Unexpected login response from the server.".to_string()
        }
        Error::ConfigError(e) => format!("The application is misconfigured: {e}"),
        Error::TracingInit(_) => error.to_string(),
    }
}
