//! Login grants as returned by the login endpoint
//!
//! A successful login answers with the session token, the role of the user
//! and an RFC 3339 expiry, e.g.
//! `{"token": "...", "userRole": "user", "expires": "2017-06-18T20:24:30Z"}`.

use crate::clock::Clock;
use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Role assigned by the server when the payload omits one
pub const DEFAULT_USER_ROLE: &str = "user";

/// Lifetime the server grants a fresh session (ten minutes)
pub const DEFAULT_SESSION_TTL_SECS: u64 = 600;

/// Token plus expiry, the unit a session is established from
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginGrant {
    pub token: String,
    #[serde(default = "default_user_role")]
    pub user_role: String,
    pub expires: DateTime<Utc>,
}

fn default_user_role() -> String {
    DEFAULT_USER_ROLE.to_string()
}

impl LoginGrant {
    /// Parse a login response body
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not a grant or carries an empty token
    pub fn from_json(body: &str) -> Result<Self> {
        let grant: Self = serde_json::from_str(body)?;
        grant.validate()?;
        Ok(grant)
    }

    /// Build a grant from a token and an RFC 3339 expiry string
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the timestamp does not parse
    pub fn from_parts(token: impl Into<String>, expires: &str) -> Result<Self> {
        let expires = DateTime::parse_from_rfc3339(expires)?.with_timezone(&Utc);
        let grant = Self {
            token: token.into(),
            user_role: default_user_role(),
            expires,
        };
        grant.validate()?;
        Ok(grant)
    }

    /// Grant that expires `ttl` after the clock's current time
    #[must_use]
    pub fn issued_now(token: impl Into<String>, ttl: Duration, clock: &dyn Clock) -> Self {
        Self {
            token: token.into(),
            user_role: default_user_role(),
            expires: clock.now() + ttl,
        }
    }

    /// Ensure the grant can back a session
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or only whitespace
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(Error::invalid_grant("token is empty"));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires
    }
}

impl std::fmt::Debug for LoginGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginGrant")
            .field("token", &"<redacted>")
            .field("user_role", &self.user_role)
            .field("expires", &self.expires)
            .finish()
    }
}
