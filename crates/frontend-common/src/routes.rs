//! Route table and session guard
//!
//! Paths may arrive in hash form (`#/login`) and may carry a query string;
//! both are normalised before lookup.

use portal_core::SessionState;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    Hello,
    Hello2,
    Login,
    Register,
}

impl Route {
    pub const ALL: [Self; 4] = [Self::Hello, Self::Hello2, Self::Login, Self::Register];

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Hello => "/",
            Self::Hello2 => "/hello2",
            Self::Login => "/login",
            Self::Register => "/register",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hello => "Hello",
            Self::Hello2 => "Hello2",
            Self::Login => "Login",
            Self::Register => "Register",
        }
    }

    /// Whether the view needs a logged-in session
    #[must_use]
    pub const fn requires_session(self) -> bool {
        matches!(self, Self::Hello2)
    }

    /// Look up the route for a location
    #[must_use]
    pub fn recognize(location: &str) -> Option<Self> {
        let path = normalize(location);
        Self::ALL.into_iter().find(|route| route.path() == path)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn normalize(location: &str) -> &str {
    let location = location.strip_prefix('#').unwrap_or(location);
    let path = location
        .split_once(['?', '#'])
        .map_or(location, |(path, _)| path);
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Outcome of asking to show a location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Proceed(Route),
    /// `from` needs a session; send the user to `to` first
    Redirect { from: Route, to: Route },
    NotFound(String),
}

/// Decide whether `route` may be shown for this session
///
/// Reads the logged-in flag only, so a guard check never consumes the
/// session the way [`SessionState::read_token`] can.
#[must_use]
pub fn guard(route: Route, session: &SessionState) -> Navigation {
    if route.requires_session() && !session.is_logged_in() {
        debug!(%route, "no session, redirecting to login");
        return Navigation::Redirect {
            from: route,
            to: Route::Login,
        };
    }
    Navigation::Proceed(route)
}

/// Recognize `location` and run the guard on it
#[must_use]
pub fn navigate(location: &str, session: &SessionState) -> Navigation {
    Route::recognize(location).map_or_else(
        || Navigation::NotFound(location.to_string()),
        |route| guard(route, session),
    )
}
