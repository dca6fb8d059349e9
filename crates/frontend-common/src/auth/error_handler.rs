//! Global auth error handler
//!
//! Request code that sees a token rejected reports it here; the auth context
//! registered through [`super::install_auth_error_handler`] reacts by asking
//! for re-authentication.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Why a request lost its authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// The server answered 401 for a token we still held
    TokenRejected,
    /// The token ran out before the request could be sent
    TokenExpired,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenRejected => f.write_str("token rejected by server"),
            Self::TokenExpired => f.write_str("token expired"),
        }
    }
}

pub type AuthErrorCallback = Rc<dyn Fn(AuthFailure)>;

thread_local! {
    static AUTH_ERROR_CALLBACK: RefCell<Option<AuthErrorCallback>> = const { RefCell::new(None) };
}

pub fn set_auth_error_callback(callback: AuthErrorCallback) {
    AUTH_ERROR_CALLBACK.with(|cb| {
        *cb.borrow_mut() = Some(callback);
    });
}

pub fn clear_auth_error_callback() {
    AUTH_ERROR_CALLBACK.with(|cb| {
        *cb.borrow_mut() = None;
    });
}

/// Report a failure; returns whether a handler was installed
pub fn trigger_auth_error(failure: AuthFailure) -> bool {
    // Clone out so the handler may replace itself without a double borrow.
    let callback = AUTH_ERROR_CALLBACK.with(|cb| cb.borrow().clone());
    match callback {
        Some(callback) => {
            tracing::debug!(%failure, "dispatching auth error");
            callback(failure);
            true
        }
        None => {
            tracing::warn!(%failure, "auth error reported with no handler installed");
            false
        }
    }
}
