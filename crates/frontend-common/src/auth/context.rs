//! Authentication context: the session plus the UI-facing auth flags

use super::error_handler::{AuthFailure, clear_auth_error_callback, set_auth_error_callback};
use super::error_messages::get_user_friendly_error;
use crate::config::AuthConfig;
use portal_core::{LoginGrant, PortalConfig, SessionState, SystemClock};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Authentication context data
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthContextData {
    pub user_role: Option<String>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub show_reauth_modal: bool,
    pub auth_expired: bool,
}

/// Authentication context actions
#[derive(Debug)]
pub enum AuthAction {
    Login(LoginGrant),
    Logout,
    SetLoading(bool),
    ValidateToken,
    ShowReauthModal,
    HideReauthModal,
}

/// Owns the session and applies [`AuthAction`]s to it
#[derive(Debug)]
pub struct AuthContext {
    session: SessionState,
    data: AuthContextData,
}

pub type SharedAuthContext = Rc<RefCell<AuthContext>>;

impl AuthContext {
    #[must_use]
    pub fn new(session: SessionState) -> Self {
        Self {
            session,
            data: AuthContextData::default(),
        }
    }

    /// Context over a fresh session on the wall clock
    #[must_use]
    pub fn from_config(config: &PortalConfig) -> Self {
        Self::new(SessionState::with_config(
            &config.session,
            Arc::new(SystemClock),
        ))
    }

    #[must_use]
    pub const fn data(&self) -> &AuthContextData {
        &self.data
    }

    #[must_use]
    pub const fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_logged_in()
    }

    /// Token for an outbound request, if the session still has one
    pub fn token_for_request(&mut self) -> Option<String> {
        self.session.read_token()
    }

    /// Parse a login response body and log in with it
    ///
    /// On failure the friendly message is stored in `data().error` and the
    /// session is left untouched.
    ///
    /// # Errors
    ///
    /// Returns the parse error when the body is not a usable grant
    pub fn login_from_response(&mut self, body: &str) -> portal_core::Result<()> {
        match LoginGrant::from_json(body) {
            Ok(grant) => {
                self.dispatch(AuthAction::Login(grant));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "login response rejected");
                self.data.error = Some(get_user_friendly_error(&e));
                self.data.is_loading = false;
                Err(e)
            }
        }
    }

    /// Log in with a bare token, expiring one configured TTL from now
    pub fn login_with_token(&mut self, token: impl Into<String>) {
        let grant = self.session.issue_grant(token);
        self.dispatch(AuthAction::Login(grant));
    }

    /// How long until the next `ValidateToken` is worth dispatching
    ///
    /// The regular interval, or the time left on the session if that is
    /// shorter. `None` when there is no live session to watch.
    #[must_use]
    pub fn next_validation_in(&self) -> Option<Duration> {
        let remaining = self.session.remaining()?.to_std().ok()?;
        Some(remaining.min(AuthConfig::TOKEN_VALIDATION_INTERVAL))
    }

    pub fn dispatch(&mut self, action: AuthAction) {
        match action {
            AuthAction::Login(grant) => {
                if let Err(e) = grant.validate() {
                    warn!(error = %e, "refusing login with invalid grant");
                    self.data.error = Some(get_user_friendly_error(&e));
                    self.data.is_loading = false;
                    return;
                }

                info!(role = %grant.user_role, "login");
                let user_role = grant.user_role.clone();
                self.session.establish(grant);
                self.data = AuthContextData {
                    user_role: Some(user_role),
                    ..AuthContextData::default()
                };
            }
            AuthAction::Logout => {
                info!("logout");
                self.session.invalidate();
                self.data = AuthContextData::default();
            }
            AuthAction::SetLoading(is_loading) => self.data.is_loading = is_loading,
            AuthAction::ValidateToken => {
                if self.session.token().is_some() && !self.session.is_valid() {
                    debug!(expiry = ?self.session.expiry(), "token expired during validation");
                    self.expire(AuthConfig::SESSION_EXPIRED_MESSAGE);
                }
            }
            AuthAction::ShowReauthModal => self.expire(AuthConfig::REAUTH_REQUIRED_MESSAGE),
            AuthAction::HideReauthModal => {
                self.data.show_reauth_modal = false;
                self.data.auth_expired = false;
            }
        }
    }

    // The role is kept so the re-auth prompt can still greet the user.
    fn expire(&mut self, message: &str) {
        self.session.invalidate();
        self.data.is_loading = false;
        self.data.error = Some(message.to_string());
        self.data.show_reauth_modal = true;
        self.data.auth_expired = true;
    }
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::from_config(&PortalConfig::default())
    }
}

/// Route reported auth failures into `context`
///
/// Holds only a weak reference; once the context is dropped the handler
/// does nothing. Replaces any previously installed handler.
pub fn install_auth_error_handler(context: &SharedAuthContext) {
    let weak = Rc::downgrade(context);
    set_auth_error_callback(Rc::new(move |failure: AuthFailure| {
        let Some(context) = weak.upgrade() else {
            clear_auth_error_callback();
            return;
        };
        match context.try_borrow_mut() {
            Ok(mut context) => context.dispatch(AuthAction::ShowReauthModal),
            Err(_) => warn!(%failure, "auth context busy, dropping auth error"),
        }
    }));
}
