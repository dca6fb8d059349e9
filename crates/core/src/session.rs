//! Client session state
//!
//! A [`SessionState`] holds the token handed out at login, the instant it
//! expires, and answers whether the user is currently logged in. It is an
//! ordinary value: whoever needs the session is given a reference to it
//! rather than reaching for a global.
//!
//! Two flag policies exist, see [`SessionMode`]. In `Derived` mode the
//! logged-in flag is always `token present && now < expiry`. In `Legacy`
//! mode each setter assigns the flag from its own argument and
//! [`SessionState::read_token`] clears it on every call.

use crate::clock::{Clock, SystemClock};
use crate::config::{SessionConfig, SessionMode};
use crate::events::{ListenerId, Listeners, SessionEvent, SessionListener};
use crate::grant::LoginGrant;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct SessionState {
    mode: SessionMode,
    clock: Arc<dyn Clock>,
    clock_skew: Duration,
    default_ttl: Duration,
    token: Option<String>,
    expiry: Option<DateTime<Utc>>,
    // Only consulted in legacy mode.
    logged_in: bool,
    previous_logged_in: bool,
    listeners: Listeners,
}

impl SessionState {
    /// Empty session
    #[must_use]
    pub fn new(mode: SessionMode, clock: Arc<dyn Clock>) -> Self {
        Self {
            mode,
            clock,
            clock_skew: Duration::zero(),
            default_ttl: SessionConfig::default().default_ttl(),
            token: None,
            expiry: None,
            logged_in: false,
            previous_logged_in: false,
            listeners: Listeners::default(),
        }
    }

    /// Empty session configured from `config`
    #[must_use]
    pub fn with_config(config: &SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config.mode, clock)
            .with_clock_skew(config.clock_skew())
            .with_default_ttl(config.default_ttl())
    }

    /// Treat every expiry as `skew` earlier than stated
    #[must_use]
    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Lifetime given to grants built by [`issue_grant`](Self::issue_grant)
    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    #[must_use]
    pub const fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Stored token, without any validity check
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Stored expiry, without any validity check
    #[must_use]
    pub const fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }

    /// Replace the token
    ///
    /// In legacy mode the logged-in flag becomes `token.is_some()`, whatever
    /// the expiry says.
    pub fn set_token(&mut self, token: Option<String>) {
        debug!(present = token.is_some(), "set_token called");
        let before = self.is_logged_in();

        if self.mode == SessionMode::Legacy {
            self.logged_in = token.is_some();
        }
        self.token = token;

        self.emit_transition(before);
    }

    /// Replace the expiry
    ///
    /// In legacy mode the logged-in flag becomes `expiry.is_some()`, even
    /// with no token stored.
    pub fn set_expiry(&mut self, expiry: Option<DateTime<Utc>>) {
        debug!(expiry = ?expiry, "set_expiry called");
        let before = self.is_logged_in();

        if self.mode == SessionMode::Legacy {
            self.logged_in = expiry.is_some();
        }
        self.expiry = expiry;

        self.emit_transition(before);
    }

    /// Install token and expiry from a login grant in one step
    pub fn establish(&mut self, grant: LoginGrant) {
        debug!(role = %grant.user_role, expires = %grant.expires, "establishing session");
        let before = self.is_logged_in();

        self.token = Some(grant.token);
        self.expiry = Some(grant.expires);
        if self.mode == SessionMode::Legacy {
            self.logged_in = true;
        }

        self.emit_transition(before);
    }

    /// Grant for `token` expiring one default TTL from now
    #[must_use]
    pub fn issue_grant(&self, token: impl Into<String>) -> LoginGrant {
        LoginGrant::issued_now(token, self.default_ttl, self.clock.as_ref())
    }

    /// Token to attach to an outbound request
    ///
    /// Returns the token while the expiry lies in the future. In legacy mode
    /// the call also remembers the current flag in
    /// [`previous_logged_in`](Self::previous_logged_in) and then clears the
    /// flag, whether or not the token was returned. In derived mode nothing
    /// is mutated apart from the remembered flag.
    pub fn read_token(&mut self) -> Option<String> {
        let before = self.is_logged_in();
        self.previous_logged_in = before;

        let unexpired = self.expiry_in_future();
        if self.mode == SessionMode::Legacy {
            self.logged_in = false;
        }

        let token = if unexpired { self.token.clone() } else { None };
        if token.is_none() && self.token.is_some() {
            warn!(expiry = ?self.expiry, "stored token is expired or has no expiry");
        }

        self.emit_transition(before);
        token
    }

    /// Current logged-in flag; never mutates
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        match self.mode {
            SessionMode::Legacy => self.logged_in,
            SessionMode::Derived => self.is_valid(),
        }
    }

    /// Whether a token is stored and its expiry lies in the future
    ///
    /// Evaluated from the stored fields in both modes, so it can be used to
    /// check a legacy session without disturbing its flag.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.token.is_some() && self.expiry_in_future()
    }

    /// Flag value seen by the most recent [`read_token`](Self::read_token)
    #[must_use]
    pub const fn previous_logged_in(&self) -> bool {
        self.previous_logged_in
    }

    /// Time left before the (skew adjusted) expiry, if any remains
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        let deadline = self.effective_expiry()?;
        let left = deadline - self.clock.now();
        (left > Duration::zero()).then_some(left)
    }

    /// Explicit logout: drop token, expiry and flag
    pub fn invalidate(&mut self) {
        debug!("invalidating session");
        let before = self.is_logged_in();

        self.token = None;
        self.expiry = None;
        self.logged_in = false;

        self.emit_transition(before);
    }

    /// Register a callback for login/logout transitions
    pub fn subscribe(&mut self, listener: SessionListener) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Remove a callback; returns whether it was registered
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    // A skew that leaves the representable range counts as already expired.
    fn effective_expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry.map(|expiry| {
            expiry
                .checked_sub_signed(self.clock_skew)
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        })
    }

    fn expiry_in_future(&self) -> bool {
        self.effective_expiry()
            .is_some_and(|deadline| self.clock.now() < deadline)
    }

    fn emit_transition(&self, before: bool) {
        let after = self.is_logged_in();
        if let Some(event) = SessionEvent::transition(before, after, self.clock.now()) {
            info!(mode = self.mode.as_str(), "{event}");
            self.listeners.notify(&event);
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(SessionMode::default(), Arc::new(SystemClock))
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("mode", &self.mode)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("expiry", &self.expiry)
            .field("clock_skew", &self.clock_skew)
            .field("default_ttl", &self.default_ttl)
            .field("logged_in", &self.is_logged_in())
            .field("previous_logged_in", &self.previous_logged_in)
            .field("listeners", &self.listeners)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, MockClock};
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 6, 18, 20, 14, 30).unwrap()
    }

    fn new_session(mode: SessionMode) -> (SessionState, ManualClock) {
        let clock = ManualClock::new(start());
        (SessionState::new(mode, Arc::new(clock.clone())), clock)
    }

    fn recorder(session: &mut SessionState) -> Arc<Mutex<Vec<SessionEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.subscribe(Arc::new(move |event: &SessionEvent| {
            sink.lock().unwrap().push(*event);
        }));
        seen
    }

    #[test]
    fn test_new_session_is_empty() {
        for mode in [SessionMode::Legacy, SessionMode::Derived] {
            let (session, _) = new_session(mode);
            assert_eq!(session.token(), None);
            assert_eq!(session.expiry(), None);
            assert!(!session.is_logged_in());
            assert!(!session.previous_logged_in());
        }
    }

    #[test]
    fn test_legacy_set_token_sets_flag_from_presence() {
        let (mut session, _) = new_session(SessionMode::Legacy);

        session.set_token(Some("abc".to_string()));
        assert!(session.is_logged_in());

        session.set_token(None);
        assert!(!session.is_logged_in());
    }

    #[test]
    fn test_legacy_set_expiry_sets_flag_without_token() {
        let (mut session, _) = new_session(SessionMode::Legacy);

        session.set_expiry(Some(start() + Duration::minutes(10)));
        assert!(session.is_logged_in());
        assert_eq!(session.token(), None);

        session.set_expiry(None);
        assert!(!session.is_logged_in());
    }

    #[test]
    fn test_legacy_token_then_future_expiry() {
        let (mut session, _) = new_session(SessionMode::Legacy);

        session.set_token(Some("abc".to_string()));
        assert!(session.is_logged_in());
        session.set_expiry(Some(start() + Duration::minutes(10)));
        assert!(session.is_logged_in());
    }

    #[test]
    fn test_legacy_past_expiry_read_returns_none() {
        let (mut session, _) = new_session(SessionMode::Legacy);

        session.set_expiry(Some(start() - Duration::seconds(1)));
        assert!(session.is_logged_in());

        assert_eq!(session.read_token(), None);
        assert!(!session.is_logged_in());
        assert!(session.previous_logged_in());
    }

    #[test]
    fn test_legacy_read_is_destructive() {
        let (mut session, _) = new_session(SessionMode::Legacy);

        session.set_token(Some("abc".to_string()));
        session.set_expiry(Some(start() + Duration::minutes(10)));

        assert_eq!(session.read_token(), Some("abc".to_string()));
        assert!(!session.is_logged_in());
        assert!(session.previous_logged_in());

        // The token is still handed out; only the flag was cleared.
        assert_eq!(session.read_token(), Some("abc".to_string()));
        assert!(!session.previous_logged_in());
    }

    #[test]
    fn test_legacy_read_without_expiry() {
        let (mut session, _) = new_session(SessionMode::Legacy);

        session.set_token(Some("abc".to_string()));
        assert_eq!(session.read_token(), None);
        assert!(!session.is_logged_in());
    }

    #[test]
    fn test_is_logged_in_is_idempotent() {
        for mode in [SessionMode::Legacy, SessionMode::Derived] {
            let (mut session, _) = new_session(mode);
            session.set_token(Some("abc".to_string()));
            session.set_expiry(Some(start() + Duration::minutes(10)));

            let first = session.is_logged_in();
            let second = session.is_logged_in();
            assert_eq!(first, second);
            assert!(first);
        }
    }

    #[test]
    fn test_derived_requires_token_and_future_expiry() {
        let (mut session, _) = new_session(SessionMode::Derived);

        session.set_token(Some("abc".to_string()));
        assert!(!session.is_logged_in());

        session.set_token(None);
        session.set_expiry(Some(start() + Duration::minutes(10)));
        assert!(!session.is_logged_in());

        session.set_token(Some("abc".to_string()));
        assert!(session.is_logged_in());
    }

    #[test]
    fn test_derived_expires_with_clock() {
        let (mut session, clock) = new_session(SessionMode::Derived);
        session.establish(LoginGrant::issued_now("abc", Duration::minutes(10), &clock));
        assert!(session.is_logged_in());

        clock.advance(Duration::minutes(10) - Duration::seconds(1));
        assert!(session.is_logged_in());

        clock.advance(Duration::seconds(1));
        assert!(!session.is_logged_in());
        assert_eq!(session.read_token(), None);
        // Expired, but still stored until someone invalidates it.
        assert_eq!(session.token(), Some("abc"));
    }

    #[test]
    fn test_derived_read_is_not_destructive() {
        let (mut session, clock) = new_session(SessionMode::Derived);
        session.establish(LoginGrant::issued_now("abc", Duration::minutes(10), &clock));

        assert_eq!(session.read_token(), Some("abc".to_string()));
        assert!(session.is_logged_in());
        assert_eq!(session.read_token(), Some("abc".to_string()));
        assert!(session.previous_logged_in());
    }

    #[test]
    fn test_invalidate_clears_everything() {
        for mode in [SessionMode::Legacy, SessionMode::Derived] {
            let (mut session, clock) = new_session(mode);
            session.establish(LoginGrant::issued_now("abc", Duration::minutes(10), &clock));
            assert!(session.is_logged_in());

            session.invalidate();
            assert!(!session.is_logged_in());
            assert_eq!(session.token(), None);
            assert_eq!(session.expiry(), None);
            assert_eq!(session.read_token(), None);
        }
    }

    #[test]
    fn test_clock_skew_shortens_session() {
        let (session, clock) = new_session(SessionMode::Derived);
        let mut session = session.with_clock_skew(Duration::seconds(30));
        session.establish(LoginGrant::issued_now("abc", Duration::minutes(1), &clock));

        assert_eq!(session.remaining(), Some(Duration::seconds(30)));
        clock.advance(Duration::seconds(30));
        assert!(!session.is_logged_in());
        assert_eq!(session.remaining(), None);
    }

    #[test]
    fn test_oversized_skew_treated_as_expired() {
        let config = SessionConfig {
            clock_skew_secs: i64::MAX,
            ..SessionConfig::default()
        };
        for mode in [SessionMode::Legacy, SessionMode::Derived] {
            let clock = ManualClock::new(start());
            let mut session = SessionState::with_config(
                &SessionConfig { mode, ..config.clone() },
                Arc::new(clock),
            );

            session.set_token(Some("abc".to_string()));
            session.set_expiry(Some(start() + Duration::minutes(10)));

            assert!(!session.is_valid());
            assert_eq!(session.remaining(), None);
            assert_eq!(session.read_token(), None);
            assert!(!session.is_logged_in());
        }
    }

    #[test]
    fn test_negative_skew_overflow_treated_as_expired() {
        let (session, _) = new_session(SessionMode::Derived);
        let mut session = session.with_clock_skew(Duration::MIN);
        session.establish(LoginGrant {
            token: "abc".to_string(),
            user_role: "user".to_string(),
            expires: DateTime::<Utc>::MAX_UTC,
        });

        assert!(!session.is_logged_in());
        assert_eq!(session.read_token(), None);
    }

    #[test]
    fn test_issue_grant_uses_configured_ttl() {
        let config = SessionConfig {
            default_ttl_secs: 90,
            ..SessionConfig::default()
        };
        let clock = ManualClock::new(start());
        let mut session = SessionState::with_config(&config, Arc::new(clock.clone()));

        let grant = session.issue_grant("abc");
        assert_eq!(grant.expires, start() + Duration::seconds(90));

        session.establish(grant);
        assert_eq!(session.remaining(), Some(Duration::seconds(90)));
        clock.advance(Duration::seconds(90));
        assert!(!session.is_logged_in());
    }

    #[test]
    fn test_issue_grant_defaults_to_ten_minutes() {
        let (session, _) = new_session(SessionMode::Derived);
        assert_eq!(
            session.issue_grant("abc").expires,
            start() + Duration::minutes(10)
        );
    }

    #[test]
    fn test_with_config_applies_mode_and_skew() {
        let config = SessionConfig {
            mode: SessionMode::Legacy,
            clock_skew_secs: 5,
            ..SessionConfig::default()
        };
        let clock = ManualClock::new(start());
        let mut session = SessionState::with_config(&config, Arc::new(clock));

        assert_eq!(session.mode(), SessionMode::Legacy);
        session.set_token(Some("abc".to_string()));
        session.set_expiry(Some(start() + Duration::seconds(5)));
        // Within the skew window: flag says yes, the read says no.
        assert!(session.is_logged_in());
        assert_eq!(session.read_token(), None);
    }

    #[test]
    fn test_transitions_notify_listeners() {
        let (mut session, clock) = new_session(SessionMode::Derived);
        let seen = recorder(&mut session);

        session.set_token(Some("abc".to_string()));
        assert!(seen.lock().unwrap().is_empty());

        session.set_expiry(Some(start() + Duration::minutes(10)));
        session.set_token(Some("def".to_string()));
        clock.advance(Duration::minutes(1));
        session.invalidate();

        let events = seen.lock().unwrap();
        assert_eq!(
            events.as_slice(),
            &[
                SessionEvent::LoggedIn { at: start() },
                SessionEvent::LoggedOut {
                    at: start() + Duration::minutes(1)
                },
            ]
        );
    }

    #[test]
    fn test_legacy_read_emits_logout() {
        let (mut session, _) = new_session(SessionMode::Legacy);
        let seen = recorder(&mut session);

        session.set_token(Some("abc".to_string()));
        session.set_expiry(Some(start() + Duration::minutes(10)));
        session.read_token();

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].is_login());
        assert!(!events[1].is_login());
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let (mut session, clock) = new_session(SessionMode::Derived);
        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);
        let id = session.subscribe(Arc::new(move |_: &SessionEvent| {
            *sink.lock().unwrap() += 1;
        }));

        assert!(session.unsubscribe(id));
        session.establish(LoginGrant::issued_now("abc", Duration::minutes(10), &clock));
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn test_expiry_compared_against_clock() {
        let expiry = start() + Duration::minutes(10);
        let mut clock = MockClock::new();
        clock.expect_now().times(1).return_const(expiry);

        let mut session = SessionState::new(SessionMode::Derived, Arc::new(clock));
        session.token = Some("abc".to_string());
        session.expiry = Some(expiry);

        // now == expiry counts as expired
        assert!(!session.is_valid());
    }

    #[test]
    fn test_debug_redacts_token() {
        let (mut session, _) = new_session(SessionMode::Derived);
        session.set_token(Some("secret-token".to_string()));
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
