//! Login state transition notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Emitted whenever the logged-in flag flips as a result of a session operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    LoggedIn { at: DateTime<Utc> },
    LoggedOut { at: DateTime<Utc> },
}

impl SessionEvent {
    /// Build the event for a flag change, if there was one
    #[must_use]
    pub const fn transition(before: bool, after: bool, at: DateTime<Utc>) -> Option<Self> {
        match (before, after) {
            (false, true) => Some(Self::LoggedIn { at }),
            (true, false) => Some(Self::LoggedOut { at }),
            _ => None,
        }
    }

    /// When the transition was observed
    #[must_use]
    pub const fn at(&self) -> DateTime<Utc> {
        match self {
            Self::LoggedIn { at } | Self::LoggedOut { at } => *at,
        }
    }

    #[must_use]
    pub const fn is_login(&self) -> bool {
        matches!(self, Self::LoggedIn { .. })
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoggedIn { at } => write!(f, "logged in at {at}"),
            Self::LoggedOut { at } => write!(f, "logged out at {at}"),
        }
    }
}

/// Callback invoked with each transition
pub type SessionListener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, SessionListener)>,
}

impl Listeners {
    pub(crate) fn add(&mut self, listener: SessionListener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn notify(&self, event: &SessionEvent) {
        for (_, listener) in &self.entries {
            listener(event);
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.len())
            .finish()
    }
}
