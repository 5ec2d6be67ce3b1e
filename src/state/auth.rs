//! Auth-session state for the current client user.
//!
//! SYSTEM CONTEXT
//! ==============
//! The service facade publishes a new `AuthenticatedUser` on every login,
//! logout, and forced session clear. Views hold a receiver to re-render when
//! the session changes.
//!
//! DESIGN
//! ======
//! The current value lives behind a mutex; changes fan out over a
//! `tokio::sync::broadcast` channel. The channel does not replay: a receiver
//! only sees values published after it subscribed. Callers that need the
//! initial state as well should use [`AuthState::snapshot_and_subscribe`],
//! which reads the value and subscribes under the same lock.
//!
//! The channel holds the last 16 changes. A receiver that falls further
//! behind gets `RecvError::Lagged` with the number of skipped values, then
//! resumes at the oldest retained one. Only the latest session matters, so
//! on `Lagged` a view should re-read [`AuthState::get_authentication`].

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tracing::info;

use crate::net::types::AuthToken;

const AUTH_CHANNEL_CAPACITY: usize = 16;

/// Identity of the current session. No token means no session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Subject id decoded from the token (the user's email).
    pub subject_id: Option<String>,
    pub security_token: Option<AuthToken>,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn new(subject_id: Option<String>, security_token: Option<AuthToken>) -> Self {
        Self { subject_id, security_token }
    }

    /// True when a JWT is present.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.security_token
            .as_ref()
            .is_some_and(|token| token.jwt.is_some())
    }

    /// Token to send with requests; empty when there is no session.
    #[must_use]
    pub fn bearer(&self) -> AuthToken {
        self.security_token.clone().unwrap_or_default()
    }
}

/// Holder for the current `AuthenticatedUser` plus change notifications.
#[derive(Clone)]
pub struct AuthState {
    current: Arc<Mutex<AuthenticatedUser>>,
    changes: broadcast::Sender<AuthenticatedUser>,
}

impl AuthState {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(AUTH_CHANNEL_CAPACITY);
        Self { current: Arc::new(Mutex::new(AuthenticatedUser::default())), changes }
    }

    /// Replace the session and notify subscribers.
    pub fn set_authentication(&self, user: AuthenticatedUser) {
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        info!(subject = user.subject_id.as_deref().unwrap_or("-"), "session updated");
        *current = user.clone();
        // No receivers is fine; the snapshot is still updated.
        let _ = self.changes.send(user);
    }

    /// Drop the session and notify subscribers.
    pub fn clear_authentication(&self) {
        self.set_authentication(AuthenticatedUser::default());
    }

    /// Current session snapshot.
    #[must_use]
    pub fn get_authentication(&self) -> AuthenticatedUser {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Receive sessions published from now on. The current value is not replayed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthenticatedUser> {
        self.changes.subscribe()
    }

    /// Current session plus a receiver for every later change, taken atomically.
    #[must_use]
    pub fn snapshot_and_subscribe(&self) -> (AuthenticatedUser, broadcast::Receiver<AuthenticatedUser>) {
        let current = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        (current.clone(), self.changes.subscribe())
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}
