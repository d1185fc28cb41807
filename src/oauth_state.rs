//! Pending OAuth `state` tokens for the sign-in round trip.
//!
//! Each token is issued for one user, can be consumed once, and stops being
//! accepted after its time to live. Time comes from an injected [`Clock`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::debug;

use crate::clock::Clock;

const TOKEN_LEN: usize = 32;

#[derive(Debug, Clone)]
struct PendingState {
    user_id: String,
    expires_at: DateTime<Utc>,
}

pub struct PendingStateStore {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    pending: Mutex<HashMap<String, PendingState>>,
}

impl PendingStateStore {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, PendingState>> {
        // A poisoned map is still usable.
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Issues a fresh token for `user_id`.
    pub fn issue(&self, user_id: &str) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();

        let expires_at = self.clock.now() + self.ttl;
        self.pending().insert(
            token.clone(),
            PendingState {
                user_id: user_id.to_string(),
                expires_at,
            },
        );
        token
    }

    /// Removes the token and returns its user if it was still valid.
    pub fn consume(&self, token: &str) -> Option<String> {
        let state = self.pending().remove(token)?;
        if state.expires_at <= self.clock.now() {
            return None;
        }
        Some(state.user_id)
    }

    /// Drops every expired token and returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut pending = self.pending();
        let before = pending.len();
        pending.retain(|_, state| state.expires_at > now);
        let removed = before - pending.len();
        if removed > 0 {
            debug!(removed, "swept expired oauth states");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending().is_empty()
    }
}
