//! Saved browser sessions.
//!
//! Sessions are created and destroyed by the page driver; the knowledge store
//! only keeps a save/restore snapshot of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum history entries kept per session snapshot.
pub const MAX_HISTORY: usize = 200;

/// One entry of a session's history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    /// What happened, e.g. `navigate` or `action:authenticate`.
    pub event: String,
    pub url: String,
    pub success: bool,
}

/// Persisted snapshot of a browser session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    /// Domains the session is known to be authenticated on.
    #[serde(default)]
    pub auth_domains: Vec<String>,
    /// Driver-specific storage state (cookies, origin data). Opaque here.
    #[serde(default)]
    pub storage_state: serde_json::Value,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl Session {
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at: now,
            last_active: now,
            auth_domains: Vec::new(),
            storage_state: serde_json::Value::Null,
            history: Vec::new(),
        }
    }

    /// Append to the history log, dropping the oldest entries past [`MAX_HISTORY`].
    pub fn record(&mut self, at: DateTime<Utc>, event: impl Into<String>, url: impl Into<String>, success: bool) {
        self.history.push(HistoryEntry {
            at,
            event: event.into(),
            url: url.into(),
            success,
        });
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }
        self.last_active = at;
    }

    pub fn add_auth_domain(&mut self, domain: &str) {
        if !self.auth_domains.iter().any(|d| d == domain) {
            self.auth_domains.push(domain.to_string());
        }
    }
}
