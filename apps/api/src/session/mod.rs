//! Per-user session state and the in-memory store that owns it.
//!
//! Stage functions never mutate a session in place: they read a
//! `SessionState` and return the next one, and the handler commits it only
//! after the whole stage succeeded.

pub mod handlers;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::projection::models::{Projection, Selections};
use crate::projection::preferences::PreferenceResponse;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub selections: Option<Selections>,
    /// Raw explanation response, embedded verbatim by later prompts.
    pub explanation: Option<String>,
    /// Raw chart response, embedded verbatim by the plan and transition prompts.
    pub chart_response: Option<String>,
    pub projection: Option<Projection>,
    pub plan: Option<String>,
    pub revised_projection: Option<Projection>,
    pub transition_projection: Option<Projection>,
    pub responses_history: Vec<PreferenceResponse>,
    /// 0 before the questionnaire starts; question `n` is asked at step `n`.
    pub step: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            selections: None,
            explanation: None,
            chart_response: None,
            projection: None,
            plan: None,
            revised_projection: None,
            transition_projection: None,
            responses_history: Vec::new(),
            step: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// The explanation, if one is present and non-empty.
    pub fn require_explanation(&self) -> Result<&str, AppError> {
        self.explanation
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                AppError::StageNotReady("Get an explanation before this step".to_string())
            })
    }

    /// The raw chart text and its parsed projection.
    pub fn require_chart(&self) -> Result<(&str, &Projection), AppError> {
        match (self.chart_response.as_deref(), self.projection.as_ref()) {
            (Some(raw), Some(projection)) if !raw.trim().is_empty() => Ok((raw, projection)),
            _ => Err(AppError::StageNotReady(
                "Show the chart before this step".to_string(),
            )),
        }
    }

    /// Clears everything derived from the explanation.
    pub fn clear_downstream_of_explanation(&mut self) {
        self.chart_response = None;
        self.projection = None;
        self.clear_downstream_of_chart();
    }

    /// Clears everything derived from the chart.
    pub fn clear_downstream_of_chart(&mut self) {
        self.plan = None;
        self.revised_projection = None;
        self.transition_projection = None;
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// A session guarded by an async mutex. Holding the lock for a whole action
/// keeps the stages of one session strictly sequential.
pub type SessionHandle = Arc<Mutex<SessionState>>;

struct SessionEntry {
    handle: SessionHandle,
    last_seen: Instant,
}

impl SessionEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_seen.elapsed() > ttl
    }

    /// An action still holds a clone of the handle.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.handle) > 1
    }
}

/// In-memory sessions with idle expiry. Expired entries are swept on
/// `create` and dropped on `get`.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<Uuid, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn create(&self) -> Uuid {
        self.evict_expired();

        let id = Uuid::new_v4();
        self.sessions.insert(
            id,
            SessionEntry {
                handle: Arc::new(Mutex::new(SessionState::new())),
                last_seen: Instant::now(),
            },
        );
        id
    }

    pub fn get(&self, id: Uuid) -> Result<SessionHandle, AppError> {
        let not_found = || AppError::NotFound(format!("Session {id} not found"));

        let mut entry = self.sessions.get_mut(&id).ok_or_else(not_found)?;
        if entry.is_expired(self.ttl) && !entry.in_use() {
            drop(entry);
            self.sessions.remove(&id);
            debug!(%id, "Session expired");
            return Err(not_found());
        }
        entry.last_seen = Instant::now();
        Ok(Arc::clone(&entry.handle))
    }

    pub fn remove(&self, id: Uuid) -> bool {
        self.sessions.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Drops every idle session past the TTL.
    pub fn evict_expired(&self) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        self.sessions
            .retain(|_, entry| entry.in_use() || !entry.is_expired(ttl));
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            debug!(evicted, "Evicted idle sessions");
        }
        evicted
    }
}
