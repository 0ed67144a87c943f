use std::time::{Duration, Instant};

use axum::http::header::{self, HeaderValue};
use axum::http::HeaderMap;
use axum::response::{IntoResponseParts, ResponseParts};
use dashmap::DashMap;

use super::queue::SessionPlaybackState;
use super::validation::SessionId;

pub const SESSION_COOKIE: &str = "jukebox_session";

/// Where session playback state lives between requests.
pub trait SessionStore: Send + Sync {
    fn get(&self, id: &SessionId) -> Option<SessionPlaybackState>;

    /// Stores `state` and refreshes the session's activity time
    fn set(&self, id: &SessionId, state: SessionPlaybackState);

    /// Refreshes the activity time without changing the state
    fn touch(&self, id: &SessionId);

    /// Drops sessions idle for at least `ttl`. Returns how many were removed.
    fn purge_expired(&self, ttl: Duration) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct StoredSession {
    state: SessionPlaybackState,
    last_activity: Instant, // Used to measure the age of the session
}

/// In-process session store. DashMap shards the map so requests from
/// different sessions never contend on one lock.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionId, StoredSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, id: &SessionId) -> Option<SessionPlaybackState> {
        self.sessions.get(id).map(|s| s.state.clone())
    }

    fn set(&self, id: &SessionId, state: SessionPlaybackState) {
        self.sessions.insert(
            id.clone(),
            StoredSession {
                state,
                last_activity: Instant::now(),
            },
        );
    }

    fn touch(&self, id: &SessionId) {
        if let Some(mut session) = self.sessions.get_mut(id) {
            session.last_activity = Instant::now();
        }
    }

    fn purge_expired(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();

        self.sessions.retain(|session_id, session| {
            let age = now.duration_since(session.last_activity);
            let keep = age < ttl;
            if !keep {
                tracing::info!(
                    "Cleaning up stale session: {} (age: {}s)",
                    session_id,
                    age.as_secs()
                );
            }
            keep
        });

        before.saturating_sub(self.sessions.len())
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}

/// Returns the stored state for `id`, creating a fresh one on first contact.
pub fn load_or_create(store: &dyn SessionStore, id: &SessionId) -> SessionPlaybackState {
    match store.get(id) {
        Some(state) => {
            store.touch(id);
            state
        }
        None => {
            tracing::debug!("Creating session {}", id);
            let state = SessionPlaybackState::default();
            store.set(id, state.clone());
            state
        }
    }
}

/// Extracts the session id from the request cookies. A missing or
/// tampered value gets a freshly minted id.
pub fn get_session_id(headers: &HeaderMap) -> SessionId {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|cookie| cookie.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| {
            cookie
                .trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .and_then(|raw| SessionId::new(raw.to_string()).ok())
        .unwrap_or_else(SessionId::generate)
}

/// `Set-Cookie` response part that pins the client to its session.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub id: SessionId,
    pub max_age: Duration,
}

impl SessionCookie {
    pub fn new(id: SessionId, max_age: Duration) -> Self {
        Self { id, max_age }
    }

    pub fn header_value(&self) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            self.id,
            self.max_age.as_secs()
        )
    }
}

impl IntoResponseParts for SessionCookie {
    type Error = std::convert::Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        // The value is built from a validated UUID and ASCII literals
        if let Ok(value) = HeaderValue::from_str(&self.header_value()) {
            res.headers_mut().append(header::SET_COOKIE, value);
        }
        Ok(res)
    }
}

/// Periodically drops sessions idle longer than `ttl`.
pub async fn cleanup_stale_sessions(store: std::sync::Arc<dyn SessionStore>, ttl: Duration) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));

    loop {
        // Fires immediately, then every 60s
        interval.tick().await;

        let removed = store.purge_expired(ttl);
        if removed > 0 {
            tracing::info!("Cleaned up {} stale session(s)", removed);
        }
    }
}
