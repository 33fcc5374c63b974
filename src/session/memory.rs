// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process session storage keyed by a cookie.
//!
//! Sessions live in memory and are lost on restart. The registry is an LRU
//! cache, so memory stays bounded however many cookie-less requests arrive.
//! Suitable for development, tests and single-instance deployments.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use lru::LruCache;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{Session, SessionError, SessionStore};

/// Default session cookie.
pub const DEFAULT_SESSION_COOKIE: &str = "OAUTH2_SESSION";

/// Values of one client session.
#[derive(Debug, Default)]
pub struct MemorySession {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySession {
    async fn load(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn store(&self, key: &str, value: String) -> Result<(), SessionError> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

/// Default number of sessions kept before the least recently used is evicted.
pub const DEFAULT_SESSION_CAPACITY: usize = 10_000;

/// Registry of [`MemorySession`]s, one per session cookie.
///
/// Bounded: once `capacity` sessions exist, creating another evicts the
/// least recently used one. Its owner is sent through the login again.
#[derive(Clone)]
pub struct MemorySessions {
    cookie_name: String,
    sessions: Arc<Mutex<LruCache<String, Arc<MemorySession>>>>,
}

impl Default for MemorySessions {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessions {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SESSION_CAPACITY)
    }

    /// Registry holding at most `capacity` sessions (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            sessions: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Arc<MemorySession>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Session for `id`, marking it as recently used.
    pub fn get(&self, id: &str) -> Option<Arc<MemorySession>> {
        self.lock().get(id).cloned()
    }

    pub fn create(&self) -> (String, Arc<MemorySession>) {
        let id = Uuid::new_v4().to_string();
        let session = Arc::new(MemorySession::new());
        if let Some((evicted, _)) = self.lock().push(id.clone(), Arc::clone(&session)) {
            tracing::debug!(session_id = %evicted, "Evicted least recently used session");
        }
        (id, session)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }
}

/// Attach the caller's [`Session`] to the request.
///
/// Requests without a known session cookie get a new session and a
/// `Set-Cookie` header on the response.
///
/// ```rust,ignore
/// let sessions = MemorySessions::new();
/// let app = Router::new()
///     .route("/", get(home))
///     .layer(axum::middleware::from_fn_with_state(
///         sessions.clone(),
///         session_middleware,
///     ));
/// ```
pub async fn session_middleware(
    State(sessions): State<MemorySessions>,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = cookie_value(request.headers(), sessions.cookie_name())
        .and_then(|id| sessions.get(&id));

    let (session, new_id) = match existing {
        Some(session) => (session, None),
        None => {
            let (id, session) = sessions.create();
            tracing::debug!(session_id = %id, "Created session");
            (session, Some(id))
        }
    };

    request.extensions_mut().insert(Session::new(session));
    let mut response = next.run(request).await;

    if let Some(id) = new_id {
        let cookie = format!(
            "{}={id}; Path=/; HttpOnly; SameSite=Lax",
            sessions.cookie_name()
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "Session cookie is not a valid header value"),
        }
    }

    response
}

/// Value of cookie `name` from the request headers.
pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
