// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session storage contract.

use std::sync::Arc;

use async_trait::async_trait;

/// Session backend failure.
#[derive(Debug, thiserror::Error)]
#[error("session store error: {0}")]
pub struct SessionError(pub String);

/// Key/value storage bound to one client session.
///
/// `store` replaces the whole value in one step, so a request cancelled
/// while refreshing leaves either the old or the new record, never a mix.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, SessionError>;

    async fn store(&self, key: &str, value: String) -> Result<(), SessionError>;

    async fn remove(&self, key: &str) -> Result<(), SessionError>;
}

/// Request extension carrying the caller's session.
///
/// Inserted by the session layer (see [`session_middleware`](super::session_middleware))
/// before the OAuth2 middleware runs.
#[derive(Clone)]
pub struct Session(pub Arc<dyn SessionStore>);

impl Session {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self(store)
    }

    pub fn backend(&self) -> &dyn SessionStore {
        self.0.as_ref()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Session").finish_non_exhaustive()
    }
}
