// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Provider redirect target.

use axum::{routing::get, Router};

use crate::auth::{AuthContext, AuthError};
use crate::policy::CallbackOutcome;

/// Complete the login started by a `LoginRequired` redirect.
///
/// 302 to the landing page on success. Errors answer with the status of the
/// [`AuthError`] (400, 401, 403, 500 or 502).
pub async fn auth_callback(AuthContext(ctx): AuthContext) -> Result<CallbackOutcome, AuthError> {
    ctx.handle_callback().await
}

/// Router serving [`auth_callback`] at `path`.
///
/// Must sit under both the session and the OAuth2 layers.
pub fn callback_router<S>(path: &str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(path, get(auth_callback))
}
