// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth2 middleware for Axum.
//!
//! Attaches a [`RequestContext`] to every request under the layer. The
//! middleware itself never rejects a request; handlers decide through the
//! extractors in [`extractor`](super::extractor).
//!
//! The session layer must run before this one:
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/", get(home))
//!     .layer(axum::middleware::from_fn_with_state(policy, oauth2_middleware))
//!     .layer(axum::middleware::from_fn_with_state(sessions, session_middleware));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::Uri,
    middleware::Next,
    response::Response,
};

use super::context::RequestContext;
use crate::policy::AuthPolicy;
use crate::session::Session;

/// Authentication middleware function.
pub async fn oauth2_middleware(
    State(policy): State<Arc<dyn AuthPolicy>>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = request.extensions().get::<Session>().cloned();
    if session.is_none() {
        tracing::debug!(path = %request.uri().path(), "Request has no session");
    }

    let query = query_params(request.uri());
    let context = RequestContext::new(Some(policy), session, query);
    request.extensions_mut().insert(Arc::new(context));

    next.run(request).await
}

/// Decoded query string. Later duplicates win.
pub(crate) fn query_params(uri: &Uri) -> HashMap<String, String> {
    uri.query()
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}
