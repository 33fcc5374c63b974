// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::auth::{oauth2_middleware, Identity};
use crate::config;
use crate::policy::AuthPolicy;
use crate::session::{session_middleware, MemorySessions};

pub mod callback;
pub mod health;

pub use callback::{auth_callback, callback_router};

/// Demo application with the callback at [`config::callback_path`].
pub fn router(policy: Arc<dyn AuthPolicy>, sessions: MemorySessions) -> Router {
    router_at(policy, sessions, &config::callback_path())
}

/// Demo application:
///
/// - `GET /` - greets the logged-in caller, redirects to the provider otherwise
/// - `GET /health` - liveness
/// - `GET {callback_path}` - provider redirect target
pub fn router_at(
    policy: Arc<dyn AuthPolicy>,
    sessions: MemorySessions,
    callback_path: &str,
) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health::health))
        .merge(callback_router(callback_path))
        // Layers run bottom-up: the session must exist before the OAuth2 context.
        .layer(from_fn_with_state(policy, oauth2_middleware))
        .layer(from_fn_with_state(sessions, session_middleware))
        .layer(TraceLayer::new_for_http())
}

async fn home(Identity(subject): Identity) -> String {
    format!("Hello, {subject}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::AllowAllPolicy;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn allow_all_app() -> Router {
        router_at(
            Arc::new(AllowAllPolicy::new("localhost")),
            MemorySessions::new(),
            config::DEFAULT_CALLBACK_PATH,
        )
    }

    async fn get_path(app: Router, path: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn home_greets_allow_all_login() {
        let response = get_path(allow_all_app(), "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Hello, localhost");
    }

    #[tokio::test]
    async fn health_reports_auth_mode() {
        let response = get_path(allow_all_app(), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["auth_mode"], "allow_all");
    }

    #[tokio::test]
    async fn callback_under_allow_all_is_forbidden() {
        let response = get_path(allow_all_app(), "/oauth2/callback?code=abc").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn health_probes_keep_session_registry_bounded() {
        let sessions = MemorySessions::with_capacity(16);
        let app = router_at(
            Arc::new(AllowAllPolicy::new("localhost")),
            sessions.clone(),
            config::DEFAULT_CALLBACK_PATH,
        );

        for _ in 0..200 {
            let response = get_path(app.clone(), "/health").await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(sessions.len(), 16);
    }
}
