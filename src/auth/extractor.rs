// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the authenticated identity.
//!
//! Use the `Identity` extractor in handlers that require a login:
//!
//! ```rust,ignore
//! async fn home(Identity(subject): Identity) -> impl IntoResponse {
//!     format!("Hello, {subject}")
//! }
//! ```
//!
//! All extractors read the [`RequestContext`] installed by
//! [`oauth2_middleware`](super::middleware::oauth2_middleware); using them
//! on a route without the middleware is a configuration error (500).

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::context::RequestContext;
use super::AuthError;

/// The request's authentication context.
#[derive(Debug, Clone)]
pub struct AuthContext(pub Arc<RequestContext>);

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<RequestContext>>()
            .cloned()
            .map(AuthContext)
            .ok_or_else(|| {
                tracing::error!(
                    path = %parts.uri.path(),
                    "Authentication extractor used on a route without the OAuth2 middleware"
                );
                AuthError::ConfigurationError(
                    "authentication middleware is not installed".to_string(),
                )
            })
    }
}

/// Subject of a logged-in caller.
///
/// Rejections: 302 to the provider when a login is needed, 403 when the
/// caller is not authenticated, 401 when the session was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub String);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthContext(ctx) = AuthContext::from_request_parts(parts, state).await?;
        let outcome = ctx.identity().await?.clone();
        outcome.into_result().map(Identity)
    }
}

/// Subject when the caller is logged in, `None` otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalIdentity(pub Option<String>);

impl<S> FromRequestParts<S> for OptionalIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthContext(ctx) = AuthContext::from_request_parts(parts, state).await?;
        let subject = ctx.identity().await?.subject().map(str::to_string);
        Ok(OptionalIdentity(subject))
    }
}

/// Whether the bypass policy is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowAllMode(pub bool);

impl<S> FromRequestParts<S> for AllowAllMode
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthContext(ctx) = AuthContext::from_request_parts(parts, state).await?;
        Ok(AllowAllMode(ctx.is_allow_all()))
    }
}
