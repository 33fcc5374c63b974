// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// Every variant maps to an HTTP response. Session decode failures are not
/// represented here: they are recovered inside the policy and never reach a
/// handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The provider answered the flow with an `error` code
    ProviderRejected(String),
    /// The provider returned an HTML error page; forwarded verbatim
    UpstreamHtml { content_type: String, body: String },
    /// Identity token signature, expiry or audience check failed
    InvalidToken(String),
    /// Token exchange succeeded but the expected claims/fields are missing
    TokenExchangeFailed,
    /// The request does not have a legitimate callback shape
    Forbidden,
    /// The caller must authenticate with the provider first
    LoginRequired { authorization_url: String },
    /// The session could not be trusted or updated for this request
    Unauthorized(String),
    /// The provider could not be reached or answered garbage
    ProviderUnavailable(String),
    /// The session store refused a read or write
    SessionStore(String),
    /// Middleware or session layer not installed
    ConfigurationError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::ProviderRejected(_) => "provider_rejected",
            AuthError::UpstreamHtml { .. } => "upstream_html",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::TokenExchangeFailed => "token_exchange_failed",
            AuthError::Forbidden => "forbidden",
            AuthError::LoginRequired { .. } => "login_required",
            AuthError::Unauthorized(_) => "unauthorized",
            AuthError::ProviderUnavailable(_) => "provider_unavailable",
            AuthError::SessionStore(_) => "session_store_error",
            AuthError::ConfigurationError(_) => "configuration_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::ProviderRejected(_)
            | AuthError::UpstreamHtml { .. }
            | AuthError::TokenExchangeFailed => StatusCode::BAD_REQUEST,
            AuthError::InvalidToken(_) | AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::LoginRequired { .. } => StatusCode::FOUND,
            AuthError::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            AuthError::SessionStore(_) | AuthError::ConfigurationError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::ProviderRejected(reason) => {
                write!(f, "Identity provider rejected the request: {reason}")
            }
            AuthError::UpstreamHtml { .. } => {
                write!(f, "Identity provider returned an error page")
            }
            AuthError::InvalidToken(reason) => write!(f, "Identity token is invalid: {reason}"),
            AuthError::TokenExchangeFailed => write!(f, "Failed to obtain OAuth2 access token."),
            AuthError::Forbidden => write!(f, "Forbidden"),
            AuthError::LoginRequired { .. } => write!(f, "Authentication required"),
            AuthError::Unauthorized(reason) => write!(f, "Not authenticated: {reason}"),
            AuthError::ProviderUnavailable(reason) => {
                write!(f, "Identity provider is unavailable: {reason}")
            }
            AuthError::SessionStore(reason) => write!(f, "Session storage failed: {reason}"),
            AuthError::ConfigurationError(reason) => {
                write!(f, "Authentication is misconfigured: {reason}")
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            AuthError::LoginRequired { authorization_url } => {
                let mut response = status.into_response();
                match HeaderValue::from_str(&authorization_url) {
                    Ok(location) => {
                        response.headers_mut().insert(header::LOCATION, location);
                        response
                    }
                    Err(_) => AuthError::ConfigurationError(
                        "authorization URL is not a valid header value".to_string(),
                    )
                    .into_response(),
                }
            }
            AuthError::UpstreamHtml { content_type, body } => {
                let content_type = HeaderValue::from_str(&content_type)
                    .unwrap_or_else(|_| HeaderValue::from_static("text/html"));
                (status, [(header::CONTENT_TYPE, content_type)], body).into_response()
            }
            other => {
                let body = Json(AuthErrorBody {
                    error: other.to_string(),
                    error_code: other.error_code().to_string(),
                });
                (status, body).into_response()
            }
        }
    }
}
