// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Policies
//!
//! A policy decides who the caller is and processes the provider callback.
//! Exactly one policy is selected at setup:
//!
//! - [`SessionOAuth2Policy`] - authorization-code flow, identity kept in
//!   the session and refreshed when stale
//! - [`AllowAllPolicy`] - fixed identity, no verification (trusted or
//!   local environments only)

pub mod allow_all;
pub mod session_oauth2;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
};
use url::Url;

use crate::auth::verifier::{IdentityVerifier, TrustedKey};
use crate::auth::AuthError;
use crate::config::{self, ClientConfig, ConfigError, BYPASS_LOGIN};
use crate::oauth::TokenClient;
use crate::session::SessionStore;

pub use allow_all::AllowAllPolicy;
pub use session_oauth2::SessionOAuth2Policy;

/// What a policy sees of an incoming request.
pub struct AuthRequest<'a> {
    pub query: &'a HashMap<String, String>,
    pub session: &'a dyn SessionStore,
}

impl<'a> AuthRequest<'a> {
    pub fn new(query: &'a HashMap<String, String>, session: &'a dyn SessionStore) -> Self {
        Self { query, session }
    }

    /// Non-empty query parameter.
    pub fn param(&self, name: &str) -> Option<&'a str> {
        self.query
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Result of asking a policy who the caller is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(String),
    Unauthenticated,
    /// The caller has to go through the provider's authorization page.
    RedirectRequired(Url),
    Rejected(String),
}

impl AuthOutcome {
    pub fn subject(&self) -> Option<&str> {
        match self {
            AuthOutcome::Authenticated(subject) => Some(subject),
            _ => None,
        }
    }

    /// The subject, or the error response a protected handler should give.
    pub fn into_result(self) -> Result<String, AuthError> {
        match self {
            AuthOutcome::Authenticated(subject) => Ok(subject),
            AuthOutcome::Unauthenticated => Err(AuthError::Forbidden),
            AuthOutcome::RedirectRequired(url) => Err(AuthError::LoginRequired {
                authorization_url: url.into(),
            }),
            AuthOutcome::Rejected(reason) => Err(AuthError::Unauthorized(reason)),
        }
    }
}

/// Successful callback handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Send the user to this application path.
    Redirect(String),
}

impl IntoResponse for CallbackOutcome {
    fn into_response(self) -> Response {
        match self {
            CallbackOutcome::Redirect(location) => {
                (StatusCode::FOUND, [(LOCATION, location)]).into_response()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    SessionOAuth2,
    AllowAll,
}

/// Authentication policy attached to the request pipeline.
#[async_trait]
pub trait AuthPolicy: Send + Sync {
    /// Identify the caller.
    async fn get_identity(&self, request: &AuthRequest<'_>) -> AuthOutcome;

    /// Process the provider's redirect back to the application.
    async fn handle_callback(&self, request: &AuthRequest<'_>)
        -> Result<CallbackOutcome, AuthError>;

    fn kind(&self) -> PolicyKind;
}

/// Build the policy for this process.
///
/// The bypass policy wins when [`config::DISABLE_LOGIN_ENV`] is set;
/// otherwise the client configuration is loaded from `config_path`.
pub fn create_policy(
    config_path: impl AsRef<Path>,
    certificate_path: Option<&Path>,
) -> Result<Arc<dyn AuthPolicy>, ConfigError> {
    if config::login_disabled()? {
        tracing::warn!(
            login = BYPASS_LOGIN,
            "OAuth2 login is disabled; every request is authenticated"
        );
        return Ok(Arc::new(AllowAllPolicy::new(BYPASS_LOGIN)));
    }

    let client_config = ClientConfig::from_file(config_path)?;
    let trusted_key = certificate_path.map(TrustedKey::from_file).transpose()?;
    build_session_policy(client_config, trusted_key)
}

/// [`create_policy`] with paths taken from the environment.
pub fn create_policy_from_env() -> Result<Arc<dyn AuthPolicy>, ConfigError> {
    let config_path = std::env::var(config::CONFIG_PATH_ENV)
        .unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.to_string());
    let certificate_path = std::env::var(config::CERTIFICATE_PATH_ENV).ok();
    create_policy(config_path, certificate_path.as_deref().map(Path::new))
}

fn build_session_policy(
    client_config: ClientConfig,
    trusted_key: Option<TrustedKey>,
) -> Result<Arc<dyn AuthPolicy>, ConfigError> {
    if trusted_key.is_none() {
        tracing::warn!(
            client_id = %client_config.client_id,
            "No provider certificate configured; identity token signatures will not be verified"
        );
    }

    let verifier = IdentityVerifier::for_client(&client_config, trusted_key);
    let client = TokenClient::new(client_config)?;
    Ok(Arc::new(SessionOAuth2Policy::new(client, verifier)))
}
