// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session-backed OAuth2 authorization-code policy.
//!
//! ## Identity resolution
//!
//! | Stored session | Result |
//! |----------------|--------|
//! | absent, unreadable or undecodable | redirect to the provider |
//! | younger than `max_age` | authenticated, provider not contacted |
//! | older than `max_age` | one refresh; success re-stores the record, failure drops it and redirects |

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use super::{AuthOutcome, AuthPolicy, AuthRequest, CallbackOutcome, PolicyKind};
use crate::auth::verifier::IdentityVerifier;
use crate::auth::AuthError;
use crate::oauth::TokenClient;
use crate::session::{self, SessionRecord, SessionStore};

/// Session key holding the encoded [`SessionRecord`].
pub const DEFAULT_SESSION_KEY: &str = "OAUTH2_OID";

/// Where the callback sends the user after a successful login.
pub const DEFAULT_LANDING_PATH: &str = "/";

#[derive(Debug, Clone)]
pub struct SessionOAuth2Policy {
    client: TokenClient,
    verifier: IdentityVerifier,
    session_key: String,
    landing_path: String,
}

impl SessionOAuth2Policy {
    pub fn new(client: TokenClient, verifier: IdentityVerifier) -> Self {
        Self {
            client,
            verifier,
            session_key: DEFAULT_SESSION_KEY.to_string(),
            landing_path: DEFAULT_LANDING_PATH.to_string(),
        }
    }

    #[must_use]
    pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = key.into();
        self
    }

    #[must_use]
    pub fn with_landing_path(mut self, path: impl Into<String>) -> Self {
        self.landing_path = path.into();
        self
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn client(&self) -> &TokenClient {
        &self.client
    }

    /// Stored record, or `None` for anything that is not a usable session.
    async fn load_record(&self, store: &dyn SessionStore) -> Option<SessionRecord> {
        let raw = match store.load(&self.session_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No OAuth2 session");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to load OAuth2 session");
                return None;
            }
        };

        match session::decode(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Discarding unusable OAuth2 session");
                None
            }
        }
    }

    async fn refresh(&self, store: &dyn SessionStore, record: SessionRecord) -> AuthOutcome {
        debug!(
            subject = %record.subject_id,
            issued_at = %record.issued_at,
            max_age = record.max_age,
            "OAuth2 session is stale, refreshing"
        );

        let tokens = match self.client.refresh_tokens(&record).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(subject = %record.subject_id, error = %e, "Token refresh failed");
                if let Err(e) = store.remove(&self.session_key).await {
                    warn!(error = %e, "Failed to remove stale OAuth2 session");
                }
                return AuthOutcome::RedirectRequired(self.client.authorization_url());
            }
        };

        let refreshed = record.refreshed(&tokens, Utc::now());
        if let Err(e) = store
            .store(&self.session_key, session::encode(&refreshed))
            .await
        {
            warn!(subject = %refreshed.subject_id, error = %e, "Failed to store refreshed session");
            return AuthOutcome::Rejected("session could not be updated".to_string());
        }

        debug!(subject = %refreshed.subject_id, max_age = refreshed.max_age, "OAuth2 session refreshed");
        AuthOutcome::Authenticated(refreshed.subject_id)
    }

    async fn complete_login(
        &self,
        store: &dyn SessionStore,
        code: &str,
    ) -> Result<CallbackOutcome, AuthError> {
        let tokens = self.client.exchange_code_for_tokens(code).await?;

        let id_token = tokens.id_token.as_deref().ok_or_else(|| {
            warn!("Token response has no id_token");
            AuthError::TokenExchangeFailed
        })?;
        let identity = self.verifier.verify(id_token).inspect_err(|e| {
            warn!(error = %e, "Identity token rejected");
        })?;

        let record = SessionRecord::from_tokens(identity.into_subject(), &tokens, Utc::now())
            .ok_or_else(|| {
                warn!("Token response lacks refresh_token or expires_in");
                AuthError::TokenExchangeFailed
            })?;

        store
            .store(&self.session_key, session::encode(&record))
            .await
            .map_err(|e| {
                warn!(subject = %record.subject_id, error = %e, "Failed to store OAuth2 session");
                AuthError::SessionStore("session could not be saved".to_string())
            })?;

        info!(subject = %record.subject_id, max_age = record.max_age, "OAuth2 login completed");
        Ok(CallbackOutcome::Redirect(self.landing_path.clone()))
    }
}

#[async_trait]
impl AuthPolicy for SessionOAuth2Policy {
    async fn get_identity(&self, request: &AuthRequest<'_>) -> AuthOutcome {
        let Some(record) = self.load_record(request.session).await else {
            return AuthOutcome::RedirectRequired(self.client.authorization_url());
        };

        if !record.is_stale(Utc::now()) {
            return AuthOutcome::Authenticated(record.subject_id);
        }

        self.refresh(request.session, record).await
    }

    async fn handle_callback(
        &self,
        request: &AuthRequest<'_>,
    ) -> Result<CallbackOutcome, AuthError> {
        if let Some(error) = request.param("error") {
            let reason = match request.param("error_description") {
                Some(description) => format!("{error}: {description}"),
                None => error.to_string(),
            };
            warn!(reason = %reason, "Provider rejected the authorization request");
            return Err(AuthError::ProviderRejected(reason));
        }

        match request.param("code") {
            Some(code) => self.complete_login(request.session, code).await,
            None => Err(AuthError::Forbidden),
        }
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::SessionOAuth2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::session::MemorySession;
    use chrono::TimeDelta;
    use std::collections::HashMap;

    /// Token endpoint nothing listens on; any provider call fails.
    fn unreachable_policy() -> SessionOAuth2Policy {
        let config = ClientConfig::new(
            "app",
            "secret",
            "https://idp.example.com/authorize".parse().unwrap(),
            "http://127.0.0.1:9/token".parse().unwrap(),
        );
        let client = TokenClient::new(config).unwrap();
        SessionOAuth2Policy::new(client, IdentityVerifier::new("app"))
    }

    fn record(age: i64, max_age: i64) -> SessionRecord {
        SessionRecord {
            subject_id: "jane@example.com".into(),
            access_token: "at".into(),
            refresh_token: "rt".into(),
            issued_at: Utc::now() - TimeDelta::seconds(age),
            max_age,
        }
    }

    #[tokio::test]
    async fn missing_session_redirects_to_provider() {
        let policy = unreachable_policy();
        let session = MemorySession::new();
        let query = HashMap::new();

        match policy.get_identity(&AuthRequest::new(&query, &session)).await {
            AuthOutcome::RedirectRequired(url) => {
                assert!(url.as_str().starts_with("https://idp.example.com/authorize?"));
                assert!(url.query_pairs().any(|(k, v)| k == "client_id" && v == "app"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn corrupt_session_redirects_to_provider() {
        let policy = unreachable_policy();
        let session = MemorySession::new();
        session
            .store(DEFAULT_SESSION_KEY, "{not json".into())
            .await
            .unwrap();
        let query = HashMap::new();

        let outcome = policy.get_identity(&AuthRequest::new(&query, &session)).await;
        assert!(matches!(outcome, AuthOutcome::RedirectRequired(_)));
    }

    #[tokio::test]
    async fn fresh_session_is_authenticated_without_provider() {
        let policy = unreachable_policy();
        let session = MemorySession::new();
        let stored = session::encode(&record(10, 3600));
        session
            .store(DEFAULT_SESSION_KEY, stored.clone())
            .await
            .unwrap();
        let query = HashMap::new();

        let outcome = policy.get_identity(&AuthRequest::new(&query, &session)).await;
        assert_eq!(outcome, AuthOutcome::Authenticated("jane@example.com".into()));
        assert_eq!(
            session.load(DEFAULT_SESSION_KEY).await.unwrap(),
            Some(stored)
        );
    }

    #[tokio::test]
    async fn failed_refresh_drops_the_session() {
        let policy = unreachable_policy();
        let session = MemorySession::new();
        session
            .store(DEFAULT_SESSION_KEY, session::encode(&record(120, 60)))
            .await
            .unwrap();
        let query = HashMap::new();

        let outcome = policy.get_identity(&AuthRequest::new(&query, &session)).await;
        assert!(matches!(outcome, AuthOutcome::RedirectRequired(_)));
        assert_eq!(session.load(DEFAULT_SESSION_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn custom_session_key_is_used() {
        let policy = unreachable_policy().with_session_key("login");
        assert_eq!(policy.session_key(), "login");

        let session = MemorySession::new();
        session
            .store("login", session::encode(&record(0, 60)))
            .await
            .unwrap();
        let query = HashMap::new();

        let outcome = policy.get_identity(&AuthRequest::new(&query, &session)).await;
        assert_eq!(outcome.subject(), Some("jane@example.com"));
    }

    #[tokio::test]
    async fn provider_error_is_reported_with_description() {
        let policy = unreachable_policy();
        let session = MemorySession::new();
        let query = HashMap::from([
            ("error".to_string(), "access_denied".to_string()),
            ("error_description".to_string(), "user said no".to_string()),
        ]);

        let err = policy
            .handle_callback(&AuthRequest::new(&query, &session))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AuthError::ProviderRejected("access_denied: user said no".into())
        );
    }

    #[tokio::test]
    async fn callback_without_code_or_error_is_forbidden() {
        let policy = unreachable_policy();
        let session = MemorySession::new();
        let query = HashMap::from([("state".to_string(), "xyz".to_string())]);

        let err = policy
            .handle_callback(&AuthRequest::new(&query, &session))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Forbidden);
        assert_eq!(session.load(DEFAULT_SESSION_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unreachable_provider_during_exchange() {
        let policy = unreachable_policy();
        let session = MemorySession::new();
        let query = HashMap::from([("code".to_string(), "abc".to_string())]);

        let err = policy
            .handle_callback(&AuthRequest::new(&query, &session))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ProviderUnavailable(_)));
    }
}
