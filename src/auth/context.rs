// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request authentication state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::OnceCell;

use super::AuthError;
use crate::policy::{AuthOutcome, AuthPolicy, AuthRequest, CallbackOutcome, PolicyKind};
use crate::session::Session;

/// Authentication state of one request.
///
/// Inserted into request extensions by
/// [`oauth2_middleware`](super::middleware::oauth2_middleware). The policy
/// is asked for the caller's identity at most once; later calls return the
/// cached outcome.
pub struct RequestContext {
    policy_ref: Option<Arc<dyn AuthPolicy>>,
    session: Option<Session>,
    query: HashMap<String, String>,
    cached_identity: OnceCell<AuthOutcome>,
}

impl RequestContext {
    pub fn new(
        policy: Option<Arc<dyn AuthPolicy>>,
        session: Option<Session>,
        query: HashMap<String, String>,
    ) -> Self {
        Self {
            policy_ref: policy,
            session,
            query,
            cached_identity: OnceCell::new(),
        }
    }

    pub fn policy(&self) -> Result<&Arc<dyn AuthPolicy>, AuthError> {
        self.policy_ref.as_ref().ok_or_else(|| {
            tracing::error!("No authentication policy attached to the request");
            AuthError::ConfigurationError("authentication policy is not configured".to_string())
        })
    }

    pub fn is_allow_all(&self) -> bool {
        self.policy_ref
            .as_ref()
            .is_some_and(|policy| policy.kind() == PolicyKind::AllowAll)
    }

    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    fn session(&self) -> Result<&Session, AuthError> {
        self.session.as_ref().ok_or_else(|| {
            tracing::error!("No session attached to the request; is the session layer installed?");
            AuthError::ConfigurationError("session support is not configured".to_string())
        })
    }

    /// Who the caller is, computed on first use.
    pub async fn identity(&self) -> Result<&AuthOutcome, AuthError> {
        let policy = self.policy()?;
        let session = self.session()?;

        let outcome = self
            .cached_identity
            .get_or_init(|| async {
                let request = AuthRequest::new(&self.query, session.backend());
                policy.get_identity(&request).await
            })
            .await;
        Ok(outcome)
    }

    /// Run the policy's callback handling with this request's query.
    pub async fn handle_callback(&self) -> Result<CallbackOutcome, AuthError> {
        let policy = self.policy()?;
        let session = self.session()?;
        let request = AuthRequest::new(&self.query, session.backend());
        policy.handle_callback(&request).await
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("policy", &self.policy_ref.as_ref().map(|p| p.kind()))
            .field("has_session", &self.session.is_some())
            .field("cached_identity", &self.cached_identity.get())
            .finish()
    }
}
