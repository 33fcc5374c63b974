// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Policy that lets every request through under a fixed login.

use async_trait::async_trait;

use super::{AuthOutcome, AuthPolicy, AuthRequest, CallbackOutcome, PolicyKind};
use crate::auth::AuthError;

/// Bypass policy for trusted or local environments.
#[derive(Debug, Clone)]
pub struct AllowAllPolicy {
    login: String,
}

impl AllowAllPolicy {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }
}

#[async_trait]
impl AuthPolicy for AllowAllPolicy {
    async fn get_identity(&self, _request: &AuthRequest<'_>) -> AuthOutcome {
        AuthOutcome::Authenticated(self.login.clone())
    }

    /// There is no flow to complete.
    async fn handle_callback(
        &self,
        _request: &AuthRequest<'_>,
    ) -> Result<CallbackOutcome, AuthError> {
        Err(AuthError::Forbidden)
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::AllowAll
    }
}
