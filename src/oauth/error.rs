// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token endpoint errors.

use crate::auth::AuthError;

/// Client-facing reason for transport failures. The underlying error is
/// logged where it happens and never sent to the caller.
pub(crate) const UNREACHABLE_REASON: &str = "no response from the token endpoint";

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The response carried an OAuth2 `error` field (serialized body).
    #[error("provider rejected the request: {0}")]
    Rejected(String),

    /// The provider answered with an HTML page instead of token data.
    #[error("provider returned an HTML page (HTTP {status})")]
    UpstreamHtml {
        status: u16,
        content_type: String,
        body: String,
    },

    #[error("token request failed: {0}")]
    Transport(String),

    #[error("token response was invalid: {0}")]
    InvalidResponse(String),
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rejected(reason) => AuthError::ProviderRejected(reason),
            ProviderError::UpstreamHtml {
                content_type, body, ..
            } => AuthError::UpstreamHtml { content_type, body },
            ProviderError::Transport(_) => {
                AuthError::ProviderUnavailable(UNREACHABLE_REASON.to_string())
            }
            ProviderError::InvalidResponse(_) => AuthError::TokenExchangeFailed,
        }
    }
}
