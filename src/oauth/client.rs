// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth2 authorization-code client.
//!
//! Builds authorization URLs and talks to the provider's token endpoint for
//! the `authorization_code` and `refresh_token` grants.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use super::error::ProviderError;
use super::token::{RefreshRequest, TokenSet};
use crate::config::{ClientConfig, ConfigError};

/// Token endpoint request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// `response_type` requested from the authorization endpoint.
const RESPONSE_TYPE: &str = "code";

#[derive(Debug, Clone)]
pub struct TokenClient {
    config: Arc<ClientConfig>,
    http: Client,
}

impl TokenClient {
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    /// Use a custom HTTP client (for connection reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Authorization URL with the configured parameters only.
    pub fn authorization_url(&self) -> Url {
        self.build_authorization_url(&[])
    }

    /// Authorization URL for the provider.
    ///
    /// Call-time `params` override configured ones; `client_id` and
    /// `response_type` always come from the client itself.
    pub fn build_authorization_url(&self, params: &[(&str, &str)]) -> Url {
        let mut merged: BTreeMap<&str, &str> = BTreeMap::new();
        if let Some(redirect_uri) = &self.config.redirect_uri {
            merged.insert("redirect_uri", redirect_uri);
        }
        if let Some(scope) = &self.config.scope {
            merged.insert("scope", scope);
        }
        for (name, value) in &self.config.extra_params {
            merged.insert(name, value);
        }
        for (name, value) in params {
            merged.insert(name, value);
        }
        merged.insert("client_id", &self.config.client_id);
        merged.insert("response_type", RESPONSE_TYPE);

        let mut url = self.config.authorization_endpoint.clone();
        url.query_pairs_mut().extend_pairs(merged);
        url
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code_for_tokens(&self, code: &str) -> Result<TokenSet, ProviderError> {
        let mut form = vec![("grant_type", "authorization_code".to_string())];
        if let Some(redirect_uri) = &self.config.redirect_uri {
            form.push(("redirect_uri", redirect_uri.clone()));
        }
        form.push(("code", code.to_string()));

        self.token_endpoint_request(form, "authorization_code").await
    }

    /// Get fresh tokens with a refresh token.
    ///
    /// Accepts a bare refresh token or a stored [`SessionRecord`](crate::session::SessionRecord).
    pub async fn refresh_tokens(
        &self,
        request: impl Into<RefreshRequest>,
    ) -> Result<TokenSet, ProviderError> {
        let request = request.into();

        let mut form = vec![("grant_type", "refresh_token".to_string())];
        if let Some(scope) = &self.config.scope {
            form.push(("scope", scope.clone()));
        }
        if let Some(access_token) = request.access_token {
            form.push(("access_token", access_token));
        }
        form.push(("refresh_token", request.refresh_token));

        self.token_endpoint_request(form, "refresh_token").await
    }

    async fn token_endpoint_request(
        &self,
        mut form: Vec<(&'static str, String)>,
        grant: &'static str,
    ) -> Result<TokenSet, ProviderError> {
        form.push(("client_id", self.config.client_id.clone()));
        form.push(("client_secret", self.config.client_secret.clone()));

        let response = self
            .http
            .post(self.config.token_endpoint.clone())
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                warn!(grant, error = %e, "Token endpoint unreachable");
                ProviderError::Transport(e.to_string())
            })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|e| {
                warn!(grant, status, error = %e, "Failed to read token endpoint response");
                ProviderError::Transport(format!("failed to read response: {e}"))
            })?;

        let fields = match parse_token_response(status, &content_type, &body) {
            Ok(fields) => fields,
            Err(e) => {
                warn!(grant, status, error = %e, "Token endpoint request failed");
                return Err(e);
            }
        };

        debug!(grant, status, "Token endpoint request succeeded");
        TokenSet::from_fields(fields)
    }
}

/// Decode a token endpoint response.
///
/// JSON when the content type says so, URL-encoded form data otherwise. HTML
/// pages are returned as errors carrying the page itself.
pub(crate) fn parse_token_response(
    status: u16,
    content_type: &str,
    body: &str,
) -> Result<Map<String, Value>, ProviderError> {
    let lowered = content_type.to_ascii_lowercase();
    if lowered.contains("html") {
        return Err(ProviderError::UpstreamHtml {
            status,
            content_type: content_type.to_string(),
            body: body.to_string(),
        });
    }

    let fields = if lowered.contains("json") {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(ProviderError::InvalidResponse(
                    "expected a JSON object".to_string(),
                ))
            }
            Err(e) => return Err(ProviderError::InvalidResponse(format!("invalid JSON: {e}"))),
        }
    } else {
        url::form_urlencoded::parse(body.as_bytes())
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect()
    };

    if fields.contains_key("error") {
        return Err(ProviderError::Rejected(Value::Object(fields).to_string()));
    }
    if !(200..300).contains(&status) {
        return Err(ProviderError::Rejected(format!("HTTP {status}")));
    }

    Ok(fields)
}
