// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token endpoint payloads.

use serde_json::{Map, Value};

use super::error::ProviderError;
use crate::session::SessionRecord;

/// Tokens returned by the provider's token endpoint.
///
/// `fields` keeps the full provider-shaped mapping; the typed fields are the
/// ones the session lifecycle depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds.
    pub expires_in: Option<i64>,
    pub id_token: Option<String>,
    pub fields: Map<String, Value>,
}

impl TokenSet {
    /// Build from a decoded token endpoint response.
    ///
    /// `expires_in` is accepted as a number or a numeric string, since
    /// form-encoded responses carry every value as text.
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self, ProviderError> {
        let access_token = string_field(&fields, "access_token")
            .ok_or_else(|| ProviderError::InvalidResponse("missing access_token".to_string()))?;
        let expires_in = match fields.get("expires_in") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            Some(_) => None,
        };

        Ok(Self {
            access_token,
            refresh_token: string_field(&fields, "refresh_token"),
            expires_in,
            id_token: string_field(&fields, "id_token"),
            fields,
        })
    }

    /// Get a raw response field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Input of a `refresh_token` grant.
///
/// Built from a bare refresh token or from a stored session record, in which
/// case the current access token is sent along.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub refresh_token: String,
    pub access_token: Option<String>,
}

impl RefreshRequest {
    #[must_use]
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: refresh_token.into(),
            access_token: None,
        }
    }

    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }
}

impl From<&str> for RefreshRequest {
    fn from(refresh_token: &str) -> Self {
        Self::new(refresh_token)
    }
}

impl From<String> for RefreshRequest {
    fn from(refresh_token: String) -> Self {
        Self::new(refresh_token)
    }
}

impl From<&SessionRecord> for RefreshRequest {
    fn from(record: &SessionRecord) -> Self {
        Self::new(record.refresh_token.clone()).with_access_token(record.access_token.clone())
    }
}
