// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session record encoding.
//!
//! Stored value layout:
//!
//! ```json
//! {
//!   "user_id": "jane@example.com",
//!   "access_token": "...",
//!   "refresh_token": "...",
//!   "creation_time": "2026-10-18T12:00:00.123456Z",
//!   "max_age": 3600
//! }
//! ```

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeDelta, Utc};
use serde_json::{json, Map, Value};

use crate::oauth::TokenSet;

/// Authenticated session persisted between requests.
///
/// The record is stale once `issued_at + max_age` has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub subject_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub issued_at: DateTime<Utc>,
    /// Lifetime in seconds.
    pub max_age: i64,
}

/// Why a stored session could not be used.
#[derive(Debug, thiserror::Error)]
pub enum SessionDecodeError {
    #[error("session is not a JSON object: {0}")]
    Json(String),

    #[error("session field {0} is missing or has the wrong type")]
    MissingField(&'static str),

    #[error("session creation_time {0:?} is not an ISO-8601 timestamp")]
    InvalidTimestamp(String),
}

impl SessionRecord {
    /// Record for a freshly completed token exchange.
    ///
    /// `None` when the provider did not return a refresh token or a lifetime.
    pub fn from_tokens(
        subject_id: impl Into<String>,
        tokens: &TokenSet,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        Some(Self {
            subject_id: subject_id.into(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone()?,
            issued_at: now,
            max_age: tokens.expires_in?,
        })
    }

    /// Same subject, new tokens, clock restarted at `now`.
    ///
    /// Keeps the previous refresh token and lifetime when the provider
    /// omits them from a refresh response.
    #[must_use]
    pub fn refreshed(&self, tokens: &TokenSet, now: DateTime<Utc>) -> Self {
        Self {
            subject_id: self.subject_id.clone(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens
                .refresh_token
                .clone()
                .unwrap_or_else(|| self.refresh_token.clone()),
            issued_at: now,
            max_age: tokens.expires_in.unwrap_or(self.max_age),
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        let lifetime = TimeDelta::try_seconds(self.max_age).unwrap_or(TimeDelta::MAX);
        self.issued_at
            .checked_add_signed(lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }
}

/// Encode a record for session storage.
pub fn encode(record: &SessionRecord) -> String {
    json!({
        "user_id": record.subject_id,
        "access_token": record.access_token,
        "refresh_token": record.refresh_token,
        "creation_time": record.issued_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        "max_age": record.max_age,
    })
    .to_string()
}

/// Decode a stored record.
///
/// Callers treat every error as "no session".
pub fn decode(raw: &str) -> Result<SessionRecord, SessionDecodeError> {
    let fields: Map<String, Value> =
        serde_json::from_str(raw).map_err(|e| SessionDecodeError::Json(e.to_string()))?;

    let creation_time = string_field(&fields, "creation_time")?;
    let max_age = match fields.get("max_age") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or(SessionDecodeError::MissingField("max_age"))?;

    Ok(SessionRecord {
        subject_id: string_field(&fields, "user_id")?,
        access_token: string_field(&fields, "access_token")?,
        refresh_token: string_field(&fields, "refresh_token")?,
        issued_at: parse_timestamp(&creation_time)?,
        max_age,
    })
}

fn string_field(fields: &Map<String, Value>, name: &'static str) -> Result<String, SessionDecodeError> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(SessionDecodeError::MissingField(name))
}

/// RFC 3339, or a naive ISO-8601 timestamp in the host's local time.
///
/// Naive timestamps are written by older session stores that record local
/// wall-clock time. A time skipped by a DST transition is rejected; an
/// ambiguous one takes the earlier instant.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, SessionDecodeError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| SessionDecodeError::InvalidTimestamp(raw.to_string()))
}
