// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::auth::AllowAllMode;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// `"oauth2"`, or `"allow_all"` when login is bypassed.
    pub auth_mode: String,
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running. Does not contact the
/// identity provider.
pub async fn health(AllowAllMode(allow_all): AllowAllMode) -> (StatusCode, Json<HealthResponse>) {
    let auth_mode = if allow_all { "allow_all" } else { "oauth2" };
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            auth_mode: auth_mode.to_string(),
        }),
    )
}
