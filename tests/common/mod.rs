// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Helpers shared by the integration tests.

#![allow(dead_code)]

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

use session_oauth2::auth::{IdentityVerifier, TrustedKey};
use session_oauth2::config::ClientConfig;
use session_oauth2::oauth::TokenClient;
use session_oauth2::policy::SessionOAuth2Policy;

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-secret";
pub const REDIRECT_URI: &str = "https://app.example.com/oauth2/callback";

pub const PROVIDER_PRIVATE_KEY: &str = include_str!("../fixtures/provider-private.pem");
pub const PROVIDER_CERT: &str = include_str!("../fixtures/provider-cert.pem");
pub const WRONG_PRIVATE_KEY: &str = include_str!("../fixtures/wrong-private.pem");

/// Client configuration whose endpoints live on the mock provider.
pub fn client_config(provider_uri: &str) -> ClientConfig {
    ClientConfig::new(
        CLIENT_ID,
        CLIENT_SECRET,
        format!("{provider_uri}/authorize").parse().unwrap(),
        format!("{provider_uri}/token").parse().unwrap(),
    )
    .with_redirect_uri(REDIRECT_URI)
    .with_scope("openid")
}

pub fn token_client(provider_uri: &str) -> TokenClient {
    TokenClient::new(client_config(provider_uri)).unwrap()
}

/// Policy that verifies identity tokens against the fixture certificate.
pub fn policy(provider_uri: &str) -> SessionOAuth2Policy {
    let config = client_config(provider_uri);
    let key = TrustedKey::from_pem(PROVIDER_CERT.as_bytes()).unwrap();
    let verifier = IdentityVerifier::for_client(&config, Some(key));
    SessionOAuth2Policy::new(TokenClient::new(config).unwrap(), verifier)
}

pub fn id_token_signed_with(private_pem: &str, email: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "sub": "0042",
        "emailAddress": email,
        "aud": CLIENT_ID,
        "iat": now,
        "exp": now + 3600,
    });
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).unwrap();
    encode(&Header::new(Algorithm::RS256), &claims, &key).unwrap()
}

pub fn id_token(email: &str) -> String {
    id_token_signed_with(PROVIDER_PRIVATE_KEY, email)
}

/// Token endpoint response for a completed login.
pub fn login_response(email: &str) -> Value {
    json!({
        "access_token": "access-1",
        "token_type": "Bearer",
        "refresh_token": "refresh-1",
        "expires_in": 3600,
        "id_token": id_token(email),
    })
}
