// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token endpoint client against a mock provider.

mod common;

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use session_oauth2::auth::AuthError;
use session_oauth2::oauth::{ProviderError, RefreshRequest};

#[tokio::test]
async fn code_exchange_posts_form_and_parses_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("accept", "application/json"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=the-code"))
        .and(body_string_contains("client_id=test-client"))
        .and(body_string_contains("client_secret=test-secret"))
        .and(body_string_contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Foauth2%2Fcallback"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3600,
            "id_token": "header.payload.sig",
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = common::token_client(&server.uri())
        .exchange_code_for_tokens("the-code")
        .await
        .unwrap();

    assert_eq!(tokens.access_token, "at");
    assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
    assert_eq!(tokens.expires_in, Some(3600));
    assert_eq!(tokens.id_token.as_deref(), Some("header.payload.sig"));
    assert_eq!(tokens.field("token_type"), Some(&json!("Bearer")));
}

#[tokio::test]
async fn form_encoded_response_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "access_token=at&refresh_token=rt&expires_in=120",
            "application/x-www-form-urlencoded",
        ))
        .mount(&server)
        .await;

    let tokens = common::token_client(&server.uri())
        .exchange_code_for_tokens("c")
        .await
        .unwrap();

    assert_eq!(tokens.access_token, "at");
    assert_eq!(tokens.expires_in, Some(120));
}

#[tokio::test]
async fn refresh_sends_refresh_grant_with_scope_and_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt-old"))
        .and(body_string_contains("access_token=at-old"))
        .and(body_string_contains("scope=openid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-new",
            "expires_in": 60,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = RefreshRequest::new("rt-old").with_access_token("at-old");
    let tokens = common::token_client(&server.uri())
        .refresh_tokens(request)
        .await
        .unwrap();

    assert_eq!(tokens.access_token, "at-new");
    assert_eq!(tokens.refresh_token, None);
}

#[tokio::test]
async fn provider_error_is_a_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "refresh token revoked",
        })))
        .mount(&server)
        .await;

    let err = common::token_client(&server.uri())
        .refresh_tokens("rt")
        .await
        .unwrap_err();

    match &err {
        ProviderError::Rejected(reason) => assert!(reason.contains("invalid_grant")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(matches!(
        AuthError::from(err),
        AuthError::ProviderRejected(_)
    ));
}

#[tokio::test]
async fn html_error_page_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_raw("<html><body>Maintenance</body></html>", "text/html"),
        )
        .mount(&server)
        .await;

    let err = common::token_client(&server.uri())
        .exchange_code_for_tokens("c")
        .await
        .unwrap_err();

    assert_eq!(
        AuthError::from(err),
        AuthError::UpstreamHtml {
            content_type: "text/html".into(),
            body: "<html><body>Maintenance</body></html>".into(),
        }
    );
}

#[tokio::test]
async fn response_without_access_token_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token_type": "Bearer" })))
        .mount(&server)
        .await;

    let err = common::token_client(&server.uri())
        .exchange_code_for_tokens("c")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::InvalidResponse(_)));
    assert_eq!(AuthError::from(err), AuthError::TokenExchangeFailed);
}
