// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Policy construction from configuration files.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use session_oauth2::config::{ConfigError, DISABLE_LOGIN_ENV};
use session_oauth2::policy::{create_policy, AuthOutcome, AuthRequest, PolicyKind};
use session_oauth2::session::MemorySession;

/// `create_policy` reads the process environment; tests touching or
/// depending on it run one at a time.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn env_guard() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sets the bypass toggle for the lifetime of the value.
struct BypassToggle<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl BypassToggle<'_> {
    fn set(value: &str) -> Self {
        let guard = env_guard();
        std::env::set_var(DISABLE_LOGIN_ENV, value);
        Self { _guard: guard }
    }
}

impl Drop for BypassToggle<'_> {
    fn drop(&mut self) {
        std::env::remove_var(DISABLE_LOGIN_ENV);
    }
}

const FIXTURE_CERT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/provider-cert.pem");

fn config_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "client_id": "my-app",
            "client_secret": "s3cret",
            "authorization_endpoint": "https://idp.example.com/authorize",
            "token_endpoint": "https://idp.example.com/token",
            "redirect_uri": "https://app.example.com/oauth2/callback",
            "prompt": "login"
        }}"#
    )
    .unwrap();
    file
}

#[test]
fn session_policy_with_provider_certificate() {
    let _env = env_guard();
    let file = config_file();
    let policy = create_policy(file.path(), Some(Path::new(FIXTURE_CERT))).unwrap();
    assert_eq!(policy.kind(), PolicyKind::SessionOAuth2);
}

#[test]
fn session_policy_without_certificate() {
    let _env = env_guard();
    let file = config_file();
    let policy = create_policy(file.path(), None).unwrap();
    assert_eq!(policy.kind(), PolicyKind::SessionOAuth2);
}

#[test]
fn unreadable_certificate_is_a_setup_error() {
    let _env = env_guard();
    let file = config_file();
    let result = create_policy(file.path(), Some(Path::new("/nonexistent/cert.pem")));
    assert!(matches!(result, Err(ConfigError::Io { .. })));
}

#[test]
fn malformed_config_is_a_setup_error() {
    let _env = env_guard();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    let result = create_policy(file.path(), None);
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[tokio::test]
async fn bypass_toggle_selects_allow_all_as_localhost() {
    let _toggle = BypassToggle::set("1");

    // The config file is not even read.
    let policy = create_policy("/nonexistent/oauth2.json", None).unwrap();
    assert_eq!(policy.kind(), PolicyKind::AllowAll);

    let session = MemorySession::new();
    let params = HashMap::new();
    let outcome = policy
        .get_identity(&AuthRequest::new(&params, &session))
        .await;
    assert_eq!(outcome, AuthOutcome::Authenticated("localhost".into()));
}

#[test]
fn bypass_toggle_off_keeps_session_policy() {
    let _toggle = BypassToggle::set("no");
    let file = config_file();
    let policy = create_policy(file.path(), None).unwrap();
    assert_eq!(policy.kind(), PolicyKind::SessionOAuth2);
}

#[test]
fn invalid_bypass_toggle_is_a_setup_error() {
    let _toggle = BypassToggle::set("sometimes");
    let file = config_file();
    match create_policy(file.path(), None) {
        Err(ConfigError::InvalidFlag { name, value }) => {
            assert_eq!(name, DISABLE_LOGIN_ENV);
            assert_eq!(value, "sometimes");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(policy) => panic!("unexpected policy: {:?}", policy.kind()),
    }
}
