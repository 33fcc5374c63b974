// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, the OAuth2 client
//! configuration, and the helpers used to load it at startup. The
//! authentication core only ever sees a fully resolved [`ClientConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `OAUTH2_CONFIG` | Path to the JSON client configuration | `oauth2.json` |
//! | `OAUTH2_CERTIFICATE` | PEM certificate of the identity provider | Unset (insecure) |
//! | `DISABLE_OAUTH2_LOGIN_FOR_LOCALHOST` | Force the allow-all bypass policy | `0` |
//! | `OAUTH2_CALLBACK_PATH` | Route receiving the provider callback | `/oauth2/callback` |
//! | `VCAP_APPLICATION` | JSON document used to expand `redirect_uri` | Optional |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! ## Config File
//!
//! ```json
//! {
//!   "client_id": "my-app",
//!   "client_secret": "s3cret",
//!   "authorization_endpoint": "https://idp.example.com/authorize",
//!   "token_endpoint": "https://idp.example.com/token",
//!   "redirect_uri": "https://${application_uris}/oauth2/callback",
//!   "scope": "openid"
//! }
//! ```
//!
//! Any additional string keys are sent as extra authorization parameters.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Deserialize;
use url::Url;

/// Environment variable holding the JSON client configuration path.
pub const CONFIG_PATH_ENV: &str = "OAUTH2_CONFIG";

/// Default client configuration path.
pub const DEFAULT_CONFIG_PATH: &str = "oauth2.json";

/// Environment variable holding the provider certificate (PEM) path.
///
/// When unset, identity tokens are accepted without signature verification.
pub const CERTIFICATE_PATH_ENV: &str = "OAUTH2_CERTIFICATE";

/// Environment toggle forcing the allow-all bypass policy.
pub const DISABLE_LOGIN_ENV: &str = "DISABLE_OAUTH2_LOGIN_FOR_LOCALHOST";

/// Login reported by the bypass policy when [`DISABLE_LOGIN_ENV`] is set.
pub const BYPASS_LOGIN: &str = "localhost";

/// Environment variable for the callback route.
pub const CALLBACK_PATH_ENV: &str = "OAUTH2_CALLBACK_PATH";

/// Default callback route.
pub const DEFAULT_CALLBACK_PATH: &str = "/oauth2/callback";

/// Platform application document used for `redirect_uri` expansion.
pub const APPLICATION_ENV: &str = "VCAP_APPLICATION";

static VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\w+|\{[^}]*\})").expect("variable pattern is valid"));

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid client configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid boolean value for {name}: {value:?}")]
    InvalidFlag { name: String, value: String },

    #[error("invalid certificate: {0}")]
    Certificate(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// OAuth2 client registration with the identity provider.
///
/// Immutable once built; shared by the token client and the identity
/// verifier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    /// Claim carrying the user identity in the identity token.
    #[serde(default)]
    pub identity_claim: Option<String>,
    /// Extra authorization parameters.
    #[serde(flatten)]
    pub extra_params: BTreeMap<String, String>,
}

impl ClientConfig {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        authorization_endpoint: Url,
        token_endpoint: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authorization_endpoint,
            token_endpoint,
            redirect_uri: None,
            scope: None,
            identity_claim: None,
            extra_params: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    #[must_use]
    pub fn with_identity_claim(mut self, claim: impl Into<String>) -> Self {
        self.identity_claim = Some(claim.into());
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.insert(name.into(), value.into());
        self
    }

    /// Load the configuration from a JSON file.
    ///
    /// Placeholders in `redirect_uri` are expanded against the platform
    /// application document, falling back to the process environment.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let application = application_document();
        Self::from_json(&raw, |name| {
            application
                .as_ref()
                .and_then(|doc| doc.get(name))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .or_else(|| std::env::var(name).ok())
        })
    }

    /// Parse the configuration, expanding `redirect_uri` with `lookup`.
    pub fn from_json<F>(raw: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: ClientConfig = serde_json::from_str(raw)?;
        if let Some(redirect_uri) = config.redirect_uri.take() {
            let expanded = expand_vars(&redirect_uri, &lookup);
            if expanded.contains('$') {
                tracing::warn!(
                    redirect_uri = %expanded,
                    "redirect_uri still contains unresolved placeholders"
                );
            }
            config.redirect_uri = Some(expanded);
        }
        Ok(config)
    }
}

fn application_document() -> Option<serde_json::Map<String, serde_json::Value>> {
    let raw = std::env::var(APPLICATION_ENV).ok()?;
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        _ => {
            tracing::warn!("{APPLICATION_ENV} is not a JSON object; ignoring it");
            None
        }
    }
}

/// Expand `$name` and `${name}` placeholders.
///
/// Unknown variables, and variables resolving to an empty string, are left
/// unchanged. Expanded text is not scanned again.
pub fn expand_vars<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    VAR_PATTERN
        .replace_all(input, |caps: &Captures<'_>| {
            let name = &caps[1];
            let name = name
                .strip_prefix('{')
                .and_then(|n| n.strip_suffix('}'))
                .unwrap_or(name);
            match lookup(name) {
                Some(value) if !value.is_empty() => value,
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Parse a boolean flag the way shell-configured toggles are usually written.
pub fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Ok(true),
        "n" | "no" | "f" | "false" | "off" | "0" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Whether the bypass policy is forced by the environment.
pub fn login_disabled() -> Result<bool, ConfigError> {
    match std::env::var(DISABLE_LOGIN_ENV) {
        Ok(value) => parse_flag(DISABLE_LOGIN_ENV, &value),
        Err(_) => Ok(false),
    }
}

/// Callback route from the environment.
pub fn callback_path() -> String {
    std::env::var(CALLBACK_PATH_ENV).unwrap_or_else(|_| DEFAULT_CALLBACK_PATH.to_string())
}
