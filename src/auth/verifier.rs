// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity token verification.
//!
//! ## Modes
//!
//! - **Trusted key configured**: RS256 signature, expiry and audience are
//!   verified against the provider's public key (taken from its PEM
//!   certificate).
//! - **No trusted key**: signature verification is skipped. Expiry and
//!   audience are still checked. Only for environments that intentionally
//!   run without the provider certificate.

use std::path::Path;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use x509_cert::der::asn1::ObjectIdentifier;
use x509_cert::der::Decode;
use x509_cert::Certificate;

use super::error::AuthError;
use crate::config::{ClientConfig, ConfigError};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Claims tried, in order, when no identity claim is configured.
const DEFAULT_IDENTITY_CLAIMS: [&str; 3] = ["emailAddress", "email", "sub"];

/// `rsaEncryption` (PKCS #1).
const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// Public key trusted to sign identity tokens.
#[derive(Clone)]
pub struct TrustedKey {
    key: DecodingKey,
}

impl std::fmt::Debug for TrustedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustedKey").finish_non_exhaustive()
    }
}

impl TrustedKey {
    /// Load from a PEM document.
    ///
    /// Accepts an X.509 `CERTIFICATE` (the subject public key is used) or an
    /// RSA `PUBLIC KEY` / `RSA PUBLIC KEY`.
    pub fn from_pem(pem_bytes: &[u8]) -> Result<Self, ConfigError> {
        let block = pem::parse(pem_bytes)
            .map_err(|e| ConfigError::Certificate(format!("invalid PEM: {e}")))?;

        let key = match block.tag() {
            "CERTIFICATE" => {
                let cert = Certificate::from_der(block.contents())
                    .map_err(|e| ConfigError::Certificate(format!("invalid X.509: {e}")))?;
                let spki = &cert.tbs_certificate.subject_public_key_info;
                if spki.algorithm.oid != RSA_ENCRYPTION {
                    return Err(ConfigError::Certificate(format!(
                        "unsupported public key algorithm {}",
                        spki.algorithm.oid
                    )));
                }
                let der = spki.subject_public_key.as_bytes().ok_or_else(|| {
                    ConfigError::Certificate("malformed subject public key".to_string())
                })?;
                DecodingKey::from_rsa_der(der)
            }
            "PUBLIC KEY" | "RSA PUBLIC KEY" => DecodingKey::from_rsa_pem(pem_bytes)
                .map_err(|e| ConfigError::Certificate(format!("invalid RSA key: {e}")))?,
            other => {
                return Err(ConfigError::Certificate(format!(
                    "unexpected PEM block {other:?}"
                )))
            }
        };

        Ok(Self { key })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_pem(&bytes)
    }
}

/// Subject identifier taken from a verified identity token.
///
/// Only produced by a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    subject: String,
}

impl VerifiedIdentity {
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn into_subject(self) -> String {
        self.subject
    }
}

/// Verifies identity tokens for one OAuth2 client.
#[derive(Debug, Clone)]
pub struct IdentityVerifier {
    audience: String,
    trusted_key: Option<TrustedKey>,
    identity_claim: Option<String>,
}

impl IdentityVerifier {
    /// Verifier without a trusted key (signature checks disabled).
    pub fn new(audience: impl Into<String>) -> Self {
        Self {
            audience: audience.into(),
            trusted_key: None,
            identity_claim: None,
        }
    }

    /// Verifier for tokens issued to `config.client_id`.
    pub fn for_client(config: &ClientConfig, trusted_key: Option<TrustedKey>) -> Self {
        Self {
            audience: config.client_id.clone(),
            trusted_key,
            identity_claim: config.identity_claim.clone(),
        }
    }

    #[must_use]
    pub fn with_trusted_key(mut self, key: TrustedKey) -> Self {
        self.trusted_key = Some(key);
        self
    }

    #[must_use]
    pub fn with_identity_claim(mut self, claim: impl Into<String>) -> Self {
        self.identity_claim = Some(claim.into());
        self
    }

    pub fn verifies_signatures(&self) -> bool {
        self.trusted_key.is_some()
    }

    pub fn verify(&self, raw_token: &str) -> Result<VerifiedIdentity, AuthError> {
        let claims = match &self.trusted_key {
            Some(key) => decode_verified(raw_token, &self.audience, key)?,
            None => decode_unverified(raw_token, &self.audience)?,
        };
        extract_identity(&claims, self.identity_claim.as_deref())
    }
}

/// Verify `raw_token` for `audience`, skipping the signature check when no
/// key is trusted.
pub fn verify(
    raw_token: &str,
    audience: &str,
    trusted_key: Option<&TrustedKey>,
) -> Result<VerifiedIdentity, AuthError> {
    let claims = match trusted_key {
        Some(key) => decode_verified(raw_token, audience, key)?,
        None => decode_unverified(raw_token, audience)?,
    };
    extract_identity(&claims, None)
}

fn decode_verified(
    raw_token: &str,
    audience: &str,
    key: &TrustedKey,
) -> Result<Map<String, Value>, AuthError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = CLOCK_SKEW_LEEWAY;
    validation.validate_nbf = true;
    validation.set_audience(&[audience]);

    let token_data =
        decode::<Map<String, Value>>(raw_token, &key.key, &validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "token has expired".to_string(),
                ErrorKind::InvalidSignature => {
                    "signature does not match the trusted key".to_string()
                }
                ErrorKind::InvalidAudience => "audience does not match this client".to_string(),
                ErrorKind::ImmatureSignature => "token is not yet valid".to_string(),
                ErrorKind::InvalidAlgorithm => "unexpected signing algorithm".to_string(),
                ErrorKind::MissingRequiredClaim(claim) => format!("missing claim: {claim}"),
                _ => "token is malformed".to_string(),
            };
            AuthError::InvalidToken(reason)
        })?;

    Ok(token_data.claims)
}

fn decode_unverified(raw_token: &str, audience: &str) -> Result<Map<String, Value>, AuthError> {
    tracing::debug!("Decoding identity token without signature verification");

    let token_data = jsonwebtoken::dangerous::insecure_decode::<Map<String, Value>>(raw_token)
        .map_err(|_| AuthError::InvalidToken("token is malformed".to_string()))?;
    let claims = token_data.claims;

    let exp = claims
        .get("exp")
        .and_then(Value::as_i64)
        .ok_or_else(|| AuthError::InvalidToken("missing claim: exp".to_string()))?;
    let now = chrono::Utc::now().timestamp();
    if exp < now - CLOCK_SKEW_LEEWAY as i64 {
        return Err(AuthError::InvalidToken("token has expired".to_string()));
    }

    let audience_matches = match claims.get("aud") {
        Some(Value::String(aud)) => aud == audience,
        Some(Value::Array(auds)) => auds.iter().any(|a| a.as_str() == Some(audience)),
        _ => false,
    };
    if !audience_matches {
        return Err(AuthError::InvalidToken(
            "audience does not match this client".to_string(),
        ));
    }

    Ok(claims)
}

fn extract_identity(
    claims: &Map<String, Value>,
    identity_claim: Option<&str>,
) -> Result<VerifiedIdentity, AuthError> {
    let subject = match identity_claim {
        Some(name) => string_claim(claims, name),
        None => DEFAULT_IDENTITY_CLAIMS
            .iter()
            .find_map(|name| string_claim(claims, name)),
    };

    subject
        .map(|subject| VerifiedIdentity { subject })
        .ok_or(AuthError::TokenExchangeFailed)
}

fn string_claim(claims: &Map<String, Value>, name: &str) -> Option<String> {
    claims
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
