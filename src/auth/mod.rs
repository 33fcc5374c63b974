// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Request-side half of the OAuth2 login.
//!
//! ## Auth Flow
//!
//! 1. `oauth2_middleware` attaches a [`RequestContext`] holding the active
//!    policy, the caller's session and the query string
//! 2. A handler asks for the caller through an extractor ([`Identity`],
//!    [`OptionalIdentity`], [`AuthContext`])
//! 3. The policy resolves the identity once; later extractors in the same
//!    request reuse the result
//! 4. Without a session the caller is redirected to the provider, whose
//!    callback verifies the identity token (see [`verifier`]) and stores
//!    the session
//!
//! ## Security
//!
//! - Identity tokens are RS256 and checked against the provider certificate
//! - Expiry and audience are always enforced, with 60 seconds of clock skew
//! - A missing policy or session layer is a server error, never an
//!   anonymous request

pub mod context;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod verifier;

pub use context::RequestContext;
pub use error::AuthError;
pub use extractor::{AllowAllMode, AuthContext, Identity, OptionalIdentity};
pub use middleware::oauth2_middleware;
pub use verifier::{IdentityVerifier, TrustedKey, VerifiedIdentity};
