// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # OAuth2 Token Client
//!
//! Client side of the authorization-code flow:
//!
//! 1. The user is sent to the provider's authorization endpoint
//!    (`client_id`, `response_type=code`, configured extras)
//! 2. The provider redirects back with a one-time `code`
//! 3. The code is exchanged at the token endpoint for an access token,
//!    a refresh token and an identity token
//! 4. When the session goes stale, the refresh token buys a new set
//!
//! Token endpoint responses may be JSON or URL-encoded form data.

pub mod client;
pub mod error;
pub mod token;

pub use client::TokenClient;
pub use error::ProviderError;
pub use token::{RefreshRequest, TokenSet};
