// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session OAuth2 - OAuth2 login for Axum services
//!
//! Redirects unauthenticated callers to an OAuth2 provider, completes the
//! authorization-code flow on the provider callback, keeps the verified
//! identity in the caller's session and refreshes it when it goes stale.
//!
//! ## Modules
//!
//! - `api` - callback route and demo router (Axum)
//! - `auth` - request context, middleware, extractors and identity token verification
//! - `config` - client configuration and environment variables
//! - `oauth` - token endpoint client
//! - `policy` - session OAuth2 and allow-all authentication policies
//! - `session` - session record storage

pub mod api;
pub mod auth;
pub mod config;
pub mod oauth;
pub mod policy;
pub mod session;
