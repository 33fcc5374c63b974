// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Module
//!
//! Persists the authenticated identity between requests.
//!
//! - `codec` - [`SessionRecord`] and its JSON storage format
//! - `store` - the [`SessionStore`] contract and the [`Session`] request extension
//! - `memory` - in-process, cookie-keyed implementation

pub mod codec;
pub mod memory;
pub mod store;

pub use codec::{decode, encode, SessionDecodeError, SessionRecord};
pub use memory::{
    session_middleware, MemorySession, MemorySessions, DEFAULT_SESSION_CAPACITY,
    DEFAULT_SESSION_COOKIE,
};
pub use store::{Session, SessionError, SessionStore};
