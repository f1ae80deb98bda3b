//! Feed API integration module.
//!
//! This module contains the HTTP client for the microblogging API, with one
//! submodule per endpoint family. All authenticated requests carry the
//! session's bearer token.

mod auth;
mod client;
mod posts;
mod search;
mod users;

// Re-export public API
pub use auth::{build_bearer_auth_header, LoginResponse};
pub use client::ApiClient;
pub use search::{SearchKind, SearchResults};

// Crate-internal re-exports (used by tests)
#[cfg(test)]
pub(crate) use client::sanitize_for_logging;
