//! Core API utilities.
//!
//! This module contains the HTTP client wrapper used by every endpoint:
//! URL building, bearer authentication from the session, and the mapping
//! from HTTP status codes onto [`FeedError`].

use log::{debug, error, info, warn};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{FeedError, Result};
use crate::session::Session;

use super::auth::build_bearer_auth_header;

/// Sanitizes text for safe logging by truncating and escaping control characters.
///
/// This function:
/// - Truncates long text to prevent log flooding
/// - Replaces control characters that could manipulate log output
/// - Escapes newlines to prevent log injection
///
/// # Parameters
///
/// - `text`: The text to sanitize
/// - `max_chars`: Maximum number of characters before truncation
///
/// # Returns
///
/// A sanitized string safe for logging
pub(crate) fn sanitize_for_logging(text: &str, max_chars: usize) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    let total = sanitized.chars().count();
    if total > max_chars {
        let truncated: String = sanitized.chars().take(max_chars).collect();
        format!("{}... [truncated, {} total chars]", truncated, total)
    } else {
        sanitized
    }
}

/// HTTP client for the feed API, bound to a session.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
    session: Session,
}

impl ApiClient {
    /// Builds a client from configuration. The session supplies the bearer
    /// token for every authenticated request.
    pub fn new(config: &ClientConfig, session: Session) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FeedError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.api_base_url.clone(),
            http,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Full URL of an API path such as `/tweets`.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.endpoint(path))
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.endpoint(path))
    }

    pub(crate) fn put(&self, path: &str) -> RequestBuilder {
        self.http.put(self.endpoint(path))
    }

    pub(crate) fn delete(&self, path: &str) -> RequestBuilder {
        self.http.delete(self.endpoint(path))
    }

    /// Attaches the session's bearer token, failing before any network
    /// call when the viewer is not logged in.
    pub(crate) fn authorized(&self, request_builder: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.session.require_token()?;
        Ok(request_builder.header(AUTHORIZATION, build_bearer_auth_header(&token)))
    }

    /// Sends a request and returns the response body on success.
    ///
    /// A 401 clears the session and yields [`FeedError::Unauthenticated`];
    /// any other failure status yields [`FeedError::Rejected`] with the
    /// server's message when one is present.
    ///
    /// # Parameters
    ///
    /// - `request_builder`: A configured request ready to send
    /// - `operation_name`: Human-readable name for the operation (for logging)
    pub(crate) async fn send(
        &self,
        request_builder: RequestBuilder,
        operation_name: &str,
    ) -> Result<String> {
        info!("Sending request for operation: {}", operation_name);

        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Operation '{}' failed to reach server: {}", operation_name, e);
                return Err(FeedError::from(e));
            }
        };

        let status = response.status();
        info!(
            "Received response with status: {} for operation: {}",
            status, operation_name
        );

        let body = response.text().await?;

        if status.is_success() {
            debug!(
                "Response summary for '{}': {} bytes received",
                operation_name,
                body.len()
            );
            return Ok(body);
        }

        if status == StatusCode::UNAUTHORIZED {
            warn!(
                "Received 401 Unauthorized for operation '{}' - session token expired or invalid",
                operation_name
            );
            self.session.logout();
            return Err(FeedError::Unauthenticated);
        }

        warn!("Operation '{}' rejected - Status: {}", operation_name, status);
        debug!(
            "Error response for '{}': {}",
            operation_name,
            sanitize_for_logging(&body, 200)
        );
        Err(FeedError::Rejected {
            status: status.as_u16(),
            message: extract_error_message(&body),
        })
    }

    /// Sends a request and decodes the JSON response body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request_builder: RequestBuilder,
        operation_name: &str,
    ) -> Result<T> {
        let body = self.send(request_builder, operation_name).await?;
        serde_json::from_str(&body).map_err(|e| {
            error!(
                "Failed to decode response for '{}': {} (body: {})",
                operation_name,
                e,
                sanitize_for_logging(&body, 200)
            );
            FeedError::Decode(format!("{}: {}", operation_name, e))
        })
    }
}

/// Pulls a human-readable message out of an error body, accepting both
/// `{"message": ...}` and `{"error": ...}` shapes.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            ["message", "error"].iter().find_map(|key| {
                json.get(*key)
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
            })
        })
        .unwrap_or_else(|| sanitize_for_logging(body.trim(), 200))
}

/// Percent-encodes a single path segment built from user input.
pub(crate) fn encode_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
