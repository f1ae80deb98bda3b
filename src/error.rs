//! Error taxonomy for the feed client.
//!
//! Every failure the client can hit is recoverable: the caller reports it to
//! the viewer and either retries the action or reloads the view. None of
//! these errors leave a feed collection partially updated.

use thiserror::Error;

/// Errors produced by the API client, the session and the view models.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// No token is stored, or the server answered 401.
    #[error("authentication required")]
    Unauthenticated,

    /// The server refused the action (permission, validation, missing post...).
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Connection, timeout or body read failure.
    #[error("network error: {0}")]
    Transport(String),

    /// The server answered with a body we could not decode.
    #[error("malformed response: {0}")]
    Decode(String),

    /// Input refused before any network call was made.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The targeted post is not part of the current collection.
    #[error("post {0} is not in this feed")]
    NotFound(String),

    /// A confirmation arrived after its view was torn down.
    #[error("view is no longer active")]
    ViewClosed,

    /// A client-side role check failed (e.g. admin view without admin rights).
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl FeedError {
    /// Returns true when the session should be cleared and the viewer sent to login.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, FeedError::Unauthenticated)
    }

    /// Short notification text suitable for showing to the viewer.
    pub fn user_message(&self) -> String {
        match self {
            FeedError::Unauthenticated => "Please log in again".to_string(),
            FeedError::Rejected { message, .. } if !message.is_empty() => message.clone(),
            FeedError::Rejected { status, .. } => format!("Request failed ({})", status),
            FeedError::Transport(_) => "Network error, please try again".to_string(),
            FeedError::Decode(_) => "Unexpected response from server".to_string(),
            FeedError::InvalidInput(reason) => reason.clone(),
            FeedError::NotFound(_) => "This post is no longer available".to_string(),
            FeedError::ViewClosed => "This view was closed".to_string(),
            FeedError::Forbidden(reason) => reason.clone(),
            FeedError::Config(reason) => format!("Configuration error: {}", reason),
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FeedError::Decode(err.to_string())
        } else {
            FeedError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Decode(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FeedError>;
