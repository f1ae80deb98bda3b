//! Configuration module for the tweetfeed client.
//!
//! This module contains the client configuration and environment variable
//! handling for talking to the feed API.

use log::{debug, info, warn};
use std::env;
use std::time::Duration;
use url::Url;

use crate::error::{FeedError, Result};

/// Base address used when `TWEETFEED_API_BASE_URL` is not set.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

/// Request timeout used when `TWEETFEED_TIMEOUT_SECS` is not set.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// How like and retweet actions reach server truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngagementStrategy {
    /// Toggle locally first, reconcile with the server's answer, roll back on failure.
    #[default]
    Optimistic,
    /// Wait for the server, then reload the whole collection.
    Refetch,
}

impl EngagementStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "optimistic" => Some(Self::Optimistic),
            "refetch" => Some(Self::Refetch),
            _ => None,
        }
    }
}

/// Configuration for the API client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Normalised base address, without trailing slash.
    pub api_base_url: String,
    pub timeout: Duration,
    /// Token to seed the session with, if any.
    pub token: Option<String>,
    pub engagement_strategy: EngagementStrategy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            token: None,
            engagement_strategy: EngagementStrategy::default(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for the given base address with defaults otherwise.
    pub fn new(api_base_url: &str) -> Result<Self> {
        Ok(Self {
            api_base_url: normalize_base_url(api_base_url)?,
            ..Self::default()
        })
    }

    /// Loads the configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TWEETFEED_API_BASE_URL`: API base address (default `http://localhost:5000`)
    /// - `TWEETFEED_TIMEOUT_SECS`: Request timeout in seconds (default 15)
    /// - `TWEETFEED_TOKEN`: Bearer token to start the session with
    /// - `TWEETFEED_ENGAGEMENT_STRATEGY`: `optimistic` (default) or `refetch`
    ///
    /// # Returns
    ///
    /// - `Ok(ClientConfig)`: If every variable that is set is valid
    /// - `Err(FeedError::Config)`: If the base URL or timeout cannot be parsed
    pub fn from_env() -> Result<Self> {
        info!("Loading client configuration from environment variables");

        let api_base_url = match env::var("TWEETFEED_API_BASE_URL") {
            Ok(value) => {
                info!("Found TWEETFEED_API_BASE_URL: {}", value);
                normalize_base_url(&value)?
            }
            Err(_) => {
                info!(
                    "No TWEETFEED_API_BASE_URL set, using {}",
                    DEFAULT_API_BASE_URL
                );
                DEFAULT_API_BASE_URL.to_string()
            }
        };

        let timeout = match env::var("TWEETFEED_TIMEOUT_SECS") {
            Ok(value) => {
                let secs: u64 = value.trim().parse().map_err(|e| {
                    FeedError::Config(format!(
                        "TWEETFEED_TIMEOUT_SECS must be a whole number of seconds: {}",
                        e
                    ))
                })?;
                if secs == 0 {
                    return Err(FeedError::Config(
                        "TWEETFEED_TIMEOUT_SECS must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let token = match env::var("TWEETFEED_TOKEN") {
            Ok(token) if !token.trim().is_empty() => {
                info!(
                    "Found TWEETFEED_TOKEN environment variable with length: {}",
                    token.len()
                );
                debug!("Session token (masked): {}", mask_token(&token));
                Some(token.trim().to_string())
            }
            Ok(_) => {
                warn!("TWEETFEED_TOKEN is empty, starting without a session");
                None
            }
            Err(_) => {
                info!("No TWEETFEED_TOKEN found, starting without a session");
                None
            }
        };

        let engagement_strategy = match env::var("TWEETFEED_ENGAGEMENT_STRATEGY") {
            Ok(value) => match EngagementStrategy::parse(&value) {
                Some(strategy) => strategy,
                None => {
                    warn!(
                        "Unknown TWEETFEED_ENGAGEMENT_STRATEGY '{}', using optimistic",
                        value
                    );
                    EngagementStrategy::Optimistic
                }
            },
            Err(_) => EngagementStrategy::default(),
        };

        let config = ClientConfig {
            api_base_url,
            timeout,
            token,
            engagement_strategy,
        };
        info!(
            "Client configuration loaded: base {}, timeout {:?}, strategy {:?}",
            config.api_base_url, config.timeout, config.engagement_strategy
        );
        Ok(config)
    }
}

/// Adds a scheme when missing, strips trailing slashes and validates the result.
pub fn normalize_base_url(value: &str) -> Result<String> {
    let mut base = value.trim().to_string();
    if base.is_empty() {
        return Err(FeedError::Config("API base URL is empty".to_string()));
    }
    if !base.starts_with("http://") && !base.starts_with("https://") {
        base = format!("http://{}", base);
    }
    while base.ends_with('/') {
        base.pop();
    }
    Url::parse(&base)
        .map_err(|e| FeedError::Config(format!("invalid API base URL '{}': {}", base, e)))?;
    Ok(base)
}

/// Masks a token for logging, keeping at most the first and last 8 characters.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let length = chars.len();
    let prefix: String = chars.iter().take(8).collect();

    if length > 16 {
        let suffix: String = chars[length - 8..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        format!("{}...", prefix)
    }
}
