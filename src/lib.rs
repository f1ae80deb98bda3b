//! # Tweetfeed Library
//!
//! A Rust client for a microblogging API. It keeps per-view post
//! collections in sync with the server while the viewer posts, likes,
//! retweets, comments, edits and deletes, and renders post text with
//! hashtags turned into links.
//!
//! ## Features
//!
//! - Feed synchronization with optimistic or refetch-based engagement
//! - Hashtag segmentation with percent-encoded hashtag links
//! - Explicit session context for the bearer token and viewer identity
//! - Home, hashtag, profile, search, admin and side panel view models
//! - Structured logging
//!
//! ## Configuration
//!
//! - `TWEETFEED_API_BASE_URL`: API base address (defaults to `http://localhost:5000`)
//! - `TWEETFEED_TIMEOUT_SECS`: Request timeout (defaults to 15)
//! - `TWEETFEED_TOKEN`: Bearer token to start with
//! - `TWEETFEED_ENGAGEMENT_STRATEGY`: `optimistic` or `refetch`

pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod media;
pub mod models;
pub mod render;
pub mod segment;
pub mod session;
pub mod views;

// Re-export commonly used types and functions
pub use api::{ApiClient, SearchKind, SearchResults};
pub use config::{ClientConfig, EngagementStrategy};
pub use error::FeedError;
pub use feed::{Feed, FeedBackend, FeedFilter, FeedSync};
pub use media::resolve_asset_url;
pub use models::{Comment, Engagement, Media, NewPost, Post, PostState, UserProfile, UserSummary};
pub use render::PostCard;
pub use segment::{segment, Segment};
pub use session::{MemoryTokenStore, Redirect, Session, TokenStore};
pub use views::{
    mount_feed, AdminView, DebouncedSearch, Mount, ProfileView, SearchView, SidePanel,
    SEARCH_DEBOUNCE,
};

#[cfg(test)]
mod tests;
