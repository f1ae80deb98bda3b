//! Media reference resolution.
//!
//! Stored media paths (avatars, post images and videos) are relative to the
//! API server and must be resolved against the configured base address
//! before they can be loaded. Paths that are already absolute URLs pass
//! through unchanged.

use url::Url;

use crate::models::UserSummary;

/// Avatar shown for users without a profile picture.
pub const DEFAULT_AVATAR_URL: &str =
    "https://abs.twimg.com/sticky/default_profile_images/default_profile_400x400.png";

/// Resolves a stored media path into a loadable URL.
///
/// # Parameters
///
/// - `base_url`: The API base address, e.g. `http://localhost:5000`
/// - `path`: The stored path, e.g. `/uploads/cat.png`, or an absolute URL
///
/// # Returns
///
/// - `Some(url)`: The absolute URL of the media
/// - `None`: If `path` is empty
///
/// # Example
///
/// ```rust
/// use tweetfeed::media::resolve_asset_url;
///
/// assert_eq!(
///     resolve_asset_url("http://localhost:5000", "/uploads/a.png").as_deref(),
///     Some("http://localhost:5000/uploads/a.png")
/// );
/// assert_eq!(
///     resolve_asset_url("http://localhost:5000", "https://cdn.example.com/a.png").as_deref(),
///     Some("https://cdn.example.com/a.png")
/// );
/// ```
pub fn resolve_asset_url(base_url: &str, path: &str) -> Option<String> {
    if path.trim().is_empty() {
        return None;
    }

    if is_absolute_url(path) {
        return Some(path.to_string());
    }

    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        Some(format!("{}{}", base, path))
    } else {
        Some(format!("{}/{}", base, path))
    }
}

/// Resolves a user's avatar, falling back to [`DEFAULT_AVATAR_URL`].
pub fn avatar_url(base_url: &str, user: &UserSummary) -> String {
    user.avatar
        .as_deref()
        .and_then(|path| resolve_asset_url(base_url, path))
        .unwrap_or_else(|| DEFAULT_AVATAR_URL.to_string())
}

fn is_absolute_url(path: &str) -> bool {
    match Url::parse(path) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}
