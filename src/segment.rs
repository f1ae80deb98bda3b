//! Text segmentation for post and comment content.
//!
//! This module splits free text into plain-text and hashtag segments so the
//! renderer can turn every hashtag into a link to that hashtag's view, and
//! validates post content before it is sent to the server.
//!
//! A hashtag is a `#` immediately followed by one or more Unicode letters,
//! Unicode digits or underscores, extending as far as possible. A `#` that
//! is not followed by such a character is plain text. Segments never
//! overlap and concatenating them reproduces the input exactly.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{FeedError, Result};

/// Maximum post length in characters, enforced before posting.
pub const MAX_POST_CHARS: usize = 280;

/// One piece of segmented text, borrowing from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Rendered verbatim, never as a link.
    Text(&'a str),
    /// `raw` is the token as written (`#rust`), `tag` the name without `#`.
    Hashtag { raw: &'a str, tag: &'a str },
}

impl<'a> Segment<'a> {
    /// The original text covered by this segment.
    pub fn as_str(&self) -> &'a str {
        match self {
            Segment::Text(text) => text,
            Segment::Hashtag { raw, .. } => raw,
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self, Segment::Hashtag { .. })
    }

    /// Link target for hashtag segments, `None` for plain text.
    pub fn link(&self) -> Option<String> {
        match self {
            Segment::Text(_) => None,
            Segment::Hashtag { tag, .. } => Some(hashtag_path(tag)),
        }
    }
}

fn hashtag_regex() -> Option<&'static Regex> {
    static HASHTAG: OnceLock<Option<Regex>> = OnceLock::new();
    // Letters, digits and underscore in any script
    HASHTAG
        .get_or_init(|| Regex::new(r"#[\p{L}\p{N}_]+").ok())
        .as_ref()
}

/// Splits `text` into ordered plain-text and hashtag segments.
///
/// Empty plain-text pieces are never emitted, so adjacent hashtags such as
/// `#a#b` produce exactly two hashtag segments.
///
/// # Parameters
///
/// - `text`: Post or comment content
///
/// # Returns
///
/// The segments in order of appearance. An empty input yields no segments.
///
/// # Example
///
/// ```rust
/// use tweetfeed::segment::{segment, Segment};
///
/// let segments = segment("say #hi!");
/// assert_eq!(segments[0], Segment::Text("say "));
/// assert_eq!(segments[1], Segment::Hashtag { raw: "#hi", tag: "hi" });
/// assert_eq!(segments[2], Segment::Text("!"));
/// ```
pub fn segment(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    let Some(re) = hashtag_regex() else {
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        return segments;
    };

    for mat in re.find_iter(text) {
        if mat.start() > cursor {
            segments.push(Segment::Text(&text[cursor..mat.start()]));
        }
        let raw = mat.as_str();
        segments.push(Segment::Hashtag {
            raw,
            tag: &raw[1..],
        });
        cursor = mat.end();
    }

    if cursor < text.len() {
        segments.push(Segment::Text(&text[cursor..]));
    }

    segments
}

/// Returns the hashtag names in `text`, in order of appearance, without `#`.
pub fn hashtags(text: &str) -> Vec<&str> {
    segment(text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Hashtag { tag, .. } => Some(tag),
            Segment::Text(_) => None,
        })
        .collect()
}

/// Builds the path of a hashtag's view, percent-encoding the tag.
///
/// ```rust
/// use tweetfeed::segment::hashtag_path;
///
/// assert_eq!(hashtag_path("rust"), "/hashtag/rust");
/// assert_eq!(hashtag_path("café"), "/hashtag/caf%C3%A9");
/// ```
pub fn hashtag_path(tag: &str) -> String {
    format!("/hashtag/{}", urlencoding::encode(tag))
}

/// Checks post content before it is sent.
///
/// Content must be at most [`MAX_POST_CHARS`] characters and may only be
/// blank when media is attached.
pub fn validate_post_content(content: &str, has_media: bool) -> Result<()> {
    let length = content.chars().count();
    if length > MAX_POST_CHARS {
        return Err(FeedError::InvalidInput(format!(
            "Post is {} characters long, the limit is {}",
            length, MAX_POST_CHARS
        )));
    }
    if content.trim().is_empty() && !has_media {
        return Err(FeedError::InvalidInput("Post cannot be empty".to_string()));
    }
    Ok(())
}

/// Checks comment text before it is sent. Blank comments are refused.
pub fn validate_comment(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(FeedError::InvalidInput(
            "Comment cannot be empty".to_string(),
        ));
    }
    Ok(())
}
