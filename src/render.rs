//! Post rendering.
//!
//! Turns posts into card view-models ready to display. A removed post
//! becomes a card that only shows why and when it was removed; everything
//! else (content, media, counts, action controls, comments) exists only on
//! active cards.

use chrono::{DateTime, Utc};

use crate::media::{avatar_url, resolve_asset_url};
use crate::models::{Media, Post, PostState, UserProfile};
use crate::segment::{segment, Segment};

/// Reason shown for removed posts that did not record one.
pub const UNSPECIFIED_REASON: &str = "Not specified";

/// One rendered piece of post text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    /// Hashtag as written plus the path of its view.
    Link { text: String, href: String },
}

impl Span {
    fn from_segment(segment: &Segment<'_>) -> Self {
        match segment {
            Segment::Text(text) => Span::Text(text.to_string()),
            Segment::Hashtag { raw, tag } => Span::Link {
                text: raw.to_string(),
                href: crate::segment::hashtag_path(tag),
            },
        }
    }
}

/// Renders text into spans, hashtags becoming links.
pub fn render_text(text: &str) -> Vec<Span> {
    segment(text).iter().map(Span::from_segment).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaView {
    Image(String),
    Video(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionBar {
    pub likes: u64,
    pub liked: bool,
    pub retweets: u64,
    pub retweeted: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentView {
    pub author: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardBody {
    Active {
        spans: Vec<Span>,
        media: Option<MediaView>,
        actions: ActionBar,
        comments: Vec<CommentView>,
    },
    Removed {
        reason: String,
        removed_at: Option<DateTime<Utc>>,
    },
}

/// Everything needed to display one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCard {
    pub id: String,
    pub author_handle: String,
    pub avatar_url: String,
    pub age: String,
    pub body: CardBody,
}

impl PostCard {
    /// Builds the card for `post` as seen by `viewer`.
    ///
    /// # Parameters
    ///
    /// - `post`: The post to render
    /// - `viewer`: The logged-in user, used to decide edit/delete controls
    /// - `base_url`: API base address for resolving media paths
    /// - `now`: Reference time for the age label
    pub fn from_post(
        post: &Post,
        viewer: Option<&UserProfile>,
        base_url: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let body = match &post.state {
            PostState::Deleted(removal) => CardBody::Removed {
                reason: removal
                    .reason
                    .clone()
                    .unwrap_or_else(|| UNSPECIFIED_REASON.to_string()),
                removed_at: removal.deleted_at,
            },
            PostState::Active(active) => {
                let owns = viewer
                    .map(|viewer| post.is_authored_by(viewer.id()))
                    .unwrap_or(false);
                let media = match &active.media {
                    Media::None => None,
                    Media::Image(path) => resolve_asset_url(base_url, path).map(MediaView::Image),
                    Media::Video(path) => resolve_asset_url(base_url, path).map(MediaView::Video),
                };
                CardBody::Active {
                    spans: render_text(&active.content),
                    media,
                    actions: ActionBar {
                        likes: active.engagement.likes,
                        liked: active.engagement.liked,
                        retweets: active.engagement.retweets,
                        retweeted: active.engagement.retweeted,
                        can_edit: owns,
                        can_delete: owns,
                    },
                    comments: active
                        .comments
                        .iter()
                        .map(|comment| CommentView {
                            author: comment.author_handle().to_string(),
                            text: comment.text.clone(),
                        })
                        .collect(),
                }
            }
        };

        PostCard {
            id: post.id.clone(),
            author_handle: post.author.handle.clone(),
            avatar_url: avatar_url(base_url, &post.author),
            age: relative_time(post.created_at, now),
            body,
        }
    }

    pub fn is_removed(&self) -> bool {
        matches!(self.body, CardBody::Removed { .. })
    }

    /// Plain-text rendering for terminals. Hashtags are followed by their
    /// link path in angle brackets.
    pub fn to_text(&self) -> String {
        let mut out = format!("@{} · {}\n", self.author_handle, self.age);

        match &self.body {
            CardBody::Removed { reason, removed_at } => {
                out.push_str("  [Removed by admin]\n");
                out.push_str(&format!("  Reason: {}\n", reason));
                if let Some(at) = removed_at {
                    out.push_str(&format!("  On: {}\n", at.format("%Y-%m-%d %H:%M UTC")));
                }
            }
            CardBody::Active {
                spans,
                media,
                actions,
                comments,
            } => {
                out.push_str("  ");
                for span in spans {
                    match span {
                        Span::Text(text) => out.push_str(text),
                        Span::Link { text, href } => {
                            out.push_str(&format!("{}<{}>", text, href));
                        }
                    }
                }
                out.push('\n');

                match media {
                    Some(MediaView::Image(url)) => out.push_str(&format!("  [image] {}\n", url)),
                    Some(MediaView::Video(url)) => out.push_str(&format!("  [video] {}\n", url)),
                    None => {}
                }

                out.push_str(&format!(
                    "  {} {}  {} {}\n",
                    if actions.liked { "♥" } else { "♡" },
                    actions.likes,
                    if actions.retweeted { "⟳*" } else { "⟳" },
                    actions.retweets
                ));

                for comment in comments {
                    out.push_str(&format!("    @{}: {}\n", comment.author, comment.text));
                }
            }
        }

        out
    }
}

/// Compact age label: `42s`, `5m`, `3h`, `2d`.
///
/// Timestamps in the future count as `0s`.
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3_600 {
        format!("{}m", seconds / 60)
    } else if seconds < 86_400 {
        format!("{}h", seconds / 3_600)
    } else {
        format!("{}d", seconds / 86_400)
    }
}

/// Renders a whole feed, one card per post, in order.
pub fn render_feed(
    posts: &[Post],
    viewer: Option<&UserProfile>,
    base_url: &str,
    now: DateTime<Utc>,
) -> Vec<PostCard> {
    posts
        .iter()
        .map(|post| PostCard::from_post(post, viewer, base_url, now))
        .collect()
}
