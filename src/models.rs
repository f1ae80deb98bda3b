//! Data model for posts, comments and users.
//!
//! The API speaks a loose JSON format where a post may carry an image, a
//! video, neither, or a deletion marker, with most fields optional. This
//! module keeps that wire shape in [`PostRecord`] and converts it into the
//! tagged [`Post`] the rest of the crate works with, so a removed post can
//! never be rendered with content or action controls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Compact author information embedded in posts, comments and user lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    /// Unique handle, used in profile URLs.
    #[serde(rename = "username")]
    pub handle: String,
    /// Stored avatar path, resolved with [`crate::media::resolve_asset_url`].
    #[serde(
        rename = "profilePicture",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl UserSummary {
    pub fn new(id: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            handle: handle.into(),
            avatar: None,
            bio: None,
        }
    }
}

/// Full user record as returned by `/auth/me` and the profile endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub summary: UserSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    /// Ids of the users following this user.
    #[serde(default)]
    pub followers: Vec<String>,
    /// Ids of the users this user follows.
    #[serde(default)]
    pub following: Vec<String>,
}

impl UserProfile {
    pub fn id(&self) -> &str {
        &self.summary.id
    }

    pub fn handle(&self) -> &str {
        &self.summary.handle
    }

    pub fn follows(&self, user_id: &str) -> bool {
        self.following.iter().any(|id| id == user_id)
    }
}

impl From<UserSummary> for UserProfile {
    fn from(summary: UserSummary) -> Self {
        Self {
            summary,
            location: None,
            website: None,
            is_admin: false,
            followers: Vec::new(),
            following: Vec::new(),
        }
    }
}

/// A comment attached to a post. Comments have no identifier of their own;
/// their position in the parent's list is their identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// `None` when the server did not populate the author.
    #[serde(
        rename = "user",
        default,
        deserialize_with = "deserialize_user_ref",
        skip_serializing_if = "Option::is_none"
    )]
    pub author: Option<UserSummary>,
    pub text: String,
}

impl Comment {
    pub fn new(author: UserSummary, text: impl Into<String>) -> Self {
        Self {
            author: Some(author),
            text: text.into(),
        }
    }

    /// Handle shown next to the comment, `anon` when the author is unknown.
    pub fn author_handle(&self) -> &str {
        self.author
            .as_ref()
            .map(|user| user.handle.as_str())
            .unwrap_or("anon")
    }
}

/// The author field of a comment is either a populated user or a bare id.
#[derive(Deserialize)]
#[serde(untagged)]
enum UserRef {
    Populated(UserSummary),
    #[allow(dead_code)]
    Id(String),
}

fn deserialize_user_ref<'de, D>(deserializer: D) -> Result<Option<UserSummary>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let user = Option::<UserRef>::deserialize(deserializer)?;
    Ok(match user {
        Some(UserRef::Populated(user)) => Some(user),
        _ => None,
    })
}

/// Attached media. A post carries at most one of these.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Media {
    #[default]
    None,
    Image(String),
    Video(String),
}

impl Media {
    /// Builds the media variant from the wire's two optional paths.
    /// Empty strings count as absent and an image takes precedence.
    pub fn from_paths(image: Option<String>, video: Option<String>) -> Self {
        match (non_empty(image), non_empty(video)) {
            (Some(image), _) => Media::Image(image),
            (None, Some(video)) => Media::Video(video),
            (None, None) => Media::None,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Media::None => None,
            Media::Image(path) | Media::Video(path) => Some(path),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Media::None)
    }

    fn into_paths(self) -> (Option<String>, Option<String>) {
        match self {
            Media::None => (None, None),
            Media::Image(path) => (Some(path), None),
            Media::Video(path) => (None, Some(path)),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Like and retweet state of a post as seen by the current viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Engagement {
    pub likes: u64,
    pub liked: bool,
    pub retweets: u64,
    pub retweeted: bool,
}

impl Engagement {
    /// Flips the viewer's like and adjusts the count accordingly.
    pub fn toggle_like(&mut self) {
        if self.liked {
            self.likes = self.likes.saturating_sub(1);
        } else {
            self.likes += 1;
        }
        self.liked = !self.liked;
    }

    /// Flips the viewer's retweet and adjusts the count accordingly.
    pub fn toggle_retweet(&mut self) {
        if self.retweeted {
            self.retweets = self.retweets.saturating_sub(1);
        } else {
            self.retweets += 1;
        }
        self.retweeted = !self.retweeted;
    }
}

/// Which engagement action an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngagementKind {
    Like,
    Retweet,
}

impl EngagementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementKind::Like => "like",
            EngagementKind::Retweet => "retweet",
        }
    }
}

/// Server confirmation of a like or retweet: the viewer's flag and the
/// resulting count. Like answers use `liked`/`likesCount`, retweet answers
/// `retweeted`/`retweetsCount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EngagementState {
    #[serde(alias = "liked", alias = "retweeted")]
    pub active: bool,
    #[serde(alias = "likesCount", alias = "retweetsCount")]
    pub count: u64,
}

/// Removal metadata of a soft-deleted post.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Removal {
    pub reason: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Content of a post that has not been removed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivePost {
    pub content: String,
    pub media: Media,
    pub engagement: Engagement,
    /// Append-only, in insertion order.
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostState {
    Active(ActivePost),
    Deleted(Removal),
}

/// A post as held by a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PostRecord", into = "PostRecord")]
pub struct Post {
    pub id: String,
    pub author: UserSummary,
    pub created_at: DateTime<Utc>,
    pub state: PostState,
}

impl Post {
    pub fn new(
        id: impl Into<String>,
        author: UserSummary,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            author,
            created_at,
            state: PostState::Active(ActivePost {
                content: content.into(),
                ..ActivePost::default()
            }),
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self.state, PostState::Deleted(_))
    }

    pub fn active(&self) -> Option<&ActivePost> {
        match &self.state {
            PostState::Active(active) => Some(active),
            PostState::Deleted(_) => None,
        }
    }

    pub fn active_mut(&mut self) -> Option<&mut ActivePost> {
        match &mut self.state {
            PostState::Active(active) => Some(active),
            PostState::Deleted(_) => None,
        }
    }

    pub fn content(&self) -> Option<&str> {
        self.active().map(|active| active.content.as_str())
    }

    pub fn engagement(&self) -> Option<Engagement> {
        self.active().map(|active| active.engagement)
    }

    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.author.id == user_id
    }
}

/// Post as exchanged with the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: UserSummary,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub liked_by_current_user: bool,
    #[serde(default)]
    pub retweets_count: u64,
    #[serde(default)]
    pub retweeted_by_current_user: bool,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<PostRecord> for Post {
    fn from(record: PostRecord) -> Self {
        let state = if record.is_deleted {
            PostState::Deleted(Removal {
                reason: non_empty(record.deleted_reason),
                deleted_at: record.deleted_at,
            })
        } else {
            PostState::Active(ActivePost {
                content: record.content,
                media: Media::from_paths(record.image, record.video),
                engagement: Engagement {
                    likes: record.likes_count,
                    liked: record.liked_by_current_user,
                    retweets: record.retweets_count,
                    retweeted: record.retweeted_by_current_user,
                },
                comments: record.comments,
            })
        };

        Post {
            id: record.id,
            author: record.user,
            created_at: record.created_at,
            state,
        }
    }
}

impl From<Post> for PostRecord {
    fn from(post: Post) -> Self {
        let mut record = PostRecord {
            id: post.id,
            user: post.author,
            content: String::new(),
            image: None,
            video: None,
            created_at: post.created_at,
            likes_count: 0,
            liked_by_current_user: false,
            retweets_count: 0,
            retweeted_by_current_user: false,
            comments: Vec::new(),
            is_deleted: false,
            deleted_reason: None,
            deleted_at: None,
        };

        match post.state {
            PostState::Active(active) => {
                let (image, video) = active.media.into_paths();
                record.content = active.content;
                record.image = image;
                record.video = video;
                record.likes_count = active.engagement.likes;
                record.liked_by_current_user = active.engagement.liked;
                record.retweets_count = active.engagement.retweets;
                record.retweeted_by_current_user = active.engagement.retweeted;
                record.comments = active.comments;
            }
            PostState::Deleted(removal) => {
                record.is_deleted = true;
                record.deleted_reason = removal.reason;
                record.deleted_at = removal.deleted_at;
            }
        }

        record
    }
}

/// Content of a post about to be created.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewPost {
    pub content: String,
    pub media: Media,
}

impl NewPost {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            media: Media::None,
        }
    }

    pub fn with_media(mut self, media: Media) -> Self {
        self.media = media;
        self
    }
}

/// A trending hashtag and how many posts use it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    pub tag: String,
    pub count: u64,
}

/// Editable profile fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub bio: String,
    pub location: String,
    pub website: String,
}

impl ProfileUpdate {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            bio: profile.summary.bio.clone().unwrap_or_default(),
            location: profile.location.clone().unwrap_or_default(),
            website: profile.website.clone().unwrap_or_default(),
        }
    }
}
