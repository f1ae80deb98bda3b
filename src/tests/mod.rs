//! # Tests Module
//!
//! This module contains the tests for the tweetfeed client.
//!
//! ## Test Categories
//!
//! ### Unit Tests
//! - Hashtag segmentation and content validation (`segment`)
//! - Wire format conversion (`models`)
//! - Media resolution and card rendering (`render`)
//! - Configuration and session handling (`config`)
//! - In-memory feed operations (`feed`)
//!
//! ### Integration Tests
//! - Feed synchronization against an in-memory backend (`feed`)
//! - API client and views against a mock HTTP server (`api`)
//!
//! ## Test Environment
//!
//! No test talks to a real server: the API tests bind a mock on
//! `127.0.0.1:0` and the feed tests use [`FakeBackend`].

mod api;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Notify;

use crate::config::EngagementStrategy;
use crate::error::{FeedError, Result};
use crate::feed::{FeedBackend, FeedFilter, FeedSync};
use crate::models::{
    ActivePost, Comment, Engagement, EngagementKind, EngagementState, Media, NewPost, Post,
    PostState, Removal, UserProfile, UserSummary,
};

/// Fixed reference time so ages and timestamps are stable.
pub(crate) fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub(crate) fn alice() -> UserProfile {
    UserProfile::from(UserSummary::new("u-alice", "alice"))
}

pub(crate) fn bob() -> UserProfile {
    UserProfile::from(UserSummary::new("u-bob", "bob"))
}

pub(crate) fn admin() -> UserProfile {
    let mut profile = UserProfile::from(UserSummary::new("u-admin", "moderator"));
    profile.is_admin = true;
    profile
}

/// Active text post with the given engagement.
pub(crate) fn post_by(id: &str, author: &UserProfile, content: &str, likes: u64, liked: bool) -> Post {
    Post {
        id: id.to_string(),
        author: author.summary.clone(),
        created_at: fixed_time(),
        state: PostState::Active(ActivePost {
            content: content.to_string(),
            media: Media::None,
            engagement: Engagement {
                likes,
                liked,
                retweets: 0,
                retweeted: false,
            },
            comments: Vec::new(),
        }),
    }
}

pub(crate) fn removed_post(id: &str, author: &UserProfile, reason: Option<&str>) -> Post {
    Post {
        id: id.to_string(),
        author: author.summary.clone(),
        created_at: fixed_time(),
        state: PostState::Deleted(Removal {
            reason: reason.map(str::to_string),
            deleted_at: Some(fixed_time()),
        }),
    }
}

/// In-memory stand-in for the API: holds "server truth" and records calls.
pub(crate) struct FakeBackend {
    pub server: Mutex<Vec<Post>>,
    pub calls: Mutex<Vec<String>>,
    /// Error returned by the next call instead of performing it.
    pub fail_next: Mutex<Option<FeedError>>,
    /// Whether engagement calls answer with the resulting state.
    pub confirm_engagement: AtomicBool,
    /// When set, engagement calls wait for a notification before answering.
    pub engage_gate: Option<Arc<Notify>>,
    pub viewer: UserSummary,
    created: AtomicUsize,
}

impl FakeBackend {
    pub fn new(server: Vec<Post>) -> Self {
        Self {
            server: Mutex::new(server),
            calls: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
            confirm_engagement: AtomicBool::new(false),
            engage_gate: None,
            viewer: alice().summary,
            created: AtomicUsize::new(0),
        }
    }

    pub fn confirming(self) -> Self {
        self.confirm_engagement.store(true, Ordering::SeqCst);
        self
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.engage_gate = Some(gate);
        self
    }

    pub fn fail_next_with(&self, err: FeedError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn server_post(&self, id: &str) -> Option<Post> {
        self.server.lock().unwrap().iter().find(|p| p.id == id).cloned()
    }

    fn begin(&self, call: &str) -> Result<()> {
        self.calls.lock().unwrap().push(call.to_string());
        match self.fail_next.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn with_server_post<R>(&self, id: &str, f: impl FnOnce(&mut Post) -> R) -> Result<R> {
        let mut server = self.server.lock().unwrap();
        let post = server
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| FeedError::Rejected {
                status: 404,
                message: "Tweet not found".to_string(),
            })?;
        Ok(f(post))
    }
}

impl FeedBackend for FakeBackend {
    async fn fetch_posts(&self, _filter: &FeedFilter) -> Result<Vec<Post>> {
        self.begin("fetch")?;
        Ok(self.server.lock().unwrap().clone())
    }

    async fn create_post(&self, post: &NewPost) -> Result<Post> {
        self.begin("create")?;
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        // The server echoes counts it should not have; the feed must reset them.
        let created = Post {
            id: format!("new-{}", n),
            author: self.viewer.clone(),
            created_at: fixed_time(),
            state: PostState::Active(ActivePost {
                content: post.content.clone(),
                media: post.media.clone(),
                engagement: Engagement {
                    likes: 3,
                    liked: true,
                    retweets: 1,
                    retweeted: true,
                },
                comments: Vec::new(),
            }),
        };
        let mut stored = created.clone();
        if let Some(active) = stored.active_mut() {
            active.engagement = Engagement::default();
        }
        self.server.lock().unwrap().insert(0, stored);
        Ok(created)
    }

    async fn engage(&self, kind: EngagementKind, post_id: &str) -> Result<Option<EngagementState>> {
        if let Some(gate) = &self.engage_gate {
            gate.notified().await;
        }
        self.begin(kind.as_str())?;
        let state = self.with_server_post(post_id, |post| {
            let active = post.active_mut()?;
            match kind {
                EngagementKind::Like => {
                    active.engagement.toggle_like();
                    Some(EngagementState {
                        active: active.engagement.liked,
                        count: active.engagement.likes,
                    })
                }
                EngagementKind::Retweet => {
                    active.engagement.toggle_retweet();
                    Some(EngagementState {
                        active: active.engagement.retweeted,
                        count: active.engagement.retweets,
                    })
                }
            }
        })?;
        if self.confirm_engagement.load(Ordering::SeqCst) {
            Ok(state)
        } else {
            Ok(None)
        }
    }

    async fn comment(&self, post_id: &str, text: &str) -> Result<()> {
        self.begin("comment")?;
        let author = self.viewer.clone();
        self.with_server_post(post_id, |post| {
            if let Some(active) = post.active_mut() {
                active.comments.push(Comment::new(author, text));
            }
        })
    }

    async fn edit_post(&self, post_id: &str, content: &str) -> Result<()> {
        self.begin("edit")?;
        self.with_server_post(post_id, |post| {
            if let Some(active) = post.active_mut() {
                active.content = content.to_string();
            }
        })
    }

    async fn delete_post(&self, post_id: &str) -> Result<()> {
        self.begin("delete")?;
        self.server.lock().unwrap().retain(|p| p.id != post_id);
        Ok(())
    }

    async fn admin_delete_post(&self, post_id: &str, reason: &str) -> Result<()> {
        self.begin(&format!("admin_delete:{}", reason))?;
        self.with_server_post(post_id, |post| {
            post.state = PostState::Deleted(Removal {
                reason: Some(reason.to_string()),
                deleted_at: Some(fixed_time()),
            });
        })
    }
}

/// Feed over `backend`, already loaded with the backend's posts, viewed by `viewer`.
pub(crate) async fn synced_feed(
    backend: FakeBackend,
    viewer: UserProfile,
    strategy: EngagementStrategy,
) -> (Arc<FakeBackend>, FeedSync<FakeBackend>) {
    let backend = Arc::new(backend);
    let initial = backend.server.lock().unwrap().clone();
    let feed = FeedSync::new(Arc::clone(&backend), FeedFilter::Home, strategy).with_viewer(viewer);
    feed.load(initial).await.unwrap();
    (backend, feed)
}
