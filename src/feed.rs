//! Feed synchronization.
//!
//! A [`Feed`] is the ordered in-memory collection of posts a view shows.
//! [`FeedSync`] binds a feed to a [`FeedBackend`] and applies the viewer's
//! actions so that, once an action succeeds, the collection matches what the
//! server holds:
//!
//! - likes and retweets follow the configured [`EngagementStrategy`]:
//!   optimistic toggling reconciled with the server's answer, or a full
//!   refetch after the server confirms;
//! - creating, commenting, editing and deleting are applied locally only
//!   after the server confirms them.
//!
//! Several actions may be in flight at once and may complete in any order.
//! Every confirmation addresses its post by id, checks that the post is
//! still present, and is dropped once the view has been torn down.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::Mutex;

use crate::config::EngagementStrategy;
use crate::error::{FeedError, Result};
use crate::models::{
    Comment, Engagement, EngagementKind, EngagementState, NewPost, Post, UserProfile,
};
use crate::segment::{validate_comment, validate_post_content};

/// Removal reason used by moderators who leave the reason blank.
pub const DEFAULT_REMOVAL_REASON: &str = "Violation of community guidelines";

/// Which collection a feed shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedFilter {
    /// Everything visible to the viewer.
    Home,
    /// Posts written by one user, by handle.
    Author(String),
    /// Posts carrying a hashtag, without the leading `#`.
    Hashtag(String),
}

impl FeedFilter {
    /// API path of the collection, with user input percent-encoded.
    pub fn api_path(&self) -> String {
        match self {
            FeedFilter::Home => "/tweets".to_string(),
            FeedFilter::Author(handle) => {
                format!("/tweets/user/{}", urlencoding::encode(handle))
            }
            FeedFilter::Hashtag(tag) => {
                format!(
                    "/tweets/hashtag/{}",
                    urlencoding::encode(tag.trim_start_matches('#'))
                )
            }
        }
    }
}

/// The remote operations a feed depends on.
///
/// Implemented by [`crate::api::ApiClient`]; tests substitute in-memory fakes.
pub trait FeedBackend: Send + Sync {
    fn fetch_posts(&self, filter: &FeedFilter) -> impl Future<Output = Result<Vec<Post>>> + Send;

    fn create_post(&self, post: &NewPost) -> impl Future<Output = Result<Post>> + Send;

    /// Toggles a like or retweet. Returns the server's resulting state when
    /// the response carries one.
    fn engage(
        &self,
        kind: EngagementKind,
        post_id: &str,
    ) -> impl Future<Output = Result<Option<EngagementState>>> + Send;

    fn comment(&self, post_id: &str, text: &str) -> impl Future<Output = Result<()>> + Send;

    fn edit_post(&self, post_id: &str, content: &str) -> impl Future<Output = Result<()>> + Send;

    fn delete_post(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send;

    fn admin_delete_post(
        &self,
        post_id: &str,
        reason: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Ordered in-memory post collection, keyed by post id.
///
/// Besides the posts, the feed counts the optimistic toggles still awaiting
/// an answer per post and kind, and bumps an epoch on every full reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    posts: Vec<Post>,
    pending: HashMap<(EngagementKind, String), usize>,
    epoch: u64,
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_posts(posts: Vec<Post>) -> Self {
        Self {
            posts,
            ..Self::default()
        }
    }

    /// Replaces the whole collection, keeping the server's order.
    pub fn load(&mut self, posts: Vec<Post>) {
        self.posts = posts;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Number of full reloads so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Post> {
        self.posts.iter_mut().find(|post| post.id == id)
    }

    fn engagement_mut(&mut self, id: &str) -> Option<&mut Engagement> {
        self.get_mut(id)
            .and_then(|post| post.active_mut())
            .map(|active| &mut active.engagement)
    }

    /// Inserts a freshly created post at the head of the collection.
    ///
    /// Counts start at zero and the viewer's flags at false. A post with the
    /// same id that a refetch already brought in is replaced, not duplicated.
    pub fn create_local(&mut self, mut post: Post) {
        if let Some(active) = post.active_mut() {
            active.engagement = Engagement::default();
        }
        self.posts.retain(|existing| existing.id != post.id);
        self.posts.insert(0, post);
    }

    /// Toggles the viewer's like or retweet on an active post.
    ///
    /// # Returns
    ///
    /// The engagement before the toggle, or `None` when the post is absent or removed.
    pub fn toggle(&mut self, kind: EngagementKind, id: &str) -> Option<Engagement> {
        let engagement = self.engagement_mut(id)?;
        let before = *engagement;
        match kind {
            EngagementKind::Like => engagement.toggle_like(),
            EngagementKind::Retweet => engagement.toggle_retweet(),
        }
        Some(before)
    }

    pub fn toggle_like(&mut self, id: &str) -> Option<Engagement> {
        self.toggle(EngagementKind::Like, id)
    }

    pub fn toggle_retweet(&mut self, id: &str) -> Option<Engagement> {
        self.toggle(EngagementKind::Retweet, id)
    }

    /// Toggles like [`Feed::toggle`] and records the toggle as awaiting an
    /// answer.
    ///
    /// # Returns
    ///
    /// The epoch the toggle was made in, or `None` when the post is absent or removed.
    pub fn start_toggle(&mut self, kind: EngagementKind, id: &str) -> Option<u64> {
        self.toggle(kind, id)?;
        *self.pending.entry((kind, id.to_string())).or_insert(0) += 1;
        Some(self.epoch)
    }

    /// Marks one toggle of `kind` on `id` as answered.
    ///
    /// # Returns
    ///
    /// How many toggles of that kind on that post are still awaiting an answer.
    pub fn settle(&mut self, kind: EngagementKind, id: &str) -> usize {
        let key = (kind, id.to_string());
        let remaining = match self.pending.get_mut(&key) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => 0,
        };
        if remaining == 0 {
            self.pending.remove(&key);
        }
        remaining
    }

    /// Toggles of `kind` on `id` still awaiting an answer.
    pub fn pending(&self, kind: EngagementKind, id: &str) -> usize {
        self.pending
            .get(&(kind, id.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Sets flag and count to exactly what the server confirmed.
    pub fn confirm(&mut self, kind: EngagementKind, id: &str, state: EngagementState) -> bool {
        let Some(engagement) = self.engagement_mut(id) else {
            return false;
        };
        match kind {
            EngagementKind::Like => {
                engagement.liked = state.active;
                engagement.likes = state.count;
            }
            EngagementKind::Retweet => {
                engagement.retweeted = state.active;
                engagement.retweets = state.count;
            }
        }
        true
    }

    /// Undoes one failed optimistic toggle of `kind` by toggling back.
    ///
    /// Toggles commute, so this removes exactly the failed toggle's effect
    /// even when other toggles of the same post were applied after it. The
    /// other engagement kind is left alone.
    pub fn rollback(&mut self, kind: EngagementKind, id: &str) -> bool {
        self.toggle(kind, id).is_some()
    }

    /// Appends a comment to an active post.
    pub fn append_comment(&mut self, id: &str, comment: Comment) -> bool {
        match self.get_mut(id).and_then(|post| post.active_mut()) {
            Some(active) => {
                active.comments.push(comment);
                true
            }
            None => false,
        }
    }

    /// Replaces the content of an active post. No-op on absent or removed posts.
    pub fn edit_local(&mut self, id: &str, content: &str) -> bool {
        match self.get_mut(id).and_then(|post| post.active_mut()) {
            Some(active) => {
                active.content = content.to_string();
                true
            }
            None => false,
        }
    }

    /// Removes a post from the collection entirely.
    pub fn remove_local(&mut self, id: &str) -> Option<Post> {
        let index = self.posts.iter().position(|post| post.id == id)?;
        Some(self.posts.remove(index))
    }
}

/// A feed owned by one mounted view, bound to its backend.
///
/// Cloning is cheap and every clone shares the same collection, so actions
/// can be issued from concurrent tasks.
pub struct FeedSync<B> {
    backend: Arc<B>,
    feed: Arc<Mutex<Feed>>,
    filter: FeedFilter,
    viewer: Option<UserProfile>,
    strategy: EngagementStrategy,
    live: Arc<AtomicBool>,
}

impl<B> Clone for FeedSync<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            feed: Arc::clone(&self.feed),
            filter: self.filter.clone(),
            viewer: self.viewer.clone(),
            strategy: self.strategy,
            live: Arc::clone(&self.live),
        }
    }
}

impl<B: FeedBackend> FeedSync<B> {
    pub fn new(backend: Arc<B>, filter: FeedFilter, strategy: EngagementStrategy) -> Self {
        Self {
            backend,
            feed: Arc::new(Mutex::new(Feed::new())),
            filter,
            viewer: None,
            strategy,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Sets the viewer whose identity authors new comments and whose rights
    /// gate editing, deleting and moderating.
    pub fn with_viewer(mut self, viewer: UserProfile) -> Self {
        self.viewer = Some(viewer);
        self
    }

    pub fn filter(&self) -> &FeedFilter {
        &self.filter
    }

    pub fn strategy(&self) -> EngagementStrategy {
        self.strategy
    }

    pub fn viewer(&self) -> Option<&UserProfile> {
        self.viewer.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Marks the view as gone. Confirmations arriving afterwards are dropped.
    pub fn teardown(&self) {
        info!("Tearing down feed view {:?}", self.filter);
        self.live.store(false, Ordering::SeqCst);
    }

    /// Copy of the current collection, for rendering.
    pub async fn posts(&self) -> Vec<Post> {
        self.feed.lock().await.posts().to_vec()
    }

    pub async fn get(&self, id: &str) -> Option<Post> {
        self.feed.lock().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.feed.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.feed.lock().await.is_empty()
    }

    /// Runs `update` on the collection if the view is still alive.
    async fn apply<R>(&self, update: impl FnOnce(&mut Feed) -> R) -> Result<R> {
        let mut feed = self.feed.lock().await;
        if !self.is_live() {
            debug!("Dropping update for torn-down view {:?}", self.filter);
            return Err(FeedError::ViewClosed);
        }
        Ok(update(&mut feed))
    }

    /// Fails with `NotFound` for absent posts and `InvalidInput` for removed ones.
    async fn require_active(&self, id: &str) -> Result<Post> {
        let feed = self.feed.lock().await;
        match feed.get(id) {
            Some(post) if post.is_deleted() => Err(FeedError::InvalidInput(
                "This post has been removed".to_string(),
            )),
            Some(post) => Ok(post.clone()),
            None => Err(FeedError::NotFound(id.to_string())),
        }
    }

    /// Fails with `Forbidden` unless the viewer is known and wrote `post`.
    fn require_owner(&self, post: &Post) -> Result<()> {
        match &self.viewer {
            Some(viewer) if post.is_authored_by(viewer.id()) => Ok(()),
            Some(_) => Err(FeedError::Forbidden(
                "Only the author can change this post".to_string(),
            )),
            None => Err(FeedError::Forbidden(
                "Viewer identity is not loaded yet".to_string(),
            )),
        }
    }

    /// Replaces the collection with `posts`.
    pub async fn load(&self, posts: Vec<Post>) -> Result<()> {
        self.apply(|feed| feed.load(posts)).await
    }

    /// Fetches the collection from the server and replaces the local one.
    ///
    /// # Returns
    ///
    /// The number of posts loaded. On failure the previous collection stays.
    pub async fn refresh(&self) -> Result<usize> {
        info!("Refreshing feed {:?}", self.filter);
        let posts = self.backend.fetch_posts(&self.filter).await?;
        let count = posts.len();
        self.load(posts).await?;
        debug!("Feed {:?} now holds {} posts", self.filter, count);
        Ok(count)
    }

    /// Creates a post and prepends it once the server confirms it.
    pub async fn create_post(&self, new_post: NewPost) -> Result<Post> {
        validate_post_content(&new_post.content, !new_post.media.is_none())?;

        info!("Creating post ({} chars)", new_post.content.chars().count());
        let created = self.backend.create_post(&new_post).await?;
        let id = created.id.clone();

        self.apply(|feed| {
            feed.create_local(created);
            feed.get(&id).cloned()
        })
        .await?
        .ok_or(FeedError::NotFound(id))
    }

    /// Toggles the viewer's like on a post.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(engagement))`: The post's engagement after the action
    /// - `Ok(None)`: The action succeeded but the post left the collection meanwhile
    /// - `Err(...)`: The action failed; the post's previous state is restored
    pub async fn like(&self, id: &str) -> Result<Option<Engagement>> {
        self.engage(EngagementKind::Like, id).await
    }

    /// Toggles the viewer's retweet on a post. See [`FeedSync::like`].
    pub async fn retweet(&self, id: &str) -> Result<Option<Engagement>> {
        self.engage(EngagementKind::Retweet, id).await
    }

    async fn engage(&self, kind: EngagementKind, id: &str) -> Result<Option<Engagement>> {
        self.require_active(id).await?;
        match self.strategy {
            EngagementStrategy::Optimistic => self.engage_optimistic(kind, id).await,
            EngagementStrategy::Refetch => self.engage_refetch(kind, id).await,
        }
    }

    async fn engage_optimistic(
        &self,
        kind: EngagementKind,
        id: &str,
    ) -> Result<Option<Engagement>> {
        let epoch = self
            .apply(|feed| feed.start_toggle(kind, id))
            .await?
            .ok_or_else(|| FeedError::NotFound(id.to_string()))?;
        debug!("Optimistic {} on post {}", kind.as_str(), id);

        match self.backend.engage(kind, id).await {
            Ok(confirmed) => {
                self.apply(|feed| {
                    // With other toggles still in flight the server's state
                    // is already outdated; the last answer settles it.
                    if feed.settle(kind, id) == 0 {
                        if let Some(state) = confirmed {
                            feed.confirm(kind, id, state);
                        }
                    }
                    feed.get(id).and_then(Post::engagement)
                })
                .await
            }
            Err(e) => {
                warn!("{} on post {} failed, rolling back: {}", kind.as_str(), id, e);
                // A torn-down view has nothing left to roll back.
                let _ = self
                    .apply(|feed| {
                        feed.settle(kind, id);
                        // A reload since the toggle already replaced it with server state.
                        if feed.epoch() == epoch {
                            feed.rollback(kind, id);
                        }
                    })
                    .await;
                Err(e)
            }
        }
    }

    async fn engage_refetch(&self, kind: EngagementKind, id: &str) -> Result<Option<Engagement>> {
        if let Err(e) = self.backend.engage(kind, id).await {
            warn!("{} on post {} failed: {}", kind.as_str(), id, e);
            return Err(e);
        }

        let posts = self.backend.fetch_posts(&self.filter).await?;
        self.apply(|feed| {
            feed.load(posts);
            feed.get(id).and_then(Post::engagement)
        })
        .await
    }

    /// Adds a comment once the server accepts it.
    ///
    /// Blank text is refused without contacting the server. The comment is
    /// authored by the viewer's server-resolved identity.
    ///
    /// # Returns
    ///
    /// Whether the comment was appended locally; `false` when the post left
    /// the collection while the request was in flight.
    pub async fn comment(&self, id: &str, text: &str) -> Result<bool> {
        validate_comment(text)?;
        let author = self
            .viewer
            .as_ref()
            .map(|viewer| viewer.summary.clone())
            .ok_or_else(|| {
                FeedError::InvalidInput("Viewer identity is not loaded yet".to_string())
            })?;
        self.require_active(id).await?;

        info!("Commenting on post {}", id);
        self.backend.comment(id, text).await?;

        self.apply(|feed| feed.append_comment(id, Comment::new(author, text)))
            .await
    }

    /// Replaces the content of one of the viewer's posts once the server accepts it.
    pub async fn edit(&self, id: &str, content: &str) -> Result<bool> {
        let post = self.require_active(id).await?;
        self.require_owner(&post)?;
        let has_media = post
            .active()
            .map(|active| !active.media.is_none())
            .unwrap_or(false);
        validate_post_content(content, has_media)?;

        info!("Editing post {}", id);
        self.backend.edit_post(id, content).await?;

        self.apply(|feed| feed.edit_local(id, content)).await
    }

    /// Deletes one of the viewer's posts and removes it once the server confirms.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let post = {
            let feed = self.feed.lock().await;
            feed.get(id)
                .cloned()
                .ok_or_else(|| FeedError::NotFound(id.to_string()))?
        };
        self.require_owner(&post)?;

        info!("Deleting post {}", id);
        self.backend.delete_post(id).await?;

        self.apply(|feed| feed.remove_local(id).is_some()).await
    }

    /// Removes a post as a moderator. A blank reason falls back to
    /// [`DEFAULT_REMOVAL_REASON`].
    pub async fn remove_as_admin(&self, id: &str, reason: &str) -> Result<bool> {
        match &self.viewer {
            Some(viewer) if viewer.is_admin => {}
            _ => {
                return Err(FeedError::Forbidden(
                    "Only administrators can remove posts".to_string(),
                ))
            }
        }
        if !self.feed.lock().await.contains(id) {
            return Err(FeedError::NotFound(id.to_string()));
        }

        let reason = match reason.trim() {
            "" => DEFAULT_REMOVAL_REASON,
            reason => reason,
        };
        info!("Removing post {} as moderator", id);
        self.backend.admin_delete_post(id, reason).await?;

        self.apply(|feed| feed.remove_local(id).is_some()).await
    }
}
