//! View models for the client's screens.
//!
//! Each view follows the same mount flow: check the session for a token
//! (none means the viewer goes to login), then load the viewer's identity
//! and the view's data in parallel. An authentication failure while
//! loading clears the session and also sends the viewer to login.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::api::{ApiClient, SearchKind, SearchResults};
use crate::config::EngagementStrategy;
use crate::error::{FeedError, Result};
use crate::feed::{FeedFilter, FeedSync};
use crate::models::{ProfileUpdate, Trend, UserProfile, UserSummary};
use crate::session::Redirect;

/// Outcome of mounting a view.
#[derive(Debug)]
pub enum Mount<T> {
    Ready(T),
    Redirect(Redirect),
}

impl<T> Mount<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Mount::Ready(view) => Some(view),
            Mount::Redirect(_) => None,
        }
    }

    pub fn redirect(&self) -> Option<Redirect> {
        match self {
            Mount::Ready(_) => None,
            Mount::Redirect(redirect) => Some(*redirect),
        }
    }
}

/// Turns a load failure into a redirect when it was an authentication failure.
fn redirect_or_err<T>(client: &ApiClient, err: FeedError) -> Result<Mount<T>> {
    match client.session().handle_failure(&err) {
        Some(redirect) => Ok(Mount::Redirect(redirect)),
        None => Err(err),
    }
}

/// Mounts a feed view (home or hashtag): identity plus collection.
pub async fn mount_feed(
    client: &ApiClient,
    filter: FeedFilter,
    strategy: EngagementStrategy,
) -> Result<Mount<FeedSync<ApiClient>>> {
    if !client.session().is_authenticated() {
        info!("No session token, redirecting to login");
        return Ok(Mount::Redirect(Redirect::Login));
    }

    let loaded = tokio::try_join!(client.me(), client.fetch_posts(&filter));
    let (viewer, posts) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => return redirect_or_err(client, e),
    };

    let feed = FeedSync::new(Arc::new(client.clone()), filter, strategy).with_viewer(viewer);
    feed.load(posts).await?;
    Ok(Mount::Ready(feed))
}

/// A user's profile page: their details, follow state and posts.
pub struct ProfileView {
    client: ApiClient,
    viewer: UserProfile,
    profile: UserProfile,
    posts: FeedSync<ApiClient>,
    followers: Option<Vec<UserSummary>>,
    following: Option<Vec<UserSummary>>,
}

impl ProfileView {
    pub async fn mount(
        client: &ApiClient,
        handle: &str,
        strategy: EngagementStrategy,
    ) -> Result<Mount<ProfileView>> {
        if !client.session().is_authenticated() {
            return Ok(Mount::Redirect(Redirect::Login));
        }

        let filter = FeedFilter::Author(handle.to_string());
        let loaded = tokio::try_join!(
            client.me(),
            client.profile(handle),
            client.fetch_posts(&filter)
        );
        let (viewer, profile, posts) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => return redirect_or_err(client, e),
        };

        let feed = FeedSync::new(Arc::new(client.clone()), filter, strategy)
            .with_viewer(viewer.clone());
        feed.load(posts).await?;

        Ok(Mount::Ready(ProfileView {
            client: client.clone(),
            viewer,
            profile,
            posts: feed,
            followers: None,
            following: None,
        }))
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn viewer(&self) -> &UserProfile {
        &self.viewer
    }

    pub fn posts(&self) -> &FeedSync<ApiClient> {
        &self.posts
    }

    pub fn is_own_profile(&self) -> bool {
        self.viewer.id() == self.profile.id()
    }

    pub fn is_following(&self) -> bool {
        self.viewer.follows(self.profile.id())
    }

    pub fn follower_count(&self) -> usize {
        self.profile.followers.len()
    }

    pub fn following_count(&self) -> usize {
        self.profile.following.len()
    }

    /// Follows or unfollows the profile's user, applying the server's answer
    /// to both the profile's followers and the viewer's following list.
    pub async fn toggle_follow(&mut self) -> Result<bool> {
        if self.is_own_profile() {
            return Err(FeedError::InvalidInput(
                "You cannot follow yourself".to_string(),
            ));
        }

        let following = self.client.toggle_follow(self.profile.id()).await?;
        let viewer_id = self.viewer.id().to_string();
        let profile_id = self.profile.id().to_string();

        if following {
            if !self.profile.followers.contains(&viewer_id) {
                self.profile.followers.push(viewer_id);
            }
            if !self.viewer.following.contains(&profile_id) {
                self.viewer.following.push(profile_id);
            }
        } else {
            self.profile.followers.retain(|id| *id != viewer_id);
            self.viewer.following.retain(|id| *id != profile_id);
        }
        // The cached follower list is stale either way.
        self.followers = None;
        self.client.session().set_identity(self.viewer.clone());

        Ok(following)
    }

    /// Saves the viewer's own profile fields.
    pub async fn update_profile(&mut self, update: &ProfileUpdate) -> Result<()> {
        if !self.is_own_profile() {
            return Err(FeedError::Forbidden(
                "You can only edit your own profile".to_string(),
            ));
        }

        let updated = self.client.update_profile(update).await?;
        self.viewer = updated.clone();
        self.profile = updated;
        Ok(())
    }

    /// Uploads a new picture for the viewer's own profile.
    pub async fn upload_profile_picture(
        &mut self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<()> {
        if !self.is_own_profile() {
            return Err(FeedError::Forbidden(
                "You can only change your own picture".to_string(),
            ));
        }

        let updated = self
            .client
            .upload_profile_picture(file_name, mime, bytes)
            .await?;
        self.viewer = updated.clone();
        self.profile = updated;
        Ok(())
    }

    /// The profile's followers, fetched on first use.
    pub async fn followers(&mut self) -> Result<&[UserSummary]> {
        if self.followers.is_none() {
            let list = self.client.followers(self.profile.handle()).await?;
            self.followers = Some(list);
        }
        Ok(self.followers.as_deref().unwrap_or_default())
    }

    /// The users the profile follows, fetched on first use.
    pub async fn following(&mut self) -> Result<&[UserSummary]> {
        if self.following.is_none() {
            let list = self.client.following(self.profile.handle()).await?;
            self.following = Some(list);
        }
        Ok(self.following.as_deref().unwrap_or_default())
    }

    pub fn teardown(&self) {
        self.posts.teardown();
    }
}

/// Moderation view, only available to administrators.
pub struct AdminView {
    viewer: UserProfile,
    feed: FeedSync<ApiClient>,
}

impl AdminView {
    /// Mounts the moderation view. Non-admins are sent to the home feed.
    pub async fn mount(client: &ApiClient) -> Result<Mount<AdminView>> {
        if !client.session().is_authenticated() {
            return Ok(Mount::Redirect(Redirect::Login));
        }

        let loaded = tokio::try_join!(client.me(), client.fetch_posts(&FeedFilter::Home));
        let (viewer, posts) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => return redirect_or_err(client, e),
        };

        if !viewer.is_admin {
            warn!("@{} is not an administrator", viewer.handle());
            return Ok(Mount::Redirect(Redirect::Home));
        }

        // Moderation always reloads from the server after an action.
        let feed = FeedSync::new(
            Arc::new(client.clone()),
            FeedFilter::Home,
            EngagementStrategy::Refetch,
        )
        .with_viewer(viewer.clone());
        feed.load(posts).await?;

        Ok(Mount::Ready(AdminView { viewer, feed }))
    }

    pub fn viewer(&self) -> &UserProfile {
        &self.viewer
    }

    pub fn feed(&self) -> &FeedSync<ApiClient> {
        &self.feed
    }

    /// Removes a post; a blank reason uses the default moderation reason.
    pub async fn remove(&self, post_id: &str, reason: &str) -> Result<bool> {
        self.feed.remove_as_admin(post_id, reason).await
    }

    pub fn teardown(&self) {
        self.feed.teardown();
    }
}

/// Quiet period a query must survive before it is sent.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Search-as-you-type entry point.
///
/// Clones share one generation counter: every call supersedes the calls made
/// before it, and only a query left unchanged for the whole delay reaches
/// the server. A superseded call resolves to `Ok(None)`, also when its
/// request was already on the wire.
#[derive(Clone)]
pub struct DebouncedSearch {
    client: ApiClient,
    generation: Arc<AtomicU64>,
    delay: Duration,
}

impl DebouncedSearch {
    pub fn new(client: &ApiClient) -> Self {
        Self::with_delay(client, SEARCH_DEBOUNCE)
    }

    pub fn with_delay(client: &ApiClient, delay: Duration) -> Self {
        Self {
            client: client.clone(),
            generation: Arc::new(AtomicU64::new(0)),
            delay,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits out the delay, then searches unless a newer call came in.
    /// A blank query clears the results at once.
    pub async fn search(&self, query: &str, kind: SearchKind) -> Result<Option<SearchResults>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if query.trim().is_empty() {
            return Ok(Some(SearchResults::empty(kind)));
        }

        tokio::time::sleep(self.delay).await;
        if self.is_superseded(generation) {
            debug!("Search for '{}' superseded before sending", query);
            return Ok(None);
        }

        let results = self.client.search(query, kind).await;
        if self.is_superseded(generation) {
            debug!("Search for '{}' superseded, dropping its answer", query);
            return Ok(None);
        }
        results.map(Some)
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }
}

/// Search screen state: the last query and its results.
pub struct SearchView {
    client: ApiClient,
    query: String,
    kind: SearchKind,
    results: SearchResults,
    debounce: DebouncedSearch,
}

impl SearchView {
    pub fn new(client: &ApiClient) -> Self {
        Self {
            client: client.clone(),
            query: String::new(),
            kind: SearchKind::Posts,
            results: SearchResults::empty(SearchKind::Posts),
            debounce: DebouncedSearch::new(client),
        }
    }

    /// Handle for input events. Its calls supersede
    /// [`SearchView::search_debounced`] and each other.
    pub fn debounced(&self) -> DebouncedSearch {
        self.debounce.clone()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn kind(&self) -> SearchKind {
        self.kind
    }

    pub fn results(&self) -> &SearchResults {
        &self.results
    }

    /// Runs a search. On failure the results are cleared.
    pub async fn search(&mut self, query: &str, kind: SearchKind) -> Result<&SearchResults> {
        self.query = query.to_string();
        self.kind = kind;

        match self.client.search(query, kind).await {
            Ok(results) => {
                self.results = results;
                Ok(&self.results)
            }
            Err(e) => {
                self.clear_after_failure(&e);
                Err(e)
            }
        }
    }

    /// Like [`SearchView::search`], but waits [`SEARCH_DEBOUNCE`] first.
    ///
    /// # Returns
    ///
    /// `None` when a newer query took over; the previous results stay.
    pub async fn search_debounced(
        &mut self,
        query: &str,
        kind: SearchKind,
    ) -> Result<Option<&SearchResults>> {
        match self.debounce.search(query, kind).await {
            Ok(Some(results)) => {
                self.query = query.to_string();
                self.kind = kind;
                self.results = results;
                Ok(Some(&self.results))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.query = query.to_string();
                self.kind = kind;
                self.clear_after_failure(&e);
                Err(e)
            }
        }
    }

    fn clear_after_failure(&mut self, e: &FeedError) {
        warn!("Search failed: {}", e);
        self.results = SearchResults::empty(self.kind);
        if let Some(redirect) = self.client.session().handle_failure(e) {
            info!("Search needs a new session: {:?}", redirect);
        }
    }
}

/// Side panel data: trending hashtags and suggested users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidePanel {
    pub trends: Vec<Trend>,
    pub suggested_users: Vec<UserSummary>,
}

impl SidePanel {
    /// Loads the panel. Without a session the panel is simply empty.
    pub async fn load(client: &ApiClient) -> Result<SidePanel> {
        if !client.session().is_authenticated() {
            return Ok(SidePanel::default());
        }

        let (suggested_users, trends) =
            tokio::try_join!(client.suggested_users(), client.trends())?;
        Ok(SidePanel {
            trends,
            suggested_users,
        })
    }
}
