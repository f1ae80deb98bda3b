//! API client and view tests against a local mock server.
//!
//! The mock answers from a table of canned `(method, path)` responses and
//! records every request it sees, so tests can check both what the client
//! did with the answer and what it sent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio_test::assert_ok;

use crate::api::{sanitize_for_logging, ApiClient, SearchKind, SearchResults};
use crate::config::{ClientConfig, EngagementStrategy};
use crate::error::FeedError;
use crate::feed::{FeedFilter, DEFAULT_REMOVAL_REASON};
use crate::models::{EngagementState, Media, NewPost};
use crate::session::{Redirect, Session};
use crate::views::{
    mount_feed, AdminView, DebouncedSearch, ProfileView, SearchView, SidePanel, SEARCH_DEBOUNCE,
};

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    query: Option<String>,
    auth: Option<String>,
    body: String,
}

#[derive(Clone, Default)]
struct MockApi {
    routes: Arc<Mutex<HashMap<(Method, String), (StatusCode, Value)>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockApi {
    fn on(self, method: Method, path: &str, status: StatusCode, body: Value) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), (status, body));
        self
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn answer(
    State(api): State<MockApi>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<Value>) {
    api.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        auth: headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body,
    });

    let routes = api.routes.lock().unwrap();
    match routes.get(&(method, uri.path().to_string())) {
        Some((status, body)) => (*status, Json(body.clone())),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Route not found" })),
        ),
    }
}

/// Serves `api` on an ephemeral port and returns its base address.
async fn serve(api: MockApi) -> String {
    let app = Router::new().fallback(answer).with_state(api);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", address)
}

fn client(base_url: &str, token: Option<&str>) -> ApiClient {
    let config = ClientConfig::new(base_url).unwrap();
    ApiClient::new(&config, Session::in_memory(token.map(str::to_string))).unwrap()
}

fn user_json(id: &str, handle: &str) -> Value {
    json!({ "_id": id, "username": handle, "followers": [], "following": [] })
}

fn post_json(id: &str, author: &str, content: &str) -> Value {
    json!({
        "_id": id,
        "user": { "_id": format!("u-{}", author), "username": author },
        "content": content,
        "createdAt": "2024-05-01T12:00:00Z",
        "likesCount": 2,
        "likedByCurrentUser": false,
        "comments": []
    })
}

#[tokio::test]
async fn test_fetch_posts_sends_bearer_token() {
    let api = MockApi::default().on(
        Method::GET,
        "/api/tweets",
        StatusCode::OK,
        json!([post_json("p1", "bob", "hello #rust")]),
    );
    let base = serve(api.clone()).await;
    let client = client(&base, Some("tok-123"));

    let posts = assert_ok!(client.fetch_posts(&FeedFilter::Home).await);

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].content(), Some("hello #rust"));
    let requests = api.requests();
    assert_eq!(requests[0].auth.as_deref(), Some("Bearer tok-123"));
}

#[tokio::test]
async fn test_missing_token_makes_no_request() {
    let api = MockApi::default();
    let base = serve(api.clone()).await;
    let client = client(&base, None);

    assert_eq!(
        client.fetch_posts(&FeedFilter::Home).await,
        Err(FeedError::Unauthenticated)
    );
    assert!(client.like("p1").await.is_err());
    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn test_unauthorized_clears_session() {
    let api = MockApi::default().on(
        Method::GET,
        "/api/tweets",
        StatusCode::UNAUTHORIZED,
        json!({ "message": "Token is not valid" }),
    );
    let base = serve(api).await;
    let client = client(&base, Some("expired"));

    assert_eq!(
        client.fetch_posts(&FeedFilter::Home).await,
        Err(FeedError::Unauthenticated)
    );
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_rejection_carries_server_message() {
    let api = MockApi::default().on(
        Method::PUT,
        "/api/tweets/p1",
        StatusCode::FORBIDDEN,
        json!({ "message": "Not authorized to edit this tweet" }),
    );
    let base = serve(api).await;
    let client = client(&base, Some("tok"));

    assert_eq!(
        client.edit_post("p1", "changed").await,
        Err(FeedError::Rejected {
            status: 403,
            message: "Not authorized to edit this tweet".to_string()
        })
    );
    assert!(client.session().is_authenticated());
}

#[tokio::test]
async fn test_engage_reads_state_when_present() {
    let api = MockApi::default()
        .on(
            Method::POST,
            "/api/tweets/p1/like",
            StatusCode::OK,
            json!({ "liked": true, "likesCount": 3 }),
        )
        .on(
            Method::POST,
            "/api/tweets/p1/retweet",
            StatusCode::OK,
            json!({ "message": "Retweeted" }),
        );
    let base = serve(api).await;
    let client = client(&base, Some("tok"));

    assert_eq!(
        client.like("p1").await.unwrap(),
        Some(EngagementState {
            active: true,
            count: 3
        })
    );
    assert_eq!(client.retweet("p1").await.unwrap(), None);
}

#[tokio::test]
async fn test_login_stores_session() {
    let mut admin = user_json("u-admin", "moderator");
    admin["isAdmin"] = json!(true);
    let api = MockApi::default().on(
        Method::POST,
        "/api/auth/login",
        StatusCode::OK,
        json!({ "token": "fresh-token", "user": admin }),
    );
    let base = serve(api.clone()).await;
    let client = client(&base, None);

    assert_eq!(
        client.login(" mod@example.com ", "secret").await,
        Ok(Redirect::Admin)
    );
    assert_eq!(client.session().token().as_deref(), Some("fresh-token"));
    assert_eq!(client.session().identity().unwrap().handle(), "moderator");

    let requests = api.requests();
    let request = &requests[0];
    assert_eq!(request.auth, None);
    let body: Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["email"], "mod@example.com");

    assert_eq!(client.logout(), Redirect::Login);
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_login_requires_credentials() {
    let api = MockApi::default();
    let base = serve(api.clone()).await;
    let client = client(&base, None);

    assert!(matches!(
        client.login("", "secret").await,
        Err(FeedError::InvalidInput(_))
    ));
    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn test_hashtag_feed_path_is_encoded() {
    let api = MockApi::default().on(
        Method::GET,
        "/api/tweets/hashtag/caf%C3%A9",
        StatusCode::OK,
        json!([]),
    );
    let base = serve(api.clone()).await;
    let client = client(&base, Some("tok"));

    let posts = client
        .fetch_posts(&FeedFilter::Hashtag("#café".to_string()))
        .await
        .unwrap();

    assert!(posts.is_empty());
    assert_eq!(api.requests()[0].path, "/api/tweets/hashtag/caf%C3%A9");
}

#[tokio::test]
async fn test_create_post_sends_media_fields() {
    let mut created = post_json("p9", "alice", "look");
    created["likesCount"] = json!(0);
    created["image"] = json!("/uploads/cat.png");
    let api = MockApi::default().on(Method::POST, "/api/tweets", StatusCode::CREATED, created);
    let base = serve(api.clone()).await;
    let client = client(&base, Some("tok"));

    let post = client
        .create_post(&NewPost::text("look").with_media(Media::Image("/uploads/cat.png".into())))
        .await
        .unwrap();

    assert_eq!(post.id, "p9");
    let body: Value = serde_json::from_str(&api.requests()[0].body).unwrap();
    assert_eq!(
        body,
        json!({ "content": "look", "image": "/uploads/cat.png", "video": "" })
    );
}

#[tokio::test]
async fn test_upload_media_returns_reference() {
    let api = MockApi::default().on(
        Method::POST,
        "/api/upload/tweet",
        StatusCode::OK,
        json!({ "type": "video", "videoUrl": "/uploads/clip.mp4" }),
    );
    let base = serve(api.clone()).await;
    let client = client(&base, Some("tok"));

    let media = client
        .upload_media("clip.mp4", "video/mp4", b"not really a video".to_vec())
        .await
        .unwrap();

    assert_eq!(media, Media::Video("/uploads/clip.mp4".to_string()));
    assert!(api.requests()[0].body.contains("name=\"media\""));
}

#[tokio::test]
async fn test_upload_profile_picture_updates_identity() {
    let alice = user_json("u-alice", "alice");
    let mut updated = alice.clone();
    updated["profilePicture"] = json!("/uploads/alice.png");
    let api = MockApi::default()
        .on(
            Method::GET,
            "/api/auth/me",
            StatusCode::OK,
            json!({ "user": alice.clone() }),
        )
        .on(
            Method::GET,
            "/api/auth/profile/username/alice",
            StatusCode::OK,
            json!({ "user": alice }),
        )
        .on(
            Method::GET,
            "/api/tweets/user/alice",
            StatusCode::OK,
            json!([]),
        )
        .on(
            Method::POST,
            "/api/auth/profile/picture",
            StatusCode::OK,
            json!({ "user": updated }),
        );
    let base = serve(api.clone()).await;
    let client = client(&base, Some("tok"));

    let mut view = ProfileView::mount(&client, "alice", EngagementStrategy::Optimistic)
        .await
        .unwrap()
        .ready()
        .unwrap();
    assert_ok!(
        view.upload_profile_picture("alice.png", "image/png", b"png bytes".to_vec())
            .await
    );

    let avatar = Some("/uploads/alice.png".to_string());
    assert_eq!(view.profile().summary.avatar, avatar);
    assert_eq!(view.viewer().summary.avatar, avatar);
    assert_eq!(client.session().identity().unwrap().summary.avatar, avatar);

    let requests = api.requests();
    let upload = requests
        .iter()
        .find(|request| request.path == "/api/auth/profile/picture")
        .unwrap();
    assert_eq!(upload.method, Method::POST);
    assert_eq!(upload.auth.as_deref(), Some("Bearer tok"));
    assert!(upload.body.contains("name=\"profilePicture\""));
    assert!(upload.body.contains("filename=\"alice.png\""));
}

#[tokio::test]
async fn test_upload_profile_picture_rejects_bad_mime() {
    let client = client("http://127.0.0.1:9", Some("tok"));
    assert!(matches!(
        client
            .upload_profile_picture("a.png", "not a mime", Vec::new())
            .await,
        Err(FeedError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_admin_delete_sends_reason() {
    let api = MockApi::default().on(
        Method::DELETE,
        "/api/admin/tweets/p1",
        StatusCode::OK,
        json!({ "message": "Tweet removed" }),
    );
    let base = serve(api.clone()).await;
    let client = client(&base, Some("tok"));

    client.admin_delete_post("p1", "Spam").await.unwrap();

    let body: Value = serde_json::from_str(&api.requests()[0].body).unwrap();
    assert_eq!(body["reason"], "Spam");
}

#[tokio::test]
async fn test_mount_feed_loads_identity_and_posts() {
    let api = MockApi::default()
        .on(
            Method::GET,
            "/api/auth/me",
            StatusCode::OK,
            json!({ "user": user_json("u-alice", "alice") }),
        )
        .on(
            Method::GET,
            "/api/tweets",
            StatusCode::OK,
            json!([post_json("p2", "bob", "b"), post_json("p1", "alice", "a")]),
        )
        .on(
            Method::POST,
            "/api/tweets/p2/like",
            StatusCode::OK,
            json!({ "liked": true, "likesCount": 8 }),
        );
    let base = serve(api).await;
    let client = client(&base, Some("tok"));

    let feed = mount_feed(&client, FeedFilter::Home, EngagementStrategy::Optimistic)
        .await
        .unwrap()
        .ready()
        .unwrap();

    assert_eq!(feed.viewer().unwrap().handle(), "alice");
    assert_eq!(feed.len().await, 2);
    assert_eq!(client.session().identity().unwrap().id(), "u-alice");

    // The server's count wins over the optimistic +1
    let engagement = feed.like("p2").await.unwrap().unwrap();
    assert_eq!((engagement.likes, engagement.liked), (8, true));
}

#[tokio::test]
async fn test_mount_feed_redirects_without_session() {
    let expired_body = json!({ "message": "Token is not valid" });
    let api = MockApi::default()
        .on(
            Method::GET,
            "/api/auth/me",
            StatusCode::UNAUTHORIZED,
            expired_body.clone(),
        )
        .on(
            Method::GET,
            "/api/tweets",
            StatusCode::UNAUTHORIZED,
            expired_body,
        );
    let base = serve(api.clone()).await;

    let anonymous = client(&base, None);
    let mount = mount_feed(&anonymous, FeedFilter::Home, EngagementStrategy::Optimistic)
        .await
        .unwrap();
    assert_eq!(mount.redirect(), Some(Redirect::Login));
    assert!(api.requests().is_empty());

    let expired = client(&base, Some("expired"));
    let mount = mount_feed(&expired, FeedFilter::Home, EngagementStrategy::Optimistic)
        .await
        .unwrap();
    assert_eq!(mount.redirect(), Some(Redirect::Login));
    assert!(!expired.session().is_authenticated());
}

#[tokio::test]
async fn test_admin_view_sends_non_admins_home() {
    let api = MockApi::default()
        .on(
            Method::GET,
            "/api/auth/me",
            StatusCode::OK,
            json!({ "user": user_json("u-alice", "alice") }),
        )
        .on(Method::GET, "/api/tweets", StatusCode::OK, json!([]));
    let base = serve(api).await;
    let client = client(&base, Some("tok"));

    let mount = AdminView::mount(&client).await.unwrap();
    assert_eq!(mount.redirect(), Some(Redirect::Home));
}

#[tokio::test]
async fn test_admin_view_removes_post() {
    let mut admin = user_json("u-admin", "moderator");
    admin["isAdmin"] = json!(true);
    let api = MockApi::default()
        .on(
            Method::GET,
            "/api/auth/me",
            StatusCode::OK,
            json!({ "user": admin }),
        )
        .on(
            Method::GET,
            "/api/tweets",
            StatusCode::OK,
            json!([post_json("p1", "bob", "spam spam")]),
        )
        .on(
            Method::DELETE,
            "/api/admin/tweets/p1",
            StatusCode::OK,
            json!({ "message": "Tweet removed" }),
        );
    let base = serve(api.clone()).await;
    let client = client(&base, Some("tok"));

    let view = AdminView::mount(&client).await.unwrap().ready().unwrap();
    assert_eq!(view.feed().strategy(), EngagementStrategy::Refetch);

    assert!(view.remove("p1", "").await.unwrap());
    assert!(view.feed().is_empty().await);

    let removal = api
        .requests()
        .into_iter()
        .find(|request| request.method == Method::DELETE)
        .unwrap();
    let body: Value = serde_json::from_str(&removal.body).unwrap();
    assert_eq!(body["reason"], DEFAULT_REMOVAL_REASON);
}

#[tokio::test]
async fn test_profile_view_toggle_follow() {
    let mut bob = user_json("u-bob", "bob");
    bob["followers"] = json!(["u-carol"]);
    let api = MockApi::default()
        .on(
            Method::GET,
            "/api/auth/me",
            StatusCode::OK,
            json!({ "user": user_json("u-alice", "alice") }),
        )
        .on(
            Method::GET,
            "/api/auth/profile/username/bob",
            StatusCode::OK,
            json!({ "user": bob }),
        )
        .on(
            Method::GET,
            "/api/tweets/user/bob",
            StatusCode::OK,
            json!([post_json("p1", "bob", "hi")]),
        )
        .on(
            Method::POST,
            "/api/auth/follow/u-bob",
            StatusCode::OK,
            json!({ "following": true }),
        );
    let base = serve(api).await;
    let client = client(&base, Some("tok"));

    let mut view = ProfileView::mount(&client, "bob", EngagementStrategy::Optimistic)
        .await
        .unwrap()
        .ready()
        .unwrap();
    assert!(!view.is_own_profile());
    assert!(!view.is_following());
    assert_eq!(view.posts().len().await, 1);

    assert!(view.toggle_follow().await.unwrap());
    assert!(view.is_following());
    assert_eq!(view.follower_count(), 2);
    assert!(client.session().identity().unwrap().follows("u-bob"));

    assert!(matches!(
        view.update_profile(&Default::default()).await,
        Err(FeedError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_search_view() {
    let api = MockApi::default().on(
        Method::GET,
        "/api/tweets/search",
        StatusCode::OK,
        json!([{ "_id": "u-bob", "username": "bob" }]),
    );
    let base = serve(api.clone()).await;
    let client = client(&base, Some("tok"));
    let mut view = SearchView::new(&client);

    let results = view.search("   ", SearchKind::Posts).await.unwrap();
    assert!(results.is_empty());
    assert!(api.requests().is_empty());

    let results = view.search("bo b", SearchKind::Users).await.unwrap().clone();
    match results {
        SearchResults::Users(users) => assert_eq!(users[0].handle, "bob"),
        SearchResults::Posts(_) => panic!("expected user results"),
    }
    let query = api.requests()[0].query.clone().unwrap();
    assert!(query.contains("type=users"));
    assert!(query.starts_with("q=bo"));
}

#[tokio::test(start_paused = true)]
async fn test_debounced_search_waits_for_quiet_period() {
    // Without a token a request that gets through fails as unauthenticated.
    let client = client("http://127.0.0.1:9", None);
    let search = DebouncedSearch::new(&client);
    let started = tokio::time::Instant::now();

    let (first, second) = tokio::join!(search.search("ru", SearchKind::Posts), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        search.search("rust", SearchKind::Posts).await
    });

    assert_eq!(first, Ok(None));
    assert_eq!(second, Err(FeedError::Unauthenticated));
    assert!(started.elapsed() >= Duration::from_millis(100) + SEARCH_DEBOUNCE);
}

#[tokio::test(start_paused = true)]
async fn test_debounced_blank_query_clears_at_once() {
    let client = client("http://127.0.0.1:9", None);
    let search = DebouncedSearch::new(&client);
    let started = tokio::time::Instant::now();

    let results = search.search("  ", SearchKind::Users).await;

    assert_eq!(results, Ok(Some(SearchResults::empty(SearchKind::Users))));
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn test_debounced_search_sends_only_latest_query() {
    let api = MockApi::default().on(
        Method::GET,
        "/api/tweets/search",
        StatusCode::OK,
        json!([post_json("p1", "bob", "#rust")]),
    );
    let base = serve(api.clone()).await;
    let client = client(&base, Some("tok"));
    let mut view = SearchView::new(&client);
    let typing = view.debounced();
    assert_eq!(typing.delay(), SEARCH_DEBOUNCE);

    let (stale, latest) = tokio::join!(typing.search("ru", SearchKind::Posts), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        view.search_debounced("rust", SearchKind::Posts).await.map(|r| r.cloned())
    });

    assert_eq!(stale, Ok(None));
    assert_eq!(latest.unwrap().unwrap().len(), 1);
    assert_eq!(view.query(), "rust");
    let requests = api.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].query.as_deref().unwrap().starts_with("q=rust"));
}

#[tokio::test]
async fn test_side_panel() {
    let api = MockApi::default()
        .on(
            Method::GET,
            "/api/tweets/trends",
            StatusCode::OK,
            json!({ "trends": [{ "tag": "rust", "count": 12 }] }),
        )
        .on(
            Method::GET,
            "/api/auth/suggested-users",
            StatusCode::OK,
            json!({ "users": [{ "_id": "u-bob", "username": "bob" }] }),
        );
    let base = serve(api.clone()).await;

    let panel = SidePanel::load(&client(&base, Some("tok"))).await.unwrap();
    assert_eq!(panel.trends[0].tag, "rust");
    assert_eq!(panel.suggested_users[0].handle, "bob");

    let empty = SidePanel::load(&client(&base, None)).await.unwrap();
    assert_eq!(empty, SidePanel::default());
    assert_eq!(api.requests().len(), 2);
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Nothing listens on this port once the listener is dropped
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{}", address), Some("tok"));
    assert!(matches!(
        client.fetch_posts(&FeedFilter::Home).await,
        Err(FeedError::Transport(_))
    ));
}

#[test]
fn test_sanitize_for_logging() {
    assert_eq!(sanitize_for_logging("line\nbreak\u{7}", 50), "line break?");
    assert_eq!(
        sanitize_for_logging("abcdef", 3),
        "abc... [truncated, 6 total chars]"
    );
}
