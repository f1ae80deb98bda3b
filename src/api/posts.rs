//! Post endpoints: collections, creation, media upload and post actions.

use log::{debug, info};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;

use crate::error::{FeedError, Result};
use crate::feed::{FeedBackend, FeedFilter};
use crate::models::{EngagementKind, EngagementState, Media, NewPost, Post};

use super::client::{encode_segment, sanitize_for_logging, ApiClient};

/// Answer of the media upload endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    video_url: Option<String>,
}

impl UploadResponse {
    fn into_media(self) -> Media {
        if self.kind.as_deref() == Some("video") {
            Media::from_paths(None, self.video_url)
        } else {
            Media::from_paths(self.image_url, None)
        }
    }
}

impl ApiClient {
    /// Fetches a post collection in server order.
    pub async fn fetch_posts(&self, filter: &FeedFilter) -> Result<Vec<Post>> {
        let request_builder = self.authorized(self.get(&filter.api_path()))?;
        let posts: Vec<Post> = self.send_json(request_builder, "fetch_posts").await?;
        info!("Fetched {} posts for {:?}", posts.len(), filter);
        Ok(posts)
    }

    /// Uploads an image or video and returns the stored media reference.
    ///
    /// # Parameters
    ///
    /// - `file_name`: Original file name, forwarded to the server
    /// - `mime`: MIME type such as `image/png` or `video/mp4`
    /// - `bytes`: File contents
    pub async fn upload_media(&self, file_name: &str, mime: &str, bytes: Vec<u8>) -> Result<Media> {
        info!("Uploading {} ({}, {} bytes)", file_name, mime, bytes.len());
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|e| FeedError::InvalidInput(format!("invalid MIME type '{}': {}", mime, e)))?;
        let form = Form::new().part("media", part);

        let request_builder = self.authorized(self.post("/upload/tweet").multipart(form))?;
        let response: UploadResponse = self.send_json(request_builder, "upload_media").await?;

        let media = response.into_media();
        if media.is_none() {
            return Err(FeedError::Decode(
                "upload_media: response carried no media path".to_string(),
            ));
        }
        Ok(media)
    }

    /// Creates a post. Media must already be uploaded.
    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        let (image, video) = match &post.media {
            Media::None => ("", ""),
            Media::Image(path) => (path.as_str(), ""),
            Media::Video(path) => ("", path.as_str()),
        };
        let payload = json!({
            "content": post.content,
            "image": image,
            "video": video,
        });
        debug!(
            "Create payload: {}",
            sanitize_for_logging(&payload.to_string(), 400)
        );

        let request_builder = self.authorized(self.post("/tweets").json(&payload))?;
        let created: Post = self.send_json(request_builder, "create_post").await?;
        info!("Created post {}", created.id);
        Ok(created)
    }

    /// Toggles a like or retweet.
    ///
    /// # Returns
    ///
    /// The server's resulting flag and count when the response carries
    /// them, `None` for a bare acknowledgement.
    pub async fn engage(
        &self,
        kind: EngagementKind,
        post_id: &str,
    ) -> Result<Option<EngagementState>> {
        let path = format!("/tweets/{}/{}", encode_segment(post_id), kind.as_str());
        let request_builder = self.authorized(self.post(&path).json(&json!({})))?;
        let body = self.send(request_builder, kind.as_str()).await?;

        let state = serde_json::from_str::<EngagementState>(&body).ok();
        debug!("{} on {} confirmed with state {:?}", kind.as_str(), post_id, state);
        Ok(state)
    }

    pub async fn like(&self, post_id: &str) -> Result<Option<EngagementState>> {
        self.engage(EngagementKind::Like, post_id).await
    }

    pub async fn retweet(&self, post_id: &str) -> Result<Option<EngagementState>> {
        self.engage(EngagementKind::Retweet, post_id).await
    }

    pub async fn comment(&self, post_id: &str, text: &str) -> Result<()> {
        let path = format!("/tweets/{}/comment", encode_segment(post_id));
        let request_builder = self.authorized(self.post(&path).json(&json!({ "text": text })))?;
        self.send(request_builder, "comment").await?;
        Ok(())
    }

    pub async fn edit_post(&self, post_id: &str, content: &str) -> Result<()> {
        let path = format!("/tweets/{}", encode_segment(post_id));
        let request_builder =
            self.authorized(self.put(&path).json(&json!({ "content": content })))?;
        self.send(request_builder, "edit_post").await?;
        Ok(())
    }

    /// Deletes one of the viewer's own posts.
    pub async fn delete_post(&self, post_id: &str) -> Result<()> {
        let path = format!("/tweets/{}", encode_segment(post_id));
        let request_builder = self.authorized(self.delete(&path))?;
        self.send(request_builder, "delete_post").await?;
        Ok(())
    }

    /// Removes any post as a moderator; the reason is forwarded to the author.
    pub async fn admin_delete_post(&self, post_id: &str, reason: &str) -> Result<()> {
        let path = format!("/admin/tweets/{}", encode_segment(post_id));
        let request_builder =
            self.authorized(self.delete(&path).json(&json!({ "reason": reason })))?;
        self.send(request_builder, "admin_delete_post").await?;
        Ok(())
    }
}

impl FeedBackend for ApiClient {
    async fn fetch_posts(&self, filter: &FeedFilter) -> Result<Vec<Post>> {
        ApiClient::fetch_posts(self, filter).await
    }

    async fn create_post(&self, post: &NewPost) -> Result<Post> {
        ApiClient::create_post(self, post).await
    }

    async fn engage(
        &self,
        kind: EngagementKind,
        post_id: &str,
    ) -> Result<Option<EngagementState>> {
        ApiClient::engage(self, kind, post_id).await
    }

    async fn comment(&self, post_id: &str, text: &str) -> Result<()> {
        ApiClient::comment(self, post_id, text).await
    }

    async fn edit_post(&self, post_id: &str, content: &str) -> Result<()> {
        ApiClient::edit_post(self, post_id, content).await
    }

    async fn delete_post(&self, post_id: &str) -> Result<()> {
        ApiClient::delete_post(self, post_id).await
    }

    async fn admin_delete_post(&self, post_id: &str, reason: &str) -> Result<()> {
        ApiClient::admin_delete_post(self, post_id, reason).await
    }
}
