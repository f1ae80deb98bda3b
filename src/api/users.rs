//! Profile and follow endpoints.

use log::info;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::error::{FeedError, Result};
use crate::models::{ProfileUpdate, UserProfile, UserSummary};

use super::auth::UserEnvelope;
use super::client::{encode_segment, ApiClient};

#[derive(Debug, Deserialize)]
struct FollowResponse {
    following: bool,
}

#[derive(Debug, Deserialize)]
struct FollowersResponse {
    #[serde(default)]
    followers: Vec<UserSummary>,
}

#[derive(Debug, Deserialize)]
struct FollowingResponse {
    #[serde(default)]
    following: Vec<UserSummary>,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    #[serde(default)]
    users: Vec<UserSummary>,
}

impl ApiClient {
    /// Looks up a user's profile by handle.
    pub async fn profile(&self, handle: &str) -> Result<UserProfile> {
        let path = format!("/auth/profile/username/{}", encode_segment(handle));
        let request_builder = self.authorized(self.get(&path))?;
        let envelope: UserEnvelope = self.send_json(request_builder, "profile").await?;
        Ok(envelope.user)
    }

    /// Updates the viewer's bio, location and website.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile> {
        let request_builder = self.authorized(self.put("/auth/profile").json(update))?;
        let envelope: UserEnvelope = self.send_json(request_builder, "update_profile").await?;
        self.session().set_identity(envelope.user.clone());
        Ok(envelope.user)
    }

    /// Replaces the viewer's profile picture.
    ///
    /// Sends the image as multipart field `profilePicture` and stores the
    /// returned profile as the session identity.
    pub async fn upload_profile_picture(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<UserProfile> {
        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|e| FeedError::InvalidInput(format!("invalid MIME type '{}': {}", mime, e)))?;
        let form = Form::new().part("profilePicture", part);

        let request_builder = self.authorized(self.post("/auth/profile/picture").multipart(form))?;
        let envelope: UserEnvelope = self
            .send_json(request_builder, "upload_profile_picture")
            .await?;
        info!("Uploaded profile picture {} ({} bytes)", file_name, size);
        self.session().set_identity(envelope.user.clone());
        Ok(envelope.user)
    }

    /// Follows or unfollows a user.
    ///
    /// # Returns
    ///
    /// Whether the viewer follows the user after the call.
    pub async fn toggle_follow(&self, user_id: &str) -> Result<bool> {
        let path = format!("/auth/follow/{}", encode_segment(user_id));
        let request_builder = self.authorized(self.post(&path))?;
        let response: FollowResponse = self.send_json(request_builder, "toggle_follow").await?;
        info!(
            "Viewer {} user {}",
            if response.following {
                "now follows"
            } else {
                "no longer follows"
            },
            user_id
        );
        Ok(response.following)
    }

    pub async fn followers(&self, handle: &str) -> Result<Vec<UserSummary>> {
        let path = format!("/auth/profile/username/{}/followers", encode_segment(handle));
        let request_builder = self.authorized(self.get(&path))?;
        let response: FollowersResponse = self.send_json(request_builder, "followers").await?;
        Ok(response.followers)
    }

    pub async fn following(&self, handle: &str) -> Result<Vec<UserSummary>> {
        let path = format!("/auth/profile/username/{}/following", encode_segment(handle));
        let request_builder = self.authorized(self.get(&path))?;
        let response: FollowingResponse = self.send_json(request_builder, "following").await?;
        Ok(response.following)
    }

    /// Users the server suggests following.
    pub async fn suggested_users(&self) -> Result<Vec<UserSummary>> {
        let request_builder = self.authorized(self.get("/auth/suggested-users"))?;
        let response: UsersResponse = self.send_json(request_builder, "suggested_users").await?;
        Ok(response.users)
    }
}
