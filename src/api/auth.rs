//! Authentication endpoints.
//!
//! Login stores the returned bearer token in the session; `me` resolves and
//! caches the viewer's identity.

use log::{info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::error::{FeedError, Result};
use crate::models::UserProfile;
use crate::session::Redirect;

use super::client::ApiClient;

/// Builds the Authorization header for bearer token authentication.
///
/// ```rust
/// use tweetfeed::api::build_bearer_auth_header;
///
/// let header = build_bearer_auth_header("your_token");
/// assert_eq!(header, "Bearer your_token");
/// ```
pub fn build_bearer_auth_header(token: &str) -> String {
    format!("Bearer {}", token)
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: UserProfile,
}

impl ApiClient {
    /// Logs in with email and password.
    ///
    /// On success the token and identity are stored in the session and the
    /// viewer is sent to the admin view if they are an admin, to the home
    /// feed otherwise.
    pub async fn login(&self, email: &str, password: &str) -> Result<Redirect> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(FeedError::InvalidInput(
                "Email and password are required".to_string(),
            ));
        }

        info!("Logging in");
        let request_builder = self
            .post("/auth/login")
            .json(&json!({ "email": email.trim(), "password": password }));

        let response: LoginResponse = self.send_json(request_builder, "login").await?;
        if response.token.is_empty() {
            warn!("Login response carried an empty token");
            return Err(FeedError::Decode("login: empty token".to_string()));
        }

        self.session().set_token(&response.token);
        let is_admin = response.user.is_admin;
        info!("Logged in as @{}", response.user.handle());
        self.session().set_identity(response.user);

        Ok(if is_admin {
            Redirect::Admin
        } else {
            Redirect::Home
        })
    }

    /// Creates an account. The viewer must log in afterwards.
    pub async fn signup(&self, username: &str, email: &str, password: &str) -> Result<Redirect> {
        if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(FeedError::InvalidInput(
                "Username, email and password are required".to_string(),
            ));
        }

        info!("Signing up @{}", username.trim());
        let request_builder = self.post("/auth/signup").json(&json!({
            "username": username.trim(),
            "email": email.trim(),
            "password": password,
        }));
        self.send(request_builder, "signup").await?;
        Ok(Redirect::Login)
    }

    /// Fetches the viewer's identity and caches it in the session.
    pub async fn me(&self) -> Result<UserProfile> {
        let request_builder = self.authorized(self.get("/auth/me"))?;
        let envelope: UserEnvelope = self.send_json(request_builder, "me").await?;
        self.session().set_identity(envelope.user.clone());
        Ok(envelope.user)
    }

    /// Clears the session. Always sends the viewer to login.
    pub fn logout(&self) -> Redirect {
        self.session().logout();
        Redirect::Login
    }
}
