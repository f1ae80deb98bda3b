//! Session context shared by every view.
//!
//! The session owns the bearer token and the cached identity of the viewer.
//! Views receive it explicitly instead of reaching into ambient storage,
//! and all reads and writes go through [`TokenStore`].

use std::sync::{Arc, Mutex, RwLock};

use log::{debug, info, warn};

use crate::config::mask_token;
use crate::error::{FeedError, Result};
use crate::models::UserProfile;

/// Where the viewer should be sent after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    Login,
    Home,
    Admin,
}

/// Read/write contract for the bearer token.
pub trait TokenStore: Send + Sync {
    fn read(&self) -> Option<String>;
    fn write(&self, token: &str);
    fn clear(&self);
}

/// Token store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn read(&self) -> Option<String> {
        match self.token.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn write(&self, token: &str) {
        let mut guard = match self.token.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(token.to_string());
    }

    fn clear(&self) {
        let mut guard = match self.token.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = None;
    }
}

/// Token plus cached identity, cheap to clone and share between views.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn TokenStore>,
    identity: Arc<RwLock<Option<UserProfile>>>,
}

impl Session {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            identity: Arc::new(RwLock::new(None)),
        }
    }

    /// Session backed by a [`MemoryTokenStore`], optionally pre-seeded.
    pub fn in_memory(token: Option<String>) -> Self {
        let store = match token {
            Some(token) => MemoryTokenStore::with_token(token),
            None => MemoryTokenStore::new(),
        };
        Self::new(Arc::new(store))
    }

    pub fn token(&self) -> Option<String> {
        self.store.read().filter(|token| !token.is_empty())
    }

    /// Returns the token or [`FeedError::Unauthenticated`] when none is stored.
    pub fn require_token(&self) -> Result<String> {
        self.token().ok_or(FeedError::Unauthenticated)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn set_token(&self, token: &str) {
        debug!("Storing session token (masked): {}", mask_token(token));
        self.store.write(token);
    }

    /// The viewer's identity as last returned by the server.
    pub fn identity(&self) -> Option<UserProfile> {
        match self.identity.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_identity(&self, profile: UserProfile) {
        let mut guard = match self.identity.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(profile);
    }

    /// Clears both the token and the cached identity.
    pub fn logout(&self) {
        info!("Clearing session");
        self.store.clear();
        let mut guard = match self.identity.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = None;
    }

    /// Applies the session side of an error: authentication failures clear
    /// the session and send the viewer to login.
    pub fn handle_failure(&self, err: &FeedError) -> Option<Redirect> {
        if err.is_auth_failure() {
            warn!("Authentication failed, logging out");
            self.logout();
            Some(Redirect::Login)
        } else {
            None
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .field(
                "identity",
                &self.identity().map(|profile| profile.summary.handle),
            )
            .finish()
    }
}
