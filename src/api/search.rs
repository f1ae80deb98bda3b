//! Search and trend endpoints.

use log::{debug, info};
use serde::Deserialize;

use crate::error::Result;
use crate::models::{Post, Trend, UserSummary};

use super::client::{sanitize_for_logging, ApiClient};

/// What a search looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchKind {
    #[default]
    Posts,
    Users,
}

impl SearchKind {
    /// Value of the `type` query parameter.
    pub fn as_query(&self) -> &'static str {
        match self {
            SearchKind::Posts => "tweets",
            SearchKind::Users => "users",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResults {
    Posts(Vec<Post>),
    Users(Vec<UserSummary>),
}

impl SearchResults {
    pub fn empty(kind: SearchKind) -> Self {
        match kind {
            SearchKind::Posts => SearchResults::Posts(Vec::new()),
            SearchKind::Users => SearchResults::Users(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SearchResults::Posts(posts) => posts.len(),
            SearchResults::Users(users) => users.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Deserialize)]
struct TrendsResponse {
    #[serde(default)]
    trends: Vec<Trend>,
}

impl ApiClient {
    /// Searches posts or users.
    ///
    /// A blank query returns empty results without contacting the server.
    pub async fn search(&self, query: &str, kind: SearchKind) -> Result<SearchResults> {
        let query = query.trim();
        if query.is_empty() {
            debug!("Blank search query, skipping request");
            return Ok(SearchResults::empty(kind));
        }

        info!(
            "Searching {} for '{}'",
            kind.as_query(),
            sanitize_for_logging(query, 50)
        );
        let request_builder = self.authorized(
            self.get("/tweets/search")
                .query(&[("q", query), ("type", kind.as_query())]),
        )?;

        let results = match kind {
            SearchKind::Posts => {
                SearchResults::Posts(self.send_json(request_builder, "search").await?)
            }
            SearchKind::Users => {
                SearchResults::Users(self.send_json(request_builder, "search").await?)
            }
        };
        info!("Search returned {} results", results.len());
        Ok(results)
    }

    /// Currently trending hashtags.
    pub async fn trends(&self) -> Result<Vec<Trend>> {
        let request_builder = self.authorized(self.get("/tweets/trends"))?;
        let response: TrendsResponse = self.send_json(request_builder, "trends").await?;
        Ok(response.trends)
    }
}
