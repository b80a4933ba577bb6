//! Forum API fetchers
//!
//! Provides a narrow interface for pulling recent posts of a community:
//! - `RedditFetcher` against the public listing API
//! - `InMemoryFetcher` serving canned records or failures

use crate::errors::FetchError;
use crate::raw::{Listing, RawRecord};
use async_trait::async_trait;
use forumpulse_common::config::FetchConfig;
use forumpulse_common::errors::{AppError, Result};
use forumpulse_common::MAX_FETCH_LIMIT;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Trait for fetching raw posts of one community
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Up to `limit` raw records, newest listing order preserved
    async fn fetch(&self, community: &str, limit: u32) -> std::result::Result<Vec<RawRecord>, FetchError>;

    /// Get the source name
    fn source_name(&self) -> &str;
}

fn effective_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_FETCH_LIMIT)
}

/// Reddit listing client
pub struct RedditFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl RedditFetcher {
    /// Create a new fetcher.
    ///
    /// Redirects are not followed: the API answers unknown communities with
    /// a redirect to its search page.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Fetcher for RedditFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, community: &str, limit: u32) -> std::result::Result<Vec<RawRecord>, FetchError> {
        let limit = effective_limit(limit);
        let url = format!("{}/r/{}/hot.json", self.base_url, community);

        debug!(url = %url, "Requesting listing");

        let response = self
            .client
            .get(&url)
            .query(&[("limit", limit.to_string()), ("raw_json", "1".to_string())])
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    format!("request failed: {}", e)
                };
                FetchError::unavailable(community, message)
            })?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND
            || status == StatusCode::FORBIDDEN
            || status.is_redirection()
        {
            return Err(FetchError::NotFound {
                community: community.to_string(),
            });
        }

        if !status.is_success() {
            return Err(FetchError::unavailable(community, format!("API returned {}", status)));
        }

        let listing: Listing = response
            .json()
            .await
            .map_err(|e| FetchError::unavailable(community, format!("malformed listing: {}", e)))?;

        let records: Vec<RawRecord> = listing
            .data
            .children
            .into_iter()
            .take(limit as usize)
            .map(|child| {
                if !child.data.is_object() {
                    warn!(community = community, "Listing child is not an object");
                }
                RawRecord::from_json(child.data)
            })
            .collect();

        debug!(count = records.len(), "Listing decoded");

        Ok(records)
    }

    fn source_name(&self) -> &str {
        "reddit"
    }
}

/// Fetcher backed by canned responses
#[derive(Default)]
pub struct InMemoryFetcher {
    responses: HashMap<String, std::result::Result<Vec<RawRecord>, FetchError>>,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `records` for `community`
    pub fn with_records(mut self, community: &str, records: Vec<RawRecord>) -> Self {
        self.responses.insert(community.to_string(), Ok(records));
        self
    }

    /// Fail every fetch of `community` with `error`
    pub fn with_failure(mut self, community: &str, error: FetchError) -> Self {
        self.responses.insert(community.to_string(), Err(error));
        self
    }
}

#[async_trait]
impl Fetcher for InMemoryFetcher {
    async fn fetch(&self, community: &str, limit: u32) -> std::result::Result<Vec<RawRecord>, FetchError> {
        match self.responses.get(community) {
            Some(Ok(records)) => Ok(records
                .iter()
                .take(effective_limit(limit) as usize)
                .cloned()
                .collect()),
            Some(Err(e)) => Err(e.clone()),
            None => {
                warn!(community = community, "No canned response");
                Err(FetchError::NotFound {
                    community: community.to_string(),
                })
            }
        }
    }

    fn source_name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> FetchConfig {
        FetchConfig {
            base_url: server.uri(),
            user_agent: "forumpulse-test/0.1".to_string(),
            timeout_secs: 2,
        }
    }

    fn listing(count: usize) -> serde_json::Value {
        let children: Vec<_> = (0..count)
            .map(|i| {
                json!({
                    "kind": "t3",
                    "data": {
                        "id": format!("p{}", i),
                        "subreddit": "rust",
                        "title": format!("Post number {}", i),
                        "author": "ferris",
                        "score": 10 + i,
                        "num_comments": i,
                        "upvote_ratio": 0.95,
                        "created_utc": 1714564800.0 + i as f64
                    }
                })
            })
            .collect();

        json!({"kind": "Listing", "data": {"after": null, "children": children}})
    }

    #[tokio::test]
    async fn test_reddit_fetch_decodes_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/rust/hot.json"))
            .and(query_param("limit", "3"))
            .and(header("user-agent", "forumpulse-test/0.1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(3)))
            .mount(&server)
            .await;

        let fetcher = RedditFetcher::new(&config_for(&server)).unwrap();
        let records = fetcher.fetch("rust", 3).await.unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, Some(json!("p0")));
        assert_eq!(records[2].score, Some(json!(12)));
    }

    #[tokio::test]
    async fn test_reddit_fetch_truncates_to_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/rust/hot.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(8)))
            .mount(&server)
            .await;

        let fetcher = RedditFetcher::new(&config_for(&server)).unwrap();
        assert_eq!(fetcher.fetch("rust", 5).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_reddit_fetch_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/nosuchplace/hot.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/r/renamed/hot.json"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "/subreddits/search.json?q=renamed"),
            )
            .mount(&server)
            .await;

        let fetcher = RedditFetcher::new(&config_for(&server)).unwrap();
        assert!(matches!(
            fetcher.fetch("nosuchplace", 5).await,
            Err(FetchError::NotFound { .. })
        ));
        assert!(matches!(
            fetcher.fetch("renamed", 5).await,
            Err(FetchError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_reddit_fetch_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/busy/hot.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/r/garbled/hot.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let fetcher = RedditFetcher::new(&config_for(&server)).unwrap();
        assert!(matches!(
            fetcher.fetch("busy", 5).await,
            Err(FetchError::SourceUnavailable { .. })
        ));
        assert!(matches!(
            fetcher.fetch("garbled", 5).await,
            Err(FetchError::SourceUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_reddit_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/slow/hot.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(listing(1))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let mut config = config_for(&server);
        config.timeout_secs = 1;
        let fetcher = RedditFetcher::new(&config).unwrap();

        match fetcher.fetch("slow", 5).await {
            Err(FetchError::SourceUnavailable { message, .. }) => {
                assert_eq!(message, "request timed out")
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_in_memory_fetcher() {
        let records: Vec<RawRecord> = (0..4)
            .map(|i| RawRecord::from_json(json!({"id": format!("r{}", i)})))
            .collect();
        let fetcher = InMemoryFetcher::new()
            .with_records("rust", records)
            .with_failure("down", FetchError::unavailable("down", "maintenance"));

        assert_eq!(fetcher.fetch("rust", 2).await.unwrap().len(), 2);
        assert_eq!(fetcher.fetch("rust", 25).await.unwrap().len(), 4);
        assert!(matches!(
            fetcher.fetch("down", 5).await,
            Err(FetchError::SourceUnavailable { .. })
        ));
        assert!(matches!(
            fetcher.fetch("unknown", 5).await,
            Err(FetchError::NotFound { .. })
        ));
    }
}
