//! Pipeline processor
//!
//! Core logic for one run: fetch each community, normalize its records and
//! upsert the resulting posts. Communities are processed one at a time and a
//! failure in one never stops the others.

use crate::errors::{FetchError, Rejection};
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;
use chrono::{DateTime, Utc};
use forumpulse_common::db::{Repository, UpsertOutcome};
use forumpulse_common::metrics::{record_rejection, record_store_failure, record_stored, FetchTimer};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// What happened to one community during a run
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityOutcome {
    pub community: String,
    pub fetch_error: Option<FetchError>,
    pub fetched: usize,
    pub rejections: Vec<Rejection>,
    pub inserted: usize,
    pub updated: usize,
    pub store_failures: usize,
}

impl CommunityOutcome {
    fn new(community: &str) -> Self {
        Self {
            community: community.to_string(),
            fetch_error: None,
            fetched: 0,
            rejections: Vec::new(),
            inserted: 0,
            updated: 0,
            store_failures: 0,
        }
    }

    pub fn stored(&self) -> usize {
        self.inserted + self.updated
    }

    pub fn rejected(&self) -> usize {
        self.rejections.len()
    }

    pub fn is_failed(&self) -> bool {
        self.fetch_error.is_some()
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Taken before the first fetch; every post written by the run has a
    /// `fetched_at` at or after it
    pub started_at: DateTime<Utc>,
    pub communities: Vec<CommunityOutcome>,
}

impl RunSummary {
    pub fn total_fetched(&self) -> usize {
        self.communities.iter().map(|c| c.fetched).sum()
    }

    pub fn total_stored(&self) -> usize {
        self.communities.iter().map(CommunityOutcome::stored).sum()
    }

    pub fn total_rejected(&self) -> usize {
        self.communities.iter().map(CommunityOutcome::rejected).sum()
    }

    pub fn failed_communities(&self) -> Vec<&CommunityOutcome> {
        self.communities.iter().filter(|c| c.is_failed()).collect()
    }

    /// No community yielded a stored post
    pub fn is_total_failure(&self) -> bool {
        self.total_stored() == 0
    }
}

/// Pipeline processor
pub struct PipelineProcessor {
    fetcher: Arc<dyn Fetcher>,
    normalizer: Normalizer,
    repository: Repository,
    limit: u32,
}

impl PipelineProcessor {
    pub fn new(fetcher: Arc<dyn Fetcher>, normalizer: Normalizer, repository: Repository, limit: u32) -> Self {
        Self {
            fetcher,
            normalizer,
            repository,
            limit,
        }
    }

    /// Process every community in order under a fresh run id
    pub async fn run(&self, communities: &[String]) -> RunSummary {
        self.run_with_id(Uuid::new_v4(), communities).await
    }

    #[instrument(skip(self, communities), fields(run_id = %run_id, communities = communities.len()))]
    pub async fn run_with_id(&self, run_id: Uuid, communities: &[String]) -> RunSummary {
        let started_at = Utc::now();
        info!(
            source = self.fetcher.source_name(),
            scorer = self.normalizer.scorer_name(),
            limit = self.limit,
            "Starting run"
        );

        let mut outcomes = Vec::with_capacity(communities.len());
        for community in communities {
            outcomes.push(self.process_community(community).await);
        }

        let summary = RunSummary {
            run_id,
            started_at,
            communities: outcomes,
        };

        info!(
            fetched = summary.total_fetched(),
            stored = summary.total_stored(),
            rejected = summary.total_rejected(),
            failed_communities = summary.failed_communities().len(),
            "Run complete"
        );

        summary
    }

    /// Fetch, normalize and persist one community
    #[instrument(skip(self))]
    pub async fn process_community(&self, community: &str) -> CommunityOutcome {
        let mut outcome = CommunityOutcome::new(community);

        let timer = FetchTimer::start(community);
        let records = match self.fetcher.fetch(community, self.limit).await {
            Ok(records) => {
                timer.success(records.len());
                records
            }
            Err(e) => {
                timer.failure(e.kind());
                warn!(error = %e, "Fetch failed, skipping community");
                outcome.fetch_error = Some(e);
                return outcome;
            }
        };

        outcome.fetched = records.len();
        debug!(fetched = outcome.fetched, "Fetched records");

        for raw in &records {
            let post = match self.normalizer.normalize(raw) {
                Ok(post) => post,
                Err(rejection) => {
                    debug!(%rejection, "Record rejected");
                    record_rejection(community, rejection.reason.code());
                    outcome.rejections.push(rejection);
                    continue;
                }
            };

            match self.repository.upsert_post(&post).await {
                Ok(UpsertOutcome::Inserted) => {
                    record_stored(post.community(), "inserted");
                    outcome.inserted += 1;
                }
                Ok(UpsertOutcome::Updated) => {
                    record_stored(post.community(), "updated");
                    outcome.updated += 1;
                }
                Err(e) => {
                    error!(
                        id = post.id(),
                        code = e.code().as_code(),
                        recoverable = e.is_recoverable(),
                        error = %e,
                        "Failed to store post"
                    );
                    record_store_failure(post.community());
                    outcome.store_failures += 1;
                }
            }
        }

        info!(
            fetched = outcome.fetched,
            rejected = outcome.rejected(),
            inserted = outcome.inserted,
            updated = outcome.updated,
            store_failures = outcome.store_failures,
            "Community processed"
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RejectReason;
    use crate::fetcher::InMemoryFetcher;
    use crate::raw::RawRecord;
    use forumpulse_common::db::{DbPool, Scope};
    use forumpulse_common::sentiment::FixedScorer;
    use sea_orm::ConnectionTrait;
    use serde_json::json;

    fn record(id: &str, community: &str, score: i64) -> RawRecord {
        RawRecord::from_json(json!({
            "id": id,
            "subreddit": community,
            "title": format!("Title of {}", id),
            "author": "someone",
            "score": score,
            "num_comments": 2,
            "created_utc": 1714564800
        }))
    }

    async fn processor(fetcher: InMemoryFetcher, limit: u32) -> (PipelineProcessor, Repository) {
        processor_on(DbPool::in_memory().await.unwrap(), fetcher, limit)
    }

    fn processor_on(pool: DbPool, fetcher: InMemoryFetcher, limit: u32) -> (PipelineProcessor, Repository) {
        let repository = Repository::new(pool);
        let normalizer = Normalizer::new(Arc::new(FixedScorer::new(0.3)));
        let processor = PipelineProcessor::new(Arc::new(fetcher), normalizer, repository.clone(), limit);
        (processor, repository)
    }

    #[tokio::test]
    async fn test_failure_isolated_per_community() {
        let fetcher = InMemoryFetcher::new()
            .with_records("rust", (0..3).map(|i| record(&format!("r{}", i), "rust", 10)).collect())
            .with_failure("down", FetchError::unavailable("down", "timed out"));
        let (processor, repository) = processor(fetcher, 25).await;

        let summary = processor
            .run(&["down".to_string(), "rust".to_string()])
            .await;

        assert_eq!(summary.communities.len(), 2);
        assert!(summary.communities[0].is_failed());
        assert_eq!(summary.communities[1].inserted, 3);
        assert_eq!(summary.total_stored(), 3);
        assert_eq!(summary.failed_communities().len(), 1);
        assert!(!summary.is_total_failure());
        assert_eq!(repository.count_posts(&Scope::All).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_rejections_counted_not_stored() {
        let mut bad = record("bad", "rust", 1);
        bad.title = Some(json!("   "));
        let fetcher = InMemoryFetcher::new().with_records(
            "rust",
            vec![record("ok", "rust", -5), bad, RawRecord::default()],
        );
        let (processor, repository) = processor(fetcher, 25).await;

        let outcome = processor.process_community("rust").await;

        assert_eq!(outcome.fetched, 3);
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.rejected(), 2);
        assert_eq!(outcome.rejections[0].reason, RejectReason::EmptyTitle);
        assert_eq!(outcome.rejections[1].reason, RejectReason::MissingId);

        assert!(repository.find_post("bad", "rust").await.unwrap().is_none());
        let stored = repository.find_post("ok", "rust").await.unwrap().unwrap();
        assert_eq!(stored.score, 0);
    }

    #[tokio::test]
    async fn test_rerun_updates_instead_of_duplicating() {
        let fetcher = InMemoryFetcher::new()
            .with_records("rust", vec![record("a", "rust", 5), record("b", "rust", 7)]);
        let (processor, repository) = processor(fetcher, 25).await;

        let first = processor.process_community("rust").await;
        let second = processor.process_community("rust").await;

        assert_eq!((first.inserted, first.updated), (2, 0));
        assert_eq!((second.inserted, second.updated), (0, 2));
        assert_eq!(repository.count_posts(&Scope::All).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_limit_applied() {
        let fetcher = InMemoryFetcher::new().with_records(
            "rust",
            (0..10).map(|i| record(&format!("r{}", i), "rust", i)).collect(),
        );
        let (processor, _) = processor(fetcher, 4).await;

        let outcome = processor.process_community("rust").await;
        assert_eq!(outcome.fetched, 4);
        assert_eq!(outcome.stored(), 4);
    }

    #[tokio::test]
    async fn test_total_failure() {
        let fetcher = InMemoryFetcher::new()
            .with_failure("gone", FetchError::NotFound {
                community: "gone".to_string(),
            });
        let (processor, _) = processor(fetcher, 25).await;

        let summary = processor
            .run(&["gone".to_string(), "missing".to_string()])
            .await;

        assert!(summary.is_total_failure());
        assert_eq!(summary.failed_communities().len(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_counted_and_isolated() {
        let pool = DbPool::in_memory().await.unwrap();
        pool.connection()
            .execute_unprepared(
                "CREATE TRIGGER refuse_b BEFORE INSERT ON posts \
                 WHEN NEW.id = 'b' BEGIN SELECT RAISE(ABORT, 'refused'); END",
            )
            .await
            .unwrap();

        let fetcher = InMemoryFetcher::new().with_records(
            "rust",
            vec![record("a", "rust", 5), record("b", "rust", 6), record("c", "rust", 7)],
        );
        let (processor, repository) = processor_on(pool, fetcher, 25);

        let outcome = processor.process_community("rust").await;

        assert_eq!(outcome.store_failures, 1);
        assert_eq!(outcome.inserted, 2);
        assert_eq!(repository.count_posts(&Scope::All).await.unwrap(), 2);
        assert!(repository.find_post("a", "rust").await.unwrap().is_some());
        assert!(repository.find_post("b", "rust").await.unwrap().is_none());
        assert!(repository.find_post("c", "rust").await.unwrap().is_some());
    }
}
