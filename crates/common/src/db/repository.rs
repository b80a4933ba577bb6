//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::post::Post;
use crate::sentiment::SentimentLabel;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, Statement,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Which posts a query covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    All,
    Community(String),
}

impl Scope {
    pub fn community(name: impl Into<String>) -> Self {
        Scope::Community(name.into())
    }

    fn condition(&self) -> Condition {
        match self {
            Scope::All => Condition::all(),
            Scope::Community(name) => Condition::all().add(PostColumn::Community.eq(name.as_str())),
        }
    }
}

/// Whether an upsert created or refreshed the row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Label distribution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
}

impl SentimentCounts {
    pub fn get(&self, label: SentimentLabel) -> u64 {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Negative => self.negative,
            SentimentLabel::Neutral => self.neutral,
        }
    }

    pub fn total(&self) -> u64 {
        self.positive + self.negative + self.neutral
    }

    fn add(&mut self, label: SentimentLabel, count: u64) {
        match label {
            SentimentLabel::Positive => self.positive += count,
            SentimentLabel::Negative => self.negative += count,
            SentimentLabel::Neutral => self.neutral += count,
        }
    }
}

/// Totals and averages over stored posts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub total_posts: u64,
    /// None when no posts are stored
    pub avg_score: Option<f64>,
    pub avg_comments: Option<f64>,
}

/// Highest and lowest polarity posts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentExtremes {
    pub most_positive: Option<StoredPost>,
    pub most_negative: Option<StoredPost>,
}

/// Per-community aggregate row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub community: String,
    pub stats: OverallStats,
    pub sentiment: SentimentCounts,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.connection()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert the post, or refresh the mutable fields of the stored row with
    /// the same `(id, community)`.
    ///
    /// `created_at` always keeps the value from the first insert. The check
    /// and the write share one transaction, so a failure leaves the row
    /// exactly as it was.
    pub async fn upsert_post(&self, post: &Post) -> Result<UpsertOutcome> {
        self.upsert_in_transaction(post)
            .await
            .map_err(|e| AppError::Persistence {
                id: post.id().to_string(),
                community: post.community().to_string(),
                message: e.to_string(),
            })
    }

    async fn upsert_in_transaction(&self, post: &Post) -> std::result::Result<UpsertOutcome, DbErr> {
        let txn = self.conn().begin().await?;

        let existing = PostEntity::find_by_id((post.id().to_string(), post.community().to_string()))
            .one(&txn)
            .await?;

        let row = PostActiveModel {
            id: Set(post.id().to_string()),
            community: Set(post.community().to_string()),
            title: Set(post.title().to_string()),
            author: Set(post.author().to_string()),
            score: Set(post.score()),
            num_comments: Set(post.num_comments()),
            upvote_ratio: Set(post.upvote_ratio()),
            created_at: Set(post.created_at()),
            sentiment_score: Set(post.sentiment_score()),
            sentiment_label: Set(post.sentiment_label().into()),
            fetched_at: Set(post.fetched_at()),
        };

        PostEntity::insert(row)
            .on_conflict(
                OnConflict::columns([PostColumn::Id, PostColumn::Community])
                    .update_columns([
                        PostColumn::Title,
                        PostColumn::Author,
                        PostColumn::Score,
                        PostColumn::NumComments,
                        PostColumn::UpvoteRatio,
                        PostColumn::SentimentScore,
                        PostColumn::SentimentLabel,
                        PostColumn::FetchedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        txn.commit().await?;

        let outcome = if existing.is_some() {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        };

        debug!(
            id = post.id(),
            community = post.community(),
            outcome = ?outcome,
            "Post upserted"
        );

        Ok(outcome)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Find a post by natural key
    pub async fn find_post(&self, id: &str, community: &str) -> Result<Option<StoredPost>> {
        PostEntity::find_by_id((id.to_string(), community.to_string()))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Count stored posts
    pub async fn count_posts(&self, scope: &Scope) -> Result<u64> {
        PostEntity::find()
            .filter(scope.condition())
            .count(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Distinct stored community names, ascending
    pub async fn communities(&self) -> Result<Vec<String>> {
        PostEntity::find()
            .select_only()
            .column(PostColumn::Community)
            .distinct()
            .order_by_asc(PostColumn::Community)
            .into_tuple::<String>()
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Up to `n` posts by score descending.
    ///
    /// Ties go to the newer post, then to the smaller id, then to the
    /// smaller community name, so the order is total and repeatable.
    pub async fn top_posts(&self, scope: &Scope, n: usize) -> Result<Vec<StoredPost>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        Self::ranked(PostEntity::find().filter(scope.condition()))
            .limit(n as u64)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    fn ranked(query: Select<PostEntity>) -> Select<PostEntity> {
        query
            .order_by_desc(PostColumn::Score)
            .order_by_desc(PostColumn::CreatedAt)
            .order_by_asc(PostColumn::Id)
            .order_by_asc(PostColumn::Community)
    }

    /// Count of posts per sentiment label
    pub async fn sentiment_counts(&self, scope: &Scope) -> Result<SentimentCounts> {
        let rows: Vec<(String, i64)> = PostEntity::find()
            .select_only()
            .column(PostColumn::SentimentLabel)
            .column_as(PostColumn::Id.count(), "count")
            .filter(scope.condition())
            .group_by(PostColumn::SentimentLabel)
            .into_tuple()
            .all(self.conn())
            .await?;

        let mut counts = SentimentCounts::default();
        for (label, count) in rows {
            match label.parse::<SentimentLabel>() {
                Ok(label) => counts.add(label, count.max(0) as u64),
                Err(e) => warn!(error = %e, count = count, "Skipping rows with unknown label"),
            }
        }

        Ok(counts)
    }

    /// Total posts, average score and average comment count
    pub async fn overall_stats(&self, scope: &Scope) -> Result<OverallStats> {
        let (filter, values): (&str, Vec<sea_orm::Value>) = match scope {
            Scope::All => ("", vec![]),
            Scope::Community(name) => ("WHERE community = ?", vec![name.as_str().into()]),
        };

        let sql = format!(
            r#"
            SELECT
                COUNT(*) AS total_posts,
                AVG(score) AS avg_score,
                AVG(num_comments) AS avg_comments
            FROM posts
            {}
            "#,
            filter
        );

        let stmt = Statement::from_sql_and_values(DbBackend::Sqlite, &sql, values);

        let Some(row) = self.conn().query_one(stmt).await? else {
            return Ok(OverallStats::default());
        };

        let total_posts: i64 = row.try_get_by_index(0)?;

        Ok(OverallStats {
            total_posts: total_posts.max(0) as u64,
            avg_score: row.try_get_by_index::<Option<f64>>(1)?,
            avg_comments: row.try_get_by_index::<Option<f64>>(2)?,
        })
    }

    /// Most positive and most negative post by polarity
    pub async fn sentiment_extremes(&self, scope: &Scope) -> Result<SentimentExtremes> {
        let most_positive = Self::ranked(
            PostEntity::find()
                .filter(scope.condition())
                .order_by_desc(PostColumn::SentimentScore),
        )
        .one(self.conn())
        .await?;

        let most_negative = Self::ranked(
            PostEntity::find()
                .filter(scope.condition())
                .order_by_asc(PostColumn::SentimentScore),
        )
        .one(self.conn())
        .await?;

        Ok(SentimentExtremes {
            most_positive,
            most_negative,
        })
    }

    /// Posts written at or after `since`, in capture order.
    ///
    /// `fetched_at` is set per record during normalization, so for one run
    /// this is the order the posts were fetched and stored in.
    pub async fn fetched_since(&self, scope: &Scope, since: DateTime<Utc>) -> Result<Vec<StoredPost>> {
        PostEntity::find()
            .filter(scope.condition())
            .filter(PostColumn::FetchedAt.gte(since))
            .order_by_asc(PostColumn::FetchedAt)
            .order_by_asc(PostColumn::Id)
            .order_by_asc(PostColumn::Community)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Stats and label counts for one community
    pub async fn community_summary(&self, community: &str) -> Result<CommunitySummary> {
        let scope = Scope::community(community);

        Ok(CommunitySummary {
            community: community.to_string(),
            stats: self.overall_stats(&scope).await?,
            sentiment: self.sentiment_counts(&scope).await?,
        })
    }
}
