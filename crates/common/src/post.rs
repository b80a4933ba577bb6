//! Validated post value object
//!
//! A `Post` can only be built through `Post::new`, which runs the field
//! rules and derives the sentiment label from the polarity. Once built it is
//! immutable.

use crate::errors::{AppError, Result};
use crate::sentiment::{clamp_polarity, SentimentLabel};
use chrono::{DateTime, Utc};
use serde::Serialize;
use validator::Validate;

/// Author sentinel for deleted or unknown accounts
pub const DELETED_AUTHOR: &str = "[deleted]";

/// Unvalidated post fields, as produced by normalization
#[derive(Debug, Clone, Validate)]
pub struct PostFields {
    #[validate(length(min = 1, message = "post id is required"))]
    pub id: String,

    #[validate(length(min = 1, message = "community is required"))]
    pub community: String,

    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,

    #[validate(length(min = 1, message = "author must not be empty"))]
    pub author: String,

    #[validate(range(min = 0, message = "score must be non-negative"))]
    pub score: i64,

    #[validate(range(min = 0, message = "comment count must be non-negative"))]
    pub num_comments: i64,

    #[validate(range(min = 0.0, max = 1.0, message = "upvote ratio must be within [0, 1]"))]
    pub upvote_ratio: f64,

    pub created_at: DateTime<Utc>,

    pub sentiment_score: f64,

    pub fetched_at: DateTime<Utc>,
}

/// A validated post snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    id: String,
    community: String,
    title: String,
    author: String,
    score: i64,
    num_comments: i64,
    upvote_ratio: f64,
    created_at: DateTime<Utc>,
    sentiment_score: f64,
    sentiment_label: SentimentLabel,
    fetched_at: DateTime<Utc>,
}

impl Post {
    /// Validate `fields` and build a post.
    ///
    /// Text fields are trimmed before the checks run, so whitespace-only
    /// values count as empty. The polarity is clamped into [-1.0, 1.0]
    /// before the label is derived.
    pub fn new(fields: PostFields) -> Result<Self> {
        let fields = PostFields {
            id: fields.id.trim().to_string(),
            community: fields.community.trim().to_string(),
            title: fields.title.trim().to_string(),
            author: fields.author.trim().to_string(),
            sentiment_score: clamp_polarity(fields.sentiment_score),
            ..fields
        };

        fields.validate().map_err(|errors| {
            let mut failed: Vec<String> = errors
                .field_errors()
                .keys()
                .map(|field| field.to_string())
                .collect();
            failed.sort();

            AppError::Validation {
                message: errors.to_string(),
                field: failed.into_iter().next(),
            }
        })?;

        Ok(Self {
            sentiment_label: SentimentLabel::from_score(fields.sentiment_score),
            id: fields.id,
            community: fields.community,
            title: fields.title,
            author: fields.author,
            score: fields.score,
            num_comments: fields.num_comments,
            upvote_ratio: fields.upvote_ratio,
            created_at: fields.created_at,
            sentiment_score: fields.sentiment_score,
            fetched_at: fields.fetched_at,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn community(&self) -> &str {
        &self.community
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn num_comments(&self) -> i64 {
        self.num_comments
    }

    pub fn upvote_ratio(&self) -> f64 {
        self.upvote_ratio
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn sentiment_score(&self) -> f64 {
        self.sentiment_score
    }

    pub fn sentiment_label(&self) -> SentimentLabel {
        self.sentiment_label
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Natural key
    pub fn key(&self) -> (&str, &str) {
        (&self.id, &self.community)
    }
}
