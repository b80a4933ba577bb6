//! Raw record to validated post conversion
//!
//! Required fields (id, community, title, creation time) reject the record
//! when absent. Counts are clamped instead: a negative or malformed score is
//! stored as 0 rather than dropping the post.

use crate::errors::{RejectReason, Rejection};
use crate::raw::{coerce_count, coerce_ratio, coerce_text, coerce_timestamp, RawRecord, TimestampError};
use chrono::{DateTime, Utc};
use forumpulse_common::errors::AppError;
use forumpulse_common::post::{Post, PostFields, DELETED_AUTHOR};
use forumpulse_common::sentiment::SentimentScorer;
use std::sync::Arc;
use tracing::debug;

/// Converts raw records into posts, scoring each title
#[derive(Clone)]
pub struct Normalizer {
    scorer: Arc<dyn SentimentScorer>,
}

impl Normalizer {
    pub fn new(scorer: Arc<dyn SentimentScorer>) -> Self {
        Self { scorer }
    }

    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    /// Normalize with `fetched_at` set to now
    pub fn normalize(&self, raw: &RawRecord) -> Result<Post, Rejection> {
        self.normalize_at(raw, Utc::now())
    }

    /// Normalize with an explicit capture time
    pub fn normalize_at(&self, raw: &RawRecord, fetched_at: DateTime<Utc>) -> Result<Post, Rejection> {
        let id = non_empty(coerce_text(raw.id.as_ref()));
        let reject = |reason: RejectReason| Rejection {
            record_id: id.clone(),
            reason,
        };

        let Some(record_id) = id.clone() else {
            return Err(reject(RejectReason::MissingId));
        };

        let community = non_empty(coerce_text(raw.subreddit.as_ref()))
            .ok_or_else(|| reject(RejectReason::MissingCommunity))?;

        let title = non_empty(coerce_text(raw.title.as_ref()))
            .ok_or_else(|| reject(RejectReason::EmptyTitle))?;

        let created_at = coerce_timestamp(raw.created_utc.as_ref()).map_err(|e| match e {
            TimestampError::Missing => reject(RejectReason::MissingCreatedAt),
            TimestampError::Invalid(value) => reject(RejectReason::InvalidCreatedAt(value)),
        })?;

        let author = non_empty(coerce_text(raw.author.as_ref()))
            .unwrap_or_else(|| DELETED_AUTHOR.to_string());

        let score = coerce_count(raw.score.as_ref());
        if score.adjusted {
            debug!(id = %record_id, raw = ?raw.score, clamped = score.value, "Score coerced");
        }
        let num_comments = coerce_count(raw.num_comments.as_ref());

        let sentiment_score = self.scorer.score(&title);

        Post::new(PostFields {
            id: record_id,
            community,
            title,
            author,
            score: score.value,
            num_comments: num_comments.value,
            upvote_ratio: coerce_ratio(raw.upvote_ratio.as_ref()),
            created_at,
            sentiment_score,
            fetched_at,
        })
        .map_err(|e| match e {
            AppError::Validation { message, .. } => reject(RejectReason::Invalid(message)),
            other => reject(RejectReason::Invalid(other.to_string())),
        })
    }
}

/// Trimmed text, or None when nothing is left
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use forumpulse_common::sentiment::{FixedScorer, LexiconScorer, SentimentLabel};
    use serde_json::{json, Value};

    fn fixed(polarity: f64) -> Normalizer {
        Normalizer::new(Arc::new(FixedScorer::new(polarity)))
    }

    fn fetched_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap()
    }

    fn raw(overrides: Value) -> RawRecord {
        let mut base = json!({
            "id": "abc123",
            "subreddit": "rust",
            "title": "Borrow checker finally clicked",
            "author": "ferris",
            "score": 42,
            "num_comments": 7,
            "upvote_ratio": 0.93,
            "created_utc": 1714564800.0
        });
        if let (Some(base), Some(overrides)) = (base.as_object_mut(), overrides.as_object()) {
            for (key, value) in overrides {
                base.insert(key.clone(), value.clone());
            }
        }
        RawRecord::from_json(base)
    }

    #[test]
    fn test_valid_record() {
        let post = fixed(0.5).normalize_at(&raw(json!({})), fetched_at()).unwrap();

        assert_eq!(post.key(), ("abc123", "rust"));
        assert_eq!(post.title(), "Borrow checker finally clicked");
        assert_eq!(post.author(), "ferris");
        assert_eq!(post.score(), 42);
        assert_eq!(post.num_comments(), 7);
        assert_eq!(post.upvote_ratio(), 0.93);
        assert_eq!(post.created_at().timestamp(), 1714564800);
        assert_eq!(post.fetched_at(), fetched_at());
        assert_eq!(post.sentiment_label(), SentimentLabel::Positive);
    }

    #[test]
    fn test_threshold_boundaries() {
        let record = raw(json!({}));
        let label = |polarity: f64| {
            fixed(polarity)
                .normalize_at(&record, fetched_at())
                .unwrap()
                .sentiment_label()
        };

        assert_eq!(label(0.1), SentimentLabel::Neutral);
        assert_eq!(label(-0.1), SentimentLabel::Neutral);
        assert_eq!(label(0.11), SentimentLabel::Positive);
        assert_eq!(label(-0.11), SentimentLabel::Negative);
        assert_eq!(label(0.0), SentimentLabel::Neutral);
    }

    #[test]
    fn test_non_finite_polarity_is_neutral() {
        let post = fixed(f64::NAN).normalize_at(&raw(json!({})), fetched_at()).unwrap();
        assert_eq!(post.sentiment_score(), 0.0);
        assert_eq!(post.sentiment_label(), SentimentLabel::Neutral);

        let post = fixed(f64::INFINITY).normalize_at(&raw(json!({})), fetched_at()).unwrap();
        assert_eq!(post.sentiment_score(), 0.0);
    }

    #[test]
    fn test_empty_title_rejected() {
        for title in [json!(""), json!("   \n\t"), Value::Null] {
            let rejection = fixed(0.0)
                .normalize_at(&raw(json!({ "title": title })), fetched_at())
                .unwrap_err();
            assert_eq!(rejection.reason, RejectReason::EmptyTitle);
            assert_eq!(rejection.record_id.as_deref(), Some("abc123"));
        }
    }

    #[test]
    fn test_negative_score_clamped() {
        let post = fixed(0.0)
            .normalize_at(&raw(json!({"score": -5, "num_comments": -1})), fetched_at())
            .unwrap();
        assert_eq!(post.score(), 0);
        assert_eq!(post.num_comments(), 0);
    }

    #[test]
    fn test_malformed_numbers_coerced() {
        let post = fixed(0.0)
            .normalize_at(
                &raw(json!({"score": "many", "num_comments": 3.7, "upvote_ratio": "?"})),
                fetched_at(),
            )
            .unwrap();
        assert_eq!(post.score(), 0);
        assert_eq!(post.num_comments(), 3);
        assert_eq!(post.upvote_ratio(), 0.5);

        let post = fixed(0.0)
            .normalize_at(&raw(json!({"score": "17"})), fetched_at())
            .unwrap();
        assert_eq!(post.score(), 17);
    }

    #[test]
    fn test_missing_required_fields() {
        let n = fixed(0.0);

        let rejection = n.normalize_at(&raw(json!({"id": null})), fetched_at()).unwrap_err();
        assert_eq!(rejection.reason, RejectReason::MissingId);
        assert_eq!(rejection.record_id, None);

        let rejection = n.normalize_at(&raw(json!({"id": "  "})), fetched_at()).unwrap_err();
        assert_eq!(rejection.reason, RejectReason::MissingId);

        let rejection = n
            .normalize_at(&raw(json!({"subreddit": ""})), fetched_at())
            .unwrap_err();
        assert_eq!(rejection.reason, RejectReason::MissingCommunity);

        let rejection = n
            .normalize_at(&raw(json!({"created_utc": null})), fetched_at())
            .unwrap_err();
        assert_eq!(rejection.reason, RejectReason::MissingCreatedAt);

        let rejection = n
            .normalize_at(&raw(json!({"created_utc": "last tuesday"})), fetched_at())
            .unwrap_err();
        assert_eq!(rejection.reason.code(), "invalid_created_at");
    }

    #[test]
    fn test_empty_record_rejected_as_missing_id() {
        let rejection = fixed(0.0)
            .normalize_at(&RawRecord::from_json(json!("garbage")), fetched_at())
            .unwrap_err();
        assert_eq!(rejection.reason, RejectReason::MissingId);
    }

    #[test]
    fn test_author_defaults_to_deleted() {
        let n = fixed(0.0);
        let post = n.normalize_at(&raw(json!({"author": null})), fetched_at()).unwrap();
        assert_eq!(post.author(), DELETED_AUTHOR);

        let post = n.normalize_at(&raw(json!({"author": " "})), fetched_at()).unwrap();
        assert_eq!(post.author(), DELETED_AUTHOR);
    }

    #[test]
    fn test_numeric_id_accepted() {
        let post = fixed(0.0)
            .normalize_at(&raw(json!({"id": 991})), fetched_at())
            .unwrap();
        assert_eq!(post.id(), "991");
    }

    #[test]
    fn test_title_is_trimmed_before_scoring() {
        let n = Normalizer::new(Arc::new(LexiconScorer::new()));
        let post = n
            .normalize_at(&raw(json!({"title": "   This release is great  "})), fetched_at())
            .unwrap();
        assert_eq!(post.title(), "This release is great");
        assert_eq!(post.sentiment_label(), SentimentLabel::Positive);
    }
}
