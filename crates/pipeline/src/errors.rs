//! Pipeline error types

use forumpulse_common::errors::AppError;
use serde::Serialize;
use thiserror::Error;

/// Per-community fetch failure. The run skips the community and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Community not found: {community}")]
    NotFound { community: String },

    #[error("Source unavailable for {community}: {message}")]
    SourceUnavailable { community: String, message: String },
}

impl FetchError {
    pub fn unavailable(community: &str, message: impl Into<String>) -> Self {
        FetchError::SourceUnavailable {
            community: community.to_string(),
            message: message.into(),
        }
    }

    /// Short machine-readable kind, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::NotFound { .. } => "not_found",
            FetchError::SourceUnavailable { .. } => "unavailable",
        }
    }
}

impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::NotFound { community } => AppError::NotFound { community },
            FetchError::SourceUnavailable { community, message } => {
                AppError::SourceUnavailable { community, message }
            }
        }
    }
}

/// Why a raw record was excluded from the batch
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum RejectReason {
    #[error("record has no id")]
    MissingId,

    #[error("record has no community")]
    MissingCommunity,

    #[error("title is empty")]
    EmptyTitle,

    #[error("record has no creation time")]
    MissingCreatedAt,

    #[error("creation time is not a valid timestamp: {0}")]
    InvalidCreatedAt(String),

    #[error("record failed validation: {0}")]
    Invalid(String),
}

impl RejectReason {
    /// Short machine-readable code, used as a metrics label and report key
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::MissingId => "missing_id",
            RejectReason::MissingCommunity => "missing_community",
            RejectReason::EmptyTitle => "empty_title",
            RejectReason::MissingCreatedAt => "missing_created_at",
            RejectReason::InvalidCreatedAt(_) => "invalid_created_at",
            RejectReason::Invalid(_) => "invalid",
        }
    }
}

/// A rejected record, kept for the run summary
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("rejected record {}: {reason}", .record_id.as_deref().unwrap_or("<unknown>"))]
pub struct Rejection {
    pub record_id: Option<String>,
    pub reason: RejectReason,
}

/// Run-level errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No community yielded any stored post ({attempted} attempted)")]
    TotalFailure { attempted: usize },

    #[error("Report error: {0}")]
    ReportError(String),

    #[error(transparent)]
    App(#[from] AppError),
}

impl PipelineError {
    pub fn is_total_failure(&self) -> bool {
        matches!(self, PipelineError::TotalFailure { .. })
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::ReportError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_conversion() {
        let err: AppError = FetchError::unavailable("rust", "timed out").into();
        assert!(matches!(err, AppError::SourceUnavailable { .. }));
        assert!(err.is_recoverable());

        let err = FetchError::NotFound {
            community: "nope".into(),
        };
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_rejection_display() {
        let rejection = Rejection {
            record_id: None,
            reason: RejectReason::MissingId,
        };
        assert_eq!(rejection.to_string(), "rejected record <unknown>: record has no id");
        assert_eq!(rejection.reason.code(), "missing_id");
    }
}
