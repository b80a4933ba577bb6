//! ForumPulse Common Library
//!
//! Shared code for the ForumPulse pipeline including:
//! - The validated `Post` value object and sentiment label policy
//! - Sentiment scorer abstraction
//! - Database models and repository patterns
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod post;
pub mod sentiment;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository, Scope};
pub use errors::{AppError, Result};
pub use post::{Post, PostFields, DELETED_AUTHOR};
pub use sentiment::{SentimentLabel, SentimentScorer};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default number of posts fetched per community
pub const DEFAULT_FETCH_LIMIT: u32 = 25;

/// Upper bound on posts fetched per community (the listing API caps at 100)
pub const MAX_FETCH_LIMIT: u32 = 100;
