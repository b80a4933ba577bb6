//! ForumPulse pipeline
//!
//! Fetches recent posts from forum communities, normalizes and scores them,
//! upserts them into the local store and renders a summary report.

pub mod app;
pub mod cli;
pub mod errors;
pub mod fetcher;
pub mod normalizer;
pub mod processor;
pub mod raw;
pub mod report;

pub use app::{run_pipeline, RunOutcome};
pub use errors::{FetchError, PipelineError, RejectReason, Rejection};
pub use fetcher::{Fetcher, InMemoryFetcher, RedditFetcher};
pub use normalizer::Normalizer;
pub use processor::{CommunityOutcome, PipelineProcessor, RunSummary};
pub use raw::RawRecord;
pub use report::{ReportBuilder, ReportData};
