//! One complete run: open the store, process the communities, write the
//! report.

use crate::errors::PipelineError;
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;
use crate::processor::{PipelineProcessor, RunSummary};
use crate::report::{write_report, ReportBuilder};
use chrono::Utc;
use forumpulse_common::config::{AppConfig, ReportFormat};
use forumpulse_common::db::{DbPool, Repository};
use forumpulse_common::sentiment::create_scorer;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// A run that stored at least one post
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub database: PathBuf,
    pub report: PathBuf,
}

impl RunOutcome {
    /// Plain-text summary for the console
    pub fn console_summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Run {}", self.summary.run_id);

        for c in &self.summary.communities {
            match &c.fetch_error {
                Some(e) => {
                    let _ = writeln!(out, "  r/{:<21} FAILED: {}", c.community, e);
                }
                None => {
                    let _ = writeln!(
                        out,
                        "  r/{:<21} fetched {}, rejected {}, inserted {}, updated {}, failed to store {}",
                        c.community,
                        c.fetched,
                        c.rejected(),
                        c.inserted,
                        c.updated,
                        c.store_failures
                    );
                }
            }
        }

        let _ = writeln!(
            out,
            "Stored {} posts ({} communities failed)",
            self.summary.total_stored(),
            self.summary.failed_communities().len()
        );
        let _ = writeln!(out, "Database: {}", self.database.display());
        let _ = writeln!(out, "Report:   {}", self.report.display());
        out
    }
}

/// Run the pipeline for `communities` and write the report.
///
/// Fails with `PipelineError::TotalFailure` when no community produced a
/// stored post; the report is not written in that case.
pub async fn run_pipeline(
    config: &AppConfig,
    communities: &[String],
    fetcher: Arc<dyn Fetcher>,
) -> Result<RunOutcome, PipelineError> {
    let pool = DbPool::new(&config.database).await?;
    let repository = Repository::new(pool.clone());

    let normalizer = Normalizer::new(create_scorer(&config.pipeline.scorer));
    let processor = PipelineProcessor::new(
        fetcher,
        normalizer,
        repository.clone(),
        config.pipeline.limit,
    );

    let summary = processor.run(communities).await;

    if summary.is_total_failure() {
        for c in &summary.communities {
            if let Some(e) = &c.fetch_error {
                warn!(community = %c.community, error = %e, "Community failed");
            }
        }
        pool.close().await?;
        return Err(PipelineError::TotalFailure {
            attempted: communities.len(),
        });
    }

    let data = ReportBuilder::collect(&repository, config.pipeline.top_n, Some(&summary), Utc::now()).await?;

    let contents = match config.pipeline.format {
        ReportFormat::Html => ReportBuilder::render_html(&data),
        ReportFormat::Json => ReportBuilder::render_json(&data)?,
    };

    let report = config.pipeline.output.clone();
    write_report(&report, &contents)
        .await
        .map_err(|e| PipelineError::ReportError(format!("failed to write {}: {}", report.display(), e)))?;

    pool.close().await?;

    info!(
        run_id = %summary.run_id,
        stored = summary.total_stored(),
        report = %report.display(),
        format = %config.pipeline.format,
        "Pipeline finished"
    );

    Ok(RunOutcome {
        summary,
        database: config.database.path.clone(),
        report,
    })
}
