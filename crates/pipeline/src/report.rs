//! Report building and rendering
//!
//! `ReportBuilder::collect` is the only part that touches the store. The
//! renderers are pure: the same `ReportData` always renders to the same
//! document, and the only timestamp in it is the caller-supplied
//! `generated_at`.

use crate::errors::PipelineError;
use crate::processor::{CommunityOutcome, RunSummary};
use chrono::{DateTime, Utc};
use forumpulse_common::db::models::StoredPost;
use forumpulse_common::db::{OverallStats, Repository, Scope, SentimentCounts};
use forumpulse_common::errors::Result;
use forumpulse_common::sentiment::SentimentLabel;
use forumpulse_common::VERSION;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, instrument};

/// One post as shown in the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostEntry {
    pub id: String,
    pub community: String,
    pub title: String,
    pub author: String,
    pub score: i64,
    pub num_comments: i64,
    pub upvote_ratio: f64,
    pub created_at: DateTime<Utc>,
    pub sentiment_score: f64,
    pub sentiment_label: SentimentLabel,
}

impl From<StoredPost> for PostEntry {
    fn from(post: StoredPost) -> Self {
        Self {
            sentiment_label: post.label(),
            id: post.id,
            community: post.community,
            title: post.title,
            author: post.author,
            score: post.score,
            num_comments: post.num_comments,
            upvote_ratio: post.upvote_ratio,
            created_at: post.created_at,
            sentiment_score: post.sentiment_score,
        }
    }
}

/// Aggregates over every stored post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallSection {
    pub stats: OverallStats,
    pub sentiment: SentimentCounts,
    pub most_positive: Option<PostEntry>,
    pub most_negative: Option<PostEntry>,
    pub top_posts: Vec<PostEntry>,
}

/// Aggregates for one stored community
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunitySection {
    pub community: String,
    pub stats: OverallStats,
    pub sentiment: SentimentCounts,
    pub top_posts: Vec<PostEntry>,
}

/// Per-community counters of the run that produced the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunCommunity {
    pub community: String,
    /// "ok", "not_found" or "unavailable"
    pub status: String,
    pub error: Option<String>,
    pub fetched: usize,
    pub rejected: usize,
    pub inserted: usize,
    pub updated: usize,
    pub store_failures: usize,
}

impl From<&CommunityOutcome> for RunCommunity {
    fn from(outcome: &CommunityOutcome) -> Self {
        Self {
            community: outcome.community.clone(),
            status: outcome
                .fetch_error
                .as_ref()
                .map(|e| e.kind())
                .unwrap_or("ok")
                .to_string(),
            error: outcome.fetch_error.as_ref().map(|e| e.to_string()),
            fetched: outcome.fetched,
            rejected: outcome.rejected(),
            inserted: outcome.inserted,
            updated: outcome.updated,
            store_failures: outcome.store_failures,
        }
    }
}

/// Everything the renderers need
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportData {
    pub generator: String,
    pub generated_at: DateTime<Utc>,
    pub top_n: usize,
    pub overall: OverallSection,
    pub communities: Vec<CommunitySection>,
    pub run: Vec<RunCommunity>,
    /// Posts written by the run, in capture order
    pub batch: Vec<PostEntry>,
}

impl ReportData {
    pub fn community(&self, name: &str) -> Option<&CommunitySection> {
        self.communities.iter().find(|c| c.community == name)
    }
}

/// Gathers report data from the store and renders it
pub struct ReportBuilder;

impl ReportBuilder {
    /// Query the store for everything the report shows
    #[instrument(skip(repository, run))]
    pub async fn collect(
        repository: &Repository,
        top_n: usize,
        run: Option<&RunSummary>,
        generated_at: DateTime<Utc>,
    ) -> Result<ReportData> {
        let extremes = repository.sentiment_extremes(&Scope::All).await?;

        let overall = OverallSection {
            stats: repository.overall_stats(&Scope::All).await?,
            sentiment: repository.sentiment_counts(&Scope::All).await?,
            most_positive: extremes.most_positive.map(PostEntry::from),
            most_negative: extremes.most_negative.map(PostEntry::from),
            top_posts: entries(repository.top_posts(&Scope::All, top_n).await?),
        };

        let mut communities = Vec::new();
        for name in repository.communities().await? {
            let summary = repository.community_summary(&name).await?;
            let top_posts = entries(repository.top_posts(&Scope::community(name.as_str()), top_n).await?);

            communities.push(CommunitySection {
                community: summary.community,
                stats: summary.stats,
                sentiment: summary.sentiment,
                top_posts,
            });
        }

        let batch = match run {
            Some(summary) => entries(repository.fetched_since(&Scope::All, summary.started_at).await?),
            None => Vec::new(),
        };

        debug!(
            total_posts = overall.stats.total_posts,
            communities = communities.len(),
            "Report data collected"
        );

        Ok(ReportData {
            generator: format!("forumpulse {}", VERSION),
            generated_at,
            top_n,
            overall,
            communities,
            run: run
                .map(|summary| summary.communities.iter().map(RunCommunity::from).collect())
                .unwrap_or_default(),
            batch,
        })
    }

    /// Render a self-contained HTML page
    pub fn render_html(data: &ReportData) -> String {
        let mut html = String::with_capacity(16 * 1024);

        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str("<title>ForumPulse report</title>\n");
        html.push_str(STYLE);
        html.push_str("</head>\n<body>\n");

        html.push_str("<h1>ForumPulse report</h1>\n");
        html.push_str(&format!(
            "<p class=\"meta\">Generated {} by {}</p>\n",
            format_time(&data.generated_at),
            escape_html(&data.generator)
        ));

        html.push_str("<h2>Overview</h2>\n");
        html.push_str(&stats_table(&data.overall.stats, &data.overall.sentiment));

        html.push_str("<h2>Sentiment extremes</h2>\n<ul class=\"extremes\">\n");
        html.push_str(&extreme_item("Most positive", data.overall.most_positive.as_ref()));
        html.push_str(&extreme_item("Most negative", data.overall.most_negative.as_ref()));
        html.push_str("</ul>\n");

        html.push_str(&format!("<h2>Top {} posts</h2>\n", data.top_n));
        html.push_str(&posts_table(&data.overall.top_posts, true));

        for section in &data.communities {
            html.push_str(&format!(
                "<section>\n<h2>r/{}</h2>\n",
                escape_html(&section.community)
            ));
            html.push_str(&stats_table(&section.stats, &section.sentiment));
            html.push_str(&posts_table(&section.top_posts, false));
            html.push_str("</section>\n");
        }

        if !data.run.is_empty() {
            html.push_str("<h2>Last run</h2>\n");
            html.push_str(&run_table(&data.run));
            html.push_str(&format!(
                "<p class=\"meta\">{} posts captured this run</p>\n",
                data.batch.len()
            ));
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    /// Render the report data as pretty-printed JSON
    pub fn render_json(data: &ReportData) -> std::result::Result<String, PipelineError> {
        let mut json = serde_json::to_string_pretty(data)?;
        json.push('\n');
        Ok(json)
    }
}

/// Write the rendered report, creating parent directories as needed
#[instrument(skip(contents), fields(path = %path.display(), bytes = contents.len()))]
pub async fn write_report(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    info!("Report written");
    Ok(())
}

fn entries(posts: Vec<StoredPost>) -> Vec<PostEntry> {
    posts.into_iter().map(PostEntry::from).collect()
}

const STYLE: &str = r#"<style>
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 2rem auto; max-width: 60rem; color: #1f2328; }
h1 { margin-bottom: 0.2rem; }
h2 { border-bottom: 1px solid #d0d7de; padding-bottom: 0.3rem; margin-top: 2rem; }
.meta { color: #656d76; }
table { border-collapse: collapse; width: 100%; margin: 0.5rem 0 1rem; }
th, td { text-align: left; padding: 0.3rem 0.5rem; border-bottom: 1px solid #eaeef2; }
td.num { text-align: right; font-variant-numeric: tabular-nums; }
.positive { color: #1a7f37; }
.negative { color: #cf222e; }
.neutral { color: #656d76; }
.failed { color: #cf222e; }
</style>
"#;

/// Escape text for HTML element and attribute content
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn format_average(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "n/a".to_string())
}

fn label_span(label: SentimentLabel, score: f64) -> String {
    format!(
        "<span class=\"{}\">{} ({:+.2})</span>",
        label.as_str(),
        label.display_name(),
        score
    )
}

fn stats_table(stats: &OverallStats, sentiment: &SentimentCounts) -> String {
    let mut html = String::from("<table class=\"stats\">\n");
    html.push_str(&format!(
        "<tr><th>Posts</th><td class=\"num\">{}</td></tr>\n",
        stats.total_posts
    ));
    html.push_str(&format!(
        "<tr><th>Average score</th><td class=\"num\">{}</td></tr>\n",
        format_average(stats.avg_score)
    ));
    html.push_str(&format!(
        "<tr><th>Average comments</th><td class=\"num\">{}</td></tr>\n",
        format_average(stats.avg_comments)
    ));
    for label in SentimentLabel::ALL {
        html.push_str(&format!(
            "<tr><th class=\"{}\">{}</th><td class=\"num\">{}</td></tr>\n",
            label.as_str(),
            label.display_name(),
            sentiment.get(label)
        ));
    }
    html.push_str("</table>\n");
    html
}

fn extreme_item(heading: &str, post: Option<&PostEntry>) -> String {
    match post {
        Some(post) => format!(
            "<li><strong>{}:</strong> {} <em>r/{}</em> {}</li>\n",
            heading,
            escape_html(&post.title),
            escape_html(&post.community),
            label_span(post.sentiment_label, post.sentiment_score)
        ),
        None => format!("<li><strong>{}:</strong> n/a</li>\n", heading),
    }
}

fn posts_table(posts: &[PostEntry], with_community: bool) -> String {
    if posts.is_empty() {
        return "<p class=\"meta\">No posts stored.</p>\n".to_string();
    }

    let mut html = String::from("<table class=\"posts\">\n<tr><th>#</th>");
    if with_community {
        html.push_str("<th>Community</th>");
    }
    html.push_str("<th>Title</th><th>Author</th><th>Score</th><th>Comments</th><th>Posted</th><th>Sentiment</th></tr>\n");

    for (rank, post) in posts.iter().enumerate() {
        html.push_str(&format!("<tr><td class=\"num\">{}</td>", rank + 1));
        if with_community {
            html.push_str(&format!("<td>r/{}</td>", escape_html(&post.community)));
        }
        html.push_str(&format!(
            "<td>{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&post.title),
            escape_html(&post.author),
            post.score,
            post.num_comments,
            format_time(&post.created_at),
            label_span(post.sentiment_label, post.sentiment_score)
        ));
    }

    html.push_str("</table>\n");
    html
}

fn run_table(run: &[RunCommunity]) -> String {
    let mut html = String::from(
        "<table class=\"run\">\n<tr><th>Community</th><th>Status</th><th>Fetched</th><th>Rejected</th><th>Inserted</th><th>Updated</th><th>Store failures</th></tr>\n",
    );

    for community in run {
        let status = match &community.error {
            Some(error) => format!("<span class=\"failed\">{}</span>", escape_html(error)),
            None => "ok".to_string(),
        };
        html.push_str(&format!(
            "<tr><td>r/{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>\n",
            escape_html(&community.community),
            status,
            community.fetched,
            community.rejected,
            community.inserted,
            community.updated,
            community.store_failures
        ));
    }

    html.push_str("</table>\n");
    html
}
