//! Command-line interface
//!
//! Flags override the layered configuration; anything left unset keeps the
//! value from files, environment or built-in defaults.

use clap::{Parser, ValueEnum};
use forumpulse_common::config::{AppConfig, ReportFormat};
use regex_lite::Regex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::OnceLock;

#[derive(Parser, Debug)]
#[command(name = "forumpulse", version)]
#[command(about = "Fetch forum posts, score their sentiment, store them and write a report")]
pub struct Cli {
    /// Communities to fetch, with or without the leading "r/"
    #[arg(required = true, value_name = "COMMUNITY", value_parser = parse_community)]
    pub communities: Vec<String>,

    /// Posts fetched per community
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub limit: Option<u32>,

    /// Report output path [default: report.html]
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// SQLite database path [default: forumpulse.db]
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Report format [default: html]
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Ranked posts per list in the report [default: 10]
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..=100))]
    pub top: Option<u64>,

    /// Additional configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Html,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Html => ReportFormat::Html,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

fn community_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]{2,21}$").expect("community pattern is valid"))
}

/// Validate one community argument, stripping an optional "r/" prefix
pub fn parse_community(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    let name = trimmed
        .strip_prefix("r/")
        .or_else(|| trimmed.strip_prefix("/r/"))
        .unwrap_or(trimmed);

    if community_pattern().is_match(name) {
        Ok(name.to_string())
    } else {
        Err(format!(
            "'{}' is not a valid community name (2-21 letters, digits or underscores)",
            value
        ))
    }
}

impl Cli {
    /// Requested communities in order, each once. Names compare
    /// case-insensitively; the first spelling wins.
    pub fn unique_communities(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.communities
            .iter()
            .filter(|name| seen.insert(name.to_ascii_lowercase()))
            .cloned()
            .collect()
    }

    /// Apply the flags that were given on top of `config`
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(limit) = self.limit {
            config.pipeline.limit = limit;
        }
        if let Some(output) = &self.output {
            config.pipeline.output = output.clone();
        }
        if let Some(db) = &self.db {
            config.database.path = db.clone();
        }
        if let Some(format) = self.format {
            config.pipeline.format = format.into();
        }
        if let Some(top) = self.top {
            config.pipeline.top_n = top as usize;
        }
    }
}
