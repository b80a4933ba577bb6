//! Sentiment scoring
//!
//! Provides:
//! - The `SentimentScorer` trait, a narrow text -> polarity interface
//! - `LexiconScorer`, a word-list polarity scorer with negation and intensifiers
//! - `FixedScorer` for tests and dry runs
//! - The fixed label policy that maps a polarity to a `SentimentLabel`

use crate::errors::AppError;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Polarity strictly above this is Positive.
pub const POSITIVE_THRESHOLD: f64 = 0.1;

/// Polarity strictly below this is Negative.
pub const NEGATIVE_THRESHOLD: f64 = -0.1;

/// Sentiment label derived from a polarity score.
///
/// The mapping is a policy constant: a symmetric dead-band of width 0.2
/// around zero is Neutral, and the band edges themselves (exactly ±0.1)
/// are Neutral too.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// All labels, in report order.
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Positive,
        SentimentLabel::Negative,
        SentimentLabel::Neutral,
    ];

    /// Classify a polarity score
    pub fn from_score(score: f64) -> Self {
        if score > POSITIVE_THRESHOLD {
            SentimentLabel::Positive
        } else if score < NEGATIVE_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Negative => "Negative",
            SentimentLabel::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for SentimentLabel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "positive" => Ok(SentimentLabel::Positive),
            "negative" => Ok(SentimentLabel::Negative),
            "neutral" => Ok(SentimentLabel::Neutral),
            other => Err(AppError::InvalidFormat {
                message: format!("unknown sentiment label '{}'", other),
            }),
        }
    }
}

impl From<SentimentLabel> for String {
    fn from(label: SentimentLabel) -> Self {
        label.as_str().to_string()
    }
}

/// Bring an arbitrary scorer output into [-1.0, 1.0]; NaN and infinities are 0.0.
pub fn clamp_polarity(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Trait for sentiment scoring
pub trait SentimentScorer: Send + Sync {
    /// Polarity of `text` in [-1.0, 1.0]
    fn score(&self, text: &str) -> f64;

    /// Scorer name, for logs
    fn name(&self) -> &str;
}

const NEGATION_WINDOW: usize = 3;
const NEGATION_FACTOR: f64 = -0.5;

const LEXICON: &[(&str, f64)] = &[
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("beautiful", 0.85),
    ("best", 1.0),
    ("better", 0.5),
    ("brilliant", 0.9),
    ("celebrate", 0.5),
    ("cool", 0.35),
    ("delighted", 0.7),
    ("excellent", 1.0),
    ("excited", 0.4),
    ("exciting", 0.3),
    ("fantastic", 0.4),
    ("fun", 0.3),
    ("glad", 0.5),
    ("good", 0.7),
    ("great", 0.8),
    ("happy", 0.8),
    ("helpful", 0.5),
    ("hope", 0.3),
    ("impressive", 0.8),
    ("improved", 0.4),
    ("interesting", 0.5),
    ("love", 0.5),
    ("lovely", 0.5),
    ("nice", 0.6),
    ("perfect", 1.0),
    ("pleased", 0.5),
    ("positive", 0.23),
    ("success", 0.4),
    ("successful", 0.75),
    ("thanks", 0.2),
    ("win", 0.8),
    ("wins", 0.8),
    ("wonderful", 1.0),
    ("angry", -0.5),
    ("awful", -1.0),
    ("bad", -0.7),
    ("boring", -1.0),
    ("broken", -0.4),
    ("collapse", -0.5),
    ("crash", -0.5),
    ("crisis", -0.6),
    ("dead", -0.2),
    ("disappointing", -0.6),
    ("disaster", -0.8),
    ("fail", -0.5),
    ("failed", -0.5),
    ("fails", -0.5),
    ("fear", -0.4),
    ("hate", -0.8),
    ("horrible", -1.0),
    ("killed", -0.2),
    ("lose", -0.4),
    ("loses", -0.4),
    ("negative", -0.3),
    ("poor", -0.4),
    ("sad", -0.5),
    ("scary", -0.5),
    ("stupid", -0.8),
    ("terrible", -1.0),
    ("threat", -0.4),
    ("ugly", -0.7),
    ("wrong", -0.5),
    ("worse", -0.4),
    ("worst", -1.0),
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("extremely", 1.5),
    ("incredibly", 1.5),
    ("really", 1.3),
    ("so", 1.2),
    ("very", 1.3),
    ("somewhat", 0.7),
    ("slightly", 0.5),
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "nothing", "hardly", "don't", "doesn't", "didn't", "isn't",
    "aren't", "wasn't", "weren't", "can't", "won't", "shouldn't",
];

/// Word-list polarity scorer.
///
/// Polarity is the mean of the sentiment-bearing words in the text. A
/// preceding intensifier scales the next word; a negation within the
/// previous three tokens flips and halves it.
pub struct LexiconScorer {
    lexicon: HashMap<&'static str, f64>,
    intensifiers: HashMap<&'static str, f64>,
    token_pattern: Regex,
}

impl LexiconScorer {
    pub fn new() -> Self {
        Self {
            lexicon: LEXICON.iter().copied().collect(),
            intensifiers: INTENSIFIERS.iter().copied().collect(),
            token_pattern: Regex::new(r"[a-z]+(?:'[a-z]+)?").expect("token pattern is valid"),
        }
    }

    fn tokens<'a>(&self, lowered: &'a str) -> Vec<&'a str> {
        self.token_pattern
            .find_iter(lowered)
            .map(|m| m.as_str())
            .collect()
    }
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer for LexiconScorer {
    fn score(&self, text: &str) -> f64 {
        let lowered = text.to_lowercase().replace('\u{2019}', "'");
        let tokens = self.tokens(&lowered);

        let mut total = 0.0;
        let mut hits = 0usize;
        let mut last_negation: Option<usize> = None;
        let mut multiplier = 1.0;

        for (position, token) in tokens.iter().enumerate() {
            if NEGATIONS.contains(token) {
                last_negation = Some(position);
                continue;
            }

            if let Some(factor) = self.intensifiers.get(token) {
                multiplier *= factor;
                continue;
            }

            if let Some(&polarity) = self.lexicon.get(token) {
                let mut value = polarity * multiplier;
                if let Some(neg) = last_negation {
                    if position - neg <= NEGATION_WINDOW {
                        value *= NEGATION_FACTOR;
                    }
                }
                total += value;
                hits += 1;
            }

            multiplier = 1.0;
        }

        if hits == 0 {
            return 0.0;
        }

        clamp_polarity(total / hits as f64)
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}

/// Scorer that returns the same polarity for every text
pub struct FixedScorer {
    polarity: f64,
}

impl FixedScorer {
    pub fn new(polarity: f64) -> Self {
        Self { polarity }
    }
}

impl SentimentScorer for FixedScorer {
    fn score(&self, _text: &str) -> f64 {
        self.polarity
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Create a scorer by name
pub fn create_scorer(name: &str) -> Arc<dyn SentimentScorer> {
    match name {
        "lexicon" => Arc::new(LexiconScorer::new()),
        "neutral" => Arc::new(FixedScorer::new(0.0)),
        _ => {
            tracing::warn!(scorer = name, "Unknown sentiment scorer, using lexicon");
            Arc::new(LexiconScorer::new())
        }
    }
}
