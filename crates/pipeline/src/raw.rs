//! Loosely typed records as returned by the forum API
//!
//! Every field is optional and numeric fields are kept as raw JSON values,
//! so decoding a record never fails. Deciding what is usable is left to the
//! normalizer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One post as returned by the listing endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub id: Option<Value>,

    #[serde(default, alias = "community")]
    pub subreddit: Option<Value>,

    #[serde(default)]
    pub title: Option<Value>,

    #[serde(default)]
    pub author: Option<Value>,

    #[serde(default)]
    pub score: Option<Value>,

    #[serde(default)]
    pub num_comments: Option<Value>,

    #[serde(default)]
    pub upvote_ratio: Option<Value>,

    /// Seconds since the epoch, integer or fractional
    #[serde(default)]
    pub created_utc: Option<Value>,
}

impl RawRecord {
    /// Decode one listing child. Anything that is not a JSON object decodes
    /// to an empty record.
    pub fn from_json(value: Value) -> Self {
        if value.is_object() {
            serde_json::from_value(value).unwrap_or_default()
        } else {
            RawRecord::default()
        }
    }
}

/// Listing envelope: `{"data": {"children": [{"kind": "t3", "data": {...}}]}}`
#[derive(Debug, Deserialize)]
pub(crate) struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData {
    #[serde(default)]
    pub children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingChild {
    #[serde(default)]
    pub data: Value,
}

/// Text value of a field; numbers are rendered, everything else is absent
pub fn coerce_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// A coerced count and whether the raw value had to be adjusted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coerced {
    pub value: i64,
    pub adjusted: bool,
}

/// Non-negative count from a noisy value.
///
/// Negative values clamp to 0; missing, null and non-numeric values become
/// 0; fractional values are truncated.
pub fn coerce_count(value: Option<&Value>) -> Coerced {
    if let Some(Value::Number(n)) = value {
        if let Some(i) = n.as_i64() {
            return Coerced {
                value: i.max(0),
                adjusted: i < 0,
            };
        }
    }

    match coerce_number(value) {
        Some(f) if f.is_finite() => {
            // `as` saturates at the i64 bounds.
            let truncated = f.trunc() as i64;
            Coerced {
                value: truncated.max(0),
                adjusted: truncated < 0 || f.fract() != 0.0 || !matches!(value, Some(Value::Number(_))),
            }
        }
        _ => Coerced {
            value: 0,
            adjusted: true,
        },
    }
}

/// Ratio in [0.0, 1.0]; missing or malformed values default to 0.5
pub fn coerce_ratio(value: Option<&Value>) -> f64 {
    match coerce_number(value) {
        Some(f) if f.is_finite() => f.clamp(0.0, 1.0),
        _ => 0.5,
    }
}

/// Why a timestamp could not be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    Missing,
    Invalid(String),
}

/// UTC timestamp from epoch seconds, truncated to whole seconds
pub fn coerce_timestamp(value: Option<&Value>) -> Result<DateTime<Utc>, TimestampError> {
    let raw = match value {
        None | Some(Value::Null) => return Err(TimestampError::Missing),
        Some(v) => v,
    };

    let seconds = coerce_number(Some(raw))
        .filter(|f| f.is_finite())
        .ok_or_else(|| TimestampError::Invalid(raw.to_string()))?;

    DateTime::from_timestamp(seconds.trunc() as i64, 0)
        .ok_or_else(|| TimestampError::Invalid(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_tolerates_anything() {
        let record = RawRecord::from_json(json!({
            "id": "abc",
            "subreddit": "rust",
            "title": "Hello",
            "score": "12",
            "extra": {"nested": true}
        }));
        assert_eq!(record.id, Some(json!("abc")));
        assert_eq!(record.score, Some(json!("12")));
        assert_eq!(record.created_utc, None);

        assert_eq!(RawRecord::from_json(json!("not an object")), RawRecord::default());
        assert_eq!(RawRecord::from_json(Value::Null), RawRecord::default());
    }

    #[test]
    fn test_community_alias() {
        let record = RawRecord::from_json(json!({"community": "golang"}));
        assert_eq!(coerce_text(record.subreddit.as_ref()), Some("golang".to_string()));
    }

    #[test]
    fn test_coerce_count() {
        assert_eq!(coerce_count(Some(&json!(42))).value, 42);
        assert!(!coerce_count(Some(&json!(42))).adjusted);

        let negative = coerce_count(Some(&json!(-5)));
        assert_eq!(negative, Coerced { value: 0, adjusted: true });

        assert_eq!(coerce_count(Some(&json!(7.9))).value, 7);
        assert_eq!(coerce_count(Some(&json!("15"))).value, 15);
        assert_eq!(coerce_count(Some(&json!("lots"))).value, 0);
        assert_eq!(coerce_count(Some(&Value::Null)).value, 0);
        assert_eq!(coerce_count(None).value, 0);
        assert_eq!(coerce_count(Some(&json!(true))).value, 0);
        assert_eq!(coerce_count(Some(&json!(1e300))).value, i64::MAX);
    }

    #[test]
    fn test_coerce_ratio() {
        assert_eq!(coerce_ratio(Some(&json!(0.97))), 0.97);
        assert_eq!(coerce_ratio(Some(&json!(1.4))), 1.0);
        assert_eq!(coerce_ratio(Some(&json!(-0.2))), 0.0);
        assert_eq!(coerce_ratio(None), 0.5);
        assert_eq!(coerce_ratio(Some(&json!("n/a"))), 0.5);
    }

    #[test]
    fn test_coerce_timestamp() {
        let ts = coerce_timestamp(Some(&json!(1714564800.0))).unwrap();
        assert_eq!(ts.timestamp(), 1714564800);

        let ts = coerce_timestamp(Some(&json!(1714564800.75))).unwrap();
        assert_eq!(ts.timestamp(), 1714564800);
        assert_eq!(ts.timestamp_subsec_nanos(), 0);

        assert_eq!(
            coerce_timestamp(Some(&json!("1714564800"))).unwrap().timestamp(),
            1714564800
        );
        assert_eq!(coerce_timestamp(None), Err(TimestampError::Missing));
        assert_eq!(coerce_timestamp(Some(&Value::Null)), Err(TimestampError::Missing));
        assert!(matches!(
            coerce_timestamp(Some(&json!("yesterday"))),
            Err(TimestampError::Invalid(_))
        ));
        assert!(matches!(
            coerce_timestamp(Some(&json!(1e20))),
            Err(TimestampError::Invalid(_))
        ));
    }
}
