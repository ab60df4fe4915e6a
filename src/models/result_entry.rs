// src/models/result_entry.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

/// Field names accepted for the quiz identifier, in priority order.
pub const QUIZ_FIELDS: [&str; 3] = ["quiz", "quizKey", "key"];

/// Field names accepted for the score, in priority order.
pub const SCORE_FIELDS: [&str; 2] = ["firstScore", "pct"];

/// One recorded quiz attempt, as stored in a result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    /// The identifier exactly as submitted, before sanitization.
    pub quiz: String,
    pub first_score: f64,
    pub when: DateTime<Utc>,
}

impl ResultEntry {
    pub fn new(quiz: impl Into<String>, first_score: f64) -> Self {
        Self {
            quiz: quiz.into(),
            first_score,
            when: Utc::now(),
        }
    }
}

/// A validated `POST /save-result` body.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub quiz: String,
    pub score: f64,
}

impl Submission {
    /// Parses and validates a raw request body.
    ///
    /// * Body that is not JSON: `BadRequest("Invalid JSON")`.
    /// * JSON without a usable identifier or score: `BadRequest("Missing quiz or score")`.
    pub fn from_body(body: &[u8]) -> Result<Self, AppError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|_| AppError::BadRequest("Invalid JSON".to_string()))?;

        value
            .as_object()
            .and_then(Self::from_object)
            .ok_or_else(|| AppError::BadRequest("Missing quiz or score".to_string()))
    }

    pub fn from_object(object: &Map<String, Value>) -> Option<Self> {
        // The identifier skips empty candidates; the score only looks at which key is present.
        let quiz = QUIZ_FIELDS
            .iter()
            .filter_map(|name| object.get(*name))
            .find_map(identifier_text);
        let score = resolve(object, &SCORE_FIELDS).and_then(coerce_score);

        Some(Self {
            quiz: quiz?,
            score: score?,
        })
    }
}

/// Returns the value of the first name present in `object`, whatever that value is.
pub fn resolve<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| object.get(*name))
}

/// Text of a usable quiz identifier: a non-empty string or a non-zero number.
///
/// Booleans are skipped even when `true`, so `{"quiz": true, "key": "k"}` records
/// under `k` rather than a quiz named `True`.
fn identifier_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// Coerces a raw score to a finite float.
///
/// Numbers pass through, strings are trimmed and parsed, booleans map to 1.0 / 0.0.
pub fn coerce_score(value: &Value) -> Option<f64> {
    let score = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };

    score.is_finite().then_some(score)
}
