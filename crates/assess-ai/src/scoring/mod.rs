//! Type-scorers and their shared contract.
//!
//! Every scorer is a function of `(raw value, rubric, item) -> ScoreOutcome`
//! that never fails on malformed input: a value that cannot be interpreted
//! yields `score: None` with an explanatory feedback string.

pub mod aggregate;
mod binary;
mod numeric;
pub mod orchestrator;
mod text;
mod timeseries;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assessment::Item;
use crate::calc::TrendDirection;
use crate::evaluator::TextEvaluator;

pub use orchestrator::{ScoringError, ScoringRunSummary, ScoringService};
pub use text::TREAT_ZERO_TOTAL_AS_ABSENT;

pub(crate) use timeseries::yearly_totals;

/// Half-open scoring interval `[min, max)`. Absent bounds are unbounded.
/// Ranges are authored non-overlapping; the first match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    pub score: f64,
}

impl ScoreRange {
    pub fn contains(&self, value: f64) -> bool {
        let above_min = self.min.map_or(true, |min| value >= min);
        let below_max = self.max.map_or(true, |max| value < max);
        above_min && below_max
    }
}

/// Scoring configuration persisted per item and interpreted by the matching
/// type-scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rubric {
    NumericRange { ranges: Vec<ScoreRange> },
    BinaryWithEvidence,
    TextRubric {
        #[serde(default)]
        dimensions: Vec<String>,
    },
    TimeseriesTrend { ideal_direction: TrendDirection },
}

/// Per-dimension sub-scores reported by the rubric text scorer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextDimensions {
    pub relevance: Option<f64>,
    pub specificity: Option<f64>,
    pub evidence: Option<f64>,
    pub comprehensiveness: Option<f64>,
}

/// Result of scoring one answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreOutcome {
    pub score: Option<f64>,
    pub feedback: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<TextDimensions>,
}

impl ScoreOutcome {
    pub fn scored(score: f64, feedback: impl Into<String>) -> Self {
        Self {
            score: Some(score),
            feedback: feedback.into(),
            dimensions: None,
        }
    }

    pub fn unscored(feedback: impl Into<String>) -> Self {
        Self {
            score: None,
            feedback: feedback.into(),
            dimensions: None,
        }
    }
}

/// Dispatch result: unscoreable field types are counted, not failed.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Scored(ScoreOutcome),
    Skipped,
}

/// Route one answer to the scorer matching its item's field type. The match
/// is exhaustive over [`crate::assessment::FieldType`], so a new field type
/// without a scorer fails to compile.
pub async fn score_answer(
    item: &Item,
    value: &Value,
    theme_name: &str,
    evaluator: &TextEvaluator,
    model: &str,
) -> Dispatch {
    use crate::assessment::FieldType::*;

    let rubric = item.scoring_rubric.as_ref();
    match item.field_type {
        Numeric | Percentage | AutoCalculated => Dispatch::Scored(numeric::score(value, rubric)),
        YesNoConditional => Dispatch::Scored(binary::score(value, rubric)),
        ShortText | LongText => {
            Dispatch::Scored(text::score(value, item, theme_name, evaluator, model).await)
        }
        MultiYearSeries => Dispatch::Scored(timeseries::score(value, rubric)),
        FileUpload | Dropdown | MultiSelect | PartnerSpecific | SalaryBands => Dispatch::Skipped,
    }
}

/// Pull a numeric value out of an answer payload: a bare number, a numeric
/// string, or an object carrying a `value` field.
pub(crate) fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        Value::Object(map) => match map.get("value")? {
            Value::Number(number) => number.as_f64(),
            Value::String(raw) => raw.trim().parse::<f64>().ok(),
            _ => None,
        },
        _ => None,
    }
}

/// Char-boundary-safe prefix truncation for prompt and snapshot caps.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
