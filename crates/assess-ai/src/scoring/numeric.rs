use serde_json::Value;

use super::{numeric_value, Rubric, ScoreOutcome};

/// Score a numeric or percentage answer against the rubric's ordered list of
/// half-open ranges. First matching range wins; no match leaves the answer
/// unscored.
pub(crate) fn score(value: &Value, rubric: Option<&Rubric>) -> ScoreOutcome {
    let Some(Rubric::NumericRange { ranges }) = rubric else {
        return ScoreOutcome::unscored("No numeric range rubric is configured for this item.");
    };

    let Some(number) = numeric_value(value) else {
        return ScoreOutcome::unscored("Answer does not contain a numeric value.");
    };

    if ranges.is_empty() {
        return ScoreOutcome::unscored("Rubric defines no score ranges.");
    }

    for range in ranges {
        if range.contains(number) {
            return ScoreOutcome::scored(
                range.score,
                format!(
                    "Value {number} scored {}/100 based on rubric ranges.",
                    range.score
                ),
            );
        }
    }

    ScoreOutcome::unscored(format!(
        "Value {number} falls outside all configured rubric ranges."
    ))
}
