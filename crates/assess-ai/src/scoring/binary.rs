use serde_json::Value;

use super::{Rubric, ScoreOutcome};
use crate::calc::round1;

/// Evidence longer than this participates in the combined score at all.
const EVIDENCE_MIN_CHARS: usize = 50;

/// Score a yes/no answer, optionally blended with evidence quality under the
/// `binary_with_evidence` rubric. Evidence quality is bucketed by length;
/// this is a deliberate proxy, not semantic evaluation of the evidence.
pub(crate) fn score(value: &Value, rubric: Option<&Rubric>) -> ScoreOutcome {
    let Some(answer) = boolean_answer(value) else {
        return ScoreOutcome::unscored("Answer does not contain a yes/no value.");
    };

    let binary_score = if answer { 100.0 } else { 0.0 };
    let label = if answer { "Yes" } else { "No" };

    if matches!(rubric, Some(Rubric::BinaryWithEvidence)) {
        let evidence = value
            .as_object()
            .and_then(|map| map.get("evidence"))
            .and_then(Value::as_str)
            .unwrap_or("");
        let evidence_len = evidence.chars().count();

        if evidence_len > EVIDENCE_MIN_CHARS {
            let evidence_quality = if evidence_len > 500 {
                85.0
            } else if evidence_len > 200 {
                65.0
            } else {
                40.0
            };

            let combined = round1(0.3 * binary_score + 0.7 * evidence_quality);
            return ScoreOutcome::scored(
                combined,
                format!(
                    "Binary: {label} ({binary_score}), Evidence quality: {evidence_quality}/100. \
                     Combined score: {combined:.1}/100."
                ),
            );
        }
    }

    ScoreOutcome::scored(binary_score, format!("{label} - scored {binary_score}/100."))
}

fn boolean_answer(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Object(map) => match map.get("answer")? {
            Value::Bool(flag) => Some(*flag),
            Value::String(raw) => parse_yes_no(raw),
            _ => None,
        },
        Value::String(raw) => parse_yes_no(raw),
        _ => None,
    }
}

fn parse_yes_no(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" => Some(true),
        "no" | "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_yes_scores_full_marks() {
        let outcome = score(&json!({"answer": true}), None);
        assert_eq!(outcome.score, Some(100.0));

        let outcome = score(&json!({"answer": true, "evidence": ""}), Some(&Rubric::BinaryWithEvidence));
        assert_eq!(outcome.score, Some(100.0));
    }

    #[test]
    fn no_scores_zero_regardless_of_evidence() {
        let evidence = "x".repeat(600);
        let outcome = score(
            &json!({"answer": false, "evidence": evidence}),
            Some(&Rubric::BinaryWithEvidence),
        );
        // 0.3*0 + 0.7*85
        assert_eq!(outcome.score, Some(59.5));

        let outcome = score(&json!({"answer": false}), None);
        assert_eq!(outcome.score, Some(0.0));
    }

    #[test]
    fn long_evidence_blends_into_the_score() {
        let evidence = "e".repeat(600);
        let outcome = score(
            &json!({"answer": true, "evidence": evidence}),
            Some(&Rubric::BinaryWithEvidence),
        );
        // 0.3*100 + 0.7*85 = 85.5
        assert_eq!(outcome.score, Some(85.5));
    }

    #[test]
    fn evidence_quality_buckets_by_length() {
        let mid = "e".repeat(300);
        let outcome = score(
            &json!({"answer": true, "evidence": mid}),
            Some(&Rubric::BinaryWithEvidence),
        );
        // 0.3*100 + 0.7*65 = 75.5
        assert_eq!(outcome.score, Some(75.5));

        let short = "e".repeat(100);
        let outcome = score(
            &json!({"answer": true, "evidence": short}),
            Some(&Rubric::BinaryWithEvidence),
        );
        // 0.3*100 + 0.7*40 = 58.0
        assert_eq!(outcome.score, Some(58.0));
    }

    #[test]
    fn evidence_under_threshold_is_ignored() {
        let outcome = score(
            &json!({"answer": true, "evidence": "brief note"}),
            Some(&Rubric::BinaryWithEvidence),
        );
        assert_eq!(outcome.score, Some(100.0));
    }

    #[test]
    fn string_answers_are_tolerated() {
        assert_eq!(score(&json!("yes"), None).score, Some(100.0));
        assert_eq!(score(&json!({"answer": "No"}), None).score, Some(0.0));
    }

    #[test]
    fn malformed_answer_is_unscored() {
        assert_eq!(score(&json!({"answer": 3}), None).score, None);
        assert_eq!(score(&json!(null), None).score, None);
        assert_eq!(score(&json!("maybe"), None).score, None);
    }
}
