use serde::Deserialize;
use serde_json::Value;

use super::{truncate_chars, ScoreOutcome, TextDimensions};
use crate::assessment::Item;
use crate::evaluator::{
    extract_json_block, prompts, ChatMessage, EvaluatorRequest, TextEvaluator,
};

/// A reported `total_score` of exactly zero is treated as "not supplied" and
/// replaced by the sum of the four dimension scores. Whether an assessor can
/// legitimately award a zero total is an open policy question; this flag
/// pins the current behavior in one greppable place.
pub const TREAT_ZERO_TOTAL_AS_ABSENT: bool = true;

/// Responses shorter than this are scored 0 without a network call.
const MIN_RESPONSE_CHARS: usize = 10;
/// Prompt input cap.
const MAX_RESPONSE_CHARS: usize = 3000;

#[derive(Debug, Deserialize)]
struct RubricVerdict {
    #[serde(default)]
    relevance: Option<f64>,
    #[serde(default)]
    specificity: Option<f64>,
    #[serde(default)]
    evidence: Option<f64>,
    #[serde(default)]
    comprehensiveness: Option<f64>,
    #[serde(default)]
    total_score: f64,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    feedback: Option<String>,
}

/// Score a free-text answer through the text-evaluation service against the
/// four-dimension rubric. Evaluator or parse failures degrade to an unscored
/// outcome with a diagnostic; text scoring never fabricates a number.
pub(crate) async fn score(
    value: &Value,
    item: &Item,
    theme_name: &str,
    evaluator: &TextEvaluator,
    model: &str,
) -> ScoreOutcome {
    let Some(text) = text_value(value) else {
        return ScoreOutcome::unscored("Answer does not contain a text value.");
    };

    if text.trim().chars().count() < MIN_RESPONSE_CHARS {
        return ScoreOutcome::scored(0.0, "Response is too short or empty to evaluate.");
    }

    let prompt = prompts::score_text_prompt(
        &item.label,
        item.code.as_str(),
        theme_name,
        truncate_chars(text, MAX_RESPONSE_CHARS),
    );

    let request = EvaluatorRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::user(prompt)],
        system: Some(prompts::SCORE_TEXT_SYSTEM.to_string()),
        max_tokens: 1000,
        temperature: 0.0,
        use_cache: true,
    };

    let response = match evaluator.invoke(&request).await {
        Ok(response) => response,
        Err(err) => {
            return ScoreOutcome::unscored(format!("Text scoring degraded to unscored: {err}"))
        }
    };

    let verdict: RubricVerdict = match serde_json::from_str(extract_json_block(&response.content)) {
        Ok(verdict) => verdict,
        Err(err) => {
            return ScoreOutcome::unscored(format!(
                "Evaluator response could not be parsed as a rubric verdict: {err}"
            ))
        }
    };

    let mut total = verdict.total_score;
    if TREAT_ZERO_TOTAL_AS_ABSENT && total == 0.0 {
        total = [
            verdict.relevance,
            verdict.specificity,
            verdict.evidence,
            verdict.comprehensiveness,
        ]
        .iter()
        .flatten()
        .sum();
    }
    let total = total.clamp(0.0, 100.0);

    let mut feedback_parts = Vec::new();
    if !verdict.strengths.is_empty() {
        feedback_parts.push(format!("Strengths: {}", verdict.strengths.join("; ")));
    }
    if !verdict.weaknesses.is_empty() {
        feedback_parts.push(format!(
            "Areas for improvement: {}",
            verdict.weaknesses.join("; ")
        ));
    }
    if let Some(note) = verdict.feedback {
        if !note.is_empty() {
            feedback_parts.push(note);
        }
    }
    let feedback = if feedback_parts.is_empty() {
        format!("Score: {total}/100")
    } else {
        feedback_parts.join(" | ")
    };

    ScoreOutcome {
        score: Some(total),
        feedback,
        dimensions: Some(TextDimensions {
            relevance: verdict.relevance,
            specificity: verdict.specificity,
            evidence: verdict.evidence,
            comprehensiveness: verdict.comprehensiveness,
        }),
    }
}

fn text_value(value: &Value) -> Option<&str> {
    match value {
        Value::String(raw) => Some(raw.as_str()),
        Value::Object(map) => map
            .get("text")
            .or_else(|| map.get("value"))
            .and_then(Value::as_str),
        _ => None,
    }
}
