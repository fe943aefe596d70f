//! Cross-item consistency checking: a deterministic rule battery plus an
//! optional model-assisted pass for contradictions rules cannot express.

mod rules;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::evaluator::{
    extract_json_block, prompts, ChatMessage, EvaluatorRequest, TextEvaluator,
};
use crate::scoring::truncate_chars;

/// Prompt input cap for the model-assisted pass.
const MAX_SNAPSHOT_CHARS: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyIssue {
    pub severity: Severity,
    pub items_involved: Vec<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyReport {
    pub is_consistent: bool,
    pub issues: Vec<ConsistencyIssue>,
    pub rule_issue_count: usize,
    pub ai_issue_count: usize,
    pub summary: String,
}

/// Shape the model is asked to reply with. Anything else is discarded.
#[derive(Debug, Deserialize)]
struct ModelFindings {
    #[serde(default)]
    issues: Vec<ModelIssue>,
}

#[derive(Debug, Deserialize)]
struct ModelIssue {
    #[serde(default)]
    severity: Option<Severity>,
    #[serde(default)]
    items_involved: Vec<String>,
    description: String,
    #[serde(default)]
    recommendation: Option<String>,
}

/// Runs the rule battery and, when requested, a model pass over the raw
/// responses. The model pass is best-effort: any transport or parse failure
/// contributes zero issues rather than failing the check.
pub struct ConsistencyChecker {
    evaluator: Arc<TextEvaluator>,
    model: String,
}

impl ConsistencyChecker {
    pub fn new(evaluator: Arc<TextEvaluator>, model: impl Into<String>) -> Self {
        Self {
            evaluator,
            model: model.into(),
        }
    }

    pub async fn check(
        &self,
        responses: &BTreeMap<String, Value>,
        use_ai: bool,
    ) -> ConsistencyReport {
        let mut issues = rules::run_rule_checks(responses);
        let rule_issue_count = issues.len();

        let mut ai_issue_count = 0;
        if use_ai {
            let model_issues = self.model_pass(responses).await;
            ai_issue_count = model_issues.len();
            issues.extend(model_issues);
        }

        let summary = if issues.is_empty() {
            "No consistency issues detected.".to_string()
        } else {
            format!("Found {} consistency issue(s).", issues.len())
        };

        ConsistencyReport {
            is_consistent: issues.is_empty(),
            issues,
            rule_issue_count,
            ai_issue_count,
            summary,
        }
    }

    async fn model_pass(&self, responses: &BTreeMap<String, Value>) -> Vec<ConsistencyIssue> {
        let populated: BTreeMap<&String, &Value> = responses
            .iter()
            .filter(|(_, value)| !value.is_null())
            .collect();
        if populated.is_empty() {
            return Vec::new();
        }

        let snapshot = match serde_json::to_string_pretty(&populated) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "could not serialise responses for the model pass");
                return Vec::new();
            }
        };

        let request = EvaluatorRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompts::consistency_prompt(
                truncate_chars(&snapshot, MAX_SNAPSHOT_CHARS),
            ))],
            system: Some(prompts::CONSISTENCY_SYSTEM.to_string()),
            max_tokens: 2000,
            temperature: 0.0,
            use_cache: true,
        };

        let response = match self.evaluator.invoke(&request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "model consistency pass unavailable, rule results stand alone");
                return Vec::new();
            }
        };

        let findings: ModelFindings = match serde_json::from_str(extract_json_block(&response.content))
        {
            Ok(findings) => findings,
            Err(err) => {
                warn!(error = %err, "model consistency reply was not parseable, discarding");
                return Vec::new();
            }
        };

        findings
            .issues
            .into_iter()
            .map(|issue| ConsistencyIssue {
                severity: issue.severity.unwrap_or(Severity::Medium),
                items_involved: issue.items_involved,
                description: issue.description,
                recommendation: issue.recommendation,
                rule_id: None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::testing::scripted_evaluator;
    use serde_json::json;

    fn checker(replies: Vec<&str>) -> ConsistencyChecker {
        ConsistencyChecker::new(Arc::new(scripted_evaluator(replies)), "m")
    }

    fn responses(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(code, value)| (code.to_string(), value.clone()))
            .collect()
    }

    #[tokio::test]
    async fn rule_violation_without_model_pass() {
        let report = checker(Vec::new())
            .check(
                &responses(&[
                    ("TL07", json!({"value": 50})),
                    ("TL06", json!({"value": 40})),
                ]),
                false,
            )
            .await;

        assert!(!report.is_consistent);
        assert_eq!(report.rule_issue_count, 1);
        assert_eq!(report.ai_issue_count, 0);
        assert_eq!(report.issues[0].rule_id.as_deref(), Some("staff_count_vs_phd"));
        assert_eq!(report.summary, "Found 1 consistency issue(s).");
    }

    #[tokio::test]
    async fn clean_responses_report_consistent() {
        let report = checker(Vec::new())
            .check(
                &responses(&[
                    ("TL07", json!({"value": 10})),
                    ("TL06", json!({"value": 40})),
                ]),
                false,
            )
            .await;

        assert!(report.is_consistent);
        assert!(report.issues.is_empty());
        assert_eq!(report.summary, "No consistency issues detected.");
    }

    #[tokio::test]
    async fn model_findings_are_appended_after_rule_issues() {
        let reply = "```json\n{\"issues\": [{\"severity\": \"medium\", \
                     \"items_involved\": [\"GV01\", \"GV03\"], \
                     \"description\": \"Board size contradicts the governance narrative\", \
                     \"recommendation\": \"Reconcile the two answers\"}]}\n```";
        let report = checker(vec![reply])
            .check(
                &responses(&[
                    ("TL07", json!({"value": 50})),
                    ("TL06", json!({"value": 40})),
                    ("GV01", json!({"value": "nine members"})),
                ]),
                true,
            )
            .await;

        assert_eq!(report.rule_issue_count, 1);
        assert_eq!(report.ai_issue_count, 1);
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[1].severity, Severity::Medium);
        assert!(report.issues[1].rule_id.is_none());
    }

    #[tokio::test]
    async fn model_failure_leaves_rule_results_standing() {
        // Empty script: the transport errors on the first call.
        let report = checker(Vec::new())
            .check(
                &responses(&[
                    ("TL07", json!({"value": 50})),
                    ("TL06", json!({"value": 40})),
                ]),
                true,
            )
            .await;

        assert_eq!(report.rule_issue_count, 1);
        assert_eq!(report.ai_issue_count, 0);
        assert_eq!(report.issues.len(), 1);
    }

    #[tokio::test]
    async fn unparseable_model_reply_is_discarded() {
        let report = checker(vec!["Everything looks broadly reasonable to me."])
            .check(&responses(&[("GV01", json!("text"))]), true)
            .await;

        assert!(report.is_consistent);
        assert_eq!(report.ai_issue_count, 0);
    }

    #[tokio::test]
    async fn model_pass_budgets_tokens_for_long_issue_lists() {
        use crate::evaluator::{
            CompletionTransport, EvaluatorError, ResponseCache, TextEvaluator, TokenUsage,
            TransportReply,
        };
        use std::sync::atomic::{AtomicU32, Ordering};

        struct CapturingTransport {
            max_tokens: AtomicU32,
        }

        #[async_trait::async_trait]
        impl CompletionTransport for CapturingTransport {
            async fn complete(
                &self,
                request: &EvaluatorRequest,
            ) -> Result<TransportReply, EvaluatorError> {
                self.max_tokens.store(request.max_tokens, Ordering::SeqCst);
                Ok(TransportReply {
                    content: "{\"issues\": []}".to_string(),
                    usage: TokenUsage {
                        input_tokens: 10,
                        output_tokens: 5,
                    },
                    model: request.model.clone(),
                    stop_reason: Some("end_turn".to_string()),
                })
            }
        }

        let transport = Arc::new(CapturingTransport {
            max_tokens: AtomicU32::new(0),
        });
        let evaluator = Arc::new(TextEvaluator::new(
            transport.clone(),
            ResponseCache::default(),
        ));

        ConsistencyChecker::new(evaluator, "m")
            .check(&responses(&[("GV01", json!("text"))]), true)
            .await;

        assert_eq!(transport.max_tokens.load(Ordering::SeqCst), 2000);
    }

    #[tokio::test]
    async fn all_null_responses_skip_the_model_call() {
        // No scripted reply is needed because the call never happens.
        let report = checker(Vec::new())
            .check(&responses(&[("GV01", Value::Null)]), true)
            .await;

        assert!(report.is_consistent);
        assert_eq!(report.ai_issue_count, 0);
    }
}
