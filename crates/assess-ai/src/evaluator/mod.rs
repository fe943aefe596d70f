//! Client for the external text-evaluation service.
//!
//! Wraps the completion API with a deterministic response cache, bounded
//! retry with exponential backoff, and per-call cost accounting. The client
//! treats `content` as opaque text; callers expecting JSON strip fence
//! markers themselves (see [`extract_json_block`]).

pub mod cache;
pub mod prompts;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

pub use cache::ResponseCache;
pub use transport::{CompletionTransport, HttpTransport, TransportReply};

/// Message role on the completion API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// One completion request. `use_cache` opts into the deterministic cache;
/// scoring callers keep it on so repeated runs stay idempotent.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluatorRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub system: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub use_cache: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Completion result with cost attached. The estimated cost is always
/// computed; it is the only cost-visibility mechanism in the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
    pub stop_reason: Option<String>,
    pub estimated_cost_usd: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluatorError {
    #[error("evaluator transport failed: {0}")]
    Transport(String),
    #[error("evaluator rate limited")]
    RateLimited,
    #[error("evaluator returned malformed payload: {0}")]
    Malformed(String),
    #[error("evaluator configuration invalid: {0}")]
    Configuration(String),
    #[error("evaluator retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// Bounded retry schedule: `base * 2^(attempt-1)`, capped.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    fn delay_before(&self, next_attempt: u32) -> Duration {
        let exponent = next_attempt.saturating_sub(2).min(16);
        let delay = self.base_delay.saturating_mul(2u32.saturating_pow(exponent));
        delay.min(self.max_delay)
    }
}

/// The single entry point for all model calls in the system.
pub struct TextEvaluator {
    transport: Arc<dyn CompletionTransport>,
    cache: ResponseCache,
    policy: RetryPolicy,
}

impl TextEvaluator {
    pub fn new(transport: Arc<dyn CompletionTransport>, cache: ResponseCache) -> Self {
        Self {
            transport,
            cache,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Invoke the completion service, consulting the cache first and retrying
    /// transport failures with exponential backoff before surfacing
    /// `RetriesExhausted` to the caller.
    pub async fn invoke(
        &self,
        request: &EvaluatorRequest,
    ) -> Result<EvaluatorResponse, EvaluatorError> {
        let key = cache_key(request);

        if request.use_cache {
            if let Some(hit) = self.cache.get(&key) {
                debug!(cache_key = %&key[..12], "evaluator cache hit");
                return Ok(hit);
            }
        }

        let mut last_error = String::new();
        for attempt in 1..=self.policy.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.policy.delay_before(attempt)).await;
            }

            info!(
                model = %request.model,
                num_messages = request.messages.len(),
                max_tokens = request.max_tokens,
                attempt,
                "evaluator call"
            );

            match self.transport.complete(request).await {
                Ok(reply) => {
                    let response = attach_cost(reply);
                    info!(
                        input_tokens = response.usage.input_tokens,
                        output_tokens = response.usage.output_tokens,
                        estimated_cost_usd = response.estimated_cost_usd,
                        "evaluator response"
                    );
                    if request.use_cache {
                        self.cache.put(key, response.clone());
                    }
                    return Ok(response);
                }
                Err(err) => {
                    warn!(attempt, error = %err, "evaluator attempt failed");
                    last_error = err.to_string();
                }
            }
        }

        Err(EvaluatorError::RetriesExhausted {
            attempts: self.policy.max_attempts,
            last_error,
        })
    }
}

#[derive(Serialize)]
struct CacheKeyPayload<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    system: Option<&'a str>,
}

/// Content hash over the normalized request. Temperature and token limits are
/// excluded, matching the idempotence contract: same conversation, same
/// cached verdict.
fn cache_key(request: &EvaluatorRequest) -> String {
    let payload = CacheKeyPayload {
        model: &request.model,
        messages: &request.messages,
        system: request.system.as_deref(),
    };
    let serialized =
        serde_json::to_vec(&payload).unwrap_or_else(|_| format!("{:?}", request).into_bytes());
    let digest = Sha256::digest(&serialized);
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

struct ModelPrice {
    input_per_1k: f64,
    output_per_1k: f64,
}

/// Fixed per-model price table; unfamiliar models fall back to the mid tier.
fn price_for(model: &str) -> ModelPrice {
    if model.contains("haiku") {
        ModelPrice {
            input_per_1k: 0.0008,
            output_per_1k: 0.004,
        }
    } else if model.contains("opus") {
        ModelPrice {
            input_per_1k: 0.015,
            output_per_1k: 0.075,
        }
    } else {
        ModelPrice {
            input_per_1k: 0.003,
            output_per_1k: 0.015,
        }
    }
}

fn attach_cost(reply: TransportReply) -> EvaluatorResponse {
    let price = price_for(&reply.model);
    let input_cost = reply.usage.input_tokens as f64 * price.input_per_1k / 1000.0;
    let output_cost = reply.usage.output_tokens as f64 * price.output_per_1k / 1000.0;
    let estimated_cost_usd = ((input_cost + output_cost) * 1e6).round() / 1e6;

    EvaluatorResponse {
        content: reply.content,
        usage: reply.usage,
        model: reply.model,
        stop_reason: reply.stop_reason,
        estimated_cost_usd,
    }
}

/// Strip optional fenced-code markers around a JSON payload. The client never
/// parses payload semantics; this is a convenience for callers that do.
pub fn extract_json_block(content: &str) -> &str {
    let trimmed = content.trim();
    let body = if let Some(start) = trimmed.find("```json") {
        &trimmed[start + "```json".len()..]
    } else if let Some(start) = trimmed.find("```") {
        &trimmed[start + "```".len()..]
    } else {
        return trimmed;
    };
    body.split("```").next().unwrap_or(body).trim()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Transport that pops pre-scripted replies; an empty script fails the
    /// call, which exercises the degrade paths.
    pub(crate) struct CannedTransport {
        replies: Mutex<VecDeque<String>>,
    }

    impl CannedTransport {
        pub(crate) fn with_replies(replies: Vec<&str>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().map(String::from).collect()),
            })
        }

        pub(crate) fn failing() -> Arc<Self> {
            Self::with_replies(Vec::new())
        }
    }

    #[async_trait::async_trait]
    impl CompletionTransport for CannedTransport {
        async fn complete(
            &self,
            request: &EvaluatorRequest,
        ) -> Result<TransportReply, EvaluatorError> {
            let next = self
                .replies
                .lock()
                .expect("script mutex poisoned")
                .pop_front();
            match next {
                Some(content) => Ok(TransportReply {
                    content,
                    usage: TokenUsage {
                        input_tokens: 200,
                        output_tokens: 80,
                    },
                    model: request.model.clone(),
                    stop_reason: Some("end_turn".to_string()),
                }),
                None => Err(EvaluatorError::Transport("script exhausted".to_string())),
            }
        }
    }

    /// Evaluator backed by a scripted transport and a fast retry schedule.
    pub(crate) fn scripted_evaluator(replies: Vec<&str>) -> TextEvaluator {
        TextEvaluator::new(CannedTransport::with_replies(replies), ResponseCache::default())
            .with_policy(RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
            })
    }
}
