use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{EvaluatorError, EvaluatorRequest, MessageRole, TokenUsage};
use crate::config::EvaluatorConfig;

/// Raw completion result before cost accounting is applied.
#[derive(Debug, Clone)]
pub struct TransportReply {
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
    pub stop_reason: Option<String>,
}

/// Seam between the retry/cache wrapper and the wire. Tests substitute
/// scripted implementations; production uses [`HttpTransport`].
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn complete(&self, request: &EvaluatorRequest)
        -> Result<TransportReply, EvaluatorError>;
}

/// Messages-API transport over HTTP.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &EvaluatorConfig) -> Result<Self, EvaluatorError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            "anthropic-version",
            header::HeaderValue::from_static("2023-06-01"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| EvaluatorError::Configuration(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    content: Vec<WireContentBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
struct WireContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn complete(
        &self,
        request: &EvaluatorRequest,
    ) -> Result<TransportReply, EvaluatorError> {
        let messages = request
            .messages
            .iter()
            .map(|message| WireMessage {
                role: match message.role {
                    MessageRole::System => "system",
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                },
                content: &message.content,
            })
            .collect();

        let body = WireRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.as_deref(),
            messages,
        };

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| EvaluatorError::Transport(err.to_string()))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(EvaluatorError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(EvaluatorError::Transport(format!("HTTP {status}: {detail}")));
        }

        let payload: WireResponse = response
            .json()
            .await
            .map_err(|err| EvaluatorError::Malformed(err.to_string()))?;

        let content = payload
            .content
            .first()
            .map(|block| block.text.clone())
            .unwrap_or_default();

        Ok(TransportReply {
            content,
            usage: TokenUsage {
                input_tokens: payload.usage.input_tokens,
                output_tokens: payload.usage.output_tokens,
            },
            model: payload.model,
            stop_reason: payload.stop_reason,
        })
    }
}
