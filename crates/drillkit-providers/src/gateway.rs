//! OpenAI-compatible chat completions gateway.
//!
//! Works with any service that speaks `/v1/chat/completions`: hosted model
//! routers, OpenAI itself, or a local inference server.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use drillkit_core::error::GenerationError;
use drillkit_core::traits::{
    GenerationRequest, GenerationResponse, ModelInfo, QuizGenerator, DEFAULT_SYSTEM_PROMPT,
};

use crate::error::{check_status, send_error, ProviderError};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Generator backed by an OpenAI-compatible endpoint.
pub struct GatewayGenerator {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GatewayGenerator {
    pub fn new(api_key: &str, base_url: Option<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client,
        })
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let start = Instant::now();

        let body = ChatRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request
                        .system_prompt
                        .clone()
                        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, DEFAULT_TIMEOUT_SECS))?;
        let response = check_status(response).await?;

        let api_response: ChatResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(GenerationResponse {
            content,
            model: api_response.model.unwrap_or_else(|| request.model.clone()),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl QuizGenerator for GatewayGenerator {
    fn name(&self) -> &str {
        "gateway"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        self.complete(request).await.map_err(|e| {
            tracing::warn!("gateway request failed: {e}");
            GenerationError::from(e)
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "google/gemini-2.5-flash".into(),
                name: "Gemini 2.5 Flash".into(),
                provider: "gateway".into(),
                max_context: 1_000_000,
            },
            ModelInfo {
                id: "openai/gpt-4.1-mini".into(),
                name: "GPT-4.1 Mini".into(),
                provider: "gateway".into(),
                max_context: 1_000_000,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> GenerationRequest {
        GenerationRequest {
            model: "google/gemini-2.5-flash".into(),
            prompt: "Write 1 easy multiple-choice questions about rocks".into(),
            system_prompt: None,
            max_tokens: 512,
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn chat_completion_returns_first_choice() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"questions\": []}"}, "index": 0}],
            "model": "google/gemini-2.5-flash"
        });

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .expect(1)
            .mount(&server)
            .await;

        let generator = GatewayGenerator::new("test-key", Some(server.uri())).unwrap();
        let response = generator.generate(&request()).await.unwrap();
        assert_eq!(response.content, "{\"questions\": []}");
        assert_eq!(response.model, "google/gemini-2.5-flash");
    }

    #[tokio::test]
    async fn rate_limit_honours_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let generator = GatewayGenerator::new("key", Some(server.uri())).unwrap();
        let err = generator.generate(&request()).await.unwrap_err();
        assert_eq!(
            err,
            GenerationError::RateLimited {
                retry_after_ms: 7000
            }
        );
    }

    #[tokio::test]
    async fn payment_required() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(402).set_body_string("insufficient credits"))
            .mount(&server)
            .await;

        let generator = GatewayGenerator::new("key", Some(server.uri())).unwrap();
        let err = generator.generate(&request()).await.unwrap_err();
        assert_eq!(err, GenerationError::PaymentRequired);
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let generator = GatewayGenerator::new("key", Some(server.uri())).unwrap();
        let err = generator.generate(&request()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Unavailable(msg) if msg.contains("500")));
    }
}
