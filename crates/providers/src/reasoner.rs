//! Reasoner provider — the mandatory capability.
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint (OpenAI,
//! OpenRouter, Ollama, vLLM, ...). The query text becomes the user turn
//! after a fixed system prompt.

use async_trait::async_trait;
use orus_core::{CapabilityProvider, ProviderError, ProviderKind, Query};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::http;

const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";
const DEFAULT_SYSTEM_PROMPT: &str =
    "You are ORUS, a system assistant. Answer the operator's question concisely.";

/// An OpenAI-compatible reasoning engine.
pub struct ReasonerProvider {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    system_prompt: String,
    temperature: f32,
    client: reqwest::Client,
}

impl ReasonerProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            temperature: 0.7,
            client: http::client(timeout),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn request_body(&self, query: &Query) -> serde_json::Value {
        let messages = vec![
            ApiMessage {
                role: "system".into(),
                content: self.system_prompt.clone(),
            },
            ApiMessage {
                role: "user".into(),
                content: query.text.clone(),
            },
        ];

        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "stream": false,
        })
    }
}

#[async_trait]
impl CapabilityProvider for ReasonerProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Reasoner
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, query: &Query) -> Result<serde_json::Value, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(provider = %self.name, model = %self.model, query_id = %query.id, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(query))
            .send()
            .await
            .map_err(http::network)?;

        let response = http::check_status(&self.name, response).await?;
        let api_response: ApiResponse = http::decode(response).await?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        Ok(serde_json::json!({
            "response": choice.message.content.unwrap_or_default(),
            "model": api_response.model,
            "usage": api_response.usage,
        }))
    }

    async fn probe(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(http::network)?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API wire types ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use orus_test_support as test_server;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    fn provider(base_url: &str) -> ReasonerProvider {
        ReasonerProvider::new("test-llm", base_url, "sk-test", Duration::from_secs(5))
            .with_model("test-model")
    }

    #[test]
    fn request_body_carries_system_and_user_turns() {
        let p = provider("http://localhost/v1/").with_system_prompt("Be brief");
        assert_eq!(p.base_url, "http://localhost/v1");

        let body = p.request_body(&Query::new("status?", "test"));
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "Be brief");
        assert_eq!(body["messages"][1]["content"], "status?");
        assert_eq!(body["stream"], false);
    }

    #[tokio::test]
    async fn invoke_returns_first_choice() {
        let router = Router::new().route(
            "/chat/completions",
            post(|Json(body): Json<Value>| async move {
                let question = body["messages"][1]["content"].as_str().unwrap_or("").to_string();
                Json(json!({
                    "model": "test-model",
                    "choices": [{ "message": { "role": "assistant", "content": format!("echo: {question}") } }],
                    "usage": { "prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5 }
                }))
            }),
        );
        let base = test_server::spawn(router).await;

        let value = provider(&base).invoke(&Query::new("status?", "test")).await.unwrap();
        assert_eq!(value["response"], "echo: status?");
        assert_eq!(value["model"], "test-model");
        assert_eq!(value["usage"]["total_tokens"], 5);
    }

    #[tokio::test]
    async fn empty_choices_is_invalid_response() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { Json(json!({ "model": "m", "choices": [] })) }),
        );
        let base = test_server::spawn(router).await;

        let err = provider(&base).invoke(&Query::new("hi", "test")).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let router = Router::new()
            .route("/limited/chat/completions", post(|| async { StatusCode::TOO_MANY_REQUESTS }))
            .route("/denied/chat/completions", post(|| async { StatusCode::UNAUTHORIZED }))
            .route(
                "/broken/chat/completions",
                post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            );
        let base = test_server::spawn(router).await;
        let q = Query::new("hi", "test");

        let err = provider(&format!("{base}/limited")).invoke(&q).await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { .. }));

        let err = provider(&format!("{base}/denied")).invoke(&q).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));

        match provider(&format!("{base}/broken")).invoke(&q).await.unwrap_err() {
            ProviderError::Api { status_code, message } => {
                assert_eq!(status_code, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("Expected Api error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn probe_checks_models_endpoint() {
        let router = Router::new().route("/models", get(|| async { Json(json!({ "data": [] })) }));
        let base = test_server::spawn(router).await;
        assert!(provider(&base).probe().await.unwrap());

        let dead = test_server::dead_url().await;
        let err = provider(&dead).probe().await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }
}
