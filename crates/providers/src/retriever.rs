//! Retriever provider — retrieval-augmented context for a query.
//!
//! Queries a document workspace (`/api/v1/workspace/{slug}/chat` in
//! `query` mode) and returns the grounded answer plus its sources.

use async_trait::async_trait;
use orus_core::{CapabilityProvider, ProviderError, ProviderKind, Query};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::http;

pub struct RetrieverProvider {
    name: String,
    base_url: String,
    api_key: String,
    workspace: String,
    client: reqwest::Client,
}

impl RetrieverProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        workspace: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            workspace: workspace.into(),
            client: http::client(timeout),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/v1/workspace/{}/chat", self.base_url, self.workspace)
    }
}

#[async_trait]
impl CapabilityProvider for RetrieverProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Retriever
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, query: &Query) -> Result<serde_json::Value, ProviderError> {
        debug!(provider = %self.name, workspace = %self.workspace, query_id = %query.id, "Sending retrieval request");

        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "message": query.text,
                "mode": "query",
                "sessionId": query.id,
            }))
            .send()
            .await
            .map_err(http::network)?;

        let response = http::check_status(&self.name, response).await?;
        let body: WorkspaceChatResponse = http::decode(response).await?;

        if let Some(error) = body.error.filter(|e| !e.is_empty()) {
            return Err(ProviderError::InvalidResponse(error));
        }

        Ok(serde_json::json!({
            "answer": body.text_response.unwrap_or_default(),
            "sources": body.sources,
        }))
    }

    async fn probe(&self) -> Result<bool, ProviderError> {
        let response = self
            .client
            .get(format!("{}/api/v1/auth", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(http::network)?;

        Ok(response.status().is_success())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceChatResponse {
    #[serde(default)]
    text_response: Option<String>,
    #[serde(default)]
    sources: Vec<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}
