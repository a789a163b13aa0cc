//! Semantic store sink — ingests each processed query as a text document.
//!
//! The document is what later retrieval runs search over, so it carries the
//! original question next to the full aggregated answer.

use async_trait::async_trait;
use orus_core::{AggregatedResult, Query, SinkError, SinkKind, SinkPublisher};
use std::time::Duration;
use tracing::debug;

use crate::http;

pub const DEFAULT_SOURCE: &str = "ORUS";
pub const CONTENT_TYPE: &str = "enhanced_query";

pub fn default_tags() -> Vec<String> {
    vec!["enhanced".into(), "async".into()]
}

pub struct SemanticStoreSink {
    name: String,
    base_url: String,
    api_key: String,
    workspace: String,
    source: String,
    tags: Vec<String>,
    client: reqwest::Client,
}

impl SemanticStoreSink {
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
            source: DEFAULT_SOURCE.into(),
            tags: default_tags(),
            client: http::client(timeout),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    fn ingest_url(&self) -> String {
        format!("{}/api/v1/workspace/{}/ingest", self.base_url, self.workspace)
    }

    /// Render the stored document.
    pub fn render_content(&self, query: &Query, result: &AggregatedResult) -> String {
        let body = serde_json::to_string_pretty(&result.to_json()).unwrap_or_default();
        let header = format!(
            "ORUS QUERY - {}",
            result.completed_at().format("%Y-%m-%d %H:%M:%S")
        );

        format!(
            "{header}\n{rule}\n\nOriginal query:\n{text}\n\nSystem response:\n{body}\n\n---\nProcessed by: {source}\n",
            rule = "=".repeat(header.chars().count()),
            text = query.text,
            source = self.source,
        )
    }
}

#[async_trait]
impl SinkPublisher for SemanticStoreSink {
    fn kind(&self) -> SinkKind {
        SinkKind::SemanticStore
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, query: &Query, result: &AggregatedResult) -> Result<(), SinkError> {
        debug!(sink = %self.name, workspace = %self.workspace, query_id = %query.id, "Ingesting query document");

        let response = self
            .client
            .post(self.ingest_url())
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "source": self.source,
                "type": CONTENT_TYPE,
                "content": self.render_content(query, result),
                "tags": self.tags,
            }))
            .send()
            .await
            .map_err(http::network)?;

        http::check_status(&self.name, response).await
    }

    async fn probe(&self) -> Result<bool, SinkError> {
        http::probe(&self.client, &self.base_url).await
    }
}
