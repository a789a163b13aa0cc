//! Tool finder provider — discovers tools relevant to a query.
//!
//! Lists the tool catalogue of a tool server (`GET /tools`) and keeps the
//! tools whose keywords appear in the query text.

use async_trait::async_trait;
use orus_core::{CapabilityProvider, ProviderError, ProviderKind, Query};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::http;

pub const DEFAULT_MAX_TOOLS: usize = 5;

/// One entry of the tool catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ToolDescriptor {
    fn matches(&self, lowered_query: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && lowered_query.contains(&k.to_lowercase()))
    }
}

/// Keep catalogue order, first `max` matches only.
pub fn select_relevant(tools: &[ToolDescriptor], query_text: &str, max: usize) -> Vec<ToolDescriptor> {
    let lowered = query_text.to_lowercase();
    tools
        .iter()
        .filter(|t| t.matches(&lowered))
        .take(max)
        .cloned()
        .collect()
}

pub struct ToolFinderProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    max_tools: usize,
    client: reqwest::Client,
}

impl ToolFinderProvider {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            max_tools: DEFAULT_MAX_TOOLS,
            client: http::client(timeout),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_max_tools(mut self, max_tools: usize) -> Self {
        self.max_tools = max_tools;
        self
    }

    async fn catalogue(&self) -> Result<Vec<ToolDescriptor>, ProviderError> {
        let mut request = self.client.get(format!("{}/tools", self.base_url));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(http::network)?;
        let response = http::check_status(&self.name, response).await?;

        // Servers answer either with a bare array or `{ "tools": [...] }`
        match http::decode::<Catalogue>(response).await? {
            Catalogue::Bare(tools) | Catalogue::Wrapped { tools } => Ok(tools),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Catalogue {
    Bare(Vec<ToolDescriptor>),
    Wrapped { tools: Vec<ToolDescriptor> },
}

#[async_trait]
impl CapabilityProvider for ToolFinderProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ToolFinder
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, query: &Query) -> Result<serde_json::Value, ProviderError> {
        let tools = self.catalogue().await?;
        let relevant = select_relevant(&tools, &query.text, self.max_tools);

        debug!(
            provider = %self.name,
            available = tools.len(),
            relevant = relevant.len(),
            "Tool discovery complete"
        );

        Ok(serde_json::json!({
            "available_tools": tools.len(),
            "relevant_tools": relevant.len(),
            "tools": relevant,
        }))
    }

    async fn probe(&self) -> Result<bool, ProviderError> {
        Ok(self.catalogue().await.is_ok())
    }
}
