//! Provider builder — turns `[providers.*]` config sections into handles.
//!
//! Kinds that are absent or disabled produce no handle at all; the status
//! registry treats them as permanently unavailable.

use orus_config::{AppConfig, EndpointConfig};
use orus_core::{CapabilityProvider, ProviderKind};
use std::sync::Arc;
use tracing::info;

use crate::reasoner::ReasonerProvider;
use crate::retriever::RetrieverProvider;
use crate::tool_finder::{DEFAULT_MAX_TOOLS, ToolFinderProvider};

/// Build one provider per enabled config section.
pub fn build_from_config(config: &AppConfig) -> Vec<Arc<dyn CapabilityProvider>> {
    config
        .enabled_providers()
        .map(|(kind, endpoint)| {
            let provider = build_one(config, kind, endpoint);
            info!(kind = %kind, url = %endpoint.api_url, "Configured provider");
            provider
        })
        .collect()
}

fn build_one(
    config: &AppConfig,
    kind: ProviderKind,
    endpoint: &EndpointConfig,
) -> Arc<dyn CapabilityProvider> {
    let timeout = config.provider_timeout(endpoint);
    let api_key = endpoint.api_key.clone().unwrap_or_default();
    let name = endpoint
        .setting_str("name")
        .map(String::from)
        .unwrap_or_else(|| kind.to_string());

    match kind {
        ProviderKind::Reasoner => {
            let mut p = ReasonerProvider::new(name, &endpoint.api_url, api_key, timeout);
            if let Some(model) = &endpoint.model {
                p = p.with_model(model);
            }
            if let Some(prompt) = endpoint.setting_str("system_prompt") {
                p = p.with_system_prompt(prompt);
            }
            if let Some(t) = endpoint.settings.get("temperature").and_then(|v| v.as_f64()) {
                p = p.with_temperature(t as f32);
            }
            Arc::new(p)
        }
        ProviderKind::Retriever => {
            let workspace = endpoint.workspace.clone().unwrap_or_else(|| "default".into());
            Arc::new(RetrieverProvider::new(
                name,
                &endpoint.api_url,
                api_key,
                workspace,
                timeout,
            ))
        }
        ProviderKind::ToolFinder => {
            let max_tools = endpoint
                .setting_u64("max_tools")
                .map(|n| n as usize)
                .unwrap_or(DEFAULT_MAX_TOOLS);
            let mut p = ToolFinderProvider::new(name, &endpoint.api_url, timeout).with_max_tools(max_tools);
            if let Some(key) = &endpoint.api_key {
                p = p.with_api_key(key);
            }
            Arc::new(p)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_builds_nothing() {
        assert!(build_from_config(&AppConfig::default()).is_empty());
    }

    #[test]
    fn builds_one_handle_per_enabled_kind() {
        let config: AppConfig = toml::from_str(
            r#"
[providers.reasoner]
api_url = "https://llm.example.com/v1"
model = "m"

[providers.retriever]
api_url = "https://rag.example.com"
workspace = "docs"
name = "rag-docs"

[providers.tool_finder]
enabled = false
api_url = "http://localhost:8931"
"#,
        )
        .unwrap();

        let providers = build_from_config(&config);
        let kinds: Vec<_> = providers.iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, vec![ProviderKind::Reasoner, ProviderKind::Retriever]);
        assert_eq!(providers[0].name(), "reasoner");
        assert_eq!(providers[1].name(), "rag-docs");
    }
}
