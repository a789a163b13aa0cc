//! Sink builder — turns `[sinks.*]` config sections into publishers.

use orus_config::{AppConfig, EndpointConfig};
use orus_core::{SinkKind, SinkPublisher};
use std::sync::Arc;
use tracing::info;

use crate::semantic_store::SemanticStoreSink;
use crate::work_panel::WorkPanelSink;

/// Build one publisher per enabled config section.
pub fn build_from_config(config: &AppConfig) -> Vec<Arc<dyn SinkPublisher>> {
    config
        .enabled_sinks()
        .map(|(kind, endpoint)| {
            let sink = build_one(config, kind, endpoint);
            info!(kind = %kind, url = %endpoint.api_url, "Configured sink");
            sink
        })
        .collect()
}

fn build_one(config: &AppConfig, kind: SinkKind, endpoint: &EndpointConfig) -> Arc<dyn SinkPublisher> {
    let timeout = config.sink_timeout(endpoint);
    let name = endpoint
        .setting_str("name")
        .map(String::from)
        .unwrap_or_else(|| kind.to_string());

    match kind {
        SinkKind::SemanticStore => {
            let workspace = endpoint.workspace.clone().unwrap_or_else(|| "default".into());
            let api_key = endpoint.api_key.clone().unwrap_or_default();
            let mut sink = SemanticStoreSink::new(name, &endpoint.api_url, api_key, workspace, timeout);
            if let Some(source) = endpoint.setting_str("source") {
                sink = sink.with_source(source);
            }
            if let Some(tags) = endpoint.setting_str_list("tags") {
                sink = sink.with_tags(tags);
            }
            Arc::new(sink)
        }
        SinkKind::WorkPanel => {
            let mut sink = WorkPanelSink::new(name, &endpoint.api_url, timeout);
            if let Some(key) = &endpoint.api_key {
                sink = sink.with_api_key(key);
            }
            if let Some(path) = endpoint.setting_str("import_path") {
                sink = sink.with_import_path(path);
            }
            if let Some(category) = endpoint.setting_str("category") {
                sink = sink.with_category(category);
            }
            if let Some(origin) = endpoint.setting_str("origin") {
                sink = sink.with_origin(origin);
            }
            Arc::new(sink)
        }
    }
}
