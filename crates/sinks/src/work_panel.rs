//! Work panel sink — records each processed query as a completed work item.

use async_trait::async_trait;
use orus_core::{AggregatedResult, ProviderKind, Query, SinkError, SinkKind, SinkPublisher};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::http;

pub const DEFAULT_IMPORT_PATH: &str = "/api/work-items/import";
pub const DEFAULT_CATEGORY: &str = "Cognitive Integration";
pub const DEFAULT_ORIGIN: &str = "ORUS";
const TITLE_CHARS: usize = 30;

#[derive(Debug, Serialize)]
pub struct WorkItem {
    pub title: String,
    pub description: String,
    pub origin: String,
    pub category: String,
    pub status: &'static str,
    pub metadata: serde_json::Value,
}

pub struct WorkPanelSink {
    name: String,
    base_url: String,
    api_key: Option<String>,
    import_path: String,
    category: String,
    origin: String,
    client: reqwest::Client,
}

impl WorkPanelSink {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            import_path: DEFAULT_IMPORT_PATH.into(),
            category: DEFAULT_CATEGORY.into(),
            origin: DEFAULT_ORIGIN.into(),
            client: http::client(timeout),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_import_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.import_path = if path.starts_with('/') { path } else { format!("/{path}") };
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn work_item(&self, query: &Query, result: &AggregatedResult) -> WorkItem {
        let timestamp = result
            .completed_at()
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let description = format!(
            "Query processed by ORUS\n\nQuery: {text}\n\nResults:\n\
             - Processing mode: {mode}\n\
             - Success: {success}\n\
             - Tools available: {tools}\n\
             - Timestamp: {timestamp}",
            text = query.text,
            mode = result.processing_mode(),
            success = result.overall_success(),
            tools = available_tools(result),
        );

        WorkItem {
            title: query.preview(TITLE_CHARS),
            description,
            origin: self.origin.clone(),
            category: self.category.clone(),
            status: "completed",
            metadata: serde_json::json!({
                "queryId": query.id,
                "source": query.source,
                "processingMode": result.processing_mode(),
                "success": result.overall_success(),
                "failedProviders": result.failed_kinds(),
                "timestamp": timestamp,
            }),
        }
    }
}

fn available_tools(result: &AggregatedResult) -> u64 {
    result
        .get(ProviderKind::ToolFinder)
        .and_then(|r| r.payload())
        .and_then(|p| p.get("available_tools"))
        .and_then(|n| n.as_u64())
        .unwrap_or(0)
}

#[async_trait]
impl SinkPublisher for WorkPanelSink {
    fn kind(&self) -> SinkKind {
        SinkKind::WorkPanel
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, query: &Query, result: &AggregatedResult) -> Result<(), SinkError> {
        debug!(sink = %self.name, query_id = %query.id, "Importing work item");

        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, self.import_path))
            .json(&self.work_item(query, result));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(http::network)?;
        http::check_status(&self.name, response).await
    }

    async fn probe(&self) -> Result<bool, SinkError> {
        http::probe(&self.client, &self.base_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orus_test_support as test_server;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use orus_core::{ProcessingMode, ProviderError, ProviderResult};
    use serde_json::{Value, json};
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    fn aggregate(query: &Query, entries: Vec<ProviderResult>) -> AggregatedResult {
        let results: BTreeMap<_, _> = entries.into_iter().map(|r| (r.kind, r)).collect();
        AggregatedResult::new(Arc::new(query.clone()), ProcessingMode::AsyncEnhanced, results)
    }

    #[test]
    fn title_truncates_long_queries() {
        let sink = WorkPanelSink::new("panel", "http://unused", Duration::from_secs(1));
        let long = Query::new("Summarise every incident from the last quarter please", "test");
        let short = Query::new("status?", "test");

        let item = sink.work_item(&long, &aggregate(&long, vec![]));
        assert_eq!(item.title, "Summarise every incident from ...");
        assert_eq!(sink.work_item(&short, &aggregate(&short, vec![])).title, "status?");
    }

    #[test]
    fn description_reports_mode_success_and_tools() {
        let sink = WorkPanelSink::new("panel", "http://unused", Duration::from_secs(1));
        let query = Query::new("restart the worker", "test");
        let result = aggregate(
            &query,
            vec![
                ProviderResult::error(ProviderKind::Reasoner, ProviderError::Timeout { after_ms: 10 }, 10),
                ProviderResult::value(
                    ProviderKind::ToolFinder,
                    json!({ "available_tools": 7, "relevant_tools": 1, "tools": [] }),
                    3,
                ),
            ],
        );

        let item = sink.work_item(&query, &result);
        assert!(item.description.contains("Processing mode: async_enhanced"));
        assert!(item.description.contains("Success: false"));
        assert!(item.description.contains("Tools available: 7"));
        assert_eq!(item.metadata["failedProviders"], json!(["reasoner"]));
        assert_eq!(item.status, "completed");
    }

    #[tokio::test]
    async fn publish_posts_to_custom_import_path() {
        let seen: Arc<Mutex<Option<Value>>> = Arc::default();
        let router = Router::new()
            .route(
                "/v2/items",
                post(|State(seen): State<Arc<Mutex<Option<Value>>>>, Json(body): Json<Value>| async move {
                    *seen.lock().unwrap() = Some(body);
                    StatusCode::CREATED
                }),
            )
            .with_state(Arc::clone(&seen));
        let base = test_server::spawn(router).await;

        let sink = WorkPanelSink::new("panel", &base, Duration::from_secs(5))
            .with_import_path("v2/items")
            .with_category("Ops");
        let query = Query::new("status?", "test");
        sink.publish(&query, &aggregate(&query, vec![])).await.unwrap();

        let body = seen.lock().unwrap().take().unwrap();
        assert_eq!(body["category"], "Ops");
        assert_eq!(body["origin"], "ORUS");
        assert_eq!(body["status"], "completed");
    }

    #[tokio::test]
    async fn rejected_payload_maps_to_rejected() {
        let router = Router::new().route(
            DEFAULT_IMPORT_PATH,
            post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "missing title") }),
        );
        let base = test_server::spawn(router).await;

        let sink = WorkPanelSink::new("panel", &base, Duration::from_secs(5));
        let query = Query::new("status?", "test");
        let err = sink.publish(&query, &aggregate(&query, vec![])).await.unwrap_err();
        assert!(matches!(err, SinkError::Rejected(msg) if msg.contains("422")));
    }
}
