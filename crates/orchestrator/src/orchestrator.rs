//! Query orchestrator — scatter a query across providers, gather one result.
//!
//! In async-enhanced mode every available provider runs on its own task
//! with its own deadline; a `JoinSet` is drained before anything is merged.
//! A provider that errors, panics, times out or is cancelled only spoils
//! its own slot. The finished result goes to the sinks on a detached task.

use orus_config::AppConfig;
use orus_core::{
    AggregatedResult, CancelSignal, CapabilityProvider, DomainEvent, EventBus, ProcessingMode,
    ProviderError, ProviderKind, ProviderResult, Query, Result, SinkKind,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::dispatch::SinkDispatcher;
use crate::isolation::{Isolated, millis, run_isolated};
use crate::registry::{ProviderRegistration, StatusSnapshot, SystemStatusRegistry};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadlines applied by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    pub provider_timeout: Duration,
    /// Per-kind overrides of `provider_timeout`.
    pub provider_timeouts: BTreeMap<ProviderKind, Duration>,
    pub sink_timeout: Duration,
    /// Per-kind overrides of `sink_timeout`.
    pub sink_timeouts: BTreeMap<SinkKind, Duration>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            provider_timeout: DEFAULT_TIMEOUT,
            provider_timeouts: BTreeMap::new(),
            sink_timeout: DEFAULT_TIMEOUT,
            sink_timeouts: BTreeMap::new(),
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            provider_timeout: Duration::from_millis(config.orchestrator.provider_timeout_ms),
            provider_timeouts: config
                .enabled_providers()
                .filter(|(_, endpoint)| endpoint.timeout_ms.is_some())
                .map(|(kind, endpoint)| (kind, config.provider_timeout(endpoint)))
                .collect(),
            sink_timeout: Duration::from_millis(config.orchestrator.sink_timeout_ms),
            sink_timeouts: config
                .enabled_sinks()
                .filter(|(_, endpoint)| endpoint.timeout_ms.is_some())
                .map(|(kind, endpoint)| (kind, config.sink_timeout(endpoint)))
                .collect(),
        }
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self.provider_timeouts.clear();
        self
    }

    pub fn with_sink_timeout(mut self, timeout: Duration) -> Self {
        self.sink_timeout = timeout;
        self.sink_timeouts.clear();
        self
    }

    /// Override the deadline of one sink kind only.
    pub fn with_sink_timeout_for(mut self, kind: SinkKind, timeout: Duration) -> Self {
        self.sink_timeouts.insert(kind, timeout);
        self
    }

    pub fn timeout_for(&self, kind: ProviderKind) -> Duration {
        self.provider_timeouts
            .get(&kind)
            .copied()
            .unwrap_or(self.provider_timeout)
    }

    pub fn sink_timeout_for(&self, kind: SinkKind) -> Duration {
        self.sink_timeouts.get(&kind).copied().unwrap_or(self.sink_timeout)
    }
}

pub struct QueryOrchestrator {
    registry: Arc<SystemStatusRegistry>,
    settings: OrchestratorSettings,
    events: EventBus,
    dispatcher: SinkDispatcher,
}

impl QueryOrchestrator {
    pub fn new(registry: SystemStatusRegistry, settings: OrchestratorSettings) -> Self {
        let sinks = registry
            .available_sinks()
            .map(|r| (Arc::clone(&r.handle), settings.sink_timeout_for(r.kind)))
            .collect();
        let dispatcher = SinkDispatcher::new(sinks);
        Self {
            registry: Arc::new(registry),
            settings,
            events: EventBus::default(),
            dispatcher,
        }
    }

    /// Publish domain events on `events` instead of a private bus.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    pub fn registry(&self) -> &SystemStatusRegistry {
        &self.registry
    }

    pub fn status(&self) -> StatusSnapshot {
        self.registry.snapshot()
    }

    /// Process one query to completion.
    pub async fn process(&self, query: Query, mode: ProcessingMode) -> Result<Arc<AggregatedResult>> {
        self.process_until(query, mode, CancelSignal::never()).await
    }

    /// Like [`process`](Self::process), but providers still running when
    /// `cancel` fires resolve to `ProviderError::Cancelled`.
    ///
    /// The only `Err` is a validation failure, in which case no provider is
    /// called and nothing is dispatched.
    pub async fn process_until(
        &self,
        query: Query,
        mode: ProcessingMode,
        cancel: CancelSignal,
    ) -> Result<Arc<AggregatedResult>> {
        query.validate()?;

        let started = Instant::now();
        let query = Arc::new(query);
        info!(query_id = %query.id, source = %query.source, mode = %mode, "Processing query");

        let results = match mode {
            ProcessingMode::AsyncEnhanced => self.fan_out(&query, cancel).await,
            ProcessingMode::SyncCompatible => self.reasoner_only(&query, cancel).await,
        };

        let result = Arc::new(AggregatedResult::new(Arc::clone(&query), mode, results));
        let elapsed_ms = millis(started.elapsed());
        let failed_providers = result.failed_kinds();

        info!(
            query_id = %query.id,
            success = result.overall_success(),
            failed = failed_providers.len(),
            elapsed_ms,
            "Query processed"
        );

        self.events.publish(DomainEvent::QueryProcessed {
            query_id: query.id.clone(),
            mode,
            overall_success: result.overall_success(),
            failed_providers,
            elapsed_ms,
            timestamp: result.completed_at(),
        });

        self.dispatcher.dispatch(Arc::clone(&result), self.events.clone());
        Ok(result)
    }

    /// Wait until every sink dispatch started so far has finished.
    pub async fn wait_for_dispatches(&self) {
        self.dispatcher.tracker().wait_idle().await;
    }

    pub fn in_flight_dispatches(&self) -> usize {
        self.dispatcher.tracker().in_flight()
    }

    async fn fan_out(&self, query: &Arc<Query>, cancel: CancelSignal) -> BTreeMap<ProviderKind, ProviderResult> {
        let mut results = BTreeMap::new();
        let mut tasks = JoinSet::new();

        for registration in self.registry.providers() {
            let kind = registration.kind;
            if !registration.available {
                results.insert(kind, unavailable(registration));
                continue;
            }

            let handle = Arc::clone(&registration.handle);
            let query = Arc::clone(query);
            let limit = self.settings.timeout_for(kind);
            let cancel = cancel.clone();
            tasks.spawn(async move { (kind, invoke_isolated(handle.as_ref(), &query, limit, cancel).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((kind, result)) => {
                    results.insert(kind, result);
                }
                Err(e) => warn!(error = %e, "Provider task ended abnormally"),
            }
        }

        // A task that never reported still owes its kind a slot
        for registration in self.registry.providers() {
            let kind = registration.kind;
            results
                .entry(kind)
                .or_insert_with(|| ProviderResult::error(kind, ProviderError::Cancelled, 0));
        }

        results
    }

    async fn reasoner_only(&self, query: &Query, cancel: CancelSignal) -> BTreeMap<ProviderKind, ProviderResult> {
        let kind = ProviderKind::Reasoner;
        let entry = match self.registry.provider(kind) {
            Some(r) if r.available => {
                invoke_isolated(r.handle.as_ref(), query, self.settings.timeout_for(kind), cancel).await
            }
            Some(r) => unavailable(r),
            None => ProviderResult::error(kind, ProviderError::Unavailable("no reasoner registered".into()), 0),
        };
        BTreeMap::from([(kind, entry)])
    }
}

fn unavailable(registration: &ProviderRegistration) -> ProviderResult {
    ProviderResult::error(
        registration.kind,
        ProviderError::Unavailable(format!("{} failed its startup probe", registration.handle.name())),
        0,
    )
}

async fn invoke_isolated(
    provider: &dyn CapabilityProvider,
    query: &Query,
    limit: Duration,
    mut cancel: CancelSignal,
) -> ProviderResult {
    let kind = provider.kind();
    let started = Instant::now();

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProviderError::Cancelled),
        isolated = run_isolated(provider.invoke(query), limit) => match isolated {
            Isolated::Completed(r) => r,
            Isolated::Panicked(msg) => Err(ProviderError::Panicked(msg)),
            Isolated::TimedOut => Err(ProviderError::Timeout { after_ms: millis(limit) }),
        },
    };
    let elapsed_ms = millis(started.elapsed());

    match &outcome {
        Ok(_) => debug!(provider = %provider.name(), kind = %kind, elapsed_ms, "Provider call succeeded"),
        Err(e) => warn!(provider = %provider.name(), kind = %kind, elapsed_ms, error = %e, "Provider call failed"),
    }

    ProviderResult::from_result(kind, outcome, elapsed_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use orus_config::EndpointConfig;

    struct Echo(ProviderKind);

    #[async_trait]
    impl CapabilityProvider for Echo {
        fn kind(&self) -> ProviderKind {
            self.0
        }

        fn name(&self) -> &str {
            "echo"
        }

        async fn invoke(&self, query: &Query) -> std::result::Result<serde_json::Value, ProviderError> {
            Ok(serde_json::json!({ "echo": query.text }))
        }
    }

    fn registry(entries: &[(ProviderKind, bool)]) -> SystemStatusRegistry {
        SystemStatusRegistry::from_registrations(
            entries
                .iter()
                .map(|(kind, ok)| ProviderRegistration::new(Arc::new(Echo(*kind)), *ok))
                .collect(),
            vec![],
        )
    }

    #[test]
    fn settings_follow_config_overrides() {
        let mut config = AppConfig::default();
        config.orchestrator.provider_timeout_ms = 10_000;
        config.orchestrator.sink_timeout_ms = 2_000;
        let mut reasoner = EndpointConfig::new("https://llm.example.com");
        reasoner.timeout_ms = Some(500);
        config.providers.insert(ProviderKind::Reasoner, reasoner);
        config
            .providers
            .insert(ProviderKind::Retriever, EndpointConfig::new("https://rag.example.com"));

        let settings = OrchestratorSettings::from_config(&config);
        assert_eq!(settings.timeout_for(ProviderKind::Reasoner), Duration::from_millis(500));
        assert_eq!(settings.timeout_for(ProviderKind::Retriever), Duration::from_secs(10));
        assert_eq!(settings.sink_timeout, Duration::from_secs(2));
        assert_eq!(settings.sink_timeout_for(SinkKind::WorkPanel), Duration::from_secs(2));

        let flat = settings.with_provider_timeout(Duration::from_millis(1));
        assert_eq!(flat.timeout_for(ProviderKind::Reasoner), Duration::from_millis(1));
    }

    #[test]
    fn sink_endpoint_timeout_overrides_global_sink_timeout() {
        let mut config = AppConfig::default();
        config.orchestrator.sink_timeout_ms = 1_000;
        let mut panel = EndpointConfig::new("https://panel.example.com");
        panel.timeout_ms = Some(60_000);
        config.sinks.insert(SinkKind::WorkPanel, panel);
        config
            .sinks
            .insert(SinkKind::SemanticStore, EndpointConfig::new("https://store.example.com"));

        let settings = OrchestratorSettings::from_config(&config);
        assert_eq!(settings.sink_timeout_for(SinkKind::WorkPanel), Duration::from_secs(60));
        assert_eq!(settings.sink_timeout_for(SinkKind::SemanticStore), Duration::from_secs(1));

        let flat = settings.with_sink_timeout(Duration::from_millis(5));
        assert_eq!(flat.sink_timeout_for(SinkKind::WorkPanel), Duration::from_millis(5));
    }

    #[tokio::test]
    async fn sync_mode_consults_only_the_reasoner() {
        let orchestrator = QueryOrchestrator::new(
            registry(&[(ProviderKind::Reasoner, true), (ProviderKind::Retriever, true)]),
            OrchestratorSettings::default(),
        );

        let result = orchestrator
            .process(Query::new("hello", "test"), ProcessingMode::SyncCompatible)
            .await
            .unwrap();

        assert_eq!(result.results().len(), 1);
        assert_eq!(result.get(ProviderKind::Reasoner).unwrap().payload().unwrap()["echo"], "hello");
        assert!(result.overall_success());
        assert_eq!(result.processing_mode(), ProcessingMode::SyncCompatible);
    }

    #[tokio::test]
    async fn sync_mode_without_reasoner_reports_unavailable() {
        let orchestrator = QueryOrchestrator::new(
            registry(&[(ProviderKind::Retriever, true)]),
            OrchestratorSettings::default(),
        );

        let result = orchestrator
            .process(Query::new("hello", "test"), ProcessingMode::SyncCompatible)
            .await
            .unwrap();

        let entry = result.get(ProviderKind::Reasoner).unwrap();
        assert!(matches!(entry.error_detail(), Some(ProviderError::Unavailable(_))));
        assert!(!result.overall_success());
    }

    #[tokio::test]
    async fn unavailable_provider_gets_slot_without_call() {
        let orchestrator = QueryOrchestrator::new(
            registry(&[(ProviderKind::Reasoner, true), (ProviderKind::ToolFinder, false)]),
            OrchestratorSettings::default(),
        );

        let result = orchestrator
            .process(Query::new("hello", "test"), ProcessingMode::AsyncEnhanced)
            .await
            .unwrap();

        assert_eq!(result.results().len(), 2);
        let tools = result.get(ProviderKind::ToolFinder).unwrap();
        assert_eq!(tools.elapsed_ms, 0);
        assert!(matches!(tools.error_detail(), Some(ProviderError::Unavailable(msg)) if msg.contains("echo")));
        assert!(result.overall_success());
        assert!(result.get(ProviderKind::Retriever).is_none());
    }

    #[tokio::test]
    async fn publishes_query_processed_event() {
        let orchestrator = QueryOrchestrator::new(registry(&[(ProviderKind::Reasoner, true)]), Default::default());
        let mut rx = orchestrator.event_bus().subscribe();

        let result = orchestrator
            .process(Query::new("hello", "test"), ProcessingMode::AsyncEnhanced)
            .await
            .unwrap();

        match rx.recv().await.unwrap().as_ref() {
            DomainEvent::QueryProcessed { query_id, overall_success, failed_providers, .. } => {
                assert_eq!(query_id, &result.query().id);
                assert!(*overall_success);
                assert!(failed_providers.is_empty());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
