//! `orus query` — process one query and print the aggregated result.

use orus_config::AppConfig;
use orus_core::{DomainEvent, ProcessingMode, Query};
use orus_orchestrator::{OrchestratorSettings, QueryOrchestrator};
use std::path::Path;
use std::time::Duration;

pub async fn run(
    config_path: Option<&Path>,
    text: String,
    source: Option<String>,
    sync: bool,
    timeout_ms: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    let mode = if sync {
        ProcessingMode::SyncCompatible
    } else {
        config.orchestrator.default_mode
    };
    let mut settings = OrchestratorSettings::from_config(&config);
    if let Some(ms) = timeout_ms {
        settings = settings.with_provider_timeout(Duration::from_millis(ms));
    }

    let registry = super::probe_registry(&config).await;
    let orchestrator = QueryOrchestrator::new(registry, settings);
    let mut events = orchestrator.event_bus().subscribe();
    orchestrator.registry().announce(orchestrator.event_bus());

    let source = source.unwrap_or_else(|| config.orchestrator.default_source.clone());
    let result = orchestrator.process(Query::new(text, source), mode).await?;
    println!("{}", serde_json::to_string_pretty(result.as_ref())?);

    orchestrator.wait_for_dispatches().await;
    while let Ok(event) = events.try_recv() {
        match event.as_ref() {
            DomainEvent::SinkDispatched(outcome) => match &outcome.error {
                None => eprintln!("  ✅ {} stored ({} ms)", outcome.sink, outcome.elapsed_ms),
                Some(e) => eprintln!("  ❌ {} failed: {e}", outcome.sink),
            },
            DomainEvent::ComponentProbed { component, available: false, .. } => {
                eprintln!("  ⚪ {component} skipped (unreachable at startup)");
            }
            _ => {}
        }
    }

    Ok(())
}
