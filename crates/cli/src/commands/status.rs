//! `orus status` — probe configured components and show what is reachable.

use orus_config::AppConfig;
use orus_core::{ProviderKind, SinkKind};
use std::path::Path;

pub async fn run(config_path: Option<&Path>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let registry = super::probe_registry(&config).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&registry.snapshot())?);
        return Ok(());
    }

    println!("ORUS Status");
    println!("===========");
    println!("  Config:            {}", AppConfig::resolve_path(config_path).display());
    println!("  Default mode:      {}", config.orchestrator.default_mode);
    println!("  Provider timeout:  {} ms", config.orchestrator.provider_timeout_ms);
    println!("  Sink timeout:      {} ms", config.orchestrator.sink_timeout_ms);

    println!("\n  Providers:");
    for kind in ProviderKind::ALL {
        let state = registry
            .provider(kind)
            .map(|r| describe(r.available, r.handle.name()))
            .unwrap_or_else(|| "⚪ not configured".into());
        println!("    {:<16}{state}", kind.as_str());
    }

    println!("\n  Sinks:");
    for kind in SinkKind::ALL {
        let state = registry
            .sinks()
            .find(|r| r.kind == kind)
            .map(|r| describe(r.available, r.handle.name()))
            .unwrap_or_else(|| "⚪ not configured".into());
        println!("    {:<16}{state}", kind.as_str());
    }

    if !registry.is_provider_available(ProviderKind::Reasoner) {
        println!("\n  ⚠️  Reasoner unavailable: every query will report success = false");
    }

    Ok(())
}

fn describe(available: bool, name: &str) -> String {
    if available {
        format!("✅ available ({name})")
    } else {
        format!("❌ unreachable ({name})")
    }
}
