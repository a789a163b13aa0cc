pub mod init;
pub mod query;
pub mod status;

use orus_config::AppConfig;
use orus_orchestrator::SystemStatusRegistry;

/// Build every configured provider and sink and probe them once.
async fn probe_registry(config: &AppConfig) -> SystemStatusRegistry {
    let providers = orus_providers::build_from_config(config);
    let sinks = orus_sinks::build_from_config(config);
    SystemStatusRegistry::probe(providers, sinks, config.probe_timeout()).await
}
