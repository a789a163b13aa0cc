//! Configuration loading, validation, and management for ORUS.
//!
//! Loads configuration from `~/.orus/config.toml` (or `ORUS_CONFIG`) with
//! environment variable overrides. Validates all settings at startup.
//!
//! A provider or sink that is absent here, or present with
//! `enabled = false`, is permanently unavailable for the process lifetime.

use orus_core::{ProcessingMode, ProviderKind, SinkKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.orus/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Timeouts and defaults for the orchestrator itself
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Capability providers, keyed by kind
    #[serde(default)]
    pub providers: BTreeMap<ProviderKind, EndpointConfig>,

    /// Sink publishers, keyed by kind
    #[serde(default)]
    pub sinks: BTreeMap<SinkKind, EndpointConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Per-provider deadline unless the endpoint sets its own
    #[serde(default = "default_call_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// Per-sink deadline unless the endpoint sets its own
    #[serde(default = "default_call_timeout_ms")]
    pub sink_timeout_ms: u64,

    /// Deadline for each startup connectivity probe
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    #[serde(default)]
    pub default_mode: ProcessingMode,

    #[serde(default = "default_source")]
    pub default_source: String,
}

fn default_call_timeout_ms() -> u64 {
    30_000
}
fn default_probe_timeout_ms() -> u64 {
    5_000
}
fn default_source() -> String {
    "cli".into()
}
fn default_true() -> bool {
    true
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            provider_timeout_ms: default_call_timeout_ms(),
            sink_timeout_ms: default_call_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            default_mode: ProcessingMode::default(),
            default_source: default_source(),
        }
    }
}

/// Connection parameters for one provider or sink.
#[derive(Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the remote service
    #[serde(default)]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Overrides the orchestrator-wide timeout for this endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Model name (reasoner)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Workspace slug (retriever, semantic store)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,

    /// Endpoint-specific settings (max_tools, import_path, tags, ...)
    #[serde(flatten)]
    pub settings: HashMap<String, serde_json::Value>,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("enabled", &self.enabled)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("timeout_ms", &self.timeout_ms)
            .field("model", &self.model)
            .field("workspace", &self.workspace)
            .field("settings", &self.settings)
            .finish()
    }
}

impl EndpointConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            enabled: true,
            api_url: api_url.into(),
            api_key: None,
            timeout_ms: None,
            model: None,
            workspace: None,
            settings: HashMap::new(),
        }
    }

    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(|v| v.as_str())
    }

    pub fn setting_u64(&self, key: &str) -> Option<u64> {
        self.settings.get(key).and_then(|v| v.as_u64())
    }

    pub fn setting_str_list(&self, key: &str) -> Option<Vec<String>> {
        self.settings.get(key).and_then(|v| v.as_array()).map(|arr| {
            arr.iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect()
        })
    }

    fn validate(&self, label: &str) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{label}: api_url must be set"
            )));
        }
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "{label}: api_url must start with http:// or https://"
            )));
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError(format!(
                "{label}: timeout_ms must be > 0"
            )));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from `path`, else `ORUS_CONFIG`, else
    /// `~/.orus/config.toml`, then apply environment overrides:
    /// - `ORUS_<KIND>_URL` / `ORUS_<KIND>_API_KEY` (e.g. `ORUS_REASONER_URL`)
    /// - `ORUS_PROVIDER_TIMEOUT_MS`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::read(&Self::resolve_path(path))?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// The file `load` reads: `path`, else `ORUS_CONFIG`, else the default.
    pub fn resolve_path(path: Option<&Path>) -> PathBuf {
        match path {
            Some(p) => p.to_path_buf(),
            None => std::env::var("ORUS_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| Self::config_dir().join("config.toml")),
        }
    }

    /// Load configuration from a specific file path, without env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply environment overrides through `lookup`, so tests can pass a map
    /// instead of touching the process environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(ms) = lookup("ORUS_PROVIDER_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.orchestrator.provider_timeout_ms = ms;
        }

        for kind in ProviderKind::ALL {
            override_endpoint(&mut self.providers, kind, kind.as_str(), &lookup);
        }
        for kind in SinkKind::ALL {
            override_endpoint(&mut self.sinks, kind, kind.as_str(), &lookup);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".orus")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let o = &self.orchestrator;
        if o.provider_timeout_ms == 0 || o.sink_timeout_ms == 0 || o.probe_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator timeouts must be > 0".into(),
            ));
        }

        for (kind, endpoint) in &self.providers {
            endpoint.validate(&format!("providers.{kind}"))?;
        }
        for (kind, endpoint) in &self.sinks {
            endpoint.validate(&format!("sinks.{kind}"))?;
        }

        Ok(())
    }

    /// Enabled provider endpoints only.
    pub fn enabled_providers(&self) -> impl Iterator<Item = (ProviderKind, &EndpointConfig)> {
        self.providers
            .iter()
            .filter(|(_, e)| e.enabled)
            .map(|(k, e)| (*k, e))
    }

    /// Enabled sink endpoints only.
    pub fn enabled_sinks(&self) -> impl Iterator<Item = (SinkKind, &EndpointConfig)> {
        self.sinks
            .iter()
            .filter(|(_, e)| e.enabled)
            .map(|(k, e)| (*k, e))
    }

    pub fn provider_timeout(&self, endpoint: &EndpointConfig) -> Duration {
        Duration::from_millis(endpoint.timeout_ms.unwrap_or(self.orchestrator.provider_timeout_ms))
    }

    pub fn sink_timeout(&self, endpoint: &EndpointConfig) -> Duration {
        Duration::from_millis(endpoint.timeout_ms.unwrap_or(self.orchestrator.sink_timeout_ms))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.orchestrator.probe_timeout_ms)
    }

    /// Generate a starter config file (for `orus init`).
    pub fn default_toml() -> String {
        let rendered = toml::to_string_pretty(&Self::default()).unwrap_or_default();
        format!("{rendered}{STARTER_ENDPOINTS}")
    }
}

fn override_endpoint<K: Ord + Copy>(
    map: &mut BTreeMap<K, EndpointConfig>,
    kind: K,
    name: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) {
    let prefix = format!("ORUS_{}", name.to_ascii_uppercase());

    if let Some(url) = lookup(&format!("{prefix}_URL")) {
        map.entry(kind)
            .or_insert_with(|| EndpointConfig::new(""))
            .api_url = url;
    }

    if let Some(key) = lookup(&format!("{prefix}_API_KEY")) {
        if let Some(endpoint) = map.get_mut(&kind) {
            endpoint.api_key = Some(key);
        }
    }
}

const STARTER_ENDPOINTS: &str = r#"
# Capability providers. Remove a section to disable that capability.
#
# [providers.reasoner]
# api_url = "https://openrouter.ai/api/v1"
# api_key = "sk-..."
# model = "anthropic/claude-sonnet-4"
#
# [providers.retriever]
# api_url = "https://rag.example.com"
# api_key = "..."
# workspace = "default"
#
# [providers.tool_finder]
# api_url = "http://localhost:8931"
# max_tools = 5

# Sinks receive every processed query, best-effort.
#
# [sinks.semantic_store]
# api_url = "https://rag.example.com"
# api_key = "..."
# workspace = "default"
#
# [sinks.work_panel]
# api_url = "https://panel.example.com"
# api_key = "..."
# import_path = "/api/work-items/import"
"#;

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
