//! Per-provider outcomes and the aggregated response built from them.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ProviderError;
use crate::provider::ProviderKind;
use crate::query::{ProcessingMode, Query};

/// Either a payload or an error, never both, never neither.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderOutcome {
    Value(serde_json::Value),
    Error(#[serde(serialize_with = "serialize_display")] ProviderError),
}

fn serialize_display<S: Serializer>(err: &ProviderError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

/// The tagged outcome of one provider invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResult {
    #[serde(skip)]
    pub kind: ProviderKind,

    #[serde(flatten)]
    pub outcome: ProviderOutcome,

    pub elapsed_ms: u64,
}

impl ProviderResult {
    pub fn value(kind: ProviderKind, value: serde_json::Value, elapsed_ms: u64) -> Self {
        Self {
            kind,
            outcome: ProviderOutcome::Value(value),
            elapsed_ms,
        }
    }

    pub fn error(kind: ProviderKind, error: ProviderError, elapsed_ms: u64) -> Self {
        Self {
            kind,
            outcome: ProviderOutcome::Error(error),
            elapsed_ms,
        }
    }

    pub fn from_result(
        kind: ProviderKind,
        result: std::result::Result<serde_json::Value, ProviderError>,
        elapsed_ms: u64,
    ) -> Self {
        match result {
            Ok(value) => Self::value(kind, value, elapsed_ms),
            Err(error) => Self::error(kind, error, elapsed_ms),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ProviderOutcome::Value(_))
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        match &self.outcome {
            ProviderOutcome::Value(v) => Some(v),
            ProviderOutcome::Error(_) => None,
        }
    }

    pub fn error_detail(&self) -> Option<&ProviderError> {
        match &self.outcome {
            ProviderOutcome::Value(_) => None,
            ProviderOutcome::Error(e) => Some(e),
        }
    }
}

/// The combined response for one query.
///
/// Built once by the orchestrator and immutable afterwards: fields are
/// private and only readable. The query is shared, not owned.
#[derive(Debug, Clone)]
pub struct AggregatedResult {
    query: Arc<Query>,
    results: BTreeMap<ProviderKind, ProviderResult>,
    processing_mode: ProcessingMode,
    overall_success: bool,
    completed_at: DateTime<Utc>,
}

impl AggregatedResult {
    /// Seal a set of provider results. Overall success is derived here and
    /// only from the mandatory Reasoner entry.
    pub fn new(
        query: Arc<Query>,
        processing_mode: ProcessingMode,
        results: BTreeMap<ProviderKind, ProviderResult>,
    ) -> Self {
        let overall_success = results
            .iter()
            .filter(|(kind, _)| kind.is_mandatory())
            .any(|(_, r)| r.is_success());

        Self {
            query,
            results,
            processing_mode,
            overall_success,
            completed_at: Utc::now(),
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn results(&self) -> &BTreeMap<ProviderKind, ProviderResult> {
        &self.results
    }

    pub fn get(&self, kind: ProviderKind) -> Option<&ProviderResult> {
        self.results.get(&kind)
    }

    pub fn processing_mode(&self) -> ProcessingMode {
        self.processing_mode
    }

    pub fn overall_success(&self) -> bool {
        self.overall_success
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Kinds whose slot holds an error.
    pub fn failed_kinds(&self) -> Vec<ProviderKind> {
        self.results
            .values()
            .filter(|r| !r.is_success())
            .map(|r| r.kind)
            .collect()
    }

    /// Outcomes without timing, for comparing two runs of the same query.
    pub fn payloads(&self) -> BTreeMap<ProviderKind, &ProviderOutcome> {
        self.results.iter().map(|(k, r)| (*k, &r.outcome)).collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for AggregatedResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4 + self.results.len()))?;
        map.serialize_entry("success", &self.overall_success)?;
        map.serialize_entry("processingMode", &self.processing_mode)?;
        map.serialize_entry(
            "timestamp",
            &self.completed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        )?;
        map.serialize_entry("query", self.query.as_ref())?;
        for (kind, result) in &self.results {
            map.serialize_entry(kind.as_str(), result)?;
        }
        map.end()
    }
}
