//! SinkPublisher trait — best-effort persistence of finished queries.
//!
//! Sinks are external systems that keep a record of what was asked and
//! answered. They are unreliable by assumption: a publish may fail, and
//! nothing on the caller's path waits for it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SinkError;
use crate::query::Query;
use crate::result::AggregatedResult;

/// The fixed set of sink kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Semantic document store that ingests the query and answer as text.
    SemanticStore,
    /// Work panel that lists processed queries as completed work items.
    WorkPanel,
}

impl SinkKind {
    pub const ALL: [SinkKind; 2] = [Self::SemanticStore, Self::WorkPanel];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SemanticStore => "semantic_store",
            Self::WorkPanel => "work_panel",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened when one sink was asked to publish one query.
///
/// Never returned to the original caller; logged and published as an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkDispatchOutcome {
    pub sink: SinkKind,
    pub query_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl SinkDispatchOutcome {
    pub fn from_result(
        sink: SinkKind,
        query_id: impl Into<String>,
        result: &std::result::Result<(), SinkError>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            sink,
            query_id: query_id.into(),
            success: result.is_ok(),
            error: result.as_ref().err().map(|e| e.to_string()),
            elapsed_ms,
        }
    }
}

/// The core SinkPublisher trait.
///
/// Side-effecting and not guaranteed idempotent. Publishes to different sinks
/// must not depend on one another.
#[async_trait]
pub trait SinkPublisher: Send + Sync {
    fn kind(&self) -> SinkKind;

    fn name(&self) -> &str;

    async fn publish(
        &self,
        query: &Query,
        result: &AggregatedResult,
    ) -> std::result::Result<(), SinkError>;

    /// Cheap connectivity check, run once at startup.
    async fn probe(&self) -> std::result::Result<bool, SinkError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_from_failure_carries_error_text() {
        let outcome = SinkDispatchOutcome::from_result(
            SinkKind::WorkPanel,
            "q-1",
            &Err(SinkError::Network("connection refused".into())),
            12,
        );
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("connection refused"));
    }

    #[test]
    fn outcome_from_success_has_no_error() {
        let outcome = SinkDispatchOutcome::from_result(SinkKind::SemanticStore, "q-1", &Ok(()), 3);
        assert!(outcome.success);
        assert!(outcome.error.is_none());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["sink"], "semantic_store");
        assert!(json.get("error").is_none());
    }
}
