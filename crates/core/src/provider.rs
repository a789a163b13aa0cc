//! CapabilityProvider trait — the abstraction over query-answering backends.
//!
//! A provider contributes one kind of answer to a query: the reasoning
//! engine's response, retrieved context, or a list of relevant tools.
//!
//! Implementations: HTTP reasoner, HTTP retriever, HTTP tool finder (see the
//! `orus-providers` crate), plus in-process stubs in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ProviderError;
use crate::query::Query;

/// The fixed set of capability kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Reasoner,
    Retriever,
    ToolFinder,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [Self::Reasoner, Self::Retriever, Self::ToolFinder];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reasoner => "reasoner",
            Self::Retriever => "retriever",
            Self::ToolFinder => "tool_finder",
        }
    }

    /// Only the Reasoner decides overall success; the others are enhancements.
    pub fn is_mandatory(&self) -> bool {
        matches!(self, Self::Reasoner)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown provider kind: {s}"))
    }
}

/// The core CapabilityProvider trait.
///
/// The orchestrator calls `invoke()` on every available provider at once.
/// Implementations must be safe to run concurrently with each other and must
/// be cancel-safe: the orchestrator abandons a call by dropping its future
/// when the per-provider timeout or the caller's cancel signal fires.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    /// Which slot of the aggregated result this provider fills.
    fn kind(&self) -> ProviderKind;

    /// A human-readable name for logs (e.g., "openrouter", "rag-workspace").
    fn name(&self) -> &str;

    /// Answer the query with an opaque structured payload.
    async fn invoke(&self, query: &Query) -> std::result::Result<serde_json::Value, ProviderError>;

    /// Cheap connectivity check, run once at startup.
    async fn probe(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
