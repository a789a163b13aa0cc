//! The query value and the processing mode requested for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// One incoming user query.
///
/// Created once per request and never mutated afterwards. The orchestrator
/// shares it by `Arc` with provider tasks, the result and the sink dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Correlates log lines, events and sink payloads for this query.
    pub id: String,

    /// The question itself.
    pub text: String,

    /// Free-form tag identifying the caller (e.g. "cli", "panel").
    pub source: String,

    pub submitted_at: DateTime<Utc>,
}

impl Query {
    /// Create a query stamped with a fresh id and the current time.
    ///
    /// Text is not validated here; the orchestrator rejects empty text.
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            source: source.into(),
            submitted_at: Utc::now(),
        }
    }

    /// Whitespace-only text counts as empty.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        Ok(())
    }

    /// A short, char-boundary-safe prefix of the text for log lines.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.text.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}

/// How the orchestrator should consult its providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Fan out to every available provider concurrently.
    #[default]
    AsyncEnhanced,
    /// Consult only the Reasoner, inline.
    SyncCompatible,
}

impl ProcessingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AsyncEnhanced => "async_enhanced",
            Self::SyncCompatible => "sync_compatible",
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "async_enhanced" | "async" => Ok(Self::AsyncEnhanced),
            "sync_compatible" | "sync" => Ok(Self::SyncCompatible),
            other => Err(format!("unknown processing mode: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_query_gets_unique_id() {
        let a = Query::new("status?", "test");
        let b = Query::new("status?", "test");
        assert_ne!(a.id, b.id);
        assert_eq!(a.source, "test");
    }

    #[test]
    fn empty_and_blank_text_rejected() {
        assert_eq!(
            Query::new("", "test").validate(),
            Err(ValidationError::EmptyQuery)
        );
        assert_eq!(
            Query::new("  \n\t", "test").validate(),
            Err(ValidationError::EmptyQuery)
        );
        assert!(Query::new("status?", "test").validate().is_ok());
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let q = Query::new("¿qué capacidades tienes?", "test");
        assert_eq!(q.preview(4), "¿qué...");
        assert_eq!(q.preview(100), q.text);
    }

    #[test]
    fn processing_mode_parses_shorthands() {
        assert_eq!("async".parse::<ProcessingMode>().unwrap(), ProcessingMode::AsyncEnhanced);
        assert_eq!(
            "SYNC_COMPATIBLE".parse::<ProcessingMode>().unwrap(),
            ProcessingMode::SyncCompatible
        );
        assert!("turbo".parse::<ProcessingMode>().is_err());
    }

    #[test]
    fn processing_mode_serializes_snake_case() {
        let json = serde_json::to_string(&ProcessingMode::SyncCompatible).unwrap();
        assert_eq!(json, "\"sync_compatible\"");
    }
}
