//! Error types for the ORUS domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each boundary has its own error type; only [`ValidationError`] ever
//! reaches the caller of the orchestrator as a hard failure.

use thiserror::Error;

/// The top-level error type for all ORUS operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Input validation ---
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Sink errors ---
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Malformed input, rejected before any provider is called.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("query text must not be empty")]
    EmptyQuery,
}

/// Failure of a single capability provider invocation.
///
/// Scoped to one provider: it is recorded in that provider's result slot and
/// never aborts the aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("timeout")]
    Timeout { after_ms: u64 },

    #[error("cancelled")]
    Cancelled,

    #[error("Provider panicked: {0}")]
    Panicked(String),
}

impl ProviderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Failure of a single sink publish attempt. Observed, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("Sink request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Sink rejected the payload: {0}")]
    Rejected(String),

    #[error("Sink timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Sink panicked: {0}")]
    Panicked(String),

    #[error("Sink not configured: {0}")]
    NotConfigured(String),
}
