//! # ORUS Core
//!
//! Domain types, traits, and error definitions for the ORUS query
//! orchestrator. This crate has **no I/O** — it defines the model that the
//! provider, sink and orchestrator crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external capability is a trait here:
//! - [`CapabilityProvider`] contributes one kind of answer to a query
//! - [`SinkPublisher`] persists a finished query somewhere, best-effort
//!
//! Implementations live in their own crates, so the orchestrator can be
//! exercised end-to-end with in-process stubs.

pub mod cancel;
pub mod error;
pub mod event;
pub mod provider;
pub mod query;
pub mod result;
pub mod sink;

// Re-export key types at crate root for ergonomics
pub use cancel::{CancelHandle, CancelSignal};
pub use error::{Error, ProviderError, Result, SinkError, ValidationError};
pub use event::{DomainEvent, EventBus};
pub use provider::{CapabilityProvider, ProviderKind};
pub use query::{ProcessingMode, Query};
pub use result::{AggregatedResult, ProviderOutcome, ProviderResult};
pub use sink::{SinkDispatchOutcome, SinkKind, SinkPublisher};
