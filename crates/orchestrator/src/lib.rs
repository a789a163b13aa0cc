//! Query orchestration for ORUS.
//!
//! A [`QueryOrchestrator`] fans one query out to every available capability
//! provider, folds the outcomes into an [`orus_core::AggregatedResult`] and
//! hands that result to the configured sinks in the background.
//! [`SystemStatusRegistry`] decides once, at startup, which components are
//! worth calling.

pub mod dispatch;
mod isolation;
pub mod orchestrator;
pub mod registry;

pub use dispatch::DispatchTracker;
pub use orchestrator::{OrchestratorSettings, QueryOrchestrator};
pub use registry::{ProviderRegistration, SinkRegistration, StatusSnapshot, SystemStatusRegistry};
