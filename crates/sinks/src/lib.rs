//! Sink publisher implementations for ORUS.
//!
//! All sinks implement the `orus_core::SinkPublisher` trait. They are
//! invoked after the caller already has its answer, so every failure here
//! is reported and then dropped.

pub mod builder;
mod http;
pub mod semantic_store;
pub mod work_panel;

pub use builder::build_from_config;
pub use semantic_store::SemanticStoreSink;
pub use work_panel::WorkPanelSink;
