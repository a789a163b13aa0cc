//! Capability provider implementations for ORUS.
//!
//! All providers implement the `orus_core::CapabilityProvider` trait.
//! [`builder::build_from_config`] turns the `[providers.*]` config sections
//! into handles ready for the status registry.

pub mod builder;
mod http;
pub mod reasoner;
pub mod retriever;
pub mod tool_finder;

pub use builder::build_from_config;
pub use reasoner::ReasonerProvider;
pub use retriever::RetrieverProvider;
pub use tool_finder::{ToolDescriptor, ToolFinderProvider};
