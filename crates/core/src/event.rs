//! Domain event system — observability without coupling.
//!
//! The orchestrator publishes what happened to each query and each sink
//! dispatch. Health reporting, tests and the CLI subscribe to react.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::provider::ProviderKind;
use crate::query::ProcessingMode;
use crate::sink::SinkDispatchOutcome;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// An aggregated result was built and handed back to the caller
    QueryProcessed {
        query_id: String,
        mode: ProcessingMode,
        overall_success: bool,
        failed_providers: Vec<ProviderKind>,
        elapsed_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// One sink finished (or failed) publishing one query
    SinkDispatched(SinkDispatchOutcome),

    /// A provider or sink was probed at startup
    ComponentProbed {
        component: String,
        available: bool,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
