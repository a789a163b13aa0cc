//! Hand-written providers and sinks with scripted behaviour.

#![allow(dead_code)]

use async_trait::async_trait;
use orus_core::{
    AggregatedResult, CapabilityProvider, ProviderError, ProviderKind, Query, SinkError, SinkKind, SinkPublisher,
};
use orus_orchestrator::{
    OrchestratorSettings, ProviderRegistration, QueryOrchestrator, SinkRegistration, SystemStatusRegistry,
};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Clone)]
pub enum Behavior {
    Value(Value),
    Fail(ProviderError),
    Delay(Duration, Value),
    Panic(&'static str),
}

pub struct StubProvider {
    kind: ProviderKind,
    behavior: Behavior,
    reachable: bool,
    calls: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
}

/// Counts an `invoke` future as live until it completes or is dropped.
struct LiveCall(Arc<AtomicUsize>);

impl LiveCall {
    fn start(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for LiveCall {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl StubProvider {
    pub fn new(kind: ProviderKind, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            kind,
            behavior,
            reachable: true,
            calls: AtomicUsize::new(0),
            in_flight: Arc::default(),
        })
    }

    pub fn unreachable(kind: ProviderKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            behavior: Behavior::Value(Value::Null),
            reachable: false,
            calls: AtomicUsize::new(0),
            in_flight: Arc::default(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Invocations started but neither finished nor dropped.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CapabilityProvider for StubProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn name(&self) -> &str {
        self.kind.as_str()
    }

    async fn invoke(&self, _query: &Query) -> Result<Value, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _live = LiveCall::start(&self.in_flight);
        match &self.behavior {
            Behavior::Value(v) => Ok(v.clone()),
            Behavior::Fail(e) => Err(e.clone()),
            Behavior::Delay(d, v) => {
                tokio::time::sleep(*d).await;
                Ok(v.clone())
            }
            Behavior::Panic(msg) => panic!("{msg}"),
        }
    }

    async fn probe(&self) -> Result<bool, ProviderError> {
        Ok(self.reachable)
    }
}

#[derive(Clone, Copy)]
pub enum SinkBehavior {
    Accept,
    Reject,
    Delay(Duration),
    Panic,
}

pub struct StubSink {
    kind: SinkKind,
    behavior: SinkBehavior,
    publishes: AtomicUsize,
}

impl StubSink {
    pub fn new(kind: SinkKind, behavior: SinkBehavior) -> Arc<Self> {
        Arc::new(Self {
            kind,
            behavior,
            publishes: AtomicUsize::new(0),
        })
    }

    pub fn publishes(&self) -> usize {
        self.publishes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SinkPublisher for StubSink {
    fn kind(&self) -> SinkKind {
        self.kind
    }

    fn name(&self) -> &str {
        self.kind.as_str()
    }

    async fn publish(&self, _query: &Query, _result: &AggregatedResult) -> Result<(), SinkError> {
        self.publishes.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            SinkBehavior::Accept => Ok(()),
            SinkBehavior::Reject => Err(SinkError::Rejected("HTTP 422: bad payload".into())),
            SinkBehavior::Delay(d) => {
                tokio::time::sleep(d).await;
                Ok(())
            }
            SinkBehavior::Panic => panic!("sink exploded"),
        }
    }
}

/// Register the stubs as-is, using each provider's reachability as its
/// availability.
pub fn orchestrator(
    providers: &[Arc<StubProvider>],
    sinks: &[Arc<StubSink>],
    settings: OrchestratorSettings,
) -> QueryOrchestrator {
    let providers = providers
        .iter()
        .map(|p| ProviderRegistration::new(Arc::clone(p) as Arc<dyn CapabilityProvider>, p.reachable))
        .collect();
    let sinks = sinks
        .iter()
        .map(|s| SinkRegistration::new(Arc::clone(s) as Arc<dyn SinkPublisher>, true))
        .collect();
    QueryOrchestrator::new(SystemStatusRegistry::from_registrations(providers, sinks), settings)
}

pub fn ok(value: Value) -> Behavior {
    Behavior::Value(value)
}

pub fn network_down() -> Behavior {
    Behavior::Fail(ProviderError::Network("connection refused".into()))
}
