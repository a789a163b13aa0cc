//! System status registry — which providers and sinks exist and which of
//! them answered their startup probe.
//!
//! Built once. The orchestrator only ever reads it, so it needs no locks.

use chrono::{DateTime, Utc};
use orus_core::{CapabilityProvider, DomainEvent, EventBus, ProviderKind, SinkKind, SinkPublisher};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::isolation::{Isolated, millis, run_isolated};

/// A provider handle plus the availability decided at startup.
#[derive(Clone)]
pub struct ProviderRegistration {
    pub kind: ProviderKind,
    pub available: bool,
    pub handle: Arc<dyn CapabilityProvider>,
}

impl ProviderRegistration {
    pub fn new(handle: Arc<dyn CapabilityProvider>, available: bool) -> Self {
        Self {
            kind: handle.kind(),
            available,
            handle,
        }
    }
}

impl fmt::Debug for ProviderRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistration")
            .field("kind", &self.kind)
            .field("name", &self.handle.name())
            .field("available", &self.available)
            .finish()
    }
}

/// A sink handle plus the availability decided at startup.
#[derive(Clone)]
pub struct SinkRegistration {
    pub kind: SinkKind,
    pub available: bool,
    pub handle: Arc<dyn SinkPublisher>,
}

impl SinkRegistration {
    pub fn new(handle: Arc<dyn SinkPublisher>, available: bool) -> Self {
        Self {
            kind: handle.kind(),
            available,
            handle,
        }
    }
}

impl fmt::Debug for SinkRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkRegistration")
            .field("kind", &self.kind)
            .field("name", &self.handle.name())
            .field("available", &self.available)
            .finish()
    }
}

/// Availability of every known kind. Kinds nobody configured are `false`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub providers: BTreeMap<ProviderKind, bool>,
    pub sinks: BTreeMap<SinkKind, bool>,
    pub probed_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SystemStatusRegistry {
    providers: BTreeMap<ProviderKind, ProviderRegistration>,
    sinks: BTreeMap<SinkKind, SinkRegistration>,
    probed_at: DateTime<Utc>,
}

#[derive(Clone, Copy)]
enum Component {
    Provider(ProviderKind),
    Sink(SinkKind),
}

impl SystemStatusRegistry {
    /// Probe every handle once, concurrently, and record the answers.
    ///
    /// A probe that errors, says `false`, panics or exceeds `probe_timeout`
    /// leaves its component registered but unavailable.
    pub async fn probe(
        providers: Vec<Arc<dyn CapabilityProvider>>,
        sinks: Vec<Arc<dyn SinkPublisher>>,
        probe_timeout: Duration,
    ) -> Self {
        let providers = by_kind(providers, |p| p.kind(), "provider");
        let sinks = by_kind(sinks, |s| s.kind(), "sink");

        let mut probes = JoinSet::new();
        for (kind, handle) in &providers {
            let (kind, handle) = (*kind, Arc::clone(handle));
            probes.spawn(async move {
                let ok = check(kind.as_str(), handle.name(), handle.probe(), probe_timeout).await;
                (Component::Provider(kind), ok)
            });
        }
        for (kind, handle) in &sinks {
            let (kind, handle) = (*kind, Arc::clone(handle));
            probes.spawn(async move {
                let ok = check(kind.as_str(), handle.name(), handle.probe(), probe_timeout).await;
                (Component::Sink(kind), ok)
            });
        }

        let mut provider_ok = BTreeMap::new();
        let mut sink_ok = BTreeMap::new();
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((Component::Provider(kind), ok)) => {
                    provider_ok.insert(kind, ok);
                }
                Ok((Component::Sink(kind), ok)) => {
                    sink_ok.insert(kind, ok);
                }
                Err(e) => warn!(error = %e, "Probe task ended abnormally"),
            }
        }

        let registry = Self {
            providers: providers
                .into_iter()
                .map(|(kind, handle)| {
                    let ok = provider_ok.get(&kind).copied().unwrap_or(false);
                    (kind, ProviderRegistration::new(handle, ok))
                })
                .collect(),
            sinks: sinks
                .into_iter()
                .map(|(kind, handle)| {
                    let ok = sink_ok.get(&kind).copied().unwrap_or(false);
                    (kind, SinkRegistration::new(handle, ok))
                })
                .collect(),
            probed_at: Utc::now(),
        };

        info!(
            providers = registry.available_providers().count(),
            sinks = registry.available_sinks().count(),
            "Startup probe complete"
        );
        registry
    }

    /// Build a registry from availability decided elsewhere.
    pub fn from_registrations(providers: Vec<ProviderRegistration>, sinks: Vec<SinkRegistration>) -> Self {
        Self {
            providers: by_kind(providers, |r| r.kind, "provider"),
            sinks: by_kind(sinks, |r| r.kind, "sink"),
            probed_at: Utc::now(),
        }
    }

    pub fn providers(&self) -> impl Iterator<Item = &ProviderRegistration> {
        self.providers.values()
    }

    pub fn sinks(&self) -> impl Iterator<Item = &SinkRegistration> {
        self.sinks.values()
    }

    pub fn available_providers(&self) -> impl Iterator<Item = &ProviderRegistration> {
        self.providers.values().filter(|r| r.available)
    }

    pub fn available_sinks(&self) -> impl Iterator<Item = &SinkRegistration> {
        self.sinks.values().filter(|r| r.available)
    }

    pub fn provider(&self, kind: ProviderKind) -> Option<&ProviderRegistration> {
        self.providers.get(&kind)
    }

    pub fn is_provider_available(&self, kind: ProviderKind) -> bool {
        self.providers.get(&kind).is_some_and(|r| r.available)
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            providers: ProviderKind::ALL
                .iter()
                .map(|k| (*k, self.is_provider_available(*k)))
                .collect(),
            sinks: SinkKind::ALL
                .iter()
                .map(|k| (*k, self.sinks.get(k).is_some_and(|r| r.available)))
                .collect(),
            probed_at: self.probed_at,
        }
    }

    /// Publish one `ComponentProbed` event per registered component.
    pub fn announce(&self, events: &EventBus) {
        let components = self
            .providers()
            .map(|r| (r.kind.as_str(), r.available))
            .chain(self.sinks().map(|r| (r.kind.as_str(), r.available)));

        for (component, available) in components {
            events.publish(DomainEvent::ComponentProbed {
                component: component.to_string(),
                available,
                timestamp: self.probed_at,
            });
        }
    }
}

/// Key handles by kind. A repeated kind replaces the earlier entry.
fn by_kind<K: Ord + Copy + fmt::Display, T>(
    items: Vec<T>,
    kind_of: impl Fn(&T) -> K,
    what: &str,
) -> BTreeMap<K, T> {
    let mut map = BTreeMap::new();
    for item in items {
        let kind = kind_of(&item);
        if map.insert(kind, item).is_some() {
            warn!(kind = %kind, component = what, "Duplicate registration, keeping the later one");
        }
    }
    map
}

async fn check<F, E>(kind: &str, name: &str, probe: F, limit: Duration) -> bool
where
    F: Future<Output = Result<bool, E>>,
    E: fmt::Display,
{
    match run_isolated(probe, limit).await {
        Isolated::Completed(Ok(true)) => {
            debug!(kind, name, "Probe succeeded");
            true
        }
        Isolated::Completed(Ok(false)) => {
            warn!(kind, name, "Probe reported unavailable");
            false
        }
        Isolated::Completed(Err(e)) => {
            warn!(kind, name, error = %e, "Probe failed");
            false
        }
        Isolated::Panicked(msg) => {
            warn!(kind, name, panic = %msg, "Probe panicked");
            false
        }
        Isolated::TimedOut => {
            warn!(kind, name, timeout_ms = millis(limit), "Probe timed out");
            false
        }
    }
}
