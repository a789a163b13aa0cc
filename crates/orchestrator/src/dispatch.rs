//! Fire-and-forget sink dispatch.
//!
//! Once a result is built it is handed to every available sink on a detached
//! task. Publishes run concurrently and never retry. Their outcomes are only
//! logged and published as `SinkDispatched` events.

use futures::future::join_all;
use orus_core::{AggregatedResult, DomainEvent, EventBus, SinkDispatchOutcome, SinkError, SinkPublisher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::isolation::{Isolated, millis, run_isolated};

/// Counts detached dispatches so shutdown can wait for them.
#[derive(Clone, Default)]
pub struct DispatchTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Default)]
struct TrackerInner {
    in_flight: AtomicUsize,
    idle: Notify,
}

impl DispatchTracker {
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Resolve once no dispatch is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register before reading the counter so a wake-up in between is not lost
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn begin(&self) -> DispatchGuard {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        DispatchGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Decrements the in-flight count however the dispatch task ends.
struct DispatchGuard {
    inner: Arc<TrackerInner>,
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

/// Each sink paired with its own publish deadline.
pub(crate) struct SinkDispatcher {
    sinks: Vec<(Arc<dyn SinkPublisher>, Duration)>,
    tracker: DispatchTracker,
}

impl SinkDispatcher {
    pub(crate) fn new(sinks: Vec<(Arc<dyn SinkPublisher>, Duration)>) -> Self {
        Self {
            sinks,
            tracker: DispatchTracker::default(),
        }
    }

    pub(crate) fn tracker(&self) -> &DispatchTracker {
        &self.tracker
    }

    /// Start publishing `result` to every sink and return immediately.
    pub(crate) fn dispatch(&self, result: Arc<AggregatedResult>, events: EventBus) {
        if self.sinks.is_empty() {
            return;
        }

        let guard = self.tracker.begin();
        let sinks = self.sinks.clone();

        tokio::spawn(async move {
            let _guard = guard;
            let outcomes = join_all(
                sinks
                    .iter()
                    .map(|(sink, limit)| publish_one(sink.as_ref(), &result, *limit)),
            )
            .await;
            for outcome in outcomes {
                events.publish(DomainEvent::SinkDispatched(outcome));
            }
        });
    }
}

async fn publish_one(sink: &dyn SinkPublisher, result: &AggregatedResult, limit: Duration) -> SinkDispatchOutcome {
    let query = result.query();
    let started = Instant::now();

    let outcome = match run_isolated(sink.publish(query, result), limit).await {
        Isolated::Completed(r) => r,
        Isolated::Panicked(msg) => Err(SinkError::Panicked(msg)),
        Isolated::TimedOut => Err(SinkError::Timeout {
            after_ms: millis(limit),
        }),
    };
    let elapsed_ms = millis(started.elapsed());

    match &outcome {
        Ok(()) => info!(sink = %sink.name(), query_id = %query.id, elapsed_ms, "Sink publish succeeded"),
        Err(e) => warn!(sink = %sink.name(), query_id = %query.id, elapsed_ms, error = %e, "Sink publish failed"),
    }

    SinkDispatchOutcome::from_result(sink.kind(), query.id.clone(), &outcome, elapsed_ms)
}
