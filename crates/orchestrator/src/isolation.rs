//! Timeout and panic containment shared by probes, provider calls and sink
//! publishes.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

pub(crate) enum Isolated<T> {
    Completed(T),
    Panicked(String),
    TimedOut,
}

/// Drive `fut` to completion unless it panics or outlives `limit`.
pub(crate) async fn run_isolated<F: Future>(fut: F, limit: Duration) -> Isolated<F::Output> {
    match tokio::time::timeout(limit, AssertUnwindSafe(fut).catch_unwind()).await {
        Ok(Ok(value)) => Isolated::Completed(value),
        Ok(Err(payload)) => Isolated::Panicked(panic_message(payload.as_ref())),
        Err(_) => Isolated::TimedOut,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
