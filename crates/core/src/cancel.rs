//! Caller-level cancellation for an in-flight orchestration.
//!
//! Built on `tokio::sync::watch` so any number of provider tasks can wait on
//! the same signal. Once fired, a signal stays fired.

use tokio::sync::watch;

/// The sending half. Fire with [`CancelHandle::cancel`].
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

/// The receiving half, cloned into every provider task.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

impl CancelHandle {
    /// Create a linked handle/signal pair.
    pub fn new() -> (Self, CancelSignal) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, CancelSignal { receiver })
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_sender, receiver) = watch::channel(false);
        Self { receiver }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the signal fires. Pends forever if the handle is dropped
    /// without firing.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.receiver.borrow_and_update() {
                return;
            }
            if self.receiver.changed().await.is_err() {
                if *self.receiver.borrow() {
                    return;
                }
                std::future::pending::<()>().await;
            }
        }
    }
}
