//! Cancellation for superseded asynchronous work

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::ser::SerializeStruct;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Notify;

/// The operation was cancelled before its result could be applied.
///
/// Expected and recoverable; callers swallow it without logging. On the wire
/// it is the `{ "canceled": true }` sentinel.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation canceled")]
pub struct Cancelled;

impl Serialize for Cancelled {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Cancelled", 1)?;
        s.serialize_field("canceled", &true)?;
        s.end()
    }
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Shared cancellation flag with a wake-up signal
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Drive `fut` unless cancelled first.
    ///
    /// The flag is checked again after completion, so a result that races a
    /// cancellation is still reported as cancelled and never applied.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(Cancelled),
            out = fut => {
                if self.is_cancelled() {
                    Err(Cancelled)
                } else {
                    Ok(out)
                }
            }
        }
    }
}

/// Holds the token of the single outstanding operation of one kind.
///
/// Starting a new operation cancels the previous one.
#[derive(Default)]
pub struct CancelSlot {
    current: Mutex<Option<CancelToken>>,
}

impl CancelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel whatever is outstanding and hand out a fresh token
    pub fn replace(&self) -> CancelToken {
        let token = CancelToken::new();
        if let Some(previous) = self.current.lock().replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    pub fn cancel(&self) {
        if let Some(previous) = self.current.lock().take() {
            previous.cancel();
        }
    }
}
