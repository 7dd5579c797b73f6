//! Cancellation utilities
//!
//! Provides a first-class cancellation handle observed at every suspension
//! point of a poll loop: the awaited sleep, the blocking sleep and the vendor
//! call itself.

use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::defaults;

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Poll loops observing this handle stop at their
    /// next suspension point and report `JobError::Cancelled`.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// A handle cancelled together with this one, but cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }
}

/// Create a standalone cancel handle that can be shared across tasks.
pub fn new_cancel_handle() -> CancelHandle {
    CancelHandle::new()
}

/// Sleep for `duration` unless cancelled first. Returns `false` on cancellation.
pub async fn sleep_or_cancel(duration: Duration, cancel: Option<&CancelHandle>) -> bool {
    match cancel {
        None => {
            tokio::time::sleep(duration).await;
            true
        }
        Some(handle) => {
            tokio::select! {
                biased;
                _ = handle.cancelled() => false,
                _ = tokio::time::sleep(duration) => true,
            }
        }
    }
}

/// Blocking counterpart of [`sleep_or_cancel`]; checks the handle every slice.
pub fn blocking_sleep_or_cancel(duration: Duration, cancel: Option<&CancelHandle>) -> bool {
    let Some(handle) = cancel else {
        std::thread::sleep(duration);
        return true;
    };
    let deadline = Instant::now() + duration;
    loop {
        if handle.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(defaults::poll::BLOCKING_SLICE));
    }
}
