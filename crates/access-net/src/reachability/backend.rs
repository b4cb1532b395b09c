//! The seam between a monitor and the platform's reachability facility.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use access_core::logging::targets;
use parking_lot::Mutex;

use super::flags::ReachabilityFlags;
use super::target::ConnectionTarget;
use crate::error::Result;

/// Callback invoked by a handle whenever the target's flags change.
pub type FlagsCallback = Arc<dyn Fn(ReachabilityFlags) + Send + Sync>;

/// Produces reachability handles for connection targets.
pub trait ReachabilityBackend: Send + Sync {
    /// Bind a handle to `target`.
    ///
    /// Fails with [`NetworkError::Resolution`](crate::NetworkError::Resolution)
    /// when the target cannot be watched at all.
    fn open(&self, target: &ConnectionTarget) -> Result<Arc<dyn ReachabilityHandle>>;
}

/// A handle bound to one connection target.
pub trait ReachabilityHandle: Send + Sync {
    /// Read the current flags. `None` when they cannot be obtained.
    fn flags(&self) -> Option<ReachabilityFlags>;

    /// Register `on_change` for flag changes.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// dropped. Implementations must not invoke callbacks of one subscription
    /// concurrently.
    fn subscribe(&self, on_change: FlagsCallback) -> Result<Subscription>;
}

/// RAII registration of a change callback. Dropping it unregisters.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Create a subscription that runs `release` when dropped.
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Create a subscription whose `release` waits for the thread that
    /// delivers its callbacks to finish.
    ///
    /// Such a release cannot run on the delivery thread itself, which is
    /// where a callback stopping its own monitor drops the subscription.
    /// When dropped there, `release` is handed to a detached thread instead.
    pub fn joining<F>(delivery: DeliveryThread, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::new(move || {
            if !delivery.is_current() {
                release();
                return;
            }

            tracing::debug!(target: targets::BACKEND, "subscription dropped on its delivery thread, releasing in background");
            let pending = Arc::new(Mutex::new(Some(release)));
            let pending_clone = Arc::clone(&pending);
            let spawned = thread::Builder::new()
                .name("access-release".to_string())
                .spawn(move || {
                    if let Some(release) = pending_clone.lock().take() {
                        release();
                    }
                });
            if let Err(e) = spawned {
                // Running it here would never return.
                if let Some(release) = pending.lock().take() {
                    std::mem::forget(release);
                }
                tracing::warn!(target: targets::BACKEND, error = %e, "could not spawn release thread, leaking subscription");
            }
        })
    }
}

/// Remembers which thread a handle delivers change callbacks on.
///
/// Call [`mark`](Self::mark) at the top of the change callback and pass a
/// clone to [`Subscription::joining`].
#[derive(Debug, Clone, Default)]
pub struct DeliveryThread {
    id: Arc<Mutex<Option<ThreadId>>>,
}

impl DeliveryThread {
    /// Create a tracker that has not seen a delivery yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the calling thread as the delivery thread.
    pub fn mark(&self) {
        *self.id.lock() = Some(thread::current().id());
    }

    /// Whether the calling thread is the last recorded delivery thread.
    pub fn is_current(&self) -> bool {
        *self.id.lock() == Some(thread::current().id())
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}
