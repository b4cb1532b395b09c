//! In-process backend whose flags and change events are driven by the caller.
//!
//! Useful for tests and for embedders that receive reachability information
//! from somewhere other than the local interface table.
//!
//! ```
//! use access_net::reachability::{
//!     ConnectionTarget, Reachability, ReachabilityFlags, SimulatedBackend,
//! };
//!
//! let backend = SimulatedBackend::new();
//! let monitor = Reachability::builder()
//!     .backend(backend.clone())
//!     .for_internet()
//!     .unwrap();
//!
//! let handle = backend.handle(&ConnectionTarget::internet()).unwrap();
//! handle.set_flags(ReachabilityFlags::REACHABLE);
//! assert!(monitor.is_reachable_via_wifi());
//! ```

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::backend::{FlagsCallback, ReachabilityBackend, ReachabilityHandle, Subscription};
use super::flags::ReachabilityFlags;
use super::target::ConnectionTarget;
use crate::error::{NetworkError, Result};

/// A backend handing out [`SimulatedHandle`]s, one per target.
#[derive(Clone, Default)]
pub struct SimulatedBackend {
    state: Arc<Mutex<BackendState>>,
}

#[derive(Default)]
struct BackendState {
    handles: HashMap<ConnectionTarget, Arc<SimulatedHandle>>,
    unresolvable: HashSet<String>,
}

impl SimulatedBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `open` fail with a resolution error for host `name`.
    pub fn reject_host(&self, name: impl Into<String>) {
        self.state.lock().unresolvable.insert(name.into());
    }

    /// The handle opened for `target`, if any.
    pub fn handle(&self, target: &ConnectionTarget) -> Option<Arc<SimulatedHandle>> {
        self.state.lock().handles.get(target).cloned()
    }
}

impl ReachabilityBackend for SimulatedBackend {
    fn open(&self, target: &ConnectionTarget) -> Result<Arc<dyn ReachabilityHandle>> {
        let mut state = self.state.lock();
        if let Some(name) = target.host() {
            if state.unresolvable.contains(name) {
                return Err(NetworkError::resolution(name, "host rejected by simulated backend"));
            }
        }

        let handle = state
            .handles
            .entry(target.clone())
            .or_insert_with(|| Arc::new(SimulatedHandle::new()));
        Ok(Arc::clone(handle) as Arc<dyn ReachabilityHandle>)
    }
}

/// Released callbacks kept for [`SimulatedHandle::deliver_late`].
const RELEASED_BACKLOG: usize = 8;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    active: BTreeMap<u64, FlagsCallback>,
    /// Most recently released callbacks, oldest first.
    released: VecDeque<FlagsCallback>,
}

impl Subscribers {
    fn release(&mut self, id: u64) {
        if let Some(callback) = self.active.remove(&id) {
            if self.released.len() == RELEASED_BACKLOG {
                self.released.pop_front();
            }
            self.released.push_back(callback);
        }
    }
}

/// A handle whose flags are set by the caller.
pub struct SimulatedHandle {
    flags: Mutex<Option<ReachabilityFlags>>,
    subscribers: Arc<Mutex<Subscribers>>,
    fail_registration: AtomicBool,
}

impl Default for SimulatedHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedHandle {
    /// Create a handle with empty flags.
    pub fn new() -> Self {
        Self {
            flags: Mutex::new(Some(ReachabilityFlags::empty())),
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
            fail_registration: AtomicBool::new(false),
        }
    }

    /// Replace the current flags without notifying subscribers.
    pub fn set_flags(&self, flags: ReachabilityFlags) {
        *self.flags.lock() = Some(flags);
    }

    /// Make flag reads fail until the next `set_flags`/`change_flags`.
    pub fn set_unreadable(&self) {
        *self.flags.lock() = None;
    }

    /// Replace the current flags and notify active subscribers.
    pub fn change_flags(&self, flags: ReachabilityFlags) {
        self.set_flags(flags);
        let callbacks: Vec<FlagsCallback> =
            self.subscribers.lock().active.values().cloned().collect();
        for callback in callbacks {
            callback(flags);
        }
    }

    /// Deliver `flags` to active subscribers and to recently released ones,
    /// as an OS that is slow to stop firing would.
    ///
    /// Each released callback receives at most one late event; the most
    /// recent few releases are remembered.
    pub fn deliver_late(&self, flags: ReachabilityFlags) {
        let callbacks: Vec<FlagsCallback> = {
            let mut subscribers = self.subscribers.lock();
            let mut callbacks: Vec<FlagsCallback> = subscribers.released.drain(..).collect();
            callbacks.extend(subscribers.active.values().cloned());
            callbacks
        };
        for callback in callbacks {
            callback(flags);
        }
    }

    /// Make subsequent `subscribe` calls fail.
    pub fn fail_registration(&self, fail: bool) {
        self.fail_registration.store(fail, Ordering::SeqCst);
    }

    /// Number of subscriptions that have not been released.
    pub fn active_subscriptions(&self) -> usize {
        self.subscribers.lock().active.len()
    }

    /// Number of released callbacks still waiting for a late delivery.
    pub fn pending_late_deliveries(&self) -> usize {
        self.subscribers.lock().released.len()
    }
}

impl ReachabilityHandle for SimulatedHandle {
    fn flags(&self) -> Option<ReachabilityFlags> {
        *self.flags.lock()
    }

    fn subscribe(&self, on_change: FlagsCallback) -> Result<Subscription> {
        if self.fail_registration.load(Ordering::SeqCst) {
            return Err(NetworkError::Registration(
                "simulated registration failure".to_string(),
            ));
        }

        let id = {
            let mut subscribers = self.subscribers.lock();
            let id = subscribers.next_id;
            subscribers.next_id += 1;
            subscribers.active.insert(id, on_change);
            id
        };

        let subscribers: Weak<Mutex<Subscribers>> = Arc::downgrade(&self.subscribers);
        Ok(Subscription::new(move || {
            if let Some(subscribers) = subscribers.upgrade() {
                subscribers.lock().release(id);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn same_target_shares_handle() {
        let backend = SimulatedBackend::new();
        let target = ConnectionTarget::Host("example.com".into());
        backend.open(&target).unwrap();
        backend.open(&target).unwrap();

        let handle = backend.handle(&target).unwrap();
        handle.set_flags(ReachabilityFlags::REACHABLE);
        let reopened = backend.open(&target).unwrap();
        assert_eq!(reopened.flags(), Some(ReachabilityFlags::REACHABLE));
    }

    #[test]
    fn rejected_host_fails_to_open() {
        let backend = SimulatedBackend::new();
        backend.reject_host("nowhere.invalid");
        let result = backend.open(&ConnectionTarget::Host("nowhere.invalid".into()));
        assert!(matches!(result, Err(NetworkError::Resolution { .. })));
    }

    #[test]
    fn released_subscription_only_sees_late_delivery() {
        let handle = SimulatedHandle::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let subscription = handle
            .subscribe(Arc::new(move |_| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        handle.change_flags(ReachabilityFlags::REACHABLE);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        drop(subscription);
        assert_eq!(handle.active_subscriptions(), 0);
        handle.change_flags(ReachabilityFlags::empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        handle.deliver_late(ReachabilityFlags::empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // a late event reaches a released callback only once
        handle.deliver_late(ReachabilityFlags::empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn released_subscriptions_are_not_retained() {
        let handle = SimulatedHandle::new();
        for _ in 0..1000 {
            let subscription = handle.subscribe(Arc::new(|_| {})).unwrap();
            drop(subscription);
        }

        assert_eq!(handle.active_subscriptions(), 0);
        assert_eq!(handle.pending_late_deliveries(), RELEASED_BACKLOG);

        handle.deliver_late(ReachabilityFlags::REACHABLE);
        assert_eq!(handle.pending_late_deliveries(), 0);
    }

    #[test]
    fn subscription_outliving_handle_releases_quietly() {
        let handle = SimulatedHandle::new();
        let subscription = handle.subscribe(Arc::new(|_| {})).unwrap();
        drop(handle);
        drop(subscription);
    }

    #[test]
    fn unreadable_flags() {
        let handle = SimulatedHandle::new();
        handle.set_unreadable();
        assert_eq!(handle.flags(), None);
        handle.set_flags(ReachabilityFlags::IS_DIRECT);
        assert_eq!(handle.flags(), Some(ReachabilityFlags::IS_DIRECT));
    }
}
