//! The reachability monitor.

use std::cell::RefCell;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use access_core::logging::targets;
use access_core::signal::Signal;
use parking_lot::{ReentrantMutex, RwLock};

use super::backend::{FlagsCallback, ReachabilityBackend, ReachabilityHandle, Subscription};
use super::flags::{NetworkStatus, ReachabilityFlags};
use super::system::SystemBackend;
use super::target::ConnectionTarget;
use crate::error::Result;

/// Name of the process-wide change notification.
pub const REACHABILITY_CHANGED_NOTIFICATION: &str = "kAccessChangedNotification";

static REACHABILITY_CHANGED: OnceLock<Signal<Reachability>> = OnceLock::new();

/// The process-wide "reachability changed" notification.
///
/// Every started monitor emits this signal after its own callbacks whenever
/// its flags change. The payload is the monitor that fired.
///
/// ```ignore
/// use access_net::reachability::reachability_changed;
///
/// reachability_changed().connect(|monitor| {
///     println!("{} is now {}", monitor.target(), monitor.status_description());
/// });
/// ```
pub fn reachability_changed() -> &'static Signal<Reachability> {
    REACHABILITY_CHANGED.get_or_init(Signal::new)
}

type StatusHandler = Arc<dyn Fn(&Reachability) + Send + Sync>;
type FlagsHandler = Arc<dyn Fn(&Reachability, ReachabilityFlags) + Send + Sync>;

#[derive(Default)]
struct Handlers {
    reachable: Option<StatusHandler>,
    unreachable: Option<StatusHandler>,
    flags_changed: Option<FlagsHandler>,
}

#[derive(Default)]
struct NotifierState {
    /// Bumped on every start and stop; callbacks carry the value they were
    /// registered with and are ignored once it no longer matches.
    generation: u64,
    subscription: Option<Subscription>,
}

struct Inner {
    target: ConnectionTarget,
    handle: Arc<dyn ReachabilityHandle>,
    cellular_counts_as_reachable: AtomicBool,
    handlers: RwLock<Handlers>,
    /// Serialises start, stop and dispatch. Re-entrant so callbacks may call
    /// `stop`/`start` on their own monitor.
    notifier: ReentrantMutex<RefCell<NotifierState>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let subscription = self.notifier.get_mut().get_mut().subscription.take();
        if subscription.is_some() {
            tracing::debug!(target: targets::REACHABILITY, watched = %self.target, "monitor dropped while running, releasing subscription");
        }
    }
}

/// Watches whether a host, an address or the internet is reachable.
///
/// A `Reachability` is a cheap handle: clones share the same monitor, its
/// callbacks and its subscription. The subscription is released by
/// [`stop`](Self::stop) or when the last clone is dropped.
///
/// # Example
///
/// ```ignore
/// use access_net::reachability::Reachability;
///
/// let monitor = Reachability::for_host("example.com")?;
///
/// monitor.on_reachable(|m| println!("{} reachable via {}", m.target(), m.status()));
/// monitor.on_unreachable(|m| println!("{} unreachable", m.target()));
///
/// monitor.start()?;
/// ```
#[derive(Clone)]
pub struct Reachability {
    inner: Arc<Inner>,
}

impl Reachability {
    /// Start building a monitor with a custom backend or policy.
    pub fn builder() -> ReachabilityBuilder {
        ReachabilityBuilder::new()
    }

    /// Monitor a host name.
    pub fn for_host(hostname: &str) -> Result<Self> {
        Self::builder().for_host(hostname)
    }

    /// Monitor a socket address.
    pub fn for_address(addr: SocketAddr) -> Result<Self> {
        Self::builder().for_address(addr)
    }

    /// Monitor the default route (`0.0.0.0`).
    pub fn for_internet() -> Result<Self> {
        Self::builder().for_internet()
    }

    /// Monitor the link-local network (`169.254.0.0`).
    pub fn for_local_network() -> Result<Self> {
        Self::builder().for_local_network()
    }

    /// Wrap a handle that was already bound to `target`.
    pub fn with_handle(target: ConnectionTarget, handle: Arc<dyn ReachabilityHandle>) -> Self {
        Self::from_parts(target, handle, true)
    }

    /// One-shot check whether the internet is reachable right now.
    pub fn has_internet_connection() -> bool {
        Self::for_internet()
            .map(|monitor| monitor.is_reachable())
            .unwrap_or(false)
    }

    fn from_parts(
        target: ConnectionTarget,
        handle: Arc<dyn ReachabilityHandle>,
        cellular_counts_as_reachable: bool,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                target,
                handle,
                cellular_counts_as_reachable: AtomicBool::new(cellular_counts_as_reachable),
                handlers: RwLock::new(Handlers::default()),
                notifier: ReentrantMutex::new(RefCell::new(NotifierState::default())),
            }),
        }
    }

    /// The watched target.
    pub fn target(&self) -> &ConnectionTarget {
        &self.inner.target
    }

    /// Returns `true` if `other` is a clone of this monitor.
    pub fn is_same_monitor(&self, other: &Reachability) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ---------------------------------------------------------------------
    // Callbacks and policy
    // ---------------------------------------------------------------------

    /// Set the callback run when the target is (or becomes) reachable.
    pub fn on_reachable<F>(&self, handler: F)
    where
        F: Fn(&Reachability) + Send + Sync + 'static,
    {
        self.inner.handlers.write().reachable = Some(Arc::new(handler));
    }

    /// Set the callback run when the target is (or becomes) unreachable.
    pub fn on_unreachable<F>(&self, handler: F)
    where
        F: Fn(&Reachability) + Send + Sync + 'static,
    {
        self.inner.handlers.write().unreachable = Some(Arc::new(handler));
    }

    /// Set the callback run with the raw flags on every change event.
    pub fn on_flags_changed<F>(&self, handler: F)
    where
        F: Fn(&Reachability, ReachabilityFlags) + Send + Sync + 'static,
    {
        self.inner.handlers.write().flags_changed = Some(Arc::new(handler));
    }

    /// Remove all three callbacks.
    pub fn clear_handlers(&self) {
        *self.inner.handlers.write() = Handlers::default();
    }

    /// Whether a cellular route counts as reachable. Defaults to `true`.
    pub fn cellular_counts_as_reachable(&self) -> bool {
        self.inner.cellular_counts_as_reachable.load(Ordering::SeqCst)
    }

    /// Change the cellular policy. Takes effect on the next query or event.
    pub fn set_cellular_counts_as_reachable(&self, counts: bool) {
        self.inner
            .cellular_counts_as_reachable
            .store(counts, Ordering::SeqCst);
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Start delivering change events.
    ///
    /// Calling `start` on a running monitor does nothing. On success the
    /// current status is read once and the reachable or unreachable callback
    /// runs before this returns. On failure the monitor stays idle and
    /// synchronous queries keep working.
    pub fn start(&self) -> Result<()> {
        let guard = self.inner.notifier.lock();

        let generation = {
            let mut state = guard.borrow_mut();
            if state.subscription.is_some() {
                tracing::trace!(target: targets::REACHABILITY, watched = %self.inner.target, "notifier already running");
                return Ok(());
            }
            state.generation += 1;
            state.generation
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let callback: FlagsCallback = Arc::new(move |flags| {
            if let Some(inner) = weak.upgrade() {
                Reachability { inner }.dispatch_change(generation, flags);
            }
        });

        let subscription = match self.inner.handle.subscribe(callback) {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::warn!(target: targets::REACHABILITY, watched = %self.inner.target, error = %e, "failed to start notifier");
                return Err(e);
            }
        };
        guard.borrow_mut().subscription = Some(subscription);
        tracing::debug!(target: targets::REACHABILITY, watched = %self.inner.target, "notifier started");

        let status = self.status();
        self.notify_status(status);
        Ok(())
    }

    /// Stop delivering change events.
    ///
    /// Once this returns no callback of this monitor runs, even if the
    /// backend still delivers an event it had already queued. Does nothing
    /// when the monitor is idle.
    pub fn stop(&self) {
        let subscription = {
            let guard = self.inner.notifier.lock();
            let mut state = guard.borrow_mut();
            state.generation += 1;
            state.subscription.take()
        };

        if let Some(subscription) = subscription {
            drop(subscription);
            tracing::debug!(target: targets::REACHABILITY, watched = %self.inner.target, "notifier stopped");
        }
    }

    /// Check if change events are being delivered.
    pub fn is_running(&self) -> bool {
        self.inner.notifier.lock().borrow().subscription.is_some()
    }

    fn is_current(&self, generation: u64) -> bool {
        let guard = self.inner.notifier.lock();
        let state = guard.borrow();
        state.generation == generation && state.subscription.is_some()
    }

    fn dispatch_change(&self, generation: u64, flags: ReachabilityFlags) {
        let _guard = self.inner.notifier.lock();
        if !self.is_current(generation) {
            tracing::trace!(target: targets::REACHABILITY, watched = %self.inner.target, "dropping event for stopped notifier");
            return;
        }
        tracing::trace!(target: targets::REACHABILITY, watched = %self.inner.target, %flags, "reachability changed");

        let flags_handler = self.inner.handlers.read().flags_changed.clone();
        if let Some(handler) = flags_handler {
            handler(self, flags);
            if !self.is_current(generation) {
                return;
            }
        }

        let status = NetworkStatus::from_flags(flags, self.cellular_counts_as_reachable());
        self.notify_status(status);
        if !self.is_current(generation) {
            return;
        }

        reachability_changed().emit(self.clone());
    }

    fn notify_status(&self, status: NetworkStatus) {
        let handler = {
            let handlers = self.inner.handlers.read();
            if status.is_reachable() {
                handlers.reachable.clone()
            } else {
                handlers.unreachable.clone()
            }
        };
        if let Some(handler) = handler {
            handler(self);
        }
    }

    // ---------------------------------------------------------------------
    // Synchronous queries
    // ---------------------------------------------------------------------

    /// Read the current flags. Empty when the backend cannot provide them.
    pub fn flags(&self) -> ReachabilityFlags {
        self.inner.handle.flags().unwrap_or_default()
    }

    /// The current status under this monitor's cellular policy.
    pub fn status(&self) -> NetworkStatus {
        NetworkStatus::from_flags(self.flags(), self.cellular_counts_as_reachable())
    }

    /// Check if the target is reachable over any transport.
    pub fn is_reachable(&self) -> bool {
        self.status().is_reachable()
    }

    /// Check if the target is reachable over WiFi or another local transport.
    pub fn is_reachable_via_wifi(&self) -> bool {
        self.status() == NetworkStatus::ReachableViaWiFi
    }

    /// Check if the target is reachable over cellular.
    pub fn is_reachable_via_cellular(&self) -> bool {
        self.status() == NetworkStatus::ReachableViaCellular
    }

    /// A connection has to be established before traffic can flow.
    ///
    /// WWAN may be available but not active until a connection is made;
    /// WiFi may require a VPN-on-demand connection.
    pub fn is_connection_required(&self) -> bool {
        self.flags()
            .contains(ReachabilityFlags::CONNECTION_REQUIRED)
    }

    /// The required connection will be brought up automatically.
    pub fn is_connection_on_demand(&self) -> bool {
        let flags = self.flags();
        flags.contains(ReachabilityFlags::CONNECTION_REQUIRED)
            && flags.intersects(
                ReachabilityFlags::CONNECTION_ON_TRAFFIC | ReachabilityFlags::CONNECTION_ON_DEMAND,
            )
    }

    /// The required connection needs user action first.
    pub fn is_intervention_required(&self) -> bool {
        self.flags().contains(
            ReachabilityFlags::CONNECTION_REQUIRED | ReachabilityFlags::INTERVENTION_REQUIRED,
        )
    }

    /// Human-readable status: "WiFi", "Cellular" or "No Connection".
    pub fn status_description(&self) -> String {
        self.status().to_string()
    }

    /// Compact flag rendering, e.g. `"-R -------d"`.
    pub fn flags_description(&self) -> String {
        self.flags().to_string()
    }
}

impl fmt::Debug for Reachability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reachability")
            .field("target", &self.inner.target)
            .field("running", &self.is_running())
            .field(
                "cellular_counts_as_reachable",
                &self.cellular_counts_as_reachable(),
            )
            .finish()
    }
}

/// Builder for [`Reachability`] monitors.
///
/// ```ignore
/// use access_net::reachability::{Reachability, SimulatedBackend};
///
/// let monitor = Reachability::builder()
///     .backend(SimulatedBackend::new())
///     .cellular_counts_as_reachable(false)
///     .for_host("example.com")?;
/// ```
pub struct ReachabilityBuilder {
    backend: Arc<dyn ReachabilityBackend>,
    cellular_counts_as_reachable: bool,
}

impl Default for ReachabilityBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReachabilityBuilder {
    /// Start from the system backend with cellular counting as reachable.
    pub fn new() -> Self {
        Self {
            backend: Arc::new(SystemBackend::new()),
            cellular_counts_as_reachable: true,
        }
    }

    /// Use a different backend.
    pub fn backend<B>(mut self, backend: B) -> Self
    where
        B: ReachabilityBackend + 'static,
    {
        self.backend = Arc::new(backend);
        self
    }

    /// Use a shared backend.
    pub fn shared_backend(mut self, backend: Arc<dyn ReachabilityBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Initial cellular policy.
    pub fn cellular_counts_as_reachable(mut self, counts: bool) -> Self {
        self.cellular_counts_as_reachable = counts;
        self
    }

    /// Monitor a host name.
    pub fn for_host(self, hostname: &str) -> Result<Reachability> {
        self.for_target(ConnectionTarget::Host(hostname.to_string()))
    }

    /// Monitor a socket address.
    pub fn for_address(self, addr: SocketAddr) -> Result<Reachability> {
        self.for_target(ConnectionTarget::Address(addr))
    }

    /// Monitor the default route.
    pub fn for_internet(self) -> Result<Reachability> {
        self.for_target(ConnectionTarget::internet())
    }

    /// Monitor the link-local network.
    pub fn for_local_network(self) -> Result<Reachability> {
        self.for_target(ConnectionTarget::local_network())
    }

    /// Monitor any target.
    pub fn for_target(self, target: ConnectionTarget) -> Result<Reachability> {
        let handle = self.backend.open(&target)?;
        tracing::debug!(target: targets::REACHABILITY, watched = %target, "created reachability monitor");
        Ok(Reachability::from_parts(
            target,
            handle,
            self.cellular_counts_as_reachable,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reachability::SimulatedHandle;
    use parking_lot::Mutex;

    fn monitor() -> (Reachability, Arc<SimulatedHandle>) {
        let handle = Arc::new(SimulatedHandle::new());
        let monitor = Reachability::with_handle(
            ConnectionTarget::internet(),
            Arc::clone(&handle) as Arc<dyn ReachabilityHandle>,
        );
        (monitor, handle)
    }

    #[test]
    fn stop_inside_callback_skips_rest_of_dispatch() {
        let (monitor, handle) = monitor();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let calls_clone = Arc::clone(&calls);
        monitor.on_flags_changed(move |m, _| {
            calls_clone.lock().push("flags");
            m.stop();
        });
        let calls_clone = Arc::clone(&calls);
        monitor.on_reachable(move |_| calls_clone.lock().push("reachable"));

        monitor.start().unwrap();
        calls.lock().clear();

        handle.change_flags(ReachabilityFlags::REACHABLE);
        assert_eq!(*calls.lock(), vec!["flags"]);
        assert!(!monitor.is_running());
        assert_eq!(handle.active_subscriptions(), 0);
    }

    #[test]
    fn handler_may_replace_handlers() {
        let (monitor, handle) = monitor();
        let count = Arc::new(Mutex::new(0));

        monitor.start().unwrap();

        let count_clone = Arc::clone(&count);
        monitor.on_unreachable(move |m| {
            *count_clone.lock() += 1;
            m.clear_handlers();
        });

        handle.change_flags(ReachabilityFlags::empty());
        handle.change_flags(ReachabilityFlags::empty());
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn restart_after_stop_registers_again() {
        let (monitor, handle) = monitor();
        monitor.start().unwrap();
        monitor.stop();
        monitor.start().unwrap();
        assert!(monitor.is_running());
        assert_eq!(handle.active_subscriptions(), 1);
    }

    #[test]
    fn debug_output_names_target() {
        let (monitor, _handle) = monitor();
        let debug = format!("{monitor:?}");
        assert!(debug.contains("0.0.0.0"));
        assert!(debug.contains("running: false"));
    }
}
