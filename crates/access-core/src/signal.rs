//! Broadcast callbacks for Access.
//!
//! A [`Signal`] fans one value out to every connected callback. The
//! reachability crate uses a single process-wide `Signal<Reachability>` so
//! that code which does not own a monitor still hears about every change.
//!
//! Callbacks run on the thread that calls [`Signal::emit`]. Reachability
//! changes arrive on whatever thread the platform delivers them on, which is
//! why callbacks must be `Send + Sync`.
//!
//! `emit` copies the callback list and drops the lock before calling anything,
//! so a callback may connect or disconnect (itself included) mid-emission.
//! Such edits apply from the following `emit`.
//!
//! ```
//! use access_core::Signal;
//!
//! let link_changed = Signal::<&'static str>::new();
//!
//! let id = link_changed.connect(|link| println!("now on {link}"));
//! link_changed.emit("WiFi");
//!
//! link_changed.disconnect(id);
//! link_changed.emit("Cellular"); // nobody listening
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// Key of one connected callback, handed back by [`Signal::connect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A list of callbacks that all receive each emitted `Args`.
///
/// Safe to share across threads and to keep in a `static`.
pub struct Signal<Args> {
    slots: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
    /// While set, `emit` returns without calling anything.
    muted: AtomicBool,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// An empty signal.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(SlotMap::with_key()),
            muted: AtomicBool::new(false),
        }
    }

    /// Add `slot`; it stays connected until [`disconnect`](Self::disconnect).
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let mut slots = self.slots.lock();
        slots.insert(Arc::new(slot))
    }

    /// Remove the callback behind `id`. `false` if it was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let removed = self.slots.lock().remove(id);
        removed.is_some()
    }

    /// Remove every callback.
    pub fn disconnect_all(&self) {
        let mut slots = self.slots.lock();
        slots.clear();
    }

    pub fn connection_count(&self) -> usize {
        let slots = self.slots.lock();
        slots.len()
    }

    /// Mute or unmute the signal.
    pub fn set_blocked(&self, blocked: bool) {
        self.muted.store(blocked, Ordering::SeqCst);
    }

    pub fn is_blocked(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    /// Call every connected callback with `args`, oldest connection first.
    #[tracing::instrument(skip_all, target = "access_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.muted.load(Ordering::SeqCst) {
            tracing::trace!(target: targets::SIGNAL, "signal muted, nothing emitted");
            return;
        }

        let snapshot: Vec<Slot<Args>> = self.slots.lock().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, slots = snapshot.len(), "emitting");

        for slot in &snapshot {
            slot(&args);
        }
    }

    /// Like [`connect`](Self::connect), but the callback is removed when the
    /// returned guard goes out of scope.
    ///
    /// ```
    /// use access_core::Signal;
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    ///
    /// let went_offline = Signal::<()>::new();
    /// let seen = Arc::new(AtomicUsize::new(0));
    ///
    /// let seen_in_slot = Arc::clone(&seen);
    /// let guard = went_offline.connect_scoped(move |_| {
    ///     seen_in_slot.fetch_add(1, Ordering::SeqCst);
    /// });
    /// went_offline.emit(());
    /// drop(guard);
    /// went_offline.emit(());
    ///
    /// assert_eq!(seen.load(Ordering::SeqCst), 1);
    /// ```
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<'_, Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        ConnectionGuard {
            id: self.connect(slot),
            signal: self,
        }
    }
}

/// Disconnects its callback on drop. See [`Signal::connect_scoped`].
///
/// Borrows the signal, so a guard on a `static` signal is itself `'static`.
pub struct ConnectionGuard<'a, Args: 'static> {
    signal: &'a Signal<Args>,
    id: ConnectionId,
}

impl<Args: 'static> ConnectionGuard<'_, Args> {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args: 'static> Drop for ConnectionGuard<'_, Args> {
    fn drop(&mut self) {
        self.signal.disconnect(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Link {
        Offline,
        WiFi,
        Cellular,
    }

    fn collector(signal: &Signal<Link>) -> (ConnectionId, Arc<Mutex<Vec<Link>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = signal.connect(move |link: &Link| sink.lock().push(*link));
        (id, seen)
    }

    #[test]
    fn every_listener_sees_each_change_in_order() {
        let changes = Signal::new();
        let (_, first) = collector(&changes);
        let (_, second) = collector(&changes);

        changes.emit(Link::WiFi);
        changes.emit(Link::Offline);

        assert_eq!(*first.lock(), [Link::WiFi, Link::Offline]);
        assert_eq!(*second.lock(), [Link::WiFi, Link::Offline]);
    }

    #[test]
    fn disconnected_listener_misses_later_changes() {
        let changes = Signal::new();
        let (id, seen) = collector(&changes);

        changes.emit(Link::Cellular);
        assert!(changes.disconnect(id));
        changes.emit(Link::WiFi);

        assert!(!changes.disconnect(id), "second disconnect finds nothing");
        assert_eq!(*seen.lock(), [Link::Cellular]);
    }

    #[test]
    fn muted_signal_drops_changes() {
        let changes = Signal::new();
        let (_, seen) = collector(&changes);

        changes.set_blocked(true);
        assert!(changes.is_blocked());
        changes.emit(Link::Offline);
        changes.set_blocked(false);
        changes.emit(Link::WiFi);

        assert_eq!(*seen.lock(), [Link::WiFi]);
    }

    #[test]
    fn disconnect_all_leaves_no_listeners() {
        let changes = Signal::<Link>::new();
        let (_, seen) = collector(&changes);
        changes.connect(|_| {});
        assert_eq!(changes.connection_count(), 2);

        changes.disconnect_all();
        changes.emit(Link::WiFi);

        assert_eq!(changes.connection_count(), 0);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn scoped_listener_ends_with_its_guard() {
        let changes = Signal::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let guard = changes.connect_scoped(move |link: &Link| sink.lock().push(*link));
        assert_eq!(changes.connection_count(), 1);
        changes.emit(Link::Cellular);
        drop(guard);
        changes.emit(Link::Offline);

        assert_eq!(*seen.lock(), [Link::Cellular]);
        assert_eq!(changes.connection_count(), 0);
    }

    #[test]
    fn one_shot_listener_removes_itself_mid_emit() {
        let changes = Arc::new(Signal::new());
        let own_id: Arc<Mutex<Option<ConnectionId>>> = Arc::default();
        let hits = Arc::new(Mutex::new(0));

        let id = changes.connect({
            let changes = Arc::clone(&changes);
            let own_id = Arc::clone(&own_id);
            let hits = Arc::clone(&hits);
            move |_: &Link| {
                *hits.lock() += 1;
                if let Some(id) = own_id.lock().take() {
                    changes.disconnect(id);
                }
            }
        });
        *own_id.lock() = Some(id);

        changes.emit(Link::WiFi);
        changes.emit(Link::Offline);

        assert_eq!(*hits.lock(), 1);
        assert_eq!(changes.connection_count(), 0);
    }
}
