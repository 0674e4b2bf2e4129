//! Signal/slot system for Horizon Bind.
//!
//! Signals are the event sink of the selection and validation engines. When a
//! component changes state it emits a signal and every connected slot is
//! invoked synchronously, in the emitting thread, before `emit` returns.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - Notification signal, slots observe but cannot veto
//! - [`CancelableSignal<Args>`] - "before" signal whose slots may veto the
//!   operation that is about to happen
//! - [`ConnectionId`] - Unique identifier returned when connecting a slot
//!
//! # Example
//!
//! ```
//! use horizon_bind_core::{CancelableSignal, Propagation, Signal};
//!
//! let after = Signal::<String>::new();
//! after.connect(|text| println!("selected {text}"));
//! after.emit("item-1".to_string());
//!
//! let before = CancelableSignal::<String>::new();
//! before.connect(|text| {
//!     if text.starts_with("locked") {
//!         Propagation::Cancel
//!     } else {
//!         Propagation::Continue
//!     }
//! });
//! assert!(before.emit("item-2".to_string()));
//! assert!(!before.emit("locked-3".to_string()));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via [`Signal::disconnect`]
    /// or [`CancelableSignal::disconnect`].
    pub struct ConnectionId;
}

/// Connection table shared by both signal kinds.
struct Slots<F: ?Sized> {
    table: Mutex<SlotMap<ConnectionId, Arc<F>>>,
    blocked: AtomicBool,
}

impl<F: ?Sized> Slots<F> {
    fn new() -> Self {
        Self {
            table: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    fn insert(&self, slot: Arc<F>) -> ConnectionId {
        self.table.lock().insert(slot)
    }

    fn remove(&self, id: ConnectionId) -> bool {
        self.table.lock().remove(id).is_some()
    }

    fn clear(&self) {
        self.table.lock().clear();
    }

    fn len(&self) -> usize {
        self.table.lock().len()
    }

    /// Copies the current slots so they can run without the lock held.
    fn snapshot(&self) -> Vec<Arc<F>> {
        self.table.lock().values().cloned().collect()
    }
}

/// A notification signal.
///
/// `Args` is passed by reference to every slot; use `()` for signals without
/// data and a tuple for several values.
///
/// Slots run in connection order. The table is copied before they run, so a
/// slot may connect or disconnect (itself included) during an emission; the
/// change applies from the next emission on.
pub struct Signal<Args> {
    slots: Slots<dyn Fn(&Args) + Send + Sync>,
}

impl<Args: Clone + Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Clone + Send + 'static> Signal<Args> {
    /// Creates a signal without slots.
    pub fn new() -> Self {
        Self {
            slots: Slots::new(),
        }
    }

    /// Connects a slot and returns its connection id.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.slots.insert(Arc::new(slot))
    }

    /// Disconnects a slot. Returns `false` if it was not connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.slots.remove(id)
    }

    /// Disconnects every slot.
    pub fn disconnect_all(&self) {
        self.slots.clear();
    }

    /// Number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.slots.len()
    }

    /// Blocks or unblocks the signal. A blocked signal ignores `emit`.
    pub fn set_blocked(&self, blocked: bool) {
        self.slots.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Whether the signal is blocked.
    pub fn is_blocked(&self) -> bool {
        self.slots.blocked.load(Ordering::SeqCst)
    }

    /// Invokes every connected slot with `args`.
    #[tracing::instrument(skip_all, target = "horizon_bind_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "blocked, emit ignored");
            return;
        }
        let slots = self.slots.snapshot();
        tracing::trace!(target: targets::SIGNAL, slots = slots.len(), "emit");
        for slot in slots {
            slot(&args);
        }
    }
}

/// What a slot of a [`CancelableSignal`] decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Let the pending operation proceed.
    #[default]
    Continue,
    /// Veto the pending operation.
    Cancel,
}

/// A "before" signal whose slots can veto the operation being announced.
///
/// Emission stops at the first slot that returns [`Propagation::Cancel`].
/// A blocked signal never vetoes.
pub struct CancelableSignal<Args> {
    slots: Slots<dyn Fn(&Args) -> Propagation + Send + Sync>,
}

impl<Args: Clone + Send + 'static> Default for CancelableSignal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Clone + Send + 'static> CancelableSignal<Args> {
    /// Creates a signal without slots.
    pub fn new() -> Self {
        Self {
            slots: Slots::new(),
        }
    }

    /// Connects a slot that decides whether the operation may proceed.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) -> Propagation + Send + Sync + 'static,
    {
        self.slots.insert(Arc::new(slot))
    }

    /// Disconnects a slot. Returns `false` if it was not connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.slots.remove(id)
    }

    /// Disconnects every slot.
    pub fn disconnect_all(&self) {
        self.slots.clear();
    }

    /// Number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.slots.len()
    }

    /// Blocks or unblocks the signal.
    pub fn set_blocked(&self, blocked: bool) {
        self.slots.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Whether the signal is blocked.
    pub fn is_blocked(&self) -> bool {
        self.slots.blocked.load(Ordering::SeqCst)
    }

    /// Asks every slot in turn. Returns `false` as soon as one vetoes.
    #[tracing::instrument(skip_all, target = "horizon_bind_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) -> bool {
        if self.is_blocked() {
            return true;
        }
        let vetoed = self
            .slots
            .snapshot()
            .into_iter()
            .any(|slot| slot(&args) == Propagation::Cancel);
        if vetoed {
            tracing::debug!(target: targets::SIGNAL, "vetoed by slot");
        }
        !vetoed
    }
}

static_assertions::assert_impl_all!(Signal<()>: Send, Sync);
static_assertions::assert_impl_all!(CancelableSignal<()>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_signal_connect_emit() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(42);
        signal.emit(100);

        let values = received.lock();
        assert_eq!(*values, vec![42, 100]);
    }

    #[test]
    fn test_signal_disconnect() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        let conn_id = signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(1);
        assert!(signal.disconnect(conn_id));
        assert!(!signal.disconnect(conn_id));
        signal.emit(2);

        assert_eq!(*received.lock(), vec![1]);
    }

    #[test]
    fn test_signal_blocked() {
        let signal = Signal::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.lock().push(value);
        });

        signal.emit(1);
        signal.set_blocked(true);
        signal.emit(2);
        signal.set_blocked(false);
        signal.emit(3);

        assert_eq!(*received.lock(), vec![1, 3]);
    }

    #[test]
    fn test_slot_may_disconnect_during_emit() {
        let signal = Arc::new(Signal::<()>::new());
        let count = Arc::new(AtomicUsize::new(0));
        let id_cell: Arc<Mutex<Option<ConnectionId>>> = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&signal);
        let count_clone = count.clone();
        let id_clone = id_cell.clone();
        let id = signal.connect(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
            if let (Some(signal), Some(id)) = (weak.upgrade(), *id_clone.lock()) {
                signal.disconnect(id);
            }
        });
        *id_cell.lock() = Some(id);

        signal.emit(());
        signal.emit(());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_cancelable_signal_veto() {
        let signal = CancelableSignal::<i32>::new();
        signal.connect(|&n| {
            if n < 0 {
                Propagation::Cancel
            } else {
                Propagation::Continue
            }
        });

        assert!(signal.emit(5));
        assert!(!signal.emit(-1));
    }

    #[test]
    fn test_cancelable_signal_stops_at_first_veto() {
        let signal = CancelableSignal::<()>::new();
        let later_calls = Arc::new(AtomicUsize::new(0));

        signal.connect(|_| Propagation::Cancel);
        let later = later_calls.clone();
        signal.connect(move |_| {
            later.fetch_add(1, Ordering::SeqCst);
            Propagation::Continue
        });

        assert!(!signal.emit(()));
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_blocked_cancelable_signal_never_vetoes() {
        let signal = CancelableSignal::<()>::new();
        signal.connect(|_| Propagation::Cancel);
        signal.set_blocked(true);
        assert!(signal.emit(()));
    }

    #[test]
    fn test_cancelable_signal_without_slots_proceeds() {
        let signal = CancelableSignal::<String>::new();
        assert_eq!(signal.connection_count(), 0);
        assert!(signal.emit("anything".into()));
    }
}
