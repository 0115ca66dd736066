//! Synchronous change notification.
//!
//! A [`Signal`] holds the callbacks (slots) interested in one kind of change.
//! Views and sources own one signal per notification they publish; consumers
//! connect closures and keep the returned [`ConnectionId`] to disconnect
//! later.
//!
//! Slots run inline on the emitting thread, in the order they were
//! connected. The slot table is copied out before the first slot runs, so a
//! slot may connect or disconnect slots on the same signal. Such edits apply
//! from the next emission on.
//!
//! ```
//! use collection_view_core::Signal;
//!
//! let rows_added = Signal::<(usize, usize)>::new();
//! let id = rows_added.connect(|(index, len)| {
//!     println!("{len} rows added at {index}");
//! });
//!
//! rows_added.emit((0, 2));
//! assert!(rows_added.disconnect(id));
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// Handle to one connected slot, returned by [`Signal::connect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// Connected slots keyed by id. `SlotMap` reuses freed keys, so iteration
/// order says nothing about connection order; each slot carries its own
/// sequence number instead.
struct SlotTable<Args> {
    slots: SlotMap<ConnectionId, (u64, Slot<Args>)>,
    next_seq: u64,
}

/// A list of slots invoked with `&Args` on every [`Signal::emit`].
pub struct Signal<Args> {
    table: Mutex<SlotTable<Args>>,
}

impl<Args> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> Signal<Args> {
    /// Creates a signal with no slots.
    pub fn new() -> Self {
        Self {
            table: Mutex::new(SlotTable {
                slots: SlotMap::with_key(),
                next_seq: 0,
            }),
        }
    }

    /// Connects `slot`; it runs on every emission until disconnected.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let slot: Slot<Args> = Arc::new(slot);
        let mut table = self.table.lock();
        let seq = table.next_seq;
        table.next_seq += 1;
        table.slots.insert((seq, slot))
    }

    /// Disconnects a slot. Returns `false` if it was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.table.lock().slots.remove(id).is_some()
    }

    /// Number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.table.lock().slots.len()
    }

    /// Runs every connected slot with `args`.
    pub fn emit(&self, args: Args) {
        let mut slots: Vec<(u64, Slot<Args>)> =
            self.table.lock().slots.values().cloned().collect();
        if slots.is_empty() {
            return;
        }
        slots.sort_unstable_by_key(|(seq, _)| *seq);
        tracing::trace!(target: targets::SIGNAL, slots = slots.len(), "emit");
        for (_, slot) in &slots {
            slot(&args);
        }
    }
}

static_assertions::assert_impl_all!(Signal<usize>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + Send + 'static>(signal: &Signal<T>) -> Arc<Mutex<Vec<T>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        signal.connect(move |value: &T| sink.lock().push(value.clone()));
        seen
    }

    #[test]
    fn test_emit_reaches_every_slot() {
        let signal = Signal::<usize>::new();
        let first = recorder(&signal);
        let second = recorder(&signal);

        signal.emit(4);
        signal.emit(2);

        assert_eq!(*first.lock(), vec![4, 2]);
        assert_eq!(*second.lock(), vec![4, 2]);
        assert_eq!(signal.connection_count(), 2);
    }

    #[test]
    fn test_disconnect_stops_delivery() {
        let signal = Signal::<&'static str>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = signal.connect(move |s| sink.lock().push(*s));

        signal.emit("before");
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit("after");

        assert_eq!(*seen.lock(), vec!["before"]);
    }

    #[test]
    fn test_slots_run_in_connection_order() {
        let signal = Signal::<()>::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for n in 0..3 {
            let order = order.clone();
            signal.connect(move |_| order.lock().push(n));
        }

        signal.emit(());
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_reconnect_after_disconnect_keeps_connection_order() {
        let signal = Signal::<()>::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let connect = |name: &'static str| {
            let order = order.clone();
            signal.connect(move |_| order.lock().push(name))
        };

        let first = connect("first");
        connect("second");
        assert!(signal.disconnect(first));
        // Lands in the slot "first" freed.
        connect("third");

        signal.emit(());
        assert_eq!(*order.lock(), vec!["second", "third"]);
    }

    #[test]
    fn test_slot_may_disconnect_itself() {
        let signal = Arc::new(Signal::<u8>::new());
        let own_id = Arc::new(Mutex::new(None));
        let calls = Arc::new(Mutex::new(0));

        let weak = Arc::downgrade(&signal);
        let own = own_id.clone();
        let counter = calls.clone();
        let id = signal.connect(move |_| {
            *counter.lock() += 1;
            if let (Some(signal), Some(id)) = (weak.upgrade(), own.lock().take()) {
                signal.disconnect(id);
            }
        });
        *own_id.lock() = Some(id);

        signal.emit(1);
        signal.emit(2);
        assert_eq!(*calls.lock(), 1);
        assert_eq!(signal.connection_count(), 0);
    }
}
