//! Change notifications published by a view.
//!
//! Every source change the view absorbs is reported as zero or more
//! [`ViewChange`]s on [`ViewSignals::changed`]. Indices are flat view
//! indices, valid at the moment the notification is delivered. Observers that
//! cannot replay a change incrementally should treat it as a
//! [`ViewChange::Reset`].

use collection_view_core::Signal;
use collection_view_core::logging::targets;

use crate::error::ViewError;

use super::value::{GroupHeader, ViewItem};

/// A change to a view's visible sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewChange<T> {
    /// Items were inserted, the first one at `index`.
    Added { items: Vec<T>, index: usize },
    /// Items were removed, the first one from `index`.
    Removed { items: Vec<T>, index: usize },
    /// Items starting at `index` were replaced in place.
    Replaced {
        old_items: Vec<T>,
        new_items: Vec<T>,
        index: usize,
    },
    /// One item moved; `new_index` is its final position.
    Moved {
        item: T,
        old_index: usize,
        new_index: usize,
    },
    /// A group emptied by a removal was dropped.
    ///
    /// When one removal prunes several levels they arrive innermost first.
    /// The k-th of them (counting from 1) reports `index` as the removed
    /// item's former position minus k, saturating at 0.
    HeaderRemoved {
        header: GroupHeader,
        depth: usize,
        index: usize,
    },
    /// The view changed wholesale; re-read everything.
    Reset,
}

impl<T> ViewChange<T> {
    /// The change in item count this notification implies.
    ///
    /// Header notifications and resets report 0.
    pub fn delta(&self) -> isize {
        match self {
            ViewChange::Added { items, .. } => items.len() as isize,
            ViewChange::Removed { items, .. } => -(items.len() as isize),
            _ => 0,
        }
    }

    /// Returns `true` for [`ViewChange::Reset`].
    pub fn is_reset(&self) -> bool {
        matches!(self, ViewChange::Reset)
    }

    fn kind_name(&self) -> &'static str {
        match self {
            ViewChange::Added { .. } => "added",
            ViewChange::Removed { .. } => "removed",
            ViewChange::Replaced { .. } => "replaced",
            ViewChange::Moved { .. } => "moved",
            ViewChange::HeaderRemoved { .. } => "header_removed",
            ViewChange::Reset => "reset",
        }
    }
}

/// Whether observers accept notifications that cover several items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeNotifications {
    /// Multi-item notifications are delivered as they are.
    #[default]
    Supported,
    /// Multi-item adds are split into single-item adds. Multi-item removes
    /// and replaces become a [`ViewChange::Reset`].
    Unsupported,
}

/// Signals emitted by a view.
///
/// All signals fire after the view has finished updating, outside its lock,
/// so handlers may query the view.
pub struct ViewSignals<T: ViewItem> {
    /// Emitted once per change to the visible sequence.
    pub changed: Signal<ViewChange<T>>,
    /// Emitted with the new count when the number of items changes.
    pub count_changed: Signal<usize>,
    /// Emitted when anything reachable through the item indexer changed.
    pub items_changed: Signal<()>,
    /// Emitted when the filter is set or cleared.
    pub filter_changed: Signal<()>,
    /// Emitted when a source change could not be applied incrementally.
    pub sync_failed: Signal<ViewError>,
}

impl<T: ViewItem> ViewSignals<T> {
    pub(crate) fn new() -> Self {
        Self {
            changed: Signal::new(),
            count_changed: Signal::new(),
            items_changed: Signal::new(),
            filter_changed: Signal::new(),
            sync_failed: Signal::new(),
        }
    }
}

/// Collects the notifications of one update, applying the range policy.
pub(crate) struct ChangeBatch<T> {
    mode: RangeNotifications,
    changes: Vec<ViewChange<T>>,
    reset: bool,
}

impl<T: ViewItem> ChangeBatch<T> {
    pub(crate) fn new(mode: RangeNotifications) -> Self {
        Self {
            mode,
            changes: Vec::new(),
            reset: false,
        }
    }

    fn push(&mut self, change: ViewChange<T>) {
        if self.reset {
            return;
        }
        tracing::trace!(target: targets::SYNC, kind = change.kind_name(), "queued view change");
        self.changes.push(change);
    }

    fn splits(&self, len: usize) -> bool {
        self.mode == RangeNotifications::Unsupported && len > 1
    }

    pub(crate) fn added(&mut self, items: Vec<T>, index: usize) {
        if items.is_empty() {
            return;
        }
        if self.splits(items.len()) {
            for (offset, item) in items.into_iter().enumerate() {
                self.push(ViewChange::Added {
                    items: vec![item],
                    index: index + offset,
                });
            }
        } else {
            self.push(ViewChange::Added { items, index });
        }
    }

    pub(crate) fn removed(&mut self, items: Vec<T>, index: usize) {
        if items.is_empty() {
            return;
        }
        if self.splits(items.len()) {
            self.reset();
        } else {
            self.push(ViewChange::Removed { items, index });
        }
    }

    pub(crate) fn replaced(&mut self, old_items: Vec<T>, new_items: Vec<T>, index: usize) {
        if new_items.is_empty() {
            return;
        }
        if self.splits(new_items.len()) {
            self.reset();
        } else {
            self.push(ViewChange::Replaced {
                old_items,
                new_items,
                index,
            });
        }
    }

    pub(crate) fn moved(&mut self, item: T, old_index: usize, new_index: usize) {
        if old_index != new_index {
            self.push(ViewChange::Moved {
                item,
                old_index,
                new_index,
            });
        }
    }

    pub(crate) fn header_removed(&mut self, header: GroupHeader, depth: usize, index: usize) {
        self.push(ViewChange::HeaderRemoved {
            header,
            depth,
            index,
        });
    }

    /// Drops everything queued so far in favor of a single reset.
    pub(crate) fn reset(&mut self) {
        self.reset = true;
        self.changes.clear();
    }

    pub(crate) fn finish(self) -> Vec<ViewChange<T>> {
        if self.reset {
            vec![ViewChange::Reset]
        } else {
            self.changes
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta() {
        let added = ViewChange::Added {
            items: vec![1i64, 2],
            index: 0,
        };
        let removed = ViewChange::Removed {
            items: vec![1i64],
            index: 0,
        };
        assert_eq!(added.delta(), 2);
        assert_eq!(removed.delta(), -1);
        assert_eq!(ViewChange::<i64>::Reset.delta(), 0);
    }

    #[test]
    fn test_supported_ranges_pass_through() {
        let mut batch = ChangeBatch::new(RangeNotifications::Supported);
        batch.added(vec![1i64, 2], 3);
        batch.removed(vec![5, 6], 0);
        assert_eq!(
            batch.finish(),
            vec![
                ViewChange::Added {
                    items: vec![1, 2],
                    index: 3
                },
                ViewChange::Removed {
                    items: vec![5, 6],
                    index: 0
                },
            ]
        );
    }

    #[test]
    fn test_unsupported_ranges_split_adds() {
        let mut batch = ChangeBatch::new(RangeNotifications::Unsupported);
        batch.added(vec![1i64, 2], 3);
        assert_eq!(
            batch.finish(),
            vec![
                ViewChange::Added {
                    items: vec![1],
                    index: 3
                },
                ViewChange::Added {
                    items: vec![2],
                    index: 4
                },
            ]
        );
    }

    #[test]
    fn test_unsupported_ranges_reset_on_removes() {
        let mut batch = ChangeBatch::new(RangeNotifications::Unsupported);
        batch.added(vec![1i64], 0);
        batch.removed(vec![1, 2], 0);
        batch.added(vec![3], 0);
        assert_eq!(batch.finish(), vec![ViewChange::Reset]);
    }

    #[test]
    fn test_empty_and_noop_changes_are_dropped() {
        let mut batch = ChangeBatch::<i64>::new(RangeNotifications::Supported);
        batch.added(Vec::new(), 0);
        batch.removed(Vec::new(), 0);
        batch.moved(7, 2, 2);
        assert!(batch.finish().is_empty());
    }
}
