//! Observable sources a view can follow.
//!
//! A source is any ordered collection that can hand out a snapshot of its
//! items and announces its mutations as [`SourceChange`]s through a
//! [`Signal`]. [`ObservableList`] is the stock implementation.

use std::fmt;
use std::sync::Arc;

use collection_view_core::{ConnectionId, Signal};
use parking_lot::RwLock;

/// The kind of mutation a [`SourceChange`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Items were inserted.
    Add,
    /// Items were removed.
    Remove,
    /// Items were replaced in place.
    Replace,
    /// Items moved to a new position.
    Move,
    /// The source changed wholesale.
    Reset,
}

/// A mutation reported by a source.
///
/// Indices are source positions. A missing index means the source did not
/// report one; the view then locates items by value.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceChange<T> {
    /// What happened.
    pub kind: ChangeKind,
    /// Items removed, replaced or moved.
    pub old_items: Vec<T>,
    /// Items added or written by a replace.
    pub new_items: Vec<T>,
    /// Position of the first affected item before the change.
    pub old_index: Option<usize>,
    /// Position of the first affected item after the change.
    pub new_index: Option<usize>,
}

impl<T> SourceChange<T> {
    /// Items were inserted starting at `index`.
    pub fn added(items: Vec<T>, index: Option<usize>) -> Self {
        Self {
            kind: ChangeKind::Add,
            old_items: Vec::new(),
            new_items: items,
            old_index: None,
            new_index: index,
        }
    }

    /// Items were removed starting at `index`.
    pub fn removed(items: Vec<T>, index: Option<usize>) -> Self {
        Self {
            kind: ChangeKind::Remove,
            old_items: items,
            new_items: Vec::new(),
            old_index: index,
            new_index: None,
        }
    }

    /// `old_items` starting at `index` were overwritten by `new_items`.
    pub fn replaced(old_items: Vec<T>, new_items: Vec<T>, index: Option<usize>) -> Self {
        Self {
            kind: ChangeKind::Replace,
            old_items,
            new_items,
            old_index: index,
            new_index: index,
        }
    }

    /// A contiguous block moved from `old_index` so that it now starts at
    /// `new_index`.
    pub fn moved(items: Vec<T>, old_index: usize, new_index: usize) -> Self {
        Self {
            kind: ChangeKind::Move,
            old_items: items,
            new_items: Vec::new(),
            old_index: Some(old_index),
            new_index: Some(new_index),
        }
    }

    /// The source must be re-read.
    pub fn reset() -> Self {
        Self {
            kind: ChangeKind::Reset,
            old_items: Vec::new(),
            new_items: Vec::new(),
            old_index: None,
            new_index: None,
        }
    }

    /// The items a move carries, from whichever list the source filled.
    pub fn moved_items(&self) -> &[T] {
        if self.old_items.is_empty() {
            &self.new_items
        } else {
            &self.old_items
        }
    }
}

/// An ordered collection a view can mirror.
///
/// `changes` must be emitted after the mutation is visible through
/// `snapshot`, once per mutation, in mutation order.
pub trait ItemSource<T>: Send + Sync {
    /// Copies the current items in source order.
    fn snapshot(&self) -> Vec<T>;

    /// Number of items.
    fn len(&self) -> usize;

    /// Returns `true` if the source holds no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The signal mutations are announced on.
    fn changes(&self) -> &Signal<SourceChange<T>>;
}

/// A thread-safe list that announces every mutation.
///
/// # Example
///
/// ```
/// use collection_view::view::{ChangeKind, ObservableList};
/// use parking_lot::Mutex;
/// use std::sync::Arc;
///
/// let list = ObservableList::new(vec![1, 2]);
/// let kinds = Arc::new(Mutex::new(Vec::new()));
/// let recorder = kinds.clone();
/// list.changes().connect(move |change| recorder.lock().push(change.kind));
///
/// list.push(3);
/// list.remove(0);
/// assert_eq!(*kinds.lock(), vec![ChangeKind::Add, ChangeKind::Remove]);
/// ```
pub struct ObservableList<T> {
    items: RwLock<Vec<T>>,
    changes: Signal<SourceChange<T>>,
}

impl<T: Clone + Send + Sync + 'static> ObservableList<T> {
    /// Creates a list holding `items`.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(items),
            changes: Signal::new(),
        }
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns `true` if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Returns a copy of the item at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        self.items.read().get(index).cloned()
    }

    /// Returns a copy of every item.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.read().clone()
    }

    /// The signal mutations are announced on.
    pub fn changes(&self) -> &Signal<SourceChange<T>> {
        &self.changes
    }

    /// Appends an item.
    pub fn push(&self, item: T) {
        let index = {
            let mut items = self.items.write();
            items.push(item.clone());
            items.len() - 1
        };
        self.changes.emit(SourceChange::added(vec![item], Some(index)));
    }

    /// Appends several items as one change.
    pub fn extend(&self, new_items: Vec<T>) {
        if new_items.is_empty() {
            return;
        }
        let index = {
            let mut items = self.items.write();
            let index = items.len();
            items.extend(new_items.iter().cloned());
            index
        };
        self.changes.emit(SourceChange::added(new_items, Some(index)));
    }

    /// Inserts an item at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert(&self, index: usize, item: T) {
        self.items.write().insert(index, item.clone());
        self.changes.emit(SourceChange::added(vec![item], Some(index)));
    }

    /// Inserts several items starting at `index` as one change.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert_range(&self, index: usize, new_items: Vec<T>) {
        if new_items.is_empty() {
            return;
        }
        self.items
            .write()
            .splice(index..index, new_items.iter().cloned());
        self.changes.emit(SourceChange::added(new_items, Some(index)));
    }

    /// Removes and returns the item at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn remove(&self, index: usize) -> T {
        let removed = self.items.write().remove(index);
        self.changes
            .emit(SourceChange::removed(vec![removed.clone()], Some(index)));
        removed
    }

    /// Removes `count` items starting at `index` as one change.
    ///
    /// # Panics
    ///
    /// Panics if `index + count > len()`.
    pub fn remove_range(&self, index: usize, count: usize) -> Vec<T> {
        let removed: Vec<T> = self.items.write().drain(index..index + count).collect();
        if !removed.is_empty() {
            self.changes
                .emit(SourceChange::removed(removed.clone(), Some(index)));
        }
        removed
    }

    /// Overwrites the item at `index`, returning the old one.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn set(&self, index: usize, item: T) -> T {
        let old = std::mem::replace(&mut self.items.write()[index], item.clone());
        self.changes.emit(SourceChange::replaced(
            vec![old.clone()],
            vec![item],
            Some(index),
        ));
        old
    }

    /// Moves the item at `from` so that it ends up at `to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is `>= len()`.
    pub fn move_item(&self, from: usize, to: usize) {
        let item = {
            let mut items = self.items.write();
            let item = items.remove(from);
            items.insert(to, item.clone());
            item
        };
        if from != to {
            self.changes.emit(SourceChange::moved(vec![item], from, to));
        }
    }

    /// Replaces every item and announces a reset.
    pub fn reset(&self, items: Vec<T>) {
        *self.items.write() = items;
        self.changes.emit(SourceChange::reset());
    }

    /// Removes every item and announces a reset.
    pub fn clear(&self) {
        self.reset(Vec::new());
    }
}

impl<T: Clone + Send + Sync + 'static> ItemSource<T> for ObservableList<T> {
    fn snapshot(&self) -> Vec<T> {
        self.to_vec()
    }

    fn len(&self) -> usize {
        ObservableList::len(self)
    }

    fn changes(&self) -> &Signal<SourceChange<T>> {
        &self.changes
    }
}

impl<T: Clone + Send + Sync + fmt::Debug + 'static> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList")
            .field("items", &*self.items.read())
            .field("connections", &self.changes.connection_count())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Keeps a view attached to its source.
///
/// Dropping the subscription disconnects the view.
#[must_use = "the view detaches when the subscription is dropped"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub(crate) fn new<T, S>(source: Arc<S>, id: ConnectionId) -> Self
    where
        T: Clone + Send + 'static,
        S: ItemSource<T> + ?Sized + 'static,
    {
        Self {
            detach: Some(Box::new(move || {
                source.changes().disconnect(id);
            })),
        }
    }

    /// Returns `true` until the subscription is cancelled.
    pub fn is_active(&self) -> bool {
        self.detach.is_some()
    }

    /// Disconnects the view now.
    pub fn cancel(mut self) {
        self.disconnect();
    }

    fn disconnect(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

static_assertions::assert_impl_all!(ObservableList<i64>: Send, Sync);
static_assertions::assert_impl_all!(Subscription: Send);
