//! The collection view: a filtered, sorted and grouped projection of a
//! source that follows the source's changes.

use std::fmt;
use std::sync::Arc;

use collection_view_core::logging::targets;
use collection_view_core::{Property, TreeFormatOptions};
use parking_lot::RwLock;

use crate::error::{Result, ViewError};

use super::config::ViewConfig;
use super::debug::GroupTreeDebug;
use super::group::{GroupDescription, GroupId, GroupTree};
use super::index_map::GroupPath;
use super::notify::{RangeNotifications, ViewChange, ViewSignals};
use super::sort::SortDescription;
use super::source::{ItemSource, SourceChange, Subscription};
use super::sync::{Synchronizer, ViewState};
use super::value::{GroupHeader, ViewItem};

struct ViewInner<T> {
    config: ViewConfig<T>,
    state: ViewState<T>,
}

/// A live, filtered, sorted and grouped view over an [`ItemSource`].
///
/// The view owns a derived copy of the source's visible items and keeps it
/// in step with the source, either through [`CollectionView::attach`] or by
/// feeding changes to [`CollectionView::apply`]. Every update is published
/// on [`CollectionView::signals`] after the view's lock is released, so
/// handlers may query the view.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use collection_view::view::{CollectionView, ObservableList, SortDescription, SortDirection};
///
/// let list = Arc::new(ObservableList::new(vec![3, 1, 2]));
/// let view = Arc::new(
///     CollectionView::builder(list.clone())
///         .sort(SortDescription::by_item(SortDirection::Ascending))
///         .build()
///         .unwrap(),
/// );
/// let _subscription = view.attach();
///
/// list.push(0);
/// assert_eq!(view.to_vec(), vec![0, 1, 2, 3]);
/// ```
pub struct CollectionView<T: ViewItem> {
    source: Arc<dyn ItemSource<T>>,
    inner: RwLock<ViewInner<T>>,
    count: Property<usize>,
    signals: ViewSignals<T>,
}

impl<T: ViewItem> CollectionView<T> {
    /// Creates an unfiltered, unsorted, ungrouped view over `source`.
    pub fn new<S>(source: Arc<S>) -> Self
    where
        S: ItemSource<T> + 'static,
    {
        let source: Arc<dyn ItemSource<T>> = source;
        let config = ViewConfig::default();
        let state = ViewState::unsorted(&source.snapshot(), &config);
        Self::from_parts(source, config, state)
    }

    /// Starts configuring a view over `source`.
    pub fn builder<S>(source: Arc<S>) -> CollectionViewBuilder<T>
    where
        S: ItemSource<T> + 'static,
    {
        CollectionViewBuilder {
            source,
            config: ViewConfig::default(),
        }
    }

    fn from_parts(source: Arc<dyn ItemSource<T>>, config: ViewConfig<T>, state: ViewState<T>) -> Self {
        let count = state.count();
        Self {
            source,
            inner: RwLock::new(ViewInner { config, state }),
            count: Property::new(count),
            signals: ViewSignals::new(),
        }
    }

    /// Follows the source's change signal until the returned subscription
    /// is dropped.
    ///
    /// The connection holds the view weakly; once the last `Arc` to the view
    /// is gone, source changes are ignored.
    pub fn attach(self: &Arc<Self>) -> Subscription {
        let view = Arc::downgrade(self);
        let id = self.source.changes().connect(move |change| {
            let Some(view) = view.upgrade() else {
                return;
            };
            if let Err(err) = view.apply(change) {
                tracing::debug!(target: targets::SYNC, %err, "source change was not applied incrementally");
            }
        });
        tracing::debug!(target: targets::VIEW, "attached to source");
        Subscription::new::<T, _>(self.source.clone(), id)
    }

    /// Folds one source change into the view.
    ///
    /// The source must already reflect the change. On failure the view
    /// reports the error on [`ViewSignals::sync_failed`] and, unless the
    /// failure was a comparison error, rebuilds itself from the source.
    pub fn apply(&self, change: &SourceChange<T>) -> Result<()> {
        let outcome = {
            let mut guard = self.inner.write();
            let inner = &mut *guard;
            Synchronizer::new(&mut inner.state, &inner.config, self.source.as_ref())
                .apply(change)
                .map(|changes| (changes, inner.state.count()))
        };

        match outcome {
            Ok((changes, count)) => {
                self.publish(changes, count);
                Ok(())
            }
            Err(err) => {
                tracing::error!(target: targets::SYNC, %err, kind = ?change.kind, "failed to apply source change");
                if !matches!(err, ViewError::NotComparable { .. }) {
                    self.recover();
                }
                self.signals.sync_failed.emit(err.clone());
                Err(err)
            }
        }
    }

    fn recover(&self) {
        let rebuilt = {
            let mut inner = self.inner.write();
            match ViewState::build(&self.source.snapshot(), &inner.config) {
                Ok(state) => {
                    inner.state = state;
                    Some(inner.state.count())
                }
                Err(err) => {
                    tracing::error!(target: targets::SYNC, %err, "rebuild after a failed change also failed");
                    None
                }
            }
        };
        if let Some(count) = rebuilt {
            self.publish(vec![ViewChange::Reset], count);
        }
    }

    fn publish(&self, changes: Vec<ViewChange<T>>, count: usize) {
        if self.count.set(count) {
            self.signals.count_changed.emit(count);
        }
        if changes.is_empty() {
            return;
        }
        self.signals.items_changed.emit(());
        for change in changes {
            self.signals.changed.emit(change);
        }
    }

    /// Rebuilds the view from the source with the current configuration.
    pub fn refresh(&self) -> Result<()> {
        self.reconfigure(|_| Ok(()))
    }

    /// Applies `mutate` to a copy of the configuration, rebuilds from the
    /// source and commits both only if the rebuild succeeds.
    fn reconfigure<F, R>(&self, mutate: F) -> Result<R>
    where
        F: FnOnce(&mut ViewConfig<T>) -> Result<R>,
    {
        let (value, count) = {
            let mut inner = self.inner.write();
            let mut config = inner.config.clone();
            let value = mutate(&mut config)?;
            let state = ViewState::build(&self.source.snapshot(), &config)?;
            inner.config = config;
            inner.state = state;
            (value, inner.state.count())
        };
        self.publish(vec![ViewChange::Reset], count);
        Ok(value)
    }

    // Filtering

    /// Shows only items for which `filter` returns `true`.
    pub fn set_filter<F>(&self, filter: F) -> Result<()>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.reconfigure(|config| {
            config.filter = Some(Arc::new(filter));
            Ok(())
        })?;
        tracing::debug!(target: targets::VIEW, "filter set");
        self.signals.filter_changed.emit(());
        Ok(())
    }

    /// Shows every item again.
    pub fn clear_filter(&self) -> Result<()> {
        self.reconfigure(|config| {
            config.filter = None;
            Ok(())
        })?;
        tracing::debug!(target: targets::VIEW, "filter cleared");
        self.signals.filter_changed.emit(());
        Ok(())
    }

    /// Returns `true` if a filter is set.
    pub fn has_filter(&self) -> bool {
        self.inner.read().config.filter.is_some()
    }

    // Sorting

    fn update_sorts<F, R>(&self, mutate: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<SortDescription<T>>) -> Result<R>,
    {
        let (value, count) = {
            let mut guard = self.inner.write();
            let inner = &mut *guard;
            let mut config = inner.config.clone();
            let value = mutate(&mut config.sorts)?;
            if config.is_sorted() {
                inner.state.resort(&config.comparer())?;
            } else {
                inner.state = ViewState::build(&self.source.snapshot(), &config)?;
            }
            tracing::debug!(target: targets::VIEW, levels = config.sorts.len(), "sort order changed");
            inner.config = config;
            (value, inner.state.count())
        };
        self.publish(vec![ViewChange::Reset], count);
        Ok(value)
    }

    /// Appends a sort level.
    pub fn add_sort(&self, sort: SortDescription<T>) -> Result<()> {
        self.update_sorts(|sorts| {
            sorts.push(sort);
            Ok(())
        })
    }

    /// Inserts a sort level at `index`.
    pub fn insert_sort(&self, index: usize, sort: SortDescription<T>) -> Result<()> {
        self.update_sorts(|sorts| {
            if index > sorts.len() {
                return Err(ViewError::out_of_range(index, sorts.len()));
            }
            sorts.insert(index, sort);
            Ok(())
        })
    }

    /// Removes and returns the sort level at `index`.
    pub fn remove_sort(&self, index: usize) -> Result<SortDescription<T>> {
        self.update_sorts(|sorts| {
            if index >= sorts.len() {
                return Err(ViewError::out_of_range(index, sorts.len()));
            }
            Ok(sorts.remove(index))
        })
    }

    /// Replaces every sort level.
    pub fn set_sorts(&self, sorts: Vec<SortDescription<T>>) -> Result<()> {
        self.update_sorts(|current| {
            *current = sorts;
            Ok(())
        })
    }

    /// Removes every sort level, restoring source order.
    pub fn clear_sorts(&self) -> Result<()> {
        self.set_sorts(Vec::new())
    }

    /// Returns the current sort levels.
    pub fn sorts(&self) -> Vec<SortDescription<T>> {
        self.inner.read().config.sorts.clone()
    }

    // Grouping

    fn update_groups<F, R>(&self, mutate: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<GroupDescription<T>>) -> Result<R>,
    {
        let (value, count) = {
            let mut inner = self.inner.write();
            let value = mutate(&mut inner.config.groups)?;
            let inner = &mut *inner;
            inner.state.regroup(&inner.config.groups);
            tracing::debug!(target: targets::VIEW, levels = inner.config.groups.len(), "grouping changed");
            (value, inner.state.count())
        };
        self.publish(vec![ViewChange::Reset], count);
        Ok(value)
    }

    /// Appends a grouping level.
    pub fn add_group(&self, group: GroupDescription<T>) -> Result<()> {
        self.update_groups(|groups| {
            groups.push(group);
            Ok(())
        })
    }

    /// Inserts a grouping level at `index`.
    pub fn insert_group(&self, index: usize, group: GroupDescription<T>) -> Result<()> {
        self.update_groups(|groups| {
            if index > groups.len() {
                return Err(ViewError::out_of_range(index, groups.len()));
            }
            groups.insert(index, group);
            Ok(())
        })
    }

    /// Removes and returns the grouping level at `index`.
    pub fn remove_group(&self, index: usize) -> Result<GroupDescription<T>> {
        self.update_groups(|groups| {
            if index >= groups.len() {
                return Err(ViewError::out_of_range(index, groups.len()));
            }
            Ok(groups.remove(index))
        })
    }

    /// Replaces every grouping level.
    pub fn set_groups(&self, groups: Vec<GroupDescription<T>>) -> Result<()> {
        self.update_groups(|current| {
            *current = groups;
            Ok(())
        })
    }

    /// Removes every grouping level.
    pub fn clear_groups(&self) -> Result<()> {
        self.set_groups(Vec::new())
    }

    /// Returns the current grouping levels.
    pub fn group_descriptions(&self) -> Vec<GroupDescription<T>> {
        self.inner.read().config.groups.clone()
    }

    // Notification policy

    /// Returns how multi-item changes are reported.
    pub fn range_notifications(&self) -> RangeNotifications {
        self.inner.read().config.range_notifications
    }

    /// Sets how multi-item changes are reported from now on.
    pub fn set_range_notifications(&self, mode: RangeNotifications) {
        self.inner.write().config.range_notifications = mode;
    }

    // Queries

    /// Number of visible items.
    pub fn count(&self) -> usize {
        self.inner.read().state.count()
    }

    /// Returns `true` if no item is visible.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Returns the item at a flat index.
    pub fn get(&self, index: usize) -> Result<T> {
        let inner = self.inner.read();
        inner
            .state
            .tree
            .item_at(index)
            .cloned()
            .ok_or_else(|| ViewError::out_of_range(index, inner.state.count()))
    }

    /// Returns the flat index of the first visible item equal to `item`.
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.inner.read().state.tree.position_of(item)
    }

    /// Returns `true` if an item equal to `item` is visible.
    pub fn contains(&self, item: &T) -> bool {
        self.index_of(item).is_some()
    }

    /// Copies the visible items in order.
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.read().state.tree.leaves().cloned().collect()
    }

    /// Iterates a copy of the visible items.
    pub fn iter(&self) -> std::vec::IntoIter<T> {
        self.to_vec().into_iter()
    }

    /// Top-level groups in display order.
    ///
    /// Ids stay valid until the next change to the view.
    pub fn groups(&self) -> Vec<GroupId> {
        self.inner.read().state.tree.roots().to_vec()
    }

    /// Returns the header of a group; `None` for unknown ids and for the
    /// implicit group of an ungrouped view.
    pub fn group_header(&self, group: GroupId) -> Option<GroupHeader> {
        self.inner
            .read()
            .state
            .tree
            .node(group)
            .and_then(|node| node.header().cloned())
    }

    /// Runs `f` against the group tree.
    ///
    /// The view is read-locked while `f` runs; `f` must not mutate the view.
    pub fn with_groups<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&GroupTree<T>) -> R,
    {
        f(&self.inner.read().state.tree)
    }

    /// Maps a flat index to its top-level group and offset.
    pub fn group_path(&self, index: usize) -> Option<GroupPath> {
        self.inner.read().state.mapper.to_group_path(index)
    }

    /// Maps a top-level group and an offset inside it to a flat index.
    pub fn flat_index(&self, group: GroupId, offset: usize) -> Result<usize> {
        self.inner.read().state.mapper.to_flat_index(group, offset)
    }

    /// The source this view mirrors.
    pub fn source(&self) -> &Arc<dyn ItemSource<T>> {
        &self.source
    }

    /// The view's signals.
    pub fn signals(&self) -> &ViewSignals<T> {
        &self.signals
    }

    /// Verifies that the view's internal structures agree with each other.
    pub fn check_consistency(&self) -> Result<()> {
        self.inner.read().state.validate()
    }

    /// Renders the group tree as text.
    pub fn debug_tree(&self, options: &TreeFormatOptions) -> String
    where
        T: fmt::Debug,
    {
        let inner = self.inner.read();
        GroupTreeDebug::new(&inner.state.tree, options).to_string()
    }
}

impl<T: ViewItem> fmt::Debug for CollectionView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("CollectionView")
            .field("count", &inner.state.count())
            .field("groups", &inner.state.tree.roots().len())
            .field("config", &inner.config)
            .finish()
    }
}

/// Builder for [`CollectionView`].
pub struct CollectionViewBuilder<T: ViewItem> {
    source: Arc<dyn ItemSource<T>>,
    config: ViewConfig<T>,
}

impl<T: ViewItem> CollectionViewBuilder<T> {
    /// Sets the filter.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.config.filter = Some(Arc::new(filter));
        self
    }

    /// Appends a sort level.
    pub fn sort(mut self, sort: SortDescription<T>) -> Self {
        self.config.sorts.push(sort);
        self
    }

    /// Appends a grouping level.
    pub fn group(mut self, group: GroupDescription<T>) -> Self {
        self.config.groups.push(group);
        self
    }

    /// Sets how multi-item changes are reported.
    pub fn range_notifications(mut self, mode: RangeNotifications) -> Self {
        self.config.range_notifications = mode;
        self
    }

    /// Builds the view from a snapshot of the source.
    ///
    /// Fails if the sort order cannot be applied to the source's items.
    pub fn build(self) -> Result<CollectionView<T>> {
        let state = ViewState::build(&self.source.snapshot(), &self.config)?;
        tracing::debug!(target: targets::VIEW, count = state.count(), "view built");
        Ok(CollectionView::from_parts(self.source, self.config, state))
    }
}

static_assertions::assert_impl_all!(CollectionView<i64>: Send, Sync);
