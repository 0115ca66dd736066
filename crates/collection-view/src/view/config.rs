//! The filter, sort and group configuration of a view.

use std::fmt;

use super::group::{self, GroupDescription};
use super::mirror::{self, FilterFn};
use super::notify::RangeNotifications;
use super::sort::{SortComparer, SortDescription};
use super::value::{GroupHeader, ViewItem};

/// Everything that decides which items a view shows and in what order.
pub(crate) struct ViewConfig<T> {
    pub(crate) filter: Option<FilterFn<T>>,
    pub(crate) sorts: Vec<SortDescription<T>>,
    pub(crate) groups: Vec<GroupDescription<T>>,
    pub(crate) range_notifications: RangeNotifications,
}

impl<T> Default for ViewConfig<T> {
    fn default() -> Self {
        Self {
            filter: None,
            sorts: Vec::new(),
            groups: Vec::new(),
            range_notifications: RangeNotifications::default(),
        }
    }
}

impl<T> Clone for ViewConfig<T> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            sorts: self.sorts.clone(),
            groups: self.groups.clone(),
            range_notifications: self.range_notifications,
        }
    }
}

impl<T> fmt::Debug for ViewConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewConfig")
            .field("has_filter", &self.filter.is_some())
            .field("sorts", &self.sorts)
            .field("groups", &self.groups)
            .field("range_notifications", &self.range_notifications)
            .finish()
    }
}

impl<T: ViewItem> ViewConfig<T> {
    pub(crate) fn passes(&self, item: &T) -> bool {
        mirror::passes(self.filter.as_ref(), item)
    }

    pub(crate) fn comparer(&self) -> SortComparer<'_, T> {
        SortComparer::new(&self.sorts)
    }

    pub(crate) fn is_sorted(&self) -> bool {
        !self.sorts.is_empty()
    }

    pub(crate) fn is_grouped(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Whether the view's order departs from source order.
    pub(crate) fn reorders(&self) -> bool {
        self.is_sorted() || self.is_grouped()
    }

    pub(crate) fn group_path(&self, item: &T) -> Vec<GroupHeader> {
        group::group_path(&self.groups, item)
    }
}
