//! The internal mirror: the filtered, sorted sequence backing a view.
//!
//! Alongside the items, the mirror keeps one inclusion flag per source
//! position. The flags translate source indices into mirror indices for
//! views that keep source order, and tell removal handling whether an item
//! was ever visible without searching for it.

use std::sync::Arc;

use crate::error::{Result, ViewError};

use super::sort::SortComparer;
use super::value::ViewItem;

/// Type alias for a filter predicate. Items for which it returns `true` are
/// shown.
pub type FilterFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Applies an optional filter; no filter admits everything.
pub(crate) fn passes<T>(filter: Option<&FilterFn<T>>, item: &T) -> bool {
    filter.is_none_or(|accept| accept(item))
}

/// Filtered and sorted copy of the source, plus per-source-position
/// inclusion flags.
#[derive(Debug, Clone)]
pub struct InternalMirror<T> {
    items: Vec<T>,
    included: Vec<bool>,
}

impl<T> Default for InternalMirror<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            included: Vec::new(),
        }
    }
}

impl<T: ViewItem> InternalMirror<T> {
    /// Filters `source` and, when the comparer is active, sorts the result.
    pub fn build(
        source: &[T],
        filter: Option<&FilterFn<T>>,
        comparer: &SortComparer<'_, T>,
    ) -> Result<Self> {
        let mut mirror = Self::unsorted(source, filter);
        mirror.items = comparer.sort(mirror.items)?;
        Ok(mirror)
    }

    /// Filters `source`, keeping source order.
    pub fn unsorted(source: &[T], filter: Option<&FilterFn<T>>) -> Self {
        let included: Vec<bool> = source.iter().map(|item| passes(filter, item)).collect();
        let items: Vec<T> = source
            .iter()
            .zip(&included)
            .filter(|(_, keep)| **keep)
            .map(|(item, _)| item.clone())
            .collect();
        Self { items, included }
    }

    /// The mirrored items in view order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Number of mirrored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if no items pass the filter.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of source positions tracked.
    pub fn source_len(&self) -> usize {
        self.included.len()
    }

    /// Whether the item at a source position passes the filter.
    pub fn is_included(&self, source_index: usize) -> Option<bool> {
        self.included.get(source_index).copied()
    }

    /// Counts included source positions before `source_index`.
    ///
    /// In source order this is the mirror index the source position maps to,
    /// or would be inserted at.
    pub fn source_to_mirror(&self, source_index: usize) -> usize {
        let end = source_index.min(self.included.len());
        self.included[..end].iter().filter(|keep| **keep).count()
    }

    /// Position of the first item equal to `item`.
    pub fn position(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|candidate| candidate == item)
    }

    /// Inserts inclusion flags for newly added source positions.
    pub fn insert_flags(&mut self, source_index: usize, flags: &[bool]) -> Result<()> {
        if source_index > self.included.len() {
            return Err(ViewError::out_of_range(source_index, self.included.len()));
        }
        self.included
            .splice(source_index..source_index, flags.iter().copied());
        Ok(())
    }

    /// Removes and returns the inclusion flags of removed source positions.
    pub fn remove_flags(&mut self, source_index: usize, len: usize) -> Result<Vec<bool>> {
        if source_index + len > self.included.len() {
            return Err(ViewError::out_of_range(source_index + len, self.included.len()));
        }
        Ok(self.included.drain(source_index..source_index + len).collect())
    }

    /// Moves one inclusion flag; `to` is the final source position.
    pub fn move_flag(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.included.len();
        if from >= len || to >= len {
            return Err(ViewError::out_of_range(from.max(to), len));
        }
        let flag = self.included.remove(from);
        self.included.insert(to, flag);
        Ok(())
    }

    /// Recomputes every inclusion flag from a source snapshot.
    pub fn refresh_flags(&mut self, source: &[T], filter: Option<&FilterFn<T>>) {
        self.included = source.iter().map(|item| passes(filter, item)).collect();
    }

    /// Inserts items at a mirror index.
    pub fn insert(&mut self, index: usize, items: Vec<T>) -> Result<()> {
        if index > self.items.len() {
            return Err(ViewError::out_of_range(index, self.items.len()));
        }
        self.items.splice(index..index, items);
        Ok(())
    }

    /// Removes `len` items starting at a mirror index.
    pub fn remove(&mut self, index: usize, len: usize) -> Result<Vec<T>> {
        if index + len > self.items.len() {
            return Err(ViewError::out_of_range(index + len, self.items.len()));
        }
        Ok(self.items.drain(index..index + len).collect())
    }

    /// Removes the first item equal to `item`, returning its former index.
    pub fn remove_item(&mut self, item: &T) -> Option<usize> {
        let index = self.position(item)?;
        self.items.remove(index);
        Some(index)
    }

    /// Replaces the item at a mirror index.
    pub fn replace(&mut self, index: usize, item: T) -> Result<T> {
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or_else(|| ViewError::out_of_range(index, len))?;
        Ok(std::mem::replace(slot, item))
    }

    /// Moves one item; `to` is its final mirror index.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.items.len();
        if from >= len || to >= len {
            return Err(ViewError::out_of_range(from.max(to), len));
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(())
    }

    /// Swaps in a new item sequence of any length, keeping the flags.
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::sort::{SortDescription, SortDirection};

    fn even() -> FilterFn<i64> {
        Arc::new(|n: &i64| n % 2 == 0)
    }

    #[test]
    fn test_build_filters_and_sorts() {
        let levels = vec![SortDescription::<i64>::by_item(SortDirection::Descending)];
        let filter = even();
        let mirror =
            InternalMirror::build(&[4, 1, 2, 6, 3], Some(&filter), &SortComparer::new(&levels))
                .unwrap();
        assert_eq!(mirror.items(), &[6, 4, 2]);
        assert_eq!(mirror.source_len(), 5);
        assert_eq!(mirror.is_included(1), Some(false));
        assert_eq!(mirror.is_included(3), Some(true));
    }

    #[test]
    fn test_source_to_mirror_counts_included() {
        let filter = even();
        let mirror =
            InternalMirror::build(&[1, 2, 3, 4, 5], Some(&filter), &SortComparer::new(&[]))
                .unwrap();
        assert_eq!(mirror.items(), &[2, 4]);
        assert_eq!(mirror.source_to_mirror(0), 0);
        assert_eq!(mirror.source_to_mirror(2), 1);
        assert_eq!(mirror.source_to_mirror(5), 2);
        assert_eq!(mirror.source_to_mirror(99), 2);
    }

    #[test]
    fn test_flag_maintenance() {
        let mut mirror =
            InternalMirror::build(&[1i64, 2, 3], None, &SortComparer::new(&[])).unwrap();
        mirror.insert_flags(1, &[false, true]).unwrap();
        assert_eq!(mirror.source_len(), 5);
        assert_eq!(mirror.remove_flags(0, 2).unwrap(), vec![true, false]);
        mirror.move_flag(0, 2).unwrap();
        assert_eq!(mirror.is_included(2), Some(true));
        assert!(mirror.remove_flags(2, 5).is_err());
    }

    #[test]
    fn test_item_edits() {
        let mut mirror =
            InternalMirror::build(&[1i64, 2, 3], None, &SortComparer::new(&[])).unwrap();
        mirror.insert(3, vec![4, 5]).unwrap();
        assert_eq!(mirror.remove(0, 2).unwrap(), vec![1, 2]);
        assert_eq!(mirror.replace(0, 30).unwrap(), 3);
        mirror.move_item(0, 2).unwrap();
        assert_eq!(mirror.items(), &[4, 5, 30]);
        assert_eq!(mirror.remove_item(&5), Some(1));
        assert_eq!(mirror.remove_item(&5), None);
        assert!(mirror.insert(9, vec![1]).is_err());
    }

    #[test]
    fn test_passes_without_filter() {
        assert!(passes::<i64>(None, &1));
        assert!(!passes(Some(&even()), &1));
    }
}
