//! Sort descriptions and comparator composition.
//!
//! A view's sort order is an ordered list of [`SortDescription`]s. Levels are
//! compared in order and the first level that tells two items apart decides;
//! items that tie on every level keep their relative order.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, ViewError};

use super::value::{KeyValue, ViewItem};

/// Type alias for a key extractor.
///
/// Turns an item into the value a sort or group level works with.
pub type KeyFn<T> = Arc<dyn Fn(&T) -> KeyValue + Send + Sync>;

/// Direction of one sort level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    /// Smallest first; nulls before values.
    #[default]
    Ascending,
    /// Largest first; nulls after values.
    Descending,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// One level of a view's sort order.
///
/// # Example
///
/// ```
/// use collection_view::view::{KeyValue, SortDescription, SortDirection};
///
/// let by_priority = SortDescription::<i64>::by_item(SortDirection::Descending);
/// assert!(!by_priority.has_key());
///
/// let by_len = SortDescription::ascending(|s: &String| KeyValue::from(s.len() as i64));
/// assert_eq!(by_len.direction(), SortDirection::Ascending);
/// ```
pub struct SortDescription<T> {
    key: Option<KeyFn<T>>,
    direction: SortDirection,
    name: Option<String>,
}

impl<T> Clone for SortDescription<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            direction: self.direction,
            name: self.name.clone(),
        }
    }
}

impl<T> fmt::Debug for SortDescription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortDescription")
            .field("name", &self.name)
            .field("has_key", &self.key.is_some())
            .field("direction", &self.direction)
            .finish()
    }
}

impl<T: ViewItem> SortDescription<T> {
    /// Creates a sort level from an optional key extractor.
    pub fn new(key: Option<KeyFn<T>>, direction: SortDirection) -> Self {
        Self {
            key,
            direction,
            name: None,
        }
    }

    /// Sorts ascending by the extracted key.
    pub fn ascending<F>(key: F) -> Self
    where
        F: Fn(&T) -> KeyValue + Send + Sync + 'static,
    {
        Self::new(Some(Arc::new(key)), SortDirection::Ascending)
    }

    /// Sorts descending by the extracted key.
    pub fn descending<F>(key: F) -> Self
    where
        F: Fn(&T) -> KeyValue + Send + Sync + 'static,
    {
        Self::new(Some(Arc::new(key)), SortDirection::Descending)
    }

    /// Sorts by the items themselves, through [`ViewItem::sort_value`].
    pub fn by_item(direction: SortDirection) -> Self {
        Self::new(None, direction)
    }

    /// Attaches a name used in debug output.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the level's name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the level's direction.
    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Returns `true` if the level uses a key extractor.
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    fn compare(&self, level: usize, a: &T, b: &T) -> Result<Ordering> {
        let ordering = match &self.key {
            Some(key) => compare_keys(level, &key(a), &key(b))?,
            None => match (a.sort_value(), b.sort_value()) {
                (Some(ka), Some(kb)) => compare_keys(level, &ka, &kb)?,
                _ => {
                    return Err(ViewError::not_comparable(
                        level,
                        "an item without a sort value",
                        "another item",
                    ));
                }
            },
        };
        Ok(self.direction.apply(ordering))
    }
}

/// Orders two keys at one level, before the direction is applied.
///
/// Nulls sort before values and two nulls tie.
fn compare_keys(level: usize, a: &KeyValue, b: &KeyValue) -> Result<Ordering> {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ok(Ordering::Equal),
        (true, false) => Ok(Ordering::Less),
        (false, true) => Ok(Ordering::Greater),
        (false, false) => a
            .try_cmp(b)
            .ok_or_else(|| ViewError::not_comparable(level, a.describe(), b.describe())),
    }
}

/// Composes a list of sort levels into one fallible comparator.
pub struct SortComparer<'a, T> {
    levels: &'a [SortDescription<T>],
}

impl<'a, T: ViewItem> SortComparer<'a, T> {
    /// Creates a comparer over the given levels.
    pub fn new(levels: &'a [SortDescription<T>]) -> Self {
        Self { levels }
    }

    /// Returns `true` if at least one level is configured.
    pub fn is_active(&self) -> bool {
        !self.levels.is_empty()
    }

    /// Compares two items level by level.
    pub fn compare(&self, a: &T, b: &T) -> Result<Ordering> {
        for (level, description) in self.levels.iter().enumerate() {
            let ordering = description.compare(level, a, b)?;
            if ordering != Ordering::Equal {
                return Ok(ordering);
            }
        }
        Ok(Ordering::Equal)
    }

    /// Returns the first position in `items` whose element compares greater
    /// than or equal to `item`.
    ///
    /// `items` must already be sorted by this comparer.
    pub fn find_insert_index(&self, items: &[T], item: &T) -> Result<usize> {
        let (mut low, mut high) = (0, items.len());
        while low < high {
            let mid = low + (high - low) / 2;
            if self.compare(&items[mid], item)? == Ordering::Less {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        Ok(low)
    }

    /// Stably sorts `items`, returning the first comparison failure.
    ///
    /// With no levels configured the input is returned unchanged.
    pub fn sort(&self, items: Vec<T>) -> Result<Vec<T>> {
        if !self.is_active() || items.len() < 2 {
            return Ok(items);
        }
        merge_sort(items, &|a, b| self.compare(a, b))
    }
}

/// Stable merge sort with a fallible comparator.
fn merge_sort<T, F>(mut items: Vec<T>, compare: &F) -> Result<Vec<T>>
where
    F: Fn(&T, &T) -> Result<Ordering>,
{
    if items.len() < 2 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, compare)?;
    let right = merge_sort(right, compare)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare(r, l)? == Ordering::Less,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        if take_right {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    Ok(merged)
}
