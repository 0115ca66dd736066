//! Values that know when they change.
//!
//! The owner of a [`Property`] writes through [`Property::set`] and emits its
//! change signal only when the write reports a difference.
//!
//! ```
//! use collection_view_core::{Property, Signal};
//!
//! let count = Property::new(0usize);
//! let count_changed = Signal::<usize>::new();
//!
//! for next in [0, 2, 2, 5] {
//!     if count.set(next) {
//!         count_changed.emit(next);
//!     }
//! }
//! assert_eq!(count.get(), 5);
//! ```

use std::fmt;

use parking_lot::RwLock;

/// A lock-protected value with change detection.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Wraps an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Returns a copy of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Stores `value`, returning `true` if it differs from the old one.
    pub fn set(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current == value {
            return false;
        }
        *current = value;
        true
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Property").field(&*self.value.read()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_reports_only_real_changes() {
        let count = Property::new(3usize);
        assert!(!count.set(3));
        assert!(count.set(4));
        assert!(!count.set(4));
        assert_eq!(count.get(), 4);
    }

    #[test]
    fn test_default_and_debug() {
        let name = Property::<String>::default();
        assert!(name.set("rows".into()));
        assert_eq!(format!("{name:?}"), "Property(\"rows\")");
    }
}
