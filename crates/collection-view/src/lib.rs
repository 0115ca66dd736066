//! Collection views: filtered, sorted and grouped live projections of an
//! observable collection.
//!
//! This crate builds on `collection-view-core` for signals, change-tracking
//! properties and logging targets.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use collection_view::prelude::*;
//!
//! let list = Arc::new(ObservableList::new(vec!["pear", "apple", "plum", "avocado"]));
//! let view = Arc::new(
//!     CollectionView::builder(list.clone())
//!         .sort(SortDescription::by_item(SortDirection::Ascending))
//!         .group(GroupDescription::new(|s: &&str| KeyValue::from(&s[..1])))
//!         .build()
//!         .unwrap(),
//! );
//! let _subscription = view.attach();
//!
//! assert_eq!(view.to_vec(), vec!["apple", "avocado", "pear", "plum"]);
//!
//! list.remove(1);
//! assert_eq!(view.to_vec(), vec!["avocado", "pear", "plum"]);
//! ```

pub mod error;
pub mod prelude;
pub mod view;

pub use error::{Result, ViewError};
