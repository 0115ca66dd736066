//! Prelude module for collection views.
//!
//! ```ignore
//! use collection_view::prelude::*;
//! ```

pub use crate::error::{Result, ViewError};
pub use crate::view::{
    ChangeKind, CollectionView, GroupDescription, GroupHeader, ItemSource, KeyValue,
    ObservableList, RangeNotifications, SortDescription, SortDirection, SourceChange,
    Subscription, ViewChange, ViewItem, header_order,
};
pub use collection_view_core::{Property, Signal, TreeFormatOptions};
