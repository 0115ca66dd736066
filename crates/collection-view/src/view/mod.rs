//! Live collection views over observable sources.
//!
//! A [`CollectionView`] presents the items of an [`ItemSource`] filtered,
//! sorted and grouped, and keeps that presentation current as the source
//! changes. Changes are absorbed incrementally where the view's order allows
//! it and reported as fine-grained [`ViewChange`]s; everything else falls
//! back to a full rebuild reported as [`ViewChange::Reset`].
//!
//! # Core Types
//!
//! - `CollectionView`: The view, built with `CollectionView::builder`
//! - `ItemSource` / `ObservableList`: What a view follows
//! - `SortDescription`: One level of the sort order
//! - `GroupDescription`: One level of grouping
//! - `ViewChange`: What observers receive on `ViewSignals::changed`
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────┐ SourceChange ┌──────────────┐  ViewChange  ┌──────────┐
//! │  ItemSource  │─────────────>│ Synchronizer │─────────────>│ Observer │
//! └──────────────┘              └──────────────┘              └──────────┘
//!                                      │
//!                      ┌───────────────┼───────────────┐
//!                      v               v               v
//!               InternalMirror     GroupTree      IndexMapper
//! ```
//!
//! The mirror holds the filtered and sorted items, the group tree
//! partitions them, and the index mapper caches where each top-level group
//! starts.

mod collection_view;
mod config;
mod debug;
mod group;
mod index_map;
mod mirror;
mod notify;
mod sort;
mod source;
mod sync;
mod value;

pub use collection_view::{CollectionView, CollectionViewBuilder};
pub use debug::GroupTreeDebug;
pub use group::{
    GroupChildren, GroupDescription, GroupId, GroupNode, GroupTree, HeaderComparator,
    ItemLocation, KeyConverter, Removal, group_path, header_order,
};
pub use index_map::{GroupPath, IndexMapper};
pub use mirror::{FilterFn, InternalMirror};
pub use notify::{RangeNotifications, ViewChange, ViewSignals};
pub use sort::{KeyFn, SortComparer, SortDescription, SortDirection};
pub use source::{ChangeKind, ItemSource, ObservableList, SourceChange, Subscription};
pub use value::{GroupHeader, KeyValue, NULL_GROUP_NAME, ViewItem};
