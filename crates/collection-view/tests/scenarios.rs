//! End-to-end behavior of a view attached to an observable list.

use std::sync::Arc;

use collection_view::prelude::*;
use collection_view::view::{CollectionViewBuilder, GroupPath};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
struct Record {
    cat: Option<&'static str>,
    v: i64,
}

impl ViewItem for Record {}

fn rec(cat: &'static str, v: i64) -> Record {
    Record { cat: Some(cat), v }
}

fn by_cat() -> GroupDescription<Record> {
    GroupDescription::new(|r: &Record| KeyValue::from(r.cat))
}

fn by_v() -> SortDescription<Record> {
    SortDescription::ascending(|r: &Record| KeyValue::from(r.v))
}

fn values(view: &CollectionView<Record>) -> Vec<i64> {
    view.iter().map(|r| r.v).collect()
}

struct Harness<T: ViewItem> {
    list: Arc<ObservableList<T>>,
    view: Arc<CollectionView<T>>,
    log: Arc<Mutex<Vec<ViewChange<T>>>>,
    _subscription: Subscription,
}

impl<T: ViewItem> Harness<T> {
    fn new<F>(items: Vec<T>, configure: F) -> Self
    where
        F: FnOnce(CollectionViewBuilder<T>) -> CollectionViewBuilder<T>,
    {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("collection_view=trace")
            .with_test_writer()
            .try_init();

        let list = Arc::new(ObservableList::new(items));
        let view = Arc::new(
            configure(CollectionView::builder(list.clone()))
                .build()
                .unwrap(),
        );
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();
        view.signals()
            .changed
            .connect(move |change| log_clone.lock().push(change.clone()));
        let subscription = view.attach();
        Self {
            list,
            view,
            log,
            _subscription: subscription,
        }
    }

    fn take_log(&self) -> Vec<ViewChange<T>> {
        std::mem::take(&mut *self.log.lock())
    }
}

#[test]
fn test_plain_view_removes_by_source_index() {
    let h = Harness::new(vec![3i64, 1, 2], |b| b);
    assert_eq!(h.view.to_vec(), vec![3, 1, 2]);

    h.list.remove(1);
    assert_eq!(
        h.take_log(),
        vec![ViewChange::Removed {
            items: vec![1],
            index: 1
        }]
    );
    assert_eq!(h.view.to_vec(), vec![3, 2]);
}

#[test]
fn test_groups_in_first_seen_order() {
    let h = Harness::new(vec![rec("a", 1), rec("b", 2), rec("a", 3)], |b| {
        b.group(by_cat())
    });

    let groups = h.view.groups();
    assert_eq!(groups.len(), 2);
    assert_eq!(h.view.group_header(groups[0]), Some(GroupHeader::from("a")));
    assert_eq!(h.view.group_header(groups[1]), Some(GroupHeader::from("b")));
    assert_eq!(values(&h.view), vec![1, 3, 2]);
    assert_eq!(h.view.get(1).unwrap().v, 3);
    assert_eq!(
        h.view.group_path(2),
        Some(GroupPath {
            group_index: 1,
            offset: 0
        })
    );
}

#[test]
fn test_sorted_add_lands_in_order() {
    let h = Harness::new(vec![rec("a", 1), rec("b", 2), rec("a", 3)], |b| b.sort(by_v()));
    assert_eq!(values(&h.view), vec![1, 2, 3]);

    h.list.push(rec("c", 0));
    assert_eq!(
        h.take_log(),
        vec![ViewChange::Added {
            items: vec![rec("c", 0)],
            index: 0
        }]
    );
    assert_eq!(values(&h.view), vec![0, 1, 2, 3]);
}

#[test]
fn test_removing_last_item_of_group_prunes_header() {
    let h = Harness::new(vec![rec("a", 1), rec("b", 2), rec("a", 3)], |b| {
        b.group(by_cat())
    });

    h.list.remove(0);
    assert_eq!(
        h.take_log(),
        vec![ViewChange::Removed {
            items: vec![rec("a", 1)],
            index: 0
        }]
    );

    h.list.remove(1);
    assert_eq!(
        h.take_log(),
        vec![
            ViewChange::Removed {
                items: vec![rec("a", 3)],
                index: 0
            },
            ViewChange::HeaderRemoved {
                header: GroupHeader::from("a"),
                depth: 0,
                index: 0
            },
        ]
    );
    assert_eq!(values(&h.view), vec![2]);
    let groups = h.view.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(h.view.group_header(groups[0]), Some(GroupHeader::from("b")));
    h.view.check_consistency().unwrap();
}

#[test]
fn test_pruned_header_sits_before_the_removed_item() {
    let h = Harness::new(vec![rec("b", 2), rec("a", 3)], |b| b.group(by_cat()));
    assert_eq!(values(&h.view), vec![2, 3]);

    h.list.remove(1);
    assert_eq!(
        h.take_log(),
        vec![
            ViewChange::Removed {
                items: vec![rec("a", 3)],
                index: 1
            },
            ViewChange::HeaderRemoved {
                header: GroupHeader::from("a"),
                depth: 0,
                index: 0
            },
        ]
    );
    h.view.check_consistency().unwrap();
}

#[test]
fn test_nested_prune_steps_up_one_index_per_level() {
    let h = Harness::new(vec![rec("b", 1), rec("a", 12)], |b| {
        b.group(by_cat())
            .group(GroupDescription::new(|r: &Record| KeyValue::from(r.v / 10)))
    });
    assert_eq!(values(&h.view), vec![1, 12]);

    h.list.remove(1);
    assert_eq!(
        h.take_log(),
        vec![
            ViewChange::Removed {
                items: vec![rec("a", 12)],
                index: 1
            },
            ViewChange::HeaderRemoved {
                header: GroupHeader::from_key(KeyValue::from(1i64)),
                depth: 1,
                index: 0
            },
            // One past the top of the view; clamped rather than wrapped.
            ViewChange::HeaderRemoved {
                header: GroupHeader::from("a"),
                depth: 0,
                index: 0
            },
        ]
    );
    assert_eq!(h.view.groups().len(), 1);
    h.view.check_consistency().unwrap();
}

#[test]
fn test_clearing_sorts_restores_source_order() {
    let h = Harness::new(vec![rec("a", 3), rec("b", 1), rec("a", 2)], |b| b.sort(by_v()));
    assert_eq!(values(&h.view), vec![1, 2, 3]);

    h.view.clear_sorts().unwrap();
    assert_eq!(h.take_log(), vec![ViewChange::Reset]);
    assert_eq!(values(&h.view), vec![3, 1, 2]);
}

#[test]
fn test_null_group_keys_share_the_nulls_group() {
    let h = Harness::new(
        vec![
            Record { cat: None, v: 1 },
            rec("x", 2),
            Record { cat: None, v: 3 },
        ],
        |b| b.group(by_cat()),
    );
    let groups = h.view.groups();
    assert_eq!(h.view.group_header(groups[0]), Some(GroupHeader::Nulls));
    assert_eq!(GroupHeader::Nulls.to_string(), "Nulls");
    assert_eq!(values(&h.view), vec![1, 3, 2]);
}

#[test]
fn test_nested_groups_with_header_order() {
    let h = Harness::new(
        vec![rec("b", 1), rec("a", 12), rec("b", 11), rec("a", 2)],
        |b| {
            b.group(by_cat().with_header_order(header_order::ascending()))
                .group(
                    GroupDescription::new(|r: &Record| KeyValue::from(r.v / 10))
                        .with_header_order(header_order::descending()),
                )
        },
    );
    assert_eq!(values(&h.view), vec![12, 2, 11, 1]);
    let text = h.view.debug_tree(&TreeFormatOptions::default());
    assert!(text.starts_with("4 items in 6 groups"));
}

#[test]
fn test_filter_hides_and_tracks_items() {
    let h = Harness::new(vec![1i64, 2, 3, 4], |b| b.filter(|n| n % 2 == 0));
    assert_eq!(h.view.to_vec(), vec![2, 4]);

    h.list.insert(0, 6);
    h.list.insert(0, 7);
    assert_eq!(
        h.take_log(),
        vec![ViewChange::Added {
            items: vec![6],
            index: 0
        }]
    );

    h.list.remove(0);
    assert!(h.take_log().is_empty());
    assert_eq!(h.view.to_vec(), vec![6, 2, 4]);

    h.list.set(2, 8);
    assert_eq!(
        h.take_log(),
        vec![ViewChange::Replaced {
            old_items: vec![2],
            new_items: vec![8],
            index: 1
        }]
    );
    assert_eq!(h.view.to_vec(), vec![6, 8, 4]);
}

#[test]
fn test_replace_in_sorted_view_rebuilds() {
    let h = Harness::new(vec![1i64, 2, 3], |b| {
        b.sort(SortDescription::by_item(SortDirection::Descending))
    });
    h.list.set(0, 9);
    assert_eq!(h.take_log(), vec![ViewChange::Reset]);
    assert_eq!(h.view.to_vec(), vec![9, 3, 2]);
}

#[test]
fn test_move_in_source_order() {
    let h = Harness::new(vec![1i64, 2, 3, 4], |b| b);
    h.list.move_item(0, 3);
    assert_eq!(
        h.take_log(),
        vec![ViewChange::Moved {
            item: 1,
            old_index: 0,
            new_index: 3
        }]
    );
    assert_eq!(h.view.to_vec(), vec![2, 3, 4, 1]);
}

#[test]
fn test_move_within_group() {
    let h = Harness::new(
        vec![rec("a", 1), rec("b", 2), rec("a", 3), rec("b", 4)],
        |b| b.group(by_cat()),
    );
    assert_eq!(values(&h.view), vec![1, 3, 2, 4]);

    h.list.move_item(0, 3);
    assert_eq!(
        h.take_log(),
        vec![ViewChange::Moved {
            item: rec("a", 1),
            old_index: 0,
            new_index: 1
        }]
    );
    assert_eq!(values(&h.view), vec![3, 1, 2, 4]);

    // Moving past items of other groups only leaves the visible order alone.
    h.list.move_item(0, 1);
    assert!(h.take_log().is_empty());
    h.view.check_consistency().unwrap();
}

#[test]
fn test_unsupported_range_notifications() {
    let h = Harness::new(vec![1i64, 2], |b| {
        b.range_notifications(RangeNotifications::Unsupported)
    });
    h.list.insert_range(1, vec![7, 8]);
    assert_eq!(
        h.take_log(),
        vec![
            ViewChange::Added {
                items: vec![7],
                index: 1
            },
            ViewChange::Added {
                items: vec![8],
                index: 2
            },
        ]
    );

    h.list.remove_range(0, 2);
    assert_eq!(h.take_log(), vec![ViewChange::Reset]);
    assert_eq!(h.view.to_vec(), vec![8, 2]);
}

#[test]
fn test_source_reset() {
    let h = Harness::new(vec![1i64, 2], |b| b);
    h.list.reset(vec![5]);
    assert_eq!(h.take_log(), vec![ViewChange::Reset]);
    assert_eq!(h.view.to_vec(), vec![5]);
    assert_eq!(h.view.count(), 1);
}

#[test]
fn test_handlers_can_read_the_view() {
    let h = Harness::new(vec![1i64], |b| b);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let view = Arc::downgrade(&h.view);
    h.view.signals().changed.connect(move |_| {
        if let Some(view) = view.upgrade() {
            seen_clone.lock().push(view.count());
        }
    });

    h.list.push(2);
    h.list.push(3);
    assert_eq!(*seen.lock(), vec![2, 3]);
}

#[test]
fn test_incomparable_add_is_reported() {
    let h = Harness::new(vec![KeyValue::from(1), KeyValue::from(2)], |b| {
        b.sort(SortDescription::by_item(SortDirection::Ascending))
    });
    let failures = Arc::new(Mutex::new(Vec::new()));
    let failures_clone = failures.clone();
    h.view
        .signals()
        .sync_failed
        .connect(move |err| failures_clone.lock().push(err.clone()));

    h.list.push(KeyValue::from("text"));
    assert_eq!(failures.lock().len(), 1);
    assert!(matches!(failures.lock()[0], ViewError::NotComparable { .. }));
    assert!(h.take_log().is_empty());
    assert_eq!(h.view.to_vec(), vec![KeyValue::from(1), KeyValue::from(2)]);
}
