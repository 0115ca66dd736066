//! Incremental synchronization of a view with its source.
//!
//! [`ViewState`] is the derived data of a view: the mirror, the group tree
//! and the index cache. [`Synchronizer`] folds one [`SourceChange`] into a
//! `ViewState` and reports the resulting [`ViewChange`]s. Changes the state
//! cannot absorb incrementally fall back to a full rebuild from a source
//! snapshot, reported as a single reset.

use collection_view_core::PerfSpan;
use collection_view_core::logging::targets;

use crate::error::{Result, ViewError};

use super::config::ViewConfig;
use super::group::{GroupDescription, GroupTree};
use super::index_map::IndexMapper;
use super::mirror::InternalMirror;
use super::notify::{ChangeBatch, ViewChange};
use super::sort::SortComparer;
use super::source::{ChangeKind, ItemSource, SourceChange};
use super::value::ViewItem;

/// Derived data of a view.
#[derive(Debug, Clone)]
pub(crate) struct ViewState<T> {
    pub(crate) mirror: InternalMirror<T>,
    pub(crate) tree: GroupTree<T>,
    pub(crate) mapper: IndexMapper,
}

impl<T: ViewItem> ViewState<T> {
    /// Filters, sorts and groups `source` from scratch.
    pub(crate) fn build(source: &[T], config: &ViewConfig<T>) -> Result<Self> {
        let _span = PerfSpan::new("rebuild");
        let mirror = InternalMirror::build(source, config.filter.as_ref(), &config.comparer())?;
        Ok(Self::from_mirror(mirror, config))
    }

    /// Like [`Self::build`], but keeps source order. Cannot fail.
    pub(crate) fn unsorted(source: &[T], config: &ViewConfig<T>) -> Self {
        let mirror = InternalMirror::unsorted(source, config.filter.as_ref());
        Self::from_mirror(mirror, config)
    }

    fn from_mirror(mirror: InternalMirror<T>, config: &ViewConfig<T>) -> Self {
        let tree = GroupTree::build(mirror.items(), &config.groups);
        let mapper = IndexMapper::from_tree(&tree);
        tracing::debug!(
            target: targets::VIEW,
            source = mirror.source_len(),
            visible = mirror.len(),
            groups = tree.group_count(),
            "built view state"
        );
        Self {
            mirror,
            tree,
            mapper,
        }
    }

    /// Number of visible items.
    pub(crate) fn count(&self) -> usize {
        self.mapper.count()
    }

    /// Rebuilds the group tree over the current mirror.
    pub(crate) fn regroup(&mut self, groups: &[GroupDescription<T>]) {
        self.tree = GroupTree::build(self.mirror.items(), groups);
        self.mapper.refresh(&self.tree);
    }

    /// Re-sorts the mirror and every leaf group in place. Nothing changes
    /// when a comparison fails.
    pub(crate) fn resort(&mut self, comparer: &SortComparer<'_, T>) -> Result<()> {
        let items = comparer.sort(self.mirror.items().to_vec())?;
        let leaves = self.tree.sorted_leaves(comparer)?;
        self.mirror.set_items(items);
        self.tree.set_leaf_items(leaves)
    }

    /// Checks that the mirror, the tree and the index cache agree.
    pub(crate) fn validate(&self) -> Result<()> {
        self.tree.validate()?;
        if self.tree.len() != self.mirror.len() {
            return Err(ViewError::inconsistent(format!(
                "group tree holds {} items, mirror holds {}",
                self.tree.len(),
                self.mirror.len()
            )));
        }
        if self.mapper.count() != self.tree.len() {
            return Err(ViewError::inconsistent("index cache is stale"));
        }
        Ok(())
    }
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            mirror: InternalMirror::default(),
            tree: GroupTree::new(),
            mapper: IndexMapper::default(),
        }
    }
}

/// Applies one source change to a [`ViewState`].
pub(crate) struct Synchronizer<'a, T: ViewItem> {
    state: &'a mut ViewState<T>,
    config: &'a ViewConfig<T>,
    source: &'a dyn ItemSource<T>,
    batch: ChangeBatch<T>,
}

impl<'a, T: ViewItem> Synchronizer<'a, T> {
    pub(crate) fn new(
        state: &'a mut ViewState<T>,
        config: &'a ViewConfig<T>,
        source: &'a dyn ItemSource<T>,
    ) -> Self {
        Self {
            state,
            config,
            source,
            batch: ChangeBatch::new(config.range_notifications),
        }
    }

    /// Folds `change` into the state and returns the notifications to
    /// publish, in order.
    #[tracing::instrument(
        skip_all,
        target = "collection_view::sync",
        level = "debug",
        fields(kind = ?change.kind)
    )]
    pub(crate) fn apply(mut self, change: &SourceChange<T>) -> Result<Vec<ViewChange<T>>> {
        match change.kind {
            ChangeKind::Add => self.on_add(&change.new_items, change.new_index)?,
            ChangeKind::Remove => self.on_remove(&change.old_items, change.old_index)?,
            ChangeKind::Replace => self.on_replace(
                &change.old_items,
                &change.new_items,
                change.old_index.or(change.new_index),
            )?,
            ChangeKind::Move => {
                self.on_move(change.moved_items(), change.old_index, change.new_index)?
            }
            ChangeKind::Reset => self.rebuild()?,
        }
        self.state.mapper.refresh(&self.state.tree);
        Ok(self.batch.finish())
    }

    fn rebuild(&mut self) -> Result<()> {
        let snapshot = self.source.snapshot();
        *self.state = ViewState::build(&snapshot, self.config)?;
        self.batch.reset();
        Ok(())
    }

    fn escalate(&mut self, reason: &'static str) -> Result<()> {
        tracing::debug!(target: targets::SYNC, reason, "falling back to a full rebuild");
        self.rebuild()
    }

    fn refresh_flags(&mut self) {
        let snapshot = self.source.snapshot();
        self.state
            .mirror
            .refresh_flags(&snapshot, self.config.filter.as_ref());
    }

    /// Start of a `len`-item range, if the range lies within the tracked
    /// source positions.
    fn known_range(&self, index: Option<usize>, len: usize) -> Option<usize> {
        index.filter(|start| start + len <= self.state.mirror.source_len())
    }

    fn on_add(&mut self, items: &[T], index: Option<usize>) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let config = self.config;
        let source_len = self.state.mirror.source_len();
        let at = index.unwrap_or(source_len);
        if at > source_len {
            return self.escalate("add position lies beyond the tracked source");
        }
        if config.is_grouped() {
            return self.escalate("regrouping after add");
        }

        let flags: Vec<bool> = items.iter().map(|item| config.passes(item)).collect();
        let accepted: Vec<T> = items
            .iter()
            .zip(&flags)
            .filter(|(_, keep)| **keep)
            .map(|(item, _)| item.clone())
            .collect();

        if config.is_sorted() {
            // Stage every insertion first so a failed comparison leaves the
            // state untouched.
            let comparer = config.comparer();
            let mut staged = self.state.mirror.items().to_vec();
            let mut placed = Vec::with_capacity(accepted.len());
            for item in accepted {
                let position = comparer.find_insert_index(&staged, &item)?;
                staged.insert(position, item.clone());
                placed.push((position, item));
            }

            self.state.mirror.insert_flags(at, &flags)?;
            self.state.mirror.set_items(staged);
            for (position, item) in placed {
                self.state.tree.insert_implicit(position, vec![item.clone()])?;
                self.batch.added(vec![item], position);
            }
            return Ok(());
        }

        let position = self.state.mirror.source_to_mirror(at);
        self.state.mirror.insert_flags(at, &flags)?;
        if accepted.is_empty() {
            return Ok(());
        }
        self.state.mirror.insert(position, accepted.clone())?;
        self.state.tree.insert_implicit(position, accepted.clone())?;
        self.batch.added(accepted, position);
        Ok(())
    }

    fn on_remove(&mut self, items: &[T], index: Option<usize>) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let known = self.known_range(index, items.len());

        if !self.config.reorders() {
            let Some(start) = known else {
                return self.remove_by_value(items);
            };
            let position = self.state.mirror.source_to_mirror(start);
            let flags = self.state.mirror.remove_flags(start, items.len())?;
            let visible = flags.iter().filter(|keep| **keep).count();
            if visible == 0 {
                return Ok(());
            }
            let removed = self.state.mirror.remove(position, visible)?;
            let dropped = self.state.tree.remove_implicit(position, visible)?;
            if removed != dropped {
                return Err(ViewError::inconsistent(
                    "mirror and implicit group removed different items",
                ));
            }
            self.batch.removed(removed, position);
            return Ok(());
        }

        let flags = match known {
            Some(start) => Some(self.state.mirror.remove_flags(start, items.len())?),
            None => None,
        };
        for (offset, item) in items.iter().enumerate() {
            let visible = match &flags {
                Some(flags) => flags[offset],
                None => self.config.passes(item),
            };
            if !visible {
                continue;
            }
            let removal = self
                .state
                .tree
                .remove_item(item)
                .ok_or_else(|| ViewError::inconsistent("removed item is not in any group"))?;
            self.state
                .mirror
                .remove_item(item)
                .ok_or_else(|| ViewError::inconsistent("removed item is not in the mirror"))?;

            let index = removal.index;
            self.batch.removed(vec![removal.item], index);
            // Each pruned level sits one slot further up than the one below it.
            for (level, (header, depth)) in removal.pruned.into_iter().enumerate() {
                self.batch
                    .header_removed(header, depth, index.saturating_sub(level + 1));
            }
        }
        if flags.is_none() {
            self.refresh_flags();
        }
        Ok(())
    }

    fn remove_by_value(&mut self, items: &[T]) -> Result<()> {
        for item in items {
            if !self.config.passes(item) {
                continue;
            }
            let position = self
                .state
                .mirror
                .position(item)
                .ok_or_else(|| ViewError::inconsistent("removed item is not in the mirror"))?;
            self.state.mirror.remove(position, 1)?;
            self.state.tree.remove_implicit(position, 1)?;
            self.batch.removed(vec![item.clone()], position);
        }
        self.refresh_flags();
        Ok(())
    }

    fn on_replace(&mut self, old: &[T], new: &[T], index: Option<usize>) -> Result<()> {
        let config = self.config;
        if config.reorders() {
            return self.escalate("replace in a sorted or grouped view");
        }
        if old.len() != new.len() {
            return self.escalate("replace changes the item count");
        }
        if new.is_empty() {
            return Ok(());
        }
        let known = self.known_range(index, new.len());

        if let (None, Some(start)) = (&config.filter, known) {
            let position = self.state.mirror.source_to_mirror(start);
            for (offset, item) in new.iter().enumerate() {
                self.state.mirror.replace(position + offset, item.clone())?;
                self.state
                    .tree
                    .replace_implicit(position + offset, item.clone())?;
            }
            self.batch.replaced(old.to_vec(), new.to_vec(), position);
            return Ok(());
        }

        for (offset, (old_item, new_item)) in old.iter().zip(new).enumerate() {
            let (was_visible, position) = match known {
                Some(start) => (
                    self.state.mirror.is_included(start + offset).unwrap_or(false),
                    self.state.mirror.source_to_mirror(start + offset),
                ),
                None => match self.state.mirror.position(old_item) {
                    Some(position) => (true, position),
                    None => (false, 0),
                },
            };
            match (was_visible, config.passes(new_item)) {
                (false, false) => {}
                (true, true) => {
                    let previous = self.state.mirror.replace(position, new_item.clone())?;
                    self.state.tree.replace_implicit(position, new_item.clone())?;
                    self.batch
                        .replaced(vec![previous], vec![new_item.clone()], position);
                }
                _ => return self.escalate("replace changes filter membership"),
            }
        }
        Ok(())
    }

    fn on_move(
        &mut self,
        items: &[T],
        old_index: Option<usize>,
        new_index: Option<usize>,
    ) -> Result<()> {
        let len = items.len();
        if len == 0 {
            return Ok(());
        }
        let (Some(from), Some(to)) = (old_index, new_index) else {
            return self.escalate("move without positions");
        };
        let source_len = self.state.mirror.source_len();
        if from + len > source_len || to + len > source_len {
            return self.escalate("move position lies beyond the tracked source");
        }
        if from == to {
            return Ok(());
        }

        // Replay the block move one source position at a time.
        for offset in 0..len {
            if to > from {
                self.move_one(from, to + len - 1)?;
            } else {
                self.move_one(from + offset, to + offset)?;
            }
        }
        Ok(())
    }

    fn move_one(&mut self, from: usize, to: usize) -> Result<()> {
        let visible = self.state.mirror.is_included(from).unwrap_or(false);
        let old_position = self.state.mirror.source_to_mirror(from);
        self.state.mirror.move_flag(from, to)?;
        // A sorted view's order does not depend on source positions.
        if !visible || self.config.is_sorted() {
            return Ok(());
        }

        let new_position = self.state.mirror.source_to_mirror(to);
        if old_position == new_position {
            return Ok(());
        }
        let item = self
            .state
            .mirror
            .items()
            .get(old_position)
            .cloned()
            .ok_or_else(|| ViewError::out_of_range(old_position, self.state.mirror.len()))?;
        self.state.mirror.move_item(old_position, new_position)?;

        if !self.config.is_grouped() {
            self.state.tree.move_implicit(old_position, new_position)?;
            self.batch.moved(item, old_position, new_position);
            return Ok(());
        }
        self.move_within_group(item, old_position, new_position)
    }

    /// Reorders a moved item inside its leaf group, placing it just past
    /// the nearest group peer it overtook in the mirror.
    fn move_within_group(&mut self, item: T, old_position: usize, new_position: usize) -> Result<()> {
        let config = self.config;
        let path = config.group_path(&item);
        let mirror = self.state.mirror.items();
        let same_group = |candidate: &&T| config.group_path(candidate) == path;
        let peer = if new_position > old_position {
            (old_position..new_position)
                .rev()
                .map(|i| &mirror[i])
                .find(same_group)
        } else {
            (new_position + 1..=old_position)
                .map(|i| &mirror[i])
                .find(same_group)
        }
        .cloned();
        let Some(peer) = peer else {
            return Ok(());
        };

        let location = self
            .state
            .tree
            .find_item(&item)
            .ok_or_else(|| ViewError::inconsistent("moved item is not in any group"))?;
        let peer_offset = self
            .state
            .tree
            .node(location.group)
            .and_then(|node| node.items())
            .and_then(|items| items.iter().position(|candidate| *candidate == peer))
            .ok_or_else(|| ViewError::inconsistent("group peer of a moved item is missing"))?;

        self.state
            .tree
            .move_within_leaf(location.group, location.offset, peer_offset)?;
        let new_index = location.index - location.offset + peer_offset;
        self.batch.moved(item, location.index, new_index);
        Ok(())
    }
}
