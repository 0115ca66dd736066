//! Group descriptions and the group tree.
//!
//! A grouped view partitions its items by one key per [`GroupDescription`].
//! The partition is stored as a [`GroupTree`]: an arena of [`GroupNode`]s
//! keyed by [`GroupId`], where inner nodes hold subgroups and leaf nodes hold
//! items. The depth-first concatenation of the leaves is the view's visible
//! sequence.
//!
//! An ungrouped view keeps a single implicit leaf with no header, so both
//! cases share the same traversal code. A view with no items has no groups
//! at all.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use slotmap::{SlotMap, new_key_type};

use crate::error::{Result, ViewError};

use super::sort::{KeyFn, SortComparer};
use super::value::{GroupHeader, KeyValue, ViewItem};

new_key_type! {
    /// Identifies a group within a [`GroupTree`].
    ///
    /// Ids are invalidated whenever the tree is rebuilt.
    pub struct GroupId;
}

/// Orders sibling group headers.
pub type HeaderComparator = Arc<dyn Fn(&GroupHeader, &GroupHeader) -> Ordering + Send + Sync>;

/// Rewrites a raw group key before it becomes a header.
///
/// Receives the key and the grouping level.
pub type KeyConverter = Arc<dyn Fn(KeyValue, usize) -> KeyValue + Send + Sync>;

/// Stock header comparators, ordering by the header's display text.
pub mod header_order {
    use std::sync::Arc;

    use super::{GroupHeader, HeaderComparator};

    /// Orders headers by display text, A to Z.
    pub fn ascending() -> HeaderComparator {
        Arc::new(|a: &GroupHeader, b: &GroupHeader| a.to_string().cmp(&b.to_string()))
    }

    /// Orders headers by display text, Z to A.
    pub fn descending() -> HeaderComparator {
        Arc::new(|a: &GroupHeader, b: &GroupHeader| b.to_string().cmp(&a.to_string()))
    }
}

/// One level of a view's grouping.
///
/// Items with equal keys at a level share a group. Groups appear in the
/// order their first item appears in the view unless a header comparator is
/// set, in which case the level's siblings are stably sorted by it.
pub struct GroupDescription<T> {
    key: Option<KeyFn<T>>,
    converter: Option<KeyConverter>,
    header_comparator: Option<HeaderComparator>,
    name: Option<String>,
}

impl<T> Clone for GroupDescription<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            converter: self.converter.clone(),
            header_comparator: self.header_comparator.clone(),
            name: self.name.clone(),
        }
    }
}

impl<T> fmt::Debug for GroupDescription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupDescription")
            .field("name", &self.name)
            .field("has_key", &self.key.is_some())
            .field("has_converter", &self.converter.is_some())
            .field("has_header_comparator", &self.header_comparator.is_some())
            .finish()
    }
}

impl<T: ViewItem> GroupDescription<T> {
    /// Groups by the extracted key.
    pub fn new<F>(key: F) -> Self
    where
        F: Fn(&T) -> KeyValue + Send + Sync + 'static,
    {
        Self {
            key: Some(Arc::new(key)),
            converter: None,
            header_comparator: None,
            name: None,
        }
    }

    /// Groups by the items' own [`ViewItem::sort_value`]; items without one
    /// land in the null group.
    pub fn by_item() -> Self {
        Self {
            key: None,
            converter: None,
            header_comparator: None,
            name: None,
        }
    }

    /// Sets a converter applied to each raw key.
    pub fn with_converter<F>(mut self, converter: F) -> Self
    where
        F: Fn(KeyValue, usize) -> KeyValue + Send + Sync + 'static,
    {
        self.converter = Some(Arc::new(converter));
        self
    }

    /// Sets the comparator used to order this level's sibling groups.
    pub fn with_header_order(mut self, comparator: HeaderComparator) -> Self {
        self.header_comparator = Some(comparator);
        self
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

    /// Returns `true` if sibling groups at this level are sorted.
    pub fn has_header_order(&self) -> bool {
        self.header_comparator.is_some()
    }

    /// Computes the group key of `item` at `level`.
    pub fn group_key(&self, item: &T, level: usize) -> KeyValue {
        let raw = match &self.key {
            Some(key) => key(item),
            None => item.sort_value().unwrap_or_default(),
        };
        match &self.converter {
            Some(convert) => convert(raw, level),
            None => raw,
        }
    }

    /// Computes the header of the group `item` belongs to at `level`.
    pub fn header_for(&self, item: &T, level: usize) -> GroupHeader {
        GroupHeader::from_key(self.group_key(item, level))
    }
}

/// Computes the header path of `item` through every grouping level.
pub fn group_path<T: ViewItem>(levels: &[GroupDescription<T>], item: &T) -> Vec<GroupHeader> {
    levels
        .iter()
        .enumerate()
        .map(|(level, description)| description.header_for(item, level))
        .collect()
}

/// Contents of a group node.
#[derive(Debug, Clone)]
pub enum GroupChildren<T> {
    /// A leaf group holding items.
    Items(Vec<T>),
    /// An inner group holding subgroups.
    Groups(Vec<GroupId>),
}

/// A single group in a [`GroupTree`].
#[derive(Debug, Clone)]
pub struct GroupNode<T> {
    header: Option<GroupHeader>,
    depth: usize,
    parent: Option<GroupId>,
    children: GroupChildren<T>,
    count: usize,
}

impl<T> GroupNode<T> {
    /// The group's header; `None` for the implicit group of an ungrouped view.
    pub fn header(&self) -> Option<&GroupHeader> {
        self.header.as_ref()
    }

    /// The grouping level, starting at 0 for top-level groups.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The enclosing group, or `None` for a top-level group.
    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    /// Total number of items in this group and its subgroups.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns `true` if the group holds items rather than subgroups.
    pub fn is_leaf(&self) -> bool {
        matches!(self.children, GroupChildren::Items(_))
    }

    /// The items of a leaf group.
    pub fn items(&self) -> Option<&[T]> {
        match &self.children {
            GroupChildren::Items(items) => Some(items),
            GroupChildren::Groups(_) => None,
        }
    }

    /// The subgroups of an inner group.
    pub fn subgroups(&self) -> Option<&[GroupId]> {
        match &self.children {
            GroupChildren::Items(_) => None,
            GroupChildren::Groups(ids) => Some(ids),
        }
    }
}

/// Where an item sits in a [`GroupTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemLocation {
    /// The leaf group holding the item.
    pub group: GroupId,
    /// Position inside the leaf group.
    pub offset: usize,
    /// Position in the view's flat sequence.
    pub index: usize,
}

/// Outcome of removing one item from a [`GroupTree`].
#[derive(Debug, Clone, PartialEq)]
pub struct Removal<T> {
    /// The removed item.
    pub item: T,
    /// The item's flat index before removal.
    pub index: usize,
    /// Headers of groups that became empty and were pruned, innermost
    /// first, with their depth.
    pub pruned: Vec<(GroupHeader, usize)>,
}

/// Arena-backed tree of groups.
#[derive(Debug, Clone)]
pub struct GroupTree<T> {
    nodes: SlotMap<GroupId, GroupNode<T>>,
    roots: Vec<GroupId>,
}

impl<T> Default for GroupTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> GroupTree<T> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            roots: Vec::new(),
        }
    }

    /// Top-level groups in display order.
    pub fn roots(&self) -> &[GroupId] {
        &self.roots
    }

    /// Looks up a group.
    pub fn node(&self, id: GroupId) -> Option<&GroupNode<T>> {
        self.nodes.get(id)
    }

    /// Total number of items.
    pub fn len(&self) -> usize {
        self.roots.iter().map(|id| self.nodes[*id].count).sum()
    }

    /// Returns `true` if the tree holds no items.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of groups at every depth.
    pub fn group_count(&self) -> usize {
        self.nodes.len()
    }

    /// Leaf groups in depth-first order.
    pub fn leaf_groups(&self) -> Vec<GroupId> {
        let mut leaves = Vec::new();
        for &root in &self.roots {
            self.collect_leaves(root, &mut leaves);
        }
        leaves
    }

    fn collect_leaves(&self, id: GroupId, out: &mut Vec<GroupId>) {
        match &self.nodes[id].children {
            GroupChildren::Items(_) => out.push(id),
            GroupChildren::Groups(children) => {
                for &child in children {
                    self.collect_leaves(child, out);
                }
            }
        }
    }

    /// Iterates the items in visible order.
    pub fn leaves(&self) -> impl Iterator<Item = &T> + '_ {
        self.leaf_groups()
            .into_iter()
            .flat_map(move |id| self.nodes[id].items().unwrap_or(&[]).iter())
    }

    /// Resolves a flat index to its leaf group and the offset inside it.
    pub fn locate(&self, index: usize) -> Option<(GroupId, usize)> {
        let mut remaining = index;
        let mut siblings: &[GroupId] = &self.roots;
        'descend: loop {
            for &id in siblings {
                let node = &self.nodes[id];
                if remaining < node.count {
                    match &node.children {
                        GroupChildren::Items(_) => return Some((id, remaining)),
                        GroupChildren::Groups(children) => {
                            siblings = children;
                            continue 'descend;
                        }
                    }
                }
                remaining -= node.count;
            }
            return None;
        }
    }

    /// Returns the item at a flat index.
    pub fn item_at(&self, index: usize) -> Option<&T> {
        let (leaf, offset) = self.locate(index)?;
        self.nodes[leaf].items()?.get(offset)
    }

    fn children_of(&self, parent: Option<GroupId>) -> &[GroupId] {
        match parent {
            None => &self.roots,
            Some(id) => self.nodes[id].subgroups().unwrap_or(&[]),
        }
    }

    fn create_group(
        &mut self,
        parent: Option<GroupId>,
        header: Option<GroupHeader>,
        depth: usize,
        leaf: bool,
    ) -> GroupId {
        let children = if leaf {
            GroupChildren::Items(Vec::new())
        } else {
            GroupChildren::Groups(Vec::new())
        };
        let id = self.nodes.insert(GroupNode {
            header,
            depth,
            parent,
            children,
            count: 0,
        });
        match parent {
            None => self.roots.push(id),
            Some(parent) => {
                if let GroupChildren::Groups(ids) = &mut self.nodes[parent].children {
                    ids.push(id);
                }
            }
        }
        id
    }

    fn grow(&mut self, id: GroupId, by: usize) {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &mut self.nodes[current];
            node.count += by;
            cursor = node.parent;
        }
    }

    /// Lowers counts from `id` up to its root, then prunes emptied groups
    /// bottom-up. Returns the pruned headers, innermost first.
    fn shrink(&mut self, id: GroupId, by: usize) -> Vec<(GroupHeader, usize)> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &mut self.nodes[current];
            node.count = node.count.saturating_sub(by);
            cursor = node.parent;
        }

        let mut pruned = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if self.nodes[current].count > 0 {
                break;
            }
            let Some(node) = self.nodes.remove(current) else {
                break;
            };
            self.detach(current, node.parent);
            if let Some(header) = node.header {
                pruned.push((header, node.depth));
            }
            cursor = node.parent;
        }
        pruned
    }

    fn detach(&mut self, id: GroupId, parent: Option<GroupId>) {
        match parent {
            None => self.roots.retain(|root| *root != id),
            Some(parent) => {
                if let Some(GroupNode {
                    children: GroupChildren::Groups(ids),
                    ..
                }) = self.nodes.get_mut(parent)
                {
                    ids.retain(|child| *child != id);
                }
            }
        }
    }

    fn leaf_items_mut(&mut self, leaf: GroupId) -> Result<&mut Vec<T>> {
        match self.nodes.get_mut(leaf).map(|node| &mut node.children) {
            Some(GroupChildren::Items(items)) => Ok(items),
            Some(GroupChildren::Groups(_)) => {
                Err(ViewError::inconsistent("expected a leaf group, found an inner group"))
            }
            None => Err(ViewError::inconsistent("leaf group no longer exists")),
        }
    }

    fn implicit_leaf(&self) -> Option<GroupId> {
        match self.roots.as_slice() {
            [id] if self.nodes[*id].header.is_none() => Some(*id),
            _ => None,
        }
    }

    /// Inserts items into the implicit group of an ungrouped tree, creating
    /// the group if the tree was empty.
    pub fn insert_implicit(&mut self, index: usize, items: Vec<T>) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let leaf = match self.implicit_leaf() {
            Some(id) => id,
            None if self.roots.is_empty() => self.create_group(None, None, 0, true),
            None => return Err(ViewError::inconsistent("positional insert into a grouped tree")),
        };
        let added = items.len();
        let existing = self.leaf_items_mut(leaf)?;
        if index > existing.len() {
            return Err(ViewError::out_of_range(index, existing.len()));
        }
        existing.splice(index..index, items);
        self.grow(leaf, added);
        Ok(())
    }

    /// Removes `len` items from the implicit group, dropping the group once
    /// it is empty.
    pub fn remove_implicit(&mut self, index: usize, len: usize) -> Result<Vec<T>> {
        let leaf = self
            .implicit_leaf()
            .ok_or_else(|| ViewError::inconsistent("positional remove from a grouped tree"))?;
        let existing = self.leaf_items_mut(leaf)?;
        if index + len > existing.len() {
            return Err(ViewError::out_of_range(index + len, existing.len()));
        }
        let removed: Vec<T> = existing.drain(index..index + len).collect();
        self.shrink(leaf, len);
        Ok(removed)
    }

    /// Replaces the item at `index` in the implicit group.
    pub fn replace_implicit(&mut self, index: usize, item: T) -> Result<T> {
        let leaf = self
            .implicit_leaf()
            .ok_or_else(|| ViewError::inconsistent("positional replace in a grouped tree"))?;
        let existing = self.leaf_items_mut(leaf)?;
        let len = existing.len();
        let slot = existing
            .get_mut(index)
            .ok_or_else(|| ViewError::out_of_range(index, len))?;
        Ok(std::mem::replace(slot, item))
    }

    /// Moves an item inside the implicit group.
    pub fn move_implicit(&mut self, from: usize, to: usize) -> Result<()> {
        let leaf = self
            .implicit_leaf()
            .ok_or_else(|| ViewError::inconsistent("positional move in a grouped tree"))?;
        self.move_within_leaf(leaf, from, to)
    }

    /// Moves an item inside one leaf group. `to` is the item's final offset.
    pub fn move_within_leaf(&mut self, leaf: GroupId, from: usize, to: usize) -> Result<()> {
        let items = self.leaf_items_mut(leaf)?;
        let len = items.len();
        if from >= len || to >= len {
            return Err(ViewError::out_of_range(from.max(to), len));
        }
        let item = items.remove(from);
        items.insert(to, item);
        Ok(())
    }

    /// Replaces the items of every listed leaf group.
    ///
    /// Each replacement must hold the same number of items as the group.
    pub fn set_leaf_items(&mut self, updates: Vec<(GroupId, Vec<T>)>) -> Result<()> {
        for (leaf, items) in updates {
            let existing = self.leaf_items_mut(leaf)?;
            if existing.len() != items.len() {
                return Err(ViewError::inconsistent("leaf replacement changes the group size"));
            }
            *existing = items;
        }
        Ok(())
    }

    /// Checks parent links, depths and counts, and that no group is empty.
    pub fn validate(&self) -> Result<()> {
        let mut reachable = 0;
        for &root in &self.roots {
            self.validate_node(root, None, 0, &mut reachable)?;
        }
        if reachable != self.nodes.len() {
            return Err(ViewError::inconsistent(format!(
                "{} groups are not reachable from the roots",
                self.nodes.len() - reachable
            )));
        }
        Ok(())
    }

    fn validate_node(
        &self,
        id: GroupId,
        parent: Option<GroupId>,
        depth: usize,
        reachable: &mut usize,
    ) -> Result<()> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| ViewError::inconsistent("dangling group id"))?;
        *reachable += 1;

        if node.parent != parent {
            return Err(ViewError::inconsistent("group has a stale parent link"));
        }
        if node.depth != depth {
            return Err(ViewError::inconsistent(format!(
                "group at depth {depth} records depth {}",
                node.depth
            )));
        }
        if node.count == 0 {
            return Err(ViewError::inconsistent("empty group left in the tree"));
        }

        let actual = match &node.children {
            GroupChildren::Items(items) => items.len(),
            GroupChildren::Groups(children) => {
                let mut total = 0;
                for &child in children {
                    self.validate_node(child, Some(id), depth + 1, reachable)?;
                    total += self.nodes[child].count;
                }
                total
            }
        };
        if actual != node.count {
            return Err(ViewError::inconsistent(format!(
                "group count {} does not match its {actual} items",
                node.count
            )));
        }
        Ok(())
    }
}

impl<T: ViewItem> GroupTree<T> {
    /// Builds a tree over `items`, which are already filtered and sorted.
    pub fn build(items: &[T], levels: &[GroupDescription<T>]) -> Self {
        let mut tree = Self::new();
        if levels.is_empty() {
            if !items.is_empty() {
                let root = tree.create_group(None, None, 0, true);
                if let GroupChildren::Items(slot) = &mut tree.nodes[root].children {
                    slot.extend_from_slice(items);
                }
                tree.grow(root, items.len());
            }
            return tree;
        }

        for item in items {
            let path = group_path(levels, item);
            tree.insert_along(&path, item.clone());
        }
        tree.sort_headers(levels);
        tree
    }

    fn insert_along(&mut self, path: &[GroupHeader], item: T) {
        let mut parent = None;
        for (depth, header) in path.iter().enumerate() {
            let existing = self
                .children_of(parent)
                .iter()
                .copied()
                .find(|id| self.nodes[*id].header.as_ref() == Some(header));
            let id = match existing {
                Some(id) => id,
                None => {
                    let leaf = depth + 1 == path.len();
                    self.create_group(parent, Some(header.clone()), depth, leaf)
                }
            };
            parent = Some(id);
        }

        if let Some(leaf) = parent {
            if let GroupChildren::Items(items) = &mut self.nodes[leaf].children {
                items.push(item);
            }
            self.grow(leaf, 1);
        }
    }

    fn sort_headers(&mut self, levels: &[GroupDescription<T>]) {
        for (depth, level) in levels.iter().enumerate() {
            let Some(comparator) = level.header_comparator.clone() else {
                continue;
            };
            if depth == 0 {
                let mut roots = std::mem::take(&mut self.roots);
                self.sort_ids(&mut roots, &comparator);
                self.roots = roots;
                continue;
            }

            let parents: Vec<GroupId> = self
                .nodes
                .iter()
                .filter(|(_, node)| node.depth + 1 == depth)
                .map(|(id, _)| id)
                .collect();
            for parent in parents {
                let mut ids = match &mut self.nodes[parent].children {
                    GroupChildren::Groups(ids) => std::mem::take(ids),
                    GroupChildren::Items(_) => continue,
                };
                self.sort_ids(&mut ids, &comparator);
                if let GroupChildren::Groups(slot) = &mut self.nodes[parent].children {
                    *slot = ids;
                }
            }
        }
    }

    fn sort_ids(&self, ids: &mut [GroupId], comparator: &HeaderComparator) {
        ids.sort_by(|a, b| match (&self.nodes[*a].header, &self.nodes[*b].header) {
            (Some(left), Some(right)) => comparator(left, right),
            _ => Ordering::Equal,
        });
    }

    /// Finds the first occurrence of `item` in visible order.
    pub fn find_item(&self, item: &T) -> Option<ItemLocation> {
        let mut start = 0;
        for leaf in self.leaf_groups() {
            let items = self.nodes[leaf].items().unwrap_or(&[]);
            if let Some(offset) = items.iter().position(|candidate| candidate == item) {
                return Some(ItemLocation {
                    group: leaf,
                    offset,
                    index: start + offset,
                });
            }
            start += items.len();
        }
        None
    }

    /// Returns the flat index of the first occurrence of `item`.
    pub fn position_of(&self, item: &T) -> Option<usize> {
        self.find_item(item).map(|location| location.index)
    }

    /// Removes the first occurrence of `item`, pruning groups it leaves empty.
    pub fn remove_item(&mut self, item: &T) -> Option<Removal<T>> {
        let location = self.find_item(item)?;
        let removed = match &mut self.nodes[location.group].children {
            GroupChildren::Items(items) => items.remove(location.offset),
            GroupChildren::Groups(_) => return None,
        };
        let pruned = self.shrink(location.group, 1);
        Some(Removal {
            item: removed,
            index: location.index,
            pruned,
        })
    }

    /// Sorts a copy of every leaf group's items.
    ///
    /// Nothing is changed; commit the result with [`Self::set_leaf_items`].
    pub fn sorted_leaves(&self, comparer: &SortComparer<'_, T>) -> Result<Vec<(GroupId, Vec<T>)>> {
        self.leaf_groups()
            .into_iter()
            .map(|leaf| {
                let items = self.nodes[leaf].items().unwrap_or(&[]).to_vec();
                Ok((leaf, comparer.sort(items)?))
            })
            .collect()
    }
}
