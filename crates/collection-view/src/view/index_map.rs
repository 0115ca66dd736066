//! Translation between flat view indices and top-level group positions.

use crate::error::{Result, ViewError};

use super::group::{GroupId, GroupTree};

/// A position expressed as (top-level group, offset inside it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupPath {
    /// Index of the top-level group.
    pub group_index: usize,
    /// Offset of the item inside that group.
    pub offset: usize,
}

/// Prefix-count cache over the top-level groups of a [`GroupTree`].
///
/// Must be refreshed after every change to the tree.
#[derive(Debug, Clone, Default)]
pub struct IndexMapper {
    roots: Vec<GroupId>,
    /// `ends[i]` is the flat index one past the last item of group `i`.
    ends: Vec<usize>,
}

impl IndexMapper {
    /// Builds the cache for `tree`.
    pub fn from_tree<T>(tree: &GroupTree<T>) -> Self {
        let mut mapper = Self::default();
        mapper.refresh(tree);
        mapper
    }

    /// Recomputes the cache from `tree`.
    pub fn refresh<T>(&mut self, tree: &GroupTree<T>) {
        self.roots.clear();
        self.ends.clear();
        let mut end = 0;
        for &root in tree.roots() {
            end += tree.node(root).map_or(0, |node| node.count());
            self.roots.push(root);
            self.ends.push(end);
        }
    }

    /// Total number of items covered.
    pub fn count(&self) -> usize {
        self.ends.last().copied().unwrap_or(0)
    }

    /// Number of top-level groups.
    pub fn group_count(&self) -> usize {
        self.roots.len()
    }

    /// Flat index of the first item of a top-level group.
    pub fn group_start(&self, group_index: usize) -> Option<usize> {
        if group_index >= self.ends.len() {
            return None;
        }
        match group_index {
            0 => Some(0),
            _ => Some(self.ends[group_index - 1]),
        }
    }

    /// Maps a flat index to its top-level group and offset.
    pub fn to_group_path(&self, index: usize) -> Option<GroupPath> {
        if index >= self.count() {
            return None;
        }
        let group_index = self.ends.partition_point(|&end| end <= index);
        let start = self.group_start(group_index)?;
        Some(GroupPath {
            group_index,
            offset: index - start,
        })
    }

    /// Maps a top-level group and an offset inside it to a flat index.
    pub fn to_flat_index(&self, group: GroupId, offset: usize) -> Result<usize> {
        let group_index = self
            .roots
            .iter()
            .position(|root| *root == group)
            .ok_or(ViewError::GroupNotFound)?;
        let start = self.group_start(group_index).ok_or(ViewError::GroupNotFound)?;
        let len = self.ends[group_index] - start;
        if offset >= len {
            return Err(ViewError::out_of_range(offset, len));
        }
        Ok(start + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::group::GroupDescription;
    use crate::view::value::KeyValue;

    fn tree() -> GroupTree<String> {
        let items: Vec<String> = ["a1", "b1", "a2", "c1", "b2", "b3"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let level = GroupDescription::new(|s: &String| KeyValue::from(s[..1].to_string()));
        GroupTree::build(&items, &[level])
    }

    #[test]
    fn test_prefix_counts() {
        let mapper = IndexMapper::from_tree(&tree());
        assert_eq!(mapper.count(), 6);
        assert_eq!(mapper.group_count(), 3);
        assert_eq!(mapper.group_start(0), Some(0));
        assert_eq!(mapper.group_start(1), Some(2));
        assert_eq!(mapper.group_start(2), Some(5));
        assert_eq!(mapper.group_start(3), None);
    }

    #[test]
    fn test_to_group_path() {
        let mapper = IndexMapper::from_tree(&tree());
        assert_eq!(
            mapper.to_group_path(0),
            Some(GroupPath { group_index: 0, offset: 0 })
        );
        assert_eq!(
            mapper.to_group_path(3),
            Some(GroupPath { group_index: 1, offset: 1 })
        );
        assert_eq!(
            mapper.to_group_path(5),
            Some(GroupPath { group_index: 2, offset: 0 })
        );
        assert_eq!(mapper.to_group_path(6), None);
    }

    #[test]
    fn test_round_trip() {
        let tree = tree();
        let mapper = IndexMapper::from_tree(&tree);
        for index in 0..mapper.count() {
            let path = mapper.to_group_path(index).unwrap();
            let group = tree.roots()[path.group_index];
            assert_eq!(mapper.to_flat_index(group, path.offset).unwrap(), index);
        }
    }

    #[test]
    fn test_to_flat_index_errors() {
        let tree = tree();
        let mapper = IndexMapper::from_tree(&tree);
        let first = tree.roots()[0];
        assert_eq!(
            mapper.to_flat_index(first, 2),
            Err(ViewError::out_of_range(2, 2))
        );

        let other = IndexMapper::from_tree(&GroupTree::<String>::new());
        assert_eq!(other.to_flat_index(first, 0), Err(ViewError::GroupNotFound));
        assert_eq!(other.count(), 0);
        assert_eq!(other.group_start(0), None);
    }
}
