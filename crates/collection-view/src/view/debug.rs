//! Text dumps of a view's group tree.

use std::fmt;

use collection_view_core::TreeFormatOptions;

use super::group::{GroupId, GroupTree};

/// Label used for the implicit group of an ungrouped view.
const IMPLICIT_GROUP_LABEL: &str = "(all items)";

/// Formats a [`GroupTree`] as an indented tree.
///
/// # Example output
///
/// ```text
/// 5 items in 3 groups
/// ├── a [2]
/// │  ├── x [1]
/// │  └── y [1]
/// └── b [3]
/// ```
pub struct GroupTreeDebug<'a, T> {
    tree: &'a GroupTree<T>,
    options: &'a TreeFormatOptions,
}

impl<'a, T> GroupTreeDebug<'a, T> {
    /// Wraps `tree` for formatting with `options`.
    pub fn new(tree: &'a GroupTree<T>, options: &'a TreeFormatOptions) -> Self {
        Self { tree, options }
    }
}

impl<T: fmt::Debug> GroupTreeDebug<'_, T> {
    fn write_group(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: GroupId,
        depth: usize,
        is_last: bool,
    ) -> fmt::Result {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return Ok(());
        }
        let Some(node) = self.tree.node(id) else {
            return Ok(());
        };

        write!(f, "{}", self.options.prefix(depth, is_last))?;
        match node.header() {
            Some(header) => write!(f, "{header}")?,
            None => f.write_str(IMPLICIT_GROUP_LABEL)?,
        }
        if self.options.show_counts {
            write!(f, " [{}]", node.count())?;
        }
        if self.options.show_ids {
            write!(f, " {id:?}")?;
        }
        writeln!(f)?;

        if let Some(children) = node.subgroups() {
            for (i, &child) in children.iter().enumerate() {
                self.write_group(f, child, depth + 1, i + 1 == children.len())?;
            }
        } else if self.options.show_leaves {
            let items = node.items().unwrap_or(&[]);
            for (i, item) in items.iter().enumerate() {
                let prefix = self.options.prefix(depth + 1, i + 1 == items.len());
                writeln!(f, "{prefix}{item:?}")?;
            }
        }
        Ok(())
    }
}

impl<T: fmt::Debug> fmt::Display for GroupTreeDebug<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} items in {} groups",
            self.tree.len(),
            self.tree.group_count()
        )?;
        let roots = self.tree.roots();
        for (i, &root) in roots.iter().enumerate() {
            self.write_group(f, root, 1, i + 1 == roots.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::group::GroupDescription;
    use crate::view::value::KeyValue;
    use collection_view_core::TreeStyle;

    fn ascii() -> TreeFormatOptions {
        TreeFormatOptions {
            style: TreeStyle::Ascii,
            ..Default::default()
        }
    }

    #[test]
    fn test_grouped_dump() {
        let items: Vec<String> = ["ax", "bx", "ay"].iter().map(|s| s.to_string()).collect();
        let levels = vec![
            GroupDescription::new(|s: &String| KeyValue::from(s[..1].to_string())),
            GroupDescription::new(|s: &String| KeyValue::from(s[1..].to_string())),
        ];
        let tree = GroupTree::build(&items, &levels);
        let options = ascii();
        let text = GroupTreeDebug::new(&tree, &options).to_string();
        assert_eq!(
            text,
            "3 items in 5 groups\n+-- a [2]\n|  +-- x [1]\n|  `-- y [1]\n`-- b [1]\n|  `-- x [1]\n"
        );
    }

    #[test]
    fn test_leaves_and_depth_limit() {
        let tree = GroupTree::build(&[1i64, 2], &[]);
        let options = TreeFormatOptions {
            show_leaves: true,
            ..ascii()
        };
        let text = GroupTreeDebug::new(&tree, &options).to_string();
        assert_eq!(text, "2 items in 1 groups\n`-- (all items) [2]\n|  +-- 1\n|  `-- 2\n");

        let options = TreeFormatOptions {
            max_depth: Some(0),
            ..ascii()
        };
        let text = GroupTreeDebug::new(&tree, &options).to_string();
        assert_eq!(text, "2 items in 1 groups\n");
    }
}
