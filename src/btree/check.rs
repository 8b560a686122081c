//! Structural self-check used by tests and the shell's `CHECK` command

use std::cmp::Ordering;

use super::{BPlusTree, BPlusTreeError, BPlusTreeResult, NodeId, NodeKind};

fn violation(msg: impl Into<String>) -> BPlusTreeError {
    BPlusTreeError::InvariantViolation(msg.into())
}

/// Bookkeeping carried through the recursive walk
struct Walk {
    leaf_depth: Option<usize>,
    visited: usize,
}

impl BPlusTree {
    /// Verify every structural invariant of the tree, reporting the first
    /// violation found:
    /// - all leaves at the same depth
    /// - node weights within bounds (the root may go lower)
    /// - keys strictly ascending and inside the range their ancestors route there
    /// - `children == keys + 1` and parent links matching the child lists
    /// - sibling links matching the left-to-right order of every level
    /// - the leaf chain holding exactly `len()` ascending entries
    pub fn check_invariants(&self) -> BPlusTreeResult<()> {
        let root = self
            .node(self.root)
            .ok_or_else(|| violation(format!("root {} is not a live node", self.root)))?;
        if root.parent().is_some() || root.left().is_some() || root.right().is_some() {
            return Err(violation(format!("root {} has a parent or siblings", root.describe())));
        }
        if root.is_internal() && root.weight() == 0 {
            return Err(violation(format!("internal root {} has no separators", root.describe())));
        }

        let mut walk = Walk {
            leaf_depth: None,
            visited: 0,
        };
        self.check_subtree(self.root, None, None, 1, &mut walk)?;

        if walk.visited != self.node_count() {
            return Err(violation(format!(
                "{} nodes reachable from the root but {} live in storage",
                walk.visited,
                self.node_count()
            )));
        }

        self.check_levels()?;
        self.check_leaf_chain()
    }

    fn check_subtree(
        &self,
        id: NodeId,
        lo: Option<&str>,
        hi: Option<&str>,
        depth: usize,
        walk: &mut Walk,
    ) -> BPlusTreeResult<()> {
        let node = self
            .node(id)
            .ok_or_else(|| violation(format!("dangling child id {id}")))?;
        walk.visited += 1;

        let weight = node.weight();
        if weight >= self.order {
            return Err(violation(format!("{} is overfull", node.describe())));
        }
        if id != self.root && weight < node.kind.min_weight(self.order) {
            return Err(violation(format!("{} is underfull", node.describe())));
        }

        let keys = node.kind.keys();
        for pair in keys.windows(2) {
            if self.ordering.compare(pair[0], pair[1]) != Ordering::Less {
                return Err(violation(format!("{} keys are not ascending", node.describe())));
            }
        }

        match &node.kind {
            NodeKind::Leaf(_) => {
                match walk.leaf_depth {
                    None => walk.leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(violation(format!(
                            "leaf {} at depth {} but other leaves at depth {}",
                            node.describe(),
                            depth,
                            expected
                        )));
                    }
                    Some(_) => {}
                }

                for key in keys {
                    let above_lo = lo.is_none_or(|lo| self.ordering.compare(key, lo) != Ordering::Less);
                    let below_hi = hi.is_none_or(|hi| self.ordering.compare(key, hi) == Ordering::Less);
                    if !above_lo || !below_hi {
                        return Err(violation(format!(
                            "key {:?} in {} outside its range [{:?}, {:?})",
                            key,
                            node.describe(),
                            lo,
                            hi
                        )));
                    }
                }
            }
            NodeKind::Internal(internal) => {
                if internal.children.len() != internal.keys.len() + 1 {
                    return Err(violation(format!(
                        "{} has {} children for {} keys",
                        node.describe(),
                        internal.children.len(),
                        internal.keys.len()
                    )));
                }

                let last = internal.children.len() - 1;
                for (i, &child) in internal.children.iter().enumerate() {
                    let child_parent = self.node(child).and_then(|c| c.parent());
                    if child_parent != Some(id) {
                        return Err(violation(format!(
                            "child {} of {} points at parent {:?}",
                            child,
                            node.describe(),
                            child_parent
                        )));
                    }

                    let child_lo = if i == 0 {
                        lo
                    } else {
                        Some(internal.keys[i - 1].as_str())
                    };
                    let child_hi = if i == last {
                        hi
                    } else {
                        Some(internal.keys[i].as_str())
                    };
                    self.check_subtree(child, child_lo, child_hi, depth + 1, walk)?;
                }
            }
        }

        Ok(())
    }

    fn check_levels(&self) -> BPlusTreeResult<()> {
        for level in self.levels() {
            for (i, &id) in level.iter().enumerate() {
                let node = self
                    .node(id)
                    .ok_or_else(|| violation(format!("dangling node id {id}")))?;

                let expected_left = if i == 0 { None } else { Some(level[i - 1]) };
                let expected_right = level.get(i + 1).copied();
                if node.left() != expected_left || node.right() != expected_right {
                    return Err(violation(format!(
                        "{} links ({:?}, {:?}) but level order says ({:?}, {:?})",
                        node.describe(),
                        node.left(),
                        node.right(),
                        expected_left,
                        expected_right
                    )));
                }
            }
        }

        Ok(())
    }

    fn check_leaf_chain(&self) -> BPlusTreeResult<()> {
        let mut previous: Option<&str> = None;
        let mut entries = 0;
        let mut hops = 0;
        let mut current = Some(self.first_leaf_id());

        while let Some(id) = current {
            hops += 1;
            if hops > self.node_count() {
                return Err(violation("leaf chain does not terminate"));
            }

            let node = self
                .node(id)
                .ok_or_else(|| violation(format!("dangling leaf id {id}")))?;
            let leaf = node
                .as_leaf()
                .ok_or_else(|| violation(format!("{} in the leaf chain is internal", node.describe())))?;

            for key in leaf.keys() {
                if let Some(prev) = previous {
                    if self.ordering.compare(prev, key) != Ordering::Less {
                        return Err(violation(format!(
                            "leaf chain out of order at {:?} -> {:?}",
                            prev, key
                        )));
                    }
                }
                previous = Some(key);
                entries += 1;
            }

            current = node.right();
        }

        if entries != self.entry_count {
            return Err(violation(format!(
                "leaf chain holds {} entries but len() is {}",
                entries, self.entry_count
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::btree::{BPlusTree, BPlusTreeError};

    #[test]
    fn test_fresh_tree_is_valid() {
        BPlusTree::new(3).unwrap().check_invariants().unwrap();
    }

    #[test]
    fn test_detects_broken_sibling_link() {
        let mut tree = BPlusTree::new(3).unwrap();
        for k in ["a", "b", "c", "d"] {
            tree.insert(k, "");
        }
        let first = tree.first_leaf_id();
        tree.node_mut(first).header.right = None;

        let err = tree.check_invariants().unwrap_err();
        assert!(matches!(err, BPlusTreeError::InvariantViolation(_)));
    }

    #[test]
    fn test_detects_wrong_parent() {
        let mut tree = BPlusTree::new(3).unwrap();
        for k in ["a", "b", "c"] {
            tree.insert(k, "");
        }
        let first = tree.first_leaf_id();
        tree.node_mut(first).header.parent = None;

        assert!(tree.check_invariants().is_err());
    }

    #[test]
    fn test_detects_unsorted_leaf() {
        let mut tree = BPlusTree::new(4).unwrap();
        tree.insert("a", "");
        tree.insert("b", "");
        let root = tree.root_id();
        tree.leaf_mut(root).entries.reverse();

        let err = tree.check_invariants().unwrap_err();
        assert!(err.to_string().contains("not ascending"));
    }

    #[test]
    fn test_detects_len_mismatch() {
        let mut tree = BPlusTree::new(4).unwrap();
        tree.insert("a", "");
        tree.entry_count = 5;

        let err = tree.check_invariants().unwrap_err();
        assert!(err.to_string().contains("len()"));
    }
}
