//! Deletion side of the balancing engine: merging or redistributing
//! ("shrinking") underfull nodes

use log::debug;

use super::{BPlusNode, BPlusTree, NodeId, NodeKind};

/// Which side of the underflowing node the chosen sibling is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl BPlusTree {
    /// Rebalance `id` if it dropped below its minimum weight.
    ///
    /// The node is combined with a sibling of the same parent. If the result
    /// fits in one node the two are merged and the parent shrinks in turn;
    /// otherwise the entries are split evenly back into the two nodes and only
    /// the parent separator changes.
    pub(super) fn maybe_shrink(&mut self, id: NodeId) {
        let (parent, underflow) = {
            let node = self.node_ref(id);
            (
                node.parent(),
                node.weight() < node.kind.min_weight(self.order),
            )
        };

        // The root may hold anything down to an empty leaf
        let Some(parent) = parent else {
            return;
        };
        if !underflow {
            return;
        }

        let (sibling, side) = self.choose_sibling(id);
        let (left, right) = match side {
            Side::Right => (id, sibling),
            Side::Left => (sibling, id),
        };

        let (separator, index) = match self.node_ref(parent).as_internal() {
            Some(node) => {
                let (separator, index) = node.separator_between(left, right);
                (separator.to_string(), index)
            }
            None => panic!("parent {parent} of node {id} is a leaf"),
        };

        let left_node = self.take_node(left);
        let right_node = self.take_node(right);
        let combined = NodeKind::combine(left_node.kind, separator, right_node.kind);

        if combined.weight() < self.order {
            let outer_left = left_node.header.left;
            let outer_right = right_node.header.right;

            let merged = self.allocate_node(combined, Some(parent), outer_left, outer_right);
            self.relink_neighbours(outer_left, merged, merged, outer_right);
            self.adopt_children(merged);
            self.retire_node(left);
            self.retire_node(right);

            debug!(
                "merge #{} + #{} -> {}",
                left_node.header.label,
                right_node.header.label,
                self.node_ref(merged).describe()
            );

            self.on_children_shrink(parent, index, merged);
        } else {
            let (left_kind, separator, right_kind) = combined.halve();
            self.restore_node(left, BPlusNode::new(left_node.header, left_kind));
            self.restore_node(right, BPlusNode::new(right_node.header, right_kind));
            self.adopt_children(left);
            self.adopt_children(right);

            debug!(
                "redistribute {} | {} (separator {:?})",
                self.node_ref(left).describe(),
                self.node_ref(right).describe(),
                separator
            );

            self.internal_mut(parent).keys[index] = separator;
        }
    }

    /// Prefer the right sibling when it shares our parent, else the left one.
    /// A non-root node always has at least one sibling under its parent.
    fn choose_sibling(&self, id: NodeId) -> (NodeId, Side) {
        let node = self.node_ref(id);
        let parent = node.parent();

        if let Some(right) = node.right() {
            if self.node_ref(right).parent() == parent {
                return (right, Side::Right);
            }
        }

        match node.left() {
            Some(left) if self.node_ref(left).parent() == parent => (left, Side::Left),
            _ => panic!("node {id} has no sibling under its parent"),
        }
    }

    /// Replace two merged children by the merged node, then rebalance this node
    fn on_children_shrink(&mut self, parent: NodeId, index: usize, merged: NodeId) {
        self.internal_mut(parent).replace_with_merged(index, merged);

        let node = self.node_ref(parent);
        if node.parent().is_some() {
            self.maybe_shrink(parent);
        } else if node.weight() == 0 {
            self.collapse_root();
        }
    }

    /// Promote the only child of a root without separators
    fn collapse_root(&mut self) {
        let old_root = self.root;
        let node = self.take_node(old_root);
        let child = node.kind.children()[0];

        let header = &mut self.node_mut(child).header;
        debug_assert!(header.left.is_none() && header.right.is_none());
        header.parent = None;
        self.root = child;
        self.retire_node(old_root);

        debug!(
            "collapse root #{} -> {}",
            node.header.label,
            self.node_ref(child).describe()
        );
    }
}
