//! Insertion side of the balancing engine: splitting ("exploding") overfull nodes

use log::debug;

use super::{BPlusTree, InternalNode, NodeId, NodeKind, Rebalance};

impl BPlusTree {
    /// Split an overflowing node into two new siblings and push the middle
    /// separator to the parent, creating a new root if the node was the root.
    ///
    /// The old node is retired; both halves get fresh labels.
    pub(super) fn explode(&mut self, id: NodeId) {
        let node = self.take_node(id);
        let header = node.header;
        let (left_kind, powder, right_kind) = node.kind.halve();

        let left_id = self.allocate_node(left_kind, header.parent, header.left, None);
        let right_id = self.allocate_node(right_kind, header.parent, Some(left_id), header.right);
        self.node_mut(left_id).header.right = Some(right_id);
        self.relink_neighbours(header.left, left_id, right_id, header.right);

        // Moved children must follow their new owner
        self.adopt_children(left_id);
        self.adopt_children(right_id);

        debug!(
            "explode #{} -> {} | {} (separator {:?})",
            header.label,
            self.node_ref(left_id).describe(),
            self.node_ref(right_id).describe(),
            powder
        );

        match header.parent {
            None => {
                let root = InternalNode::new(vec![powder], vec![left_id, right_id]);
                let root_id = self.allocate_node(NodeKind::Internal(root), None, None, None);
                self.node_mut(left_id).header.parent = Some(root_id);
                self.node_mut(right_id).header.parent = Some(root_id);
                self.root = root_id;
                debug!("new root {}", self.node_ref(root_id).describe());
            }
            Some(parent) => self.on_child_explode(parent, id, powder, left_id, right_id),
        }

        self.retire_node(id);
    }

    /// Replace an exploded child by its two halves and split this node in turn
    /// if it now overflows
    fn on_child_explode(
        &mut self,
        parent: NodeId,
        exploded: NodeId,
        powder: String,
        left: NodeId,
        right: NodeId,
    ) {
        let order = self.order;
        let node = self.internal_mut(parent);
        node.replace_with_split(exploded, powder, left, right);

        if node.weight() >= order {
            self.explode(parent);
        }
    }
}
