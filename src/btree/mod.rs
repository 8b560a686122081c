//! In-memory B+ tree over string keys and values
//!
//! The tree keeps every level as a doubly linked sibling list:
//! - leaves are linked left to right, so ordered traversal never touches
//!   internal nodes beyond the first descent
//! - an overflowing node explodes into two new nodes and pushes a separator up
//! - an underflowing node combines with a sibling of the same parent and is
//!   either merged into one node or redistributed back into two
//!
//! Nodes live in an arena addressed by [`NodeId`]; parent and sibling relations
//! are plain ids, rewired on every structural change.

mod check;
mod error;
mod node;
mod ordering;
mod shrink;
mod split;
#[cfg(test)]
mod tests;

pub use error::{BPlusTreeError, BPlusTreeResult};
pub use node::{
    BPlusNode, IdAllocator, InternalNode, LeafNode, NodeHeader, NodeId, NodeKind, Rebalance,
};
pub use ordering::{KeyOrdering, natural_cmp};

use log::trace;

/// Default tree order used by `BPlusTree::default()` and the shell
pub const DEFAULT_ORDER: usize = 4;

/// B+ Tree data structure
///
/// Order `d` means:
/// - A leaf splits once it holds `d` entries, so it keeps at most `d - 1`
/// - An internal node splits once it holds `d` separators, so it keeps at most `d` children
/// - A non-root leaf keeps at least `floor(d/2)` entries
/// - A non-root internal node keeps at least `ceil(d/2) - 1` separators
#[derive(Debug, Clone)]
pub struct BPlusTree {
    /// Root node ID; the root always exists, an empty tree has an empty leaf root
    root: NodeId,

    /// Tree order
    order: usize,

    /// How keys compare
    ordering: KeyOrdering,

    /// Node storage
    nodes: Vec<Option<BPlusNode>>,

    /// Free list for recycling retired nodes
    free_list: Vec<NodeId>,

    /// Label source for new nodes
    ids: IdAllocator,

    /// Total number of entries in the tree
    entry_count: usize,
}

impl BPlusTree {
    /// Create a new empty B+ tree with lexicographic key ordering
    ///
    /// # Arguments
    /// * `order` - The tree order (must be >= 3)
    pub fn new(order: usize) -> BPlusTreeResult<Self> {
        Self::with_ordering(order, KeyOrdering::Lexicographic)
    }

    /// Create a new empty B+ tree with the given key ordering
    pub fn with_ordering(order: usize, ordering: KeyOrdering) -> BPlusTreeResult<Self> {
        if order < 3 {
            return Err(BPlusTreeError::InvalidOrder(order));
        }

        let mut tree = Self {
            root: 0,
            order,
            ordering,
            nodes: Vec::new(),
            free_list: Vec::new(),
            ids: IdAllocator::new(),
            entry_count: 0,
        };
        tree.root = tree.allocate_node(NodeKind::Leaf(LeafNode::new()), None, None, None);
        Ok(tree)
    }

    /// Get the tree order
    pub fn order(&self) -> usize {
        self.order
    }

    /// Get the key ordering
    pub fn ordering(&self) -> KeyOrdering {
        self.ordering
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// Get number of entries in the tree
    pub fn len(&self) -> usize {
        self.entry_count
    }

    /// Get tree height (1 for a single leaf, 2+ once internal nodes exist)
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;

        while let Some(node) = self.node_ref(current).as_internal() {
            current = node.children[0];
            height += 1;
        }

        height
    }

    /// Drop every entry, leaving a single empty leaf as root.
    /// Labels keep counting from where they were.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free_list.clear();
        self.entry_count = 0;
        self.root = self.allocate_node(NodeKind::Leaf(LeafNode::new()), None, None, None);
    }

    // ========== Node Management ==========

    /// Allocate a new node with a fresh label, returning its ID
    fn allocate_node(
        &mut self,
        kind: NodeKind,
        parent: Option<NodeId>,
        left: Option<NodeId>,
        right: Option<NodeId>,
    ) -> NodeId {
        let header = NodeHeader {
            label: self.ids.next_id(),
            parent,
            left,
            right,
        };
        let node = BPlusNode::new(header, kind);

        if let Some(id) = self.free_list.pop() {
            self.nodes[id] = Some(node);
            id
        } else {
            let id = self.nodes.len();
            self.nodes.push(Some(node));
            id
        }
    }

    /// Get a reference to a node by ID
    pub fn node(&self, id: NodeId) -> Option<&BPlusNode> {
        self.nodes.get(id).and_then(|n| n.as_ref())
    }

    /// Get a live node; a dangling id is a bug in the balancing code
    fn node_ref(&self, id: NodeId) -> &BPlusNode {
        match self.nodes.get(id).and_then(|n| n.as_ref()) {
            Some(node) => node,
            None => panic!("dangling node id {id}"),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut BPlusNode {
        match self.nodes.get_mut(id).and_then(|n| n.as_mut()) {
            Some(node) => node,
            None => panic!("dangling node id {id}"),
        }
    }

    fn leaf_mut(&mut self, id: NodeId) -> &mut LeafNode {
        match self.node_mut(id).as_leaf_mut() {
            Some(leaf) => leaf,
            None => panic!("node {id} is not a leaf"),
        }
    }

    fn internal_mut(&mut self, id: NodeId) -> &mut InternalNode {
        match self.node_mut(id).as_internal_mut() {
            Some(node) => node,
            None => panic!("node {id} is not an internal node"),
        }
    }

    /// Move a node out of its slot. The slot stays reserved until the node is
    /// either put back or retired.
    fn take_node(&mut self, id: NodeId) -> BPlusNode {
        match self.nodes.get_mut(id).and_then(Option::take) {
            Some(node) => node,
            None => panic!("dangling node id {id}"),
        }
    }

    fn restore_node(&mut self, id: NodeId, node: BPlusNode) {
        debug_assert!(self.nodes[id].is_none());
        self.nodes[id] = Some(node);
    }

    /// Release the slot of a node previously moved out with `take_node`
    fn retire_node(&mut self, id: NodeId) {
        debug_assert!(self.nodes[id].is_none());
        self.free_list.push(id);
    }

    /// Point every child of `id` back at `id`
    fn adopt_children(&mut self, id: NodeId) {
        let children = self.node_ref(id).kind.children().to_vec();
        for child in children {
            self.node_mut(child).header.parent = Some(id);
        }
    }

    /// Make the outer neighbours of a replaced run of nodes point at the new
    /// first/last node of the run
    fn relink_neighbours(
        &mut self,
        outer_left: Option<NodeId>,
        first: NodeId,
        last: NodeId,
        outer_right: Option<NodeId>,
    ) {
        if let Some(left) = outer_left {
            self.node_mut(left).header.right = Some(first);
        }
        if let Some(right) = outer_right {
            self.node_mut(right).header.left = Some(last);
        }
    }

    /// Get the root node ID
    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Get the first (leftmost) leaf node ID
    pub fn first_leaf_id(&self) -> NodeId {
        let mut current = self.root;
        while let Some(node) = self.node_ref(current).as_internal() {
            current = node.children[0];
        }
        current
    }

    /// Get the number of live nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// Number of labels handed out over the tree's lifetime
    pub fn labels_allocated(&self) -> u64 {
        self.ids.allocated()
    }

    /// Node IDs grouped by depth, each level ordered left to right
    pub fn levels(&self) -> Vec<Vec<NodeId>> {
        let mut levels = vec![vec![self.root]];

        loop {
            let next: Vec<NodeId> = levels[levels.len() - 1]
                .iter()
                .flat_map(|&id| self.node_ref(id).kind.children().iter().copied())
                .collect();
            if next.is_empty() {
                break;
            }
            levels.push(next);
        }

        levels
    }

    // ========== Search Operations ==========

    /// Find the leaf node that should contain the given key
    fn find_leaf(&self, key: &str) -> NodeId {
        let mut current = self.root;

        while let Some(node) = self.node_ref(current).as_internal() {
            let child_idx = node.find_child_index(key, self.ordering);
            trace!("descend {:?} -> child {} of node {}", key, child_idx, current);
            current = node.children[child_idx];
        }

        current
    }

    /// Look up the value stored under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        let leaf_id = self.find_leaf(key);
        self.node_ref(leaf_id).as_leaf()?.get(key, self.ordering)
    }

    /// Check whether `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    // ========== Mutation ==========

    /// Insert a key-value pair, or overwrite the value of an existing key.
    /// Returns the previous value if the key was already present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let leaf_id = self.find_leaf(&key);
        let ordering = self.ordering;

        let previous = self.leaf_mut(leaf_id).upsert(key, value.into(), ordering);
        if previous.is_some() {
            return previous;
        }

        self.entry_count += 1;

        if self.node_ref(leaf_id).weight() >= self.order {
            self.explode(leaf_id);
        }

        None
    }

    /// Remove `key`, returning its value if it was present
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let leaf_id = self.find_leaf(key);
        let ordering = self.ordering;

        let value = self.leaf_mut(leaf_id).remove(key, ordering)?;
        self.entry_count -= 1;

        self.maybe_shrink(leaf_id);

        Some(value)
    }

    /// Delete `key`. Returns true if an entry was deleted
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove(key).is_some()
    }

    // ========== Traversal ==========

    /// Snapshot of all entries in ascending key order
    pub fn traverse(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Iterate over all entries in key order
    pub fn iter(&self) -> BPlusTreeIter<'_> {
        BPlusTreeIter::new(self)
    }

    /// DOT description of the node graph
    pub fn export_graph(&self) -> String {
        crate::graph::export(self).to_string()
    }
}

impl Default for BPlusTree {
    /// Empty tree with `DEFAULT_ORDER` and lexicographic keys
    fn default() -> Self {
        Self::new(DEFAULT_ORDER).expect("Default order is valid")
    }
}

/// Iterator over B+ tree entries, walking the leaf chain
pub struct BPlusTreeIter<'a> {
    tree: &'a BPlusTree,
    current_leaf: Option<NodeId>,
    current_idx: usize,
}

impl<'a> BPlusTreeIter<'a> {
    fn new(tree: &'a BPlusTree) -> Self {
        Self {
            tree,
            current_leaf: Some(tree.first_leaf_id()),
            current_idx: 0,
        }
    }
}

impl<'a> Iterator for BPlusTreeIter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = self.tree.node(self.current_leaf?)?;
            let leaf = node.as_leaf()?;

            if let Some((key, value)) = leaf.entries.get(self.current_idx) {
                self.current_idx += 1;
                return Some((key.as_str(), value.as_str()));
            }

            // Move to next leaf
            self.current_leaf = node.right();
            self.current_idx = 0;
        }
    }
}

impl<'a> IntoIterator for &'a BPlusTree {
    type Item = (&'a str, &'a str);
    type IntoIter = BPlusTreeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
