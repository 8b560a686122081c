use std::cmp::Ordering;

use super::KeyOrdering;

/// Node identifier (index into node storage)
pub type NodeId = usize;

/// Hands out node labels for one tree.
///
/// Labels start at 1, only ever grow, and are never handed out twice. They exist
/// for diagnostics; nothing in the balancing code looks at them.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Number of labels handed out so far
    pub fn allocated(&self) -> u64 {
        self.next - 1
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Label and non-owning relations of a node.
///
/// `left`/`right` link every node of the same depth, across parent boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeHeader {
    pub label: u64,
    pub parent: Option<NodeId>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
}

impl NodeHeader {
    pub fn new(label: u64) -> Self {
        Self {
            label,
            ..Self::default()
        }
    }
}

/// Leaf node: sorted, unique key-value pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeafNode {
    pub entries: Vec<(String, String)>,
}

impl LeafNode {
    /// Create a new empty leaf node
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a leaf node with given entries (must already be sorted)
    pub fn with_entries(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if leaf is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn search(&self, key: &str, ordering: KeyOrdering) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|(k, _)| ordering.compare(k, key))
    }

    /// Look up the value stored under `key`
    pub fn get(&self, key: &str, ordering: KeyOrdering) -> Option<&str> {
        let pos = self.search(key, ordering).ok()?;
        Some(self.entries[pos].1.as_str())
    }

    /// Insert a key-value pair in sorted order, or overwrite the value of an
    /// existing key. Returns the previous value on overwrite.
    pub fn upsert(&mut self, key: String, value: String, ordering: KeyOrdering) -> Option<String> {
        match self.search(&key, ordering) {
            Ok(pos) => Some(std::mem::replace(&mut self.entries[pos].1, value)),
            Err(pos) => {
                self.entries.insert(pos, (key, value));
                None
            }
        }
    }

    /// Remove `key`, returning its value if it was present
    pub fn remove(&mut self, key: &str, ordering: KeyOrdering) -> Option<String> {
        let pos = self.search(key, ordering).ok()?;
        Some(self.entries.remove(pos).1)
    }

    /// Keys in this leaf
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Get the minimum key in this leaf
    pub fn min_key(&self) -> Option<&str> {
        self.entries.first().map(|(k, _)| k.as_str())
    }
}

/// Internal node: separator keys and child pointers
///
/// - `children.len() == keys.len() + 1`
/// - every key under `children[i]` is `< keys[i]` and `>= keys[i - 1]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InternalNode {
    pub keys: Vec<String>,
    pub children: Vec<NodeId>,
}

impl InternalNode {
    /// Create a new internal node with given keys and children
    pub fn new(keys: Vec<String>, children: Vec<NodeId>) -> Self {
        debug_assert_eq!(keys.len() + 1, children.len());
        Self { keys, children }
    }

    /// Number of children
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Check if node has no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Find the child index for a given key.
    /// Returns the index of the first separator strictly greater than `key`, or the
    /// last child if there is none.
    pub fn find_child_index(&self, key: &str, ordering: KeyOrdering) -> usize {
        self.keys
            .partition_point(|k| ordering.compare(k, key) != Ordering::Greater)
    }

    /// Position of `child` in the child list
    pub fn child_position(&self, child: NodeId) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    /// Replace `exploded` by `left` and `right`, with `separator` between them
    pub fn replace_with_split(
        &mut self,
        exploded: NodeId,
        separator: String,
        left: NodeId,
        right: NodeId,
    ) {
        let Some(pos) = self.child_position(exploded) else {
            panic!("node {exploded} is not a child of this internal node");
        };
        self.children[pos] = left;
        self.children.insert(pos + 1, right);
        self.keys.insert(pos, separator);
    }

    /// Separator between two adjacent children, with its index in `keys`
    pub fn separator_between(&self, left: NodeId, right: NodeId) -> (&str, usize) {
        let Some(pos) = self.child_position(left) else {
            panic!("node {left} is not a child of this internal node");
        };
        assert_eq!(
            self.children.get(pos + 1),
            Some(&right),
            "nodes {left} and {right} are not adjacent children"
        );
        (self.keys[pos].as_str(), pos)
    }

    /// Replace the two children around separator `index` by `merged`, dropping
    /// the separator. Returns the dropped separator.
    pub fn replace_with_merged(&mut self, index: usize, merged: NodeId) -> String {
        self.children[index] = merged;
        self.children.remove(index + 1);
        self.keys.remove(index)
    }
}

/// What split and merge/redistribute need from a node payload.
///
/// Leaves and internal nodes go through the same decisions; they differ only in
/// what gets moved and in what happens to the separator.
pub trait Rebalance: Sized {
    /// Entry count used for capacity decisions
    fn weight(&self) -> usize;

    /// Smallest weight a non-root node may have for the given order
    fn min_weight(order: usize) -> usize;

    /// Concatenate two adjacent siblings around their parent separator
    fn combine(left: Self, separator: String, right: Self) -> Self;

    /// Split at the midpoint, returning the separator for the parent
    fn halve(self) -> (Self, String, Self);
}

impl Rebalance for LeafNode {
    fn weight(&self) -> usize {
        self.entries.len()
    }

    fn min_weight(order: usize) -> usize {
        order / 2
    }

    fn combine(mut left: Self, _separator: String, right: Self) -> Self {
        left.entries.extend(right.entries);
        left
    }

    fn halve(mut self) -> (Self, String, Self) {
        let mid = self.entries.len() / 2;
        let right = self.entries.split_off(mid);
        let separator = right[0].0.clone();
        (self, separator, LeafNode::with_entries(right))
    }
}

impl Rebalance for InternalNode {
    fn weight(&self) -> usize {
        self.keys.len()
    }

    fn min_weight(order: usize) -> usize {
        order.div_ceil(2) - 1
    }

    fn combine(mut left: Self, separator: String, right: Self) -> Self {
        left.keys.push(separator);
        left.keys.extend(right.keys);
        left.children.extend(right.children);
        left
    }

    fn halve(mut self) -> (Self, String, Self) {
        let mid = self.keys.len() / 2;
        let right_keys = self.keys.split_off(mid + 1);
        let right_children = self.children.split_off(mid + 1);
        let Some(separator) = self.keys.pop() else {
            unreachable!("halving an internal node without keys");
        };
        (self, separator, InternalNode::new(right_keys, right_children))
    }
}

/// Payload of a node: either data entries or routing keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Internal(InternalNode),
    Leaf(LeafNode),
}

impl NodeKind {
    pub fn weight(&self) -> usize {
        match self {
            NodeKind::Internal(node) => node.weight(),
            NodeKind::Leaf(node) => node.weight(),
        }
    }

    pub fn min_weight(&self, order: usize) -> usize {
        match self {
            NodeKind::Internal(_) => InternalNode::min_weight(order),
            NodeKind::Leaf(_) => LeafNode::min_weight(order),
        }
    }

    /// Both sides must be the same kind of node
    pub fn combine(left: Self, separator: String, right: Self) -> Self {
        match (left, right) {
            (NodeKind::Internal(l), NodeKind::Internal(r)) => {
                NodeKind::Internal(InternalNode::combine(l, separator, r))
            }
            (NodeKind::Leaf(l), NodeKind::Leaf(r)) => {
                NodeKind::Leaf(LeafNode::combine(l, separator, r))
            }
            _ => panic!("cannot combine a leaf with an internal node"),
        }
    }

    pub fn halve(self) -> (Self, String, Self) {
        match self {
            NodeKind::Internal(node) => {
                let (l, sep, r) = node.halve();
                (NodeKind::Internal(l), sep, NodeKind::Internal(r))
            }
            NodeKind::Leaf(node) => {
                let (l, sep, r) = node.halve();
                (NodeKind::Leaf(l), sep, NodeKind::Leaf(r))
            }
        }
    }

    /// Children of an internal node; empty for a leaf
    pub fn children(&self) -> &[NodeId] {
        match self {
            NodeKind::Internal(node) => &node.children,
            NodeKind::Leaf(_) => &[],
        }
    }

    /// Entry keys of a leaf, or separator keys of an internal node
    pub fn keys(&self) -> Vec<&str> {
        match self {
            NodeKind::Internal(node) => node.keys.iter().map(String::as_str).collect(),
            NodeKind::Leaf(node) => node.keys().collect(),
        }
    }
}

/// B+ tree node: header plus payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BPlusNode {
    pub header: NodeHeader,
    pub kind: NodeKind,
}

impl BPlusNode {
    pub fn new(header: NodeHeader, kind: NodeKind) -> Self {
        Self { header, kind }
    }

    /// Check if this is a leaf node
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// Check if this is an internal node
    pub fn is_internal(&self) -> bool {
        matches!(self.kind, NodeKind::Internal(_))
    }

    pub fn label(&self) -> u64 {
        self.header.label
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.header.parent
    }

    pub fn left(&self) -> Option<NodeId> {
        self.header.left
    }

    pub fn right(&self) -> Option<NodeId> {
        self.header.right
    }

    pub fn weight(&self) -> usize {
        self.kind.weight()
    }

    /// Human readable label: `#<label> [k1, k2, ...]`
    pub fn describe(&self) -> String {
        format!("#{} [{}]", self.header.label, self.kind.keys().join(", "))
    }

    /// Get as internal node reference
    pub fn as_internal(&self) -> Option<&InternalNode> {
        match &self.kind {
            NodeKind::Internal(node) => Some(node),
            NodeKind::Leaf(_) => None,
        }
    }

    /// Get as internal node mutable reference
    pub fn as_internal_mut(&mut self) -> Option<&mut InternalNode> {
        match &mut self.kind {
            NodeKind::Internal(node) => Some(node),
            NodeKind::Leaf(_) => None,
        }
    }

    /// Get as leaf node reference
    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match &self.kind {
            NodeKind::Internal(_) => None,
            NodeKind::Leaf(node) => Some(node),
        }
    }

    /// Get as leaf node mutable reference
    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafNode> {
        match &mut self.kind {
            NodeKind::Internal(_) => None,
            NodeKind::Leaf(node) => Some(node),
        }
    }
}
