//! The Name Tree (§4.2): the shared hash-based prefix index all other
//! tables attach to. Backed by a generation-checked arena so `NodeId`s
//! handed out to FIB/PIT/CS stay valid references without borrowing the
//! tree itself.

use ndnfd_common::name::Name;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

const LOAD_FACTOR_UP: f64 = 0.5;
const LOAD_FACTOR_DOWN: f64 = 0.1;
const MIN_BUCKETS: usize = 16;

/// A stable reference to a Name Tree node. Pairs a slot index with a
/// generation counter so a node erased and a later node reusing its slot
/// never alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

struct Node {
    prefix: Name,
    hash: u64,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    fib: bool,
    pit_count: usize,
    cs_count: usize,
    strategy: bool,
    measurements: bool,
}

impl Node {
    fn has_attachments(&self) -> bool {
        self.fib || self.pit_count > 0 || self.cs_count > 0 || self.strategy || self.measurements
    }
}

enum Slot {
    Occupied { generation: u32, node: Node },
    Free { generation: u32 },
}

/// Hashes a name prefix for bucket placement: XOR-fold of each component's
/// hash over its wire bytes (§4.2). Not observable outside this module.
fn hash_name(name: &Name) -> u64 {
    let mut acc = 0u64;
    for component in name.components() {
        let mut hasher = DefaultHasher::new();
        component.as_bytes().hash(&mut hasher);
        acc ^= hasher.finish();
    }
    acc
}

pub struct NameTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    buckets: Vec<Vec<NodeId>>,
    by_name: HashMap<Name, NodeId>,
    item_count: usize,
    root: NodeId,
}

impl NameTree {
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            buckets: (0..MIN_BUCKETS).map(|_| Vec::new()).collect(),
            by_name: HashMap::new(),
            item_count: 0,
            root: NodeId { index: 0, generation: 0 },
        };
        let root_name = Name::new();
        let root = tree.alloc_node(root_name.clone(), None);
        tree.root = root;
        tree.by_name.insert(root_name, root);
        tree
    }

    fn alloc_node(&mut self, prefix: Name, parent: Option<NodeId>) -> NodeId {
        let hash = hash_name(&prefix);
        let node = Node {
            prefix,
            hash,
            parent,
            children: Vec::new(),
            fib: false,
            pit_count: 0,
            cs_count: 0,
            strategy: false,
            measurements: false,
        };
        let id = if let Some(index) = self.free.pop() {
            let generation = match &self.slots[index as usize] {
                Slot::Free { generation } => *generation,
                Slot::Occupied { .. } => unreachable!("free list points at occupied slot"),
            };
            self.slots[index as usize] = Slot::Occupied { generation, node };
            NodeId { index, generation }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot::Occupied { generation: 0, node });
            NodeId { index, generation: 0 }
        };
        self.bucket_of(id).push(id);
        self.item_count += 1;
        self.maybe_grow();
        id
    }

    fn bucket_index(&self, hash: u64) -> usize {
        (hash as usize) % self.buckets.len()
    }

    fn bucket_of(&mut self, id: NodeId) -> &mut Vec<NodeId> {
        let hash = self.node(id).hash;
        let idx = self.bucket_index(hash);
        &mut self.buckets[idx]
    }

    fn node(&self, id: NodeId) -> &Node {
        match &self.slots[id.index as usize] {
            Slot::Occupied { generation, node } if *generation == id.generation => node,
            _ => panic!("use of stale NameTree NodeId"),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match &mut self.slots[id.index as usize] {
            Slot::Occupied { generation, node } if *generation == id.generation => node,
            _ => panic!("use of stale NameTree NodeId"),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn prefix(&self, id: NodeId) -> &Name {
        &self.node(id).prefix
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Returns the node for `name`, creating every missing ancestor along
    /// the way. O(components) amortized.
    pub fn lookup(&mut self, name: &Name) -> NodeId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let mut depth = name.len();
        while depth > 0 && !self.by_name.contains_key(&name.prefix(depth - 1)) {
            depth -= 1;
        }
        // Find (or note) the deepest existing ancestor.
        let mut current = if depth == 0 {
            self.root
        } else {
            *self.by_name.get(&name.prefix(depth - 1)).unwrap()
        };
        for len in depth..=name.len() {
            let candidate = name.prefix(len);
            if let Some(&id) = self.by_name.get(&candidate) {
                current = id;
                continue;
            }
            let id = self.alloc_node(candidate.clone(), Some(current));
            self.node_mut(current).children.push(id);
            self.by_name.insert(candidate, id);
            current = id;
        }
        current
    }

    pub fn find_exact(&self, name: &Name) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Scans prefixes of `name` from longest to shortest, returning the
    /// first node satisfying `predicate`.
    pub fn find_longest_prefix_match(&self, name: &Name, predicate: impl Fn(NodeId) -> bool) -> Option<NodeId> {
        for len in (0..=name.len()).rev() {
            let candidate = name.prefix(len);
            if let Some(&id) = self.by_name.get(&candidate) {
                if predicate(id) {
                    return Some(id);
                }
            }
        }
        None
    }

    /// All ancestors of `name` (longest to shortest) whose node satisfies
    /// `predicate`.
    pub fn find_all_matches(&self, name: &Name, predicate: impl Fn(NodeId) -> bool) -> Vec<NodeId> {
        let mut out = Vec::new();
        for len in (0..=name.len()).rev() {
            let candidate = name.prefix(len);
            if let Some(&id) = self.by_name.get(&candidate) {
                if predicate(id) {
                    out.push(id);
                }
            }
        }
        out
    }

    /// DFS over the subtree rooted at `prefix`'s node (if any).
    /// `subtree_predicate(node) -> (visit, recurse)` gates inclusion and
    /// descent independently.
    pub fn partial_enumerate(
        &self,
        prefix: &Name,
        subtree_predicate: impl Fn(NodeId) -> (bool, bool),
    ) -> Vec<NodeId> {
        let mut out = Vec::new();
        if let Some(root) = self.find_exact(prefix) {
            let mut stack = vec![root];
            while let Some(id) = stack.pop() {
                let (visit, recurse) = subtree_predicate(id);
                if visit {
                    out.push(id);
                }
                if recurse {
                    stack.extend(self.node(id).children.iter().copied());
                }
            }
        }
        out
    }

    pub fn attach_fib(&mut self, id: NodeId) {
        self.node_mut(id).fib = true;
    }

    pub fn detach_fib(&mut self, id: NodeId) {
        self.node_mut(id).fib = false;
        self.erase_if_empty(id);
    }

    pub fn attach_pit(&mut self, id: NodeId) {
        self.node_mut(id).pit_count += 1;
    }

    pub fn detach_pit(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        node.pit_count = node.pit_count.saturating_sub(1);
        self.erase_if_empty(id);
    }

    pub fn attach_cs(&mut self, id: NodeId) {
        self.node_mut(id).cs_count += 1;
    }

    pub fn detach_cs(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        node.cs_count = node.cs_count.saturating_sub(1);
        self.erase_if_empty(id);
    }

    /// Deletes `id` if it has no attachments and no children, then
    /// recurses to its parent. Never erases the root.
    pub fn erase_if_empty(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        let (empty, parent) = {
            let node = self.node(id);
            (node.children.is_empty() && !node.has_attachments(), node.parent)
        };
        if !empty {
            return;
        }
        let prefix = self.node(id).prefix.clone();
        self.by_name.remove(&prefix);
        let bucket = self.bucket_of(id);
        bucket.retain(|&n| n != id);
        if let Some(parent_id) = parent {
            self.node_mut(parent_id).children.retain(|&c| c != id);
        }
        let generation = match &self.slots[id.index as usize] {
            Slot::Occupied { generation, .. } => *generation,
            Slot::Free { .. } => return,
        };
        self.slots[id.index as usize] = Slot::Free { generation: generation.wrapping_add(1) };
        self.free.push(id.index);
        self.item_count -= 1;
        self.maybe_shrink();
        if let Some(parent_id) = parent {
            self.erase_if_empty(parent_id);
        }
    }

    fn maybe_grow(&mut self) {
        let threshold = (self.buckets.len() as f64 * LOAD_FACTOR_UP) as usize;
        if self.item_count > threshold.max(1) {
            self.rehash(self.buckets.len() * 2);
        }
    }

    fn maybe_shrink(&mut self) {
        let threshold = (self.buckets.len() as f64 * LOAD_FACTOR_DOWN) as usize;
        if self.buckets.len() > MIN_BUCKETS && self.item_count < threshold {
            self.rehash((self.buckets.len() / 2).max(MIN_BUCKETS));
        }
    }

    fn rehash(&mut self, new_bucket_count: usize) {
        let mut buckets: Vec<Vec<NodeId>> = (0..new_bucket_count).map(|_| Vec::new()).collect();
        for (index, slot) in self.slots.iter().enumerate() {
            if let Slot::Occupied { generation, node } = slot {
                let id = NodeId { index: index as u32, generation: *generation };
                let idx = (node.hash as usize) % new_bucket_count;
                buckets[idx].push(id);
            }
        }
        self.buckets = buckets;
    }

    pub fn len(&self) -> usize {
        self.item_count
    }

    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }
}

impl Default for NameTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_creates_missing_ancestors() {
        let mut tree = NameTree::new();
        let node = tree.lookup(&Name::from_str("/a/b/c"));
        assert_eq!(tree.prefix(node), &Name::from_str("/a/b/c"));
        assert!(tree.find_exact(&Name::from_str("/a")).is_some());
        assert!(tree.find_exact(&Name::from_str("/a/b")).is_some());
    }

    #[test]
    fn lookup_is_idempotent() {
        let mut tree = NameTree::new();
        let first = tree.lookup(&Name::from_str("/a/b"));
        let second = tree.lookup(&Name::from_str("/a/b"));
        assert_eq!(first, second);
    }

    #[test]
    fn find_longest_prefix_match_prefers_deepest() {
        let mut tree = NameTree::new();
        let a = tree.lookup(&Name::from_str("/a"));
        let ab = tree.lookup(&Name::from_str("/a/b"));
        tree.attach_fib(a);
        tree.attach_fib(ab);
        let found = tree
            .find_longest_prefix_match(&Name::from_str("/a/b/c"), |id| tree.node(id).fib)
            .unwrap();
        assert_eq!(found, ab);
    }

    #[test]
    fn erase_if_empty_collapses_unused_ancestors() {
        let mut tree = NameTree::new();
        let leaf = tree.lookup(&Name::from_str("/a/b/c"));
        tree.attach_pit(leaf);
        tree.detach_pit(leaf);
        assert!(tree.find_exact(&Name::from_str("/a/b/c")).is_none());
        assert!(tree.find_exact(&Name::from_str("/a/b")).is_none());
        assert!(tree.find_exact(&Name::from_str("/a")).is_none());
        assert!(tree.find_exact(&Name::new()).is_some());
    }

    #[test]
    fn erase_if_empty_keeps_ancestor_with_other_children() {
        let mut tree = NameTree::new();
        let ab = tree.lookup(&Name::from_str("/a/b"));
        let ac = tree.lookup(&Name::from_str("/a/c"));
        tree.attach_pit(ab);
        tree.attach_pit(ac);
        tree.detach_pit(ab);
        assert!(tree.find_exact(&Name::from_str("/a/b")).is_none());
        assert!(tree.find_exact(&Name::from_str("/a")).is_some());
    }

    #[test]
    fn zero_component_name_is_lookup_able() {
        let mut tree = NameTree::new();
        let root = tree.lookup(&Name::new());
        assert_eq!(root, tree.root());
    }
}
