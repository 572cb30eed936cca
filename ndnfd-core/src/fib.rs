//! Forwarding Information Base (§4.3): longest-prefix-match table mapping
//! name prefixes to next-hop faces with costs.

use crate::face::FaceId;
use crate::name_tree::{NameTree, NodeId};
use ndnfd_common::name::{Name, MAX_NAME_DEPTH};
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, thiserror::Error)]
pub enum FibError {
    #[error("name too long: {0} components (max {1})")]
    NameTooLong(usize, usize),
}

#[derive(Debug, Clone, Default)]
pub struct FibEntry {
    pub prefix: Name,
    next_hops: HashMap<FaceId, u64>,
}

impl FibEntry {
    pub fn next_hops(&self) -> impl Iterator<Item = (FaceId, u64)> + '_ {
        self.next_hops.iter().map(|(&f, &c)| (f, c))
    }

    pub fn is_empty(&self) -> bool {
        self.next_hops.is_empty()
    }

    /// Next hop with the lowest cost, if any — the default next-hop picker
    /// a best-route strategy uses.
    pub fn best_next_hop(&self) -> Option<FaceId> {
        self.next_hops
            .iter()
            .min_by_key(|(_, &cost)| cost)
            .map(|(&f, _)| f)
    }
}

/// Empty sentinel returned by `find_longest_prefix_match` on a total miss.
fn empty_entry() -> &'static FibEntry {
    static EMPTY_ENTRY: OnceLock<FibEntry> = OnceLock::new();
    EMPTY_ENTRY.get_or_init(FibEntry::default)
}

pub struct Fib {
    entries: HashMap<NodeId, FibEntry>,
}

impl Fib {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn find_longest_prefix_match<'a>(&'a self, tree: &NameTree, name: &Name) -> &'a FibEntry {
        if let Some(node) = tree.find_longest_prefix_match(name, |n| self.entries.contains_key(&n)) {
            self.entries.get(&node).expect("predicate guaranteed presence")
        } else {
            empty_entry()
        }
    }

    pub fn find_exact<'a>(&'a self, tree: &NameTree, name: &Name) -> Option<&'a FibEntry> {
        let node = tree.find_exact(name)?;
        self.entries.get(&node)
    }

    /// Idempotent: returns the existing entry if already present. Creating
    /// a missing entry adds no next-hops (§4.3).
    pub fn insert(&mut self, tree: &mut NameTree, name: &Name) -> Result<(NodeId, bool), FibError> {
        if name.len() > MAX_NAME_DEPTH {
            return Err(FibError::NameTooLong(name.len(), MAX_NAME_DEPTH));
        }
        let node = tree.lookup(name);
        let created = !self.entries.contains_key(&node);
        if created {
            self.entries.insert(
                node,
                FibEntry { prefix: name.clone(), next_hops: HashMap::new() },
            );
            tree.attach_fib(node);
        }
        Ok((node, created))
    }

    pub fn add_next_hop(&mut self, node: NodeId, face_id: FaceId, cost: u64) {
        if let Some(entry) = self.entries.get_mut(&node) {
            entry.next_hops.insert(face_id, cost);
        }
    }

    /// Removes `face_id` from the entry at `node`; erases the entry (and
    /// garbage-collects the Name Tree node) if it becomes empty.
    pub fn remove_next_hop(&mut self, tree: &mut NameTree, node: NodeId, face_id: FaceId) {
        let became_empty = if let Some(entry) = self.entries.get_mut(&node) {
            entry.next_hops.remove(&face_id);
            entry.next_hops.is_empty()
        } else {
            false
        };
        if became_empty {
            self.erase(tree, node);
        }
    }

    pub fn erase(&mut self, tree: &mut NameTree, node: NodeId) {
        if self.entries.remove(&node).is_some() {
            tree.detach_fib(node);
            tree.erase_if_empty(node);
        }
    }

    /// Removes every next-hop referencing `face_id` across all entries
    /// (§4.7.5 face-fail pipeline, step 1).
    pub fn remove_face(&mut self, tree: &mut NameTree, face_id: FaceId) {
        let emptied: Vec<NodeId> = self
            .entries
            .iter_mut()
            .filter_map(|(&node, entry)| {
                entry.next_hops.remove(&face_id);
                entry.next_hops.is_empty().then_some(node)
            })
            .collect();
        for node in emptied {
            self.erase(tree, node);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for Fib {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_prefix_match_prefers_longer_entry() {
        let mut tree = NameTree::new();
        let mut fib = Fib::new();
        let (a_node, _) = fib.insert(&mut tree, &Name::from_str("/a")).unwrap();
        let (ab_node, _) = fib.insert(&mut tree, &Name::from_str("/a/b")).unwrap();
        fib.add_next_hop(a_node, 1, 10);
        fib.add_next_hop(ab_node, 2, 10);

        let entry = fib.find_longest_prefix_match(&tree, &Name::from_str("/a/b/c"));
        assert_eq!(entry.prefix, Name::from_str("/a/b"));
    }

    #[test]
    fn add_next_hop_is_idempotent_on_face() {
        let mut tree = NameTree::new();
        let mut fib = Fib::new();
        let (node, _) = fib.insert(&mut tree, &Name::from_str("/a")).unwrap();
        fib.add_next_hop(node, 1, 10);
        fib.add_next_hop(node, 1, 20);
        let entry = fib.find_exact(&tree, &Name::from_str("/a")).unwrap();
        assert_eq!(entry.next_hops().count(), 1);
        assert_eq!(entry.next_hops().next().unwrap().1, 20);
    }

    #[test]
    fn removing_last_next_hop_erases_entry() {
        let mut tree = NameTree::new();
        let mut fib = Fib::new();
        let (node, _) = fib.insert(&mut tree, &Name::from_str("/a")).unwrap();
        fib.add_next_hop(node, 1, 10);
        fib.remove_next_hop(&mut tree, node, 1);
        assert!(fib.find_exact(&tree, &Name::from_str("/a")).is_none());
    }

    #[test]
    fn name_too_long_is_rejected() {
        let mut tree = NameTree::new();
        let mut fib = Fib::new();
        let long = Name::from_components((0..MAX_NAME_DEPTH + 1).map(|i| {
            ndnfd_common::name::NameComponent::new(format!("c{i}").into_bytes())
        }).collect());
        assert!(fib.insert(&mut tree, &long).is_err());
    }

    #[test]
    fn face_fail_removes_next_hops_everywhere() {
        let mut tree = NameTree::new();
        let mut fib = Fib::new();
        let (a, _) = fib.insert(&mut tree, &Name::from_str("/a")).unwrap();
        let (b, _) = fib.insert(&mut tree, &Name::from_str("/b")).unwrap();
        fib.add_next_hop(a, 1, 10);
        fib.add_next_hop(b, 1, 10);
        fib.add_next_hop(b, 2, 20);
        fib.remove_face(&mut tree, 1);
        assert!(fib.find_exact(&tree, &Name::from_str("/a")).is_none());
        assert_eq!(fib.find_exact(&tree, &Name::from_str("/b")).unwrap().next_hops().count(), 1);
    }
}
