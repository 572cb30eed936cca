//! Content Store (§4.5): caches Data under its full name with a pluggable
//! eviction policy.

use crate::name_tree::NameTree;
use ndnfd_common::config::CsPolicyKind;
use ndnfd_common::name::{FullName, Name};
use ndnfd_common::packet::{ChildSelector, Data, Interest};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

pub struct CsEntry {
    pub data: Data,
    pub full_name: FullName,
    pub stale_after: Option<Instant>,
    pub is_unsolicited: bool,
    pub inserted_at: Instant,
}

impl CsEntry {
    fn is_stale(&self, now: Instant) -> bool {
        matches!(self.stale_after, Some(t) if now >= t)
    }
}

/// A policy decides eviction order; it only ever sees full names, never the
/// stored Data.
trait EvictionPolicy: Send {
    fn on_insert(&mut self, key: FullName, is_unsolicited: bool, has_freshness: bool);
    fn on_access(&mut self, key: &FullName);
    fn on_mark_stale(&mut self, key: &FullName);
    fn on_remove(&mut self, key: &FullName);
    fn evict_one(&mut self) -> Option<FullName>;
}

/// Three queues — UNSOLICITED, STALE, FIFO — drained in that order.
#[derive(Default)]
struct PriorityFifoPolicy {
    unsolicited: VecDeque<FullName>,
    stale: VecDeque<FullName>,
    fifo: VecDeque<FullName>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Queue {
    Unsolicited,
    Stale,
    Fifo,
}

impl PriorityFifoPolicy {
    fn queue_of(&self, key: &FullName) -> Option<Queue> {
        if self.unsolicited.contains(key) {
            Some(Queue::Unsolicited)
        } else if self.stale.contains(key) {
            Some(Queue::Stale)
        } else if self.fifo.contains(key) {
            Some(Queue::Fifo)
        } else {
            None
        }
    }

    fn remove_from(&mut self, queue: Queue, key: &FullName) {
        let q = match queue {
            Queue::Unsolicited => &mut self.unsolicited,
            Queue::Stale => &mut self.stale,
            Queue::Fifo => &mut self.fifo,
        };
        q.retain(|k| k != key);
    }
}

impl EvictionPolicy for PriorityFifoPolicy {
    fn on_insert(&mut self, key: FullName, is_unsolicited: bool, _has_freshness: bool) {
        if let Some(q) = self.queue_of(&key) {
            self.remove_from(q, &key);
        }
        if is_unsolicited {
            self.unsolicited.push_back(key);
        } else {
            self.fifo.push_back(key);
        }
    }

    fn on_access(&mut self, _key: &FullName) {}

    fn on_mark_stale(&mut self, key: &FullName) {
        if let Some(q) = self.queue_of(key) {
            if q != Queue::Stale {
                self.remove_from(q, key);
                self.stale.push_back(key.clone());
            }
        }
    }

    fn on_remove(&mut self, key: &FullName) {
        if let Some(q) = self.queue_of(key) {
            self.remove_from(q, key);
        }
    }

    fn evict_one(&mut self) -> Option<FullName> {
        self.unsolicited
            .pop_front()
            .or_else(|| self.stale.pop_front())
            .or_else(|| self.fifo.pop_front())
    }
}

/// Single queue in recency-of-use order; hits and inserts promote to the
/// tail. `Vec`-backed: fine at the scale this exercise targets, O(n) per
/// promotion rather than O(1).
#[derive(Default)]
struct LruPolicy {
    order: Vec<FullName>,
}

impl EvictionPolicy for LruPolicy {
    fn on_insert(&mut self, key: FullName, _is_unsolicited: bool, _has_freshness: bool) {
        self.order.retain(|k| k != &key);
        self.order.push(key);
    }

    fn on_access(&mut self, key: &FullName) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let k = self.order.remove(pos);
            self.order.push(k);
        }
    }

    fn on_mark_stale(&mut self, _key: &FullName) {}

    fn on_remove(&mut self, key: &FullName) {
        self.order.retain(|k| k != key);
    }

    fn evict_one(&mut self) -> Option<FullName> {
        if self.order.is_empty() {
            None
        } else {
            Some(self.order.remove(0))
        }
    }
}

fn policy_for(kind: CsPolicyKind) -> Box<dyn EvictionPolicy> {
    match kind {
        CsPolicyKind::PriorityFifo => Box::new(PriorityFifoPolicy::default()),
        CsPolicyKind::Lru => Box::new(LruPolicy::default()),
    }
}

pub struct Cs {
    entries: BTreeMap<FullName, CsEntry>,
    limit: usize,
    policy: Box<dyn EvictionPolicy>,
    policy_kind: CsPolicyKind,
}

impl Cs {
    pub fn new(limit: usize, policy_kind: CsPolicyKind) -> Self {
        Self {
            entries: BTreeMap::new(),
            limit,
            policy: policy_for(policy_kind),
            policy_kind,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stores `data` under its full name, evicting as needed to respect
    /// `limit`. Re-evaluates queue placement on replace (§4.5).
    pub fn insert(&mut self, tree: &mut NameTree, data: Data, is_unsolicited: bool, now: Instant) {
        let full_name = data.full_name();
        let stale_after = data.meta.freshness_period.map(|fp| now + fp);
        let is_new = !self.entries.contains_key(&full_name);

        self.entries.insert(
            full_name.clone(),
            CsEntry { data, full_name: full_name.clone(), stale_after, is_unsolicited, inserted_at: now },
        );
        self.policy.on_insert(full_name.clone(), is_unsolicited, stale_after.is_some());
        if is_new {
            let node = tree.lookup(&full_name.name);
            tree.attach_cs(node);
        }

        while self.entries.len() > self.limit {
            if let Some(victim) = self.policy.evict_one() {
                self.remove_entry(tree, &victim);
            } else {
                break;
            }
        }
    }

    fn remove_entry(&mut self, tree: &mut NameTree, key: &FullName) {
        if let Some(entry) = self.entries.remove(key) {
            self.policy.on_remove(key);
            let node = tree.lookup(&entry.full_name.name);
            tree.detach_cs(node);
        }
    }

    /// Moves any entry whose freshness period has elapsed as of `now` into
    /// the STALE queue (Priority-FIFO) — the scheduled transition in §4.5,
    /// modeled as a periodic sweep rather than a per-entry timer task.
    pub fn tick(&mut self, now: Instant) {
        let stale: Vec<FullName> = self
            .entries
            .values()
            .filter(|e| e.is_stale(now))
            .map(|e| e.full_name.clone())
            .collect();
        for key in stale {
            self.policy.on_mark_stale(&key);
        }
    }

    pub fn find(&mut self, interest: &Interest, now: Instant) -> Option<&Data> {
        let lower = interest.name.clone();
        let upper = interest.name.successor();
        let candidate_range: Vec<FullName> = self
            .entries
            .range(FullName::new(lower.clone(), [0u8; 32])..FullName::new(upper, [0u8; 32]))
            .map(|(k, _)| k.clone())
            .collect();

        let mut candidates: Vec<FullName> = candidate_range
            .into_iter()
            .filter(|key| {
                let entry = &self.entries[key];
                if interest.must_be_fresh && entry.is_stale(now) {
                    return false;
                }
                let suffix_len = key.as_name().len().saturating_sub(interest.name.len());
                if let Some(min) = interest.selectors.min_suffix_components {
                    if (suffix_len as u32) < min {
                        return false;
                    }
                }
                if let Some(max) = interest.selectors.max_suffix_components {
                    if (suffix_len as u32) > max {
                        return false;
                    }
                }
                if !interest.selectors.exclude.is_empty() {
                    let as_name = key.as_name();
                    if let Some(next) = as_name.get(interest.name.len()) {
                        let excluded: HashSet<_> = interest
                            .selectors
                            .exclude
                            .iter()
                            .filter_map(|e| e.components().last().cloned())
                            .collect();
                        if excluded.contains(next) {
                            return false;
                        }
                    }
                }
                true
            })
            .collect();

        candidates.sort();
        let chosen = match interest.selectors.child_selector {
            Some(ChildSelector::Rightmost) => candidates.last().cloned(),
            _ => candidates.first().cloned(),
        }?;

        self.policy.on_access(&chosen);
        self.entries.get(&chosen).map(|e| &e.data)
    }

    /// Bulk-erases up to `limit` entries under `name_prefix`.
    pub fn erase(&mut self, tree: &mut NameTree, name_prefix: &Name, limit: usize) -> usize {
        let lower = name_prefix.clone();
        let upper = name_prefix.successor();
        let victims: Vec<FullName> = self
            .entries
            .range(FullName::new(lower, [0u8; 32])..FullName::new(upper, [0u8; 32]))
            .take(limit)
            .map(|(k, _)| k.clone())
            .collect();
        let n = victims.len();
        for key in victims {
            self.remove_entry(tree, &key);
        }
        n
    }

    /// Requires the store to be empty — §4.5 precondition.
    pub fn set_policy(&mut self, kind: CsPolicyKind) -> Result<(), &'static str> {
        if !self.entries.is_empty() {
            return Err("set_policy requires an empty Content Store");
        }
        self.policy = policy_for(kind);
        self.policy_kind = kind;
        Ok(())
    }

    pub fn policy_kind(&self) -> CsPolicyKind {
        self.policy_kind
    }

    pub fn set_limit(&mut self, tree: &mut NameTree, limit: usize) {
        self.limit = limit;
        while self.entries.len() > self.limit {
            if let Some(victim) = self.policy.evict_one() {
                self.remove_entry(tree, &victim);
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn data(name: &str, content: &str) -> Data {
        Data::new(Name::from_str(name), Bytes::copy_from_slice(content.as_bytes()))
    }

    #[test]
    fn insert_then_find_round_trips() {
        let mut tree = NameTree::new();
        let mut cs = Cs::new(10, CsPolicyKind::PriorityFifo);
        let now = Instant::now();
        cs.insert(&mut tree, data("/a/b", "hi"), false, now);
        let interest = Interest::new(Name::from_str("/a/b")).with_must_be_fresh(false);
        let found = cs.find(&interest, now).unwrap();
        assert_eq!(found.content, Bytes::from_static(b"hi"));
    }

    #[test]
    fn must_be_fresh_excludes_stale_entries() {
        let mut tree = NameTree::new();
        let mut cs = Cs::new(10, CsPolicyKind::PriorityFifo);
        let now = Instant::now();
        cs.insert(&mut tree, data("/a", "x").with_freshness_period(Duration::from_millis(10)), false, now);
        let later = now + Duration::from_millis(50);
        cs.tick(later);
        let interest = Interest::new(Name::from_str("/a"));
        assert!(interest.must_be_fresh);
        assert!(cs.find(&interest, later).is_none());
    }

    #[test]
    fn replacing_same_full_name_keeps_size_constant() {
        let mut tree = NameTree::new();
        let mut cs = Cs::new(10, CsPolicyKind::PriorityFifo);
        let now = Instant::now();
        let d = data("/a", "same");
        cs.insert(&mut tree, d.clone(), false, now);
        let before = cs.len();
        cs.insert(&mut tree, d, false, now);
        assert_eq!(cs.len(), before);
    }

    #[test]
    fn eviction_respects_limit_priority_order() {
        let mut tree = NameTree::new();
        let mut cs = Cs::new(1, CsPolicyKind::PriorityFifo);
        let now = Instant::now();
        cs.insert(&mut tree, data("/a", "1"), true, now);
        cs.insert(&mut tree, data("/b", "2"), false, now);
        assert_eq!(cs.len(), 1);
        let interest = Interest::new(Name::from_str("/a")).with_must_be_fresh(false);
        assert!(cs.find(&interest, now).is_none());
    }

    #[test]
    fn lru_access_promotes_entry() {
        let mut tree = NameTree::new();
        let mut cs = Cs::new(2, CsPolicyKind::Lru);
        let now = Instant::now();
        cs.insert(&mut tree, data("/a", "1"), false, now);
        cs.insert(&mut tree, data("/b", "2"), false, now);
        let interest_a = Interest::new(Name::from_str("/a")).with_must_be_fresh(false);
        cs.find(&interest_a, now);
        cs.insert(&mut tree, data("/c", "3"), false, now);
        assert!(cs.find(&interest_a, now).is_some());
        let interest_b = Interest::new(Name::from_str("/b")).with_must_be_fresh(false);
        assert!(cs.find(&interest_b, now).is_none());
    }
}
