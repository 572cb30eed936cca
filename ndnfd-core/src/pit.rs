//! Pending Interest Table (§4.4): tracks outstanding Interests, one entry
//! per Interest identity, with in-records (downstream) and out-records
//! (upstream) plus the unsatisfy/straggler timers.

use crate::face::FaceId;
use crate::name_tree::{NameTree, NodeId};
use ndnfd_common::name::Name;
use ndnfd_common::packet::{Interest, InterestIdentity, Nack};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Fixed interval after satisfaction during which late duplicate Data is
/// still accepted and absorbed (§4.4).
pub const STRAGGLER_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct InRecord {
    pub face: FaceId,
    pub last_nonce: u32,
    pub last_renewed: Instant,
    pub expiry: Instant,
    pub interest: Interest,
}

#[derive(Debug, Clone)]
pub struct OutRecord {
    pub face: FaceId,
    pub last_nonce: u32,
    pub expiry: Instant,
    pub incoming_nack: Option<Nack>,
}

pub struct PitEntry {
    pub identity: InterestIdentity,
    pub name: Name,
    node: NodeId,
    in_records: HashMap<FaceId, InRecord>,
    out_records: HashMap<FaceId, OutRecord>,
    unsatisfy_expiry: Option<Instant>,
    straggler_expiry: Option<Instant>,
}

impl PitEntry {
    pub fn in_records(&self) -> impl Iterator<Item = &InRecord> {
        self.in_records.values()
    }

    pub fn out_records(&self) -> impl Iterator<Item = &OutRecord> {
        self.out_records.values()
    }

    pub fn get_in_record(&self, face: FaceId) -> Option<&InRecord> {
        self.in_records.get(&face)
    }

    pub fn get_out_record(&self, face: FaceId) -> Option<&OutRecord> {
        self.out_records.get(&face)
    }

    fn recompute_unsatisfy(&mut self) {
        self.unsatisfy_expiry = self.in_records.values().map(|r| r.expiry).max();
    }

    /// True iff `interest` shares this entry's identity (§4.4 `can_match`).
    pub fn can_match(&self, interest: &Interest) -> bool {
        self.identity == interest.identity()
    }
}

pub enum ExpiredReason {
    Unsatisfied,
    Straggler,
}

pub struct Pit {
    entries: HashMap<InterestIdentity, PitEntry>,
}

impl Pit {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, identity: &InterestIdentity) -> Option<&PitEntry> {
        self.entries.get(identity)
    }

    fn entry_for<'a>(
        &'a mut self,
        tree: &mut NameTree,
        interest: &Interest,
    ) -> &'a mut PitEntry {
        let identity = interest.identity();
        if !self.entries.contains_key(&identity) {
            let node = tree.lookup(&interest.name);
            tree.attach_pit(node);
            self.entries.insert(
                identity.clone(),
                PitEntry {
                    identity: identity.clone(),
                    name: interest.name.clone(),
                    node,
                    in_records: HashMap::new(),
                    out_records: HashMap::new(),
                    unsatisfy_expiry: None,
                    straggler_expiry: None,
                },
            );
        }
        self.entries.get_mut(&identity).unwrap()
    }

    /// Finds or creates the PIT entry for `interest`'s identity (§4.7.1
    /// step 4), without touching its records.
    pub fn insert(&mut self, tree: &mut NameTree, interest: &Interest) -> InterestIdentity {
        self.entry_for(tree, interest);
        interest.identity()
    }

    pub fn insert_or_update_in_record(
        &mut self,
        tree: &mut NameTree,
        face: FaceId,
        interest: &Interest,
        now: Instant,
    ) -> InterestIdentity {
        let entry = self.entry_for(tree, interest);
        let expiry = now + interest.lifetime;
        entry.in_records.insert(
            face,
            InRecord {
                face,
                last_nonce: interest.nonce,
                last_renewed: now,
                expiry,
                interest: interest.clone(),
            },
        );
        entry.recompute_unsatisfy();
        entry.identity.clone()
    }

    pub fn insert_or_update_out_record(
        &mut self,
        tree: &mut NameTree,
        face: FaceId,
        interest: &Interest,
        now: Instant,
    ) -> InterestIdentity {
        let entry = self.entry_for(tree, interest);
        let expiry = now + interest.lifetime;
        entry.out_records.insert(
            face,
            OutRecord { face, last_nonce: interest.nonce, expiry, incoming_nack: None },
        );
        entry.identity.clone()
    }

    pub fn delete_in_record(&mut self, identity: &InterestIdentity, face: FaceId) {
        if let Some(entry) = self.entries.get_mut(identity) {
            entry.in_records.remove(&face);
            entry.recompute_unsatisfy();
        }
    }

    pub fn delete_out_record(&mut self, identity: &InterestIdentity, face: FaceId) {
        if let Some(entry) = self.entries.get_mut(identity) {
            entry.out_records.remove(&face);
        }
    }

    pub fn clear_in_records(&mut self, identity: &InterestIdentity) {
        if let Some(entry) = self.entries.get_mut(identity) {
            entry.in_records.clear();
            entry.unsatisfy_expiry = None;
        }
    }

    /// Accepted only if `nack`'s nonce matches the out-record's last nonce
    /// (§4.4); returns whether it was accepted.
    pub fn set_incoming_nack(&mut self, identity: &InterestIdentity, face: FaceId, nack: Nack) -> bool {
        if let Some(entry) = self.entries.get_mut(identity) {
            if let Some(record) = entry.out_records.get_mut(&face) {
                if record.last_nonce == nack.nonce() {
                    record.incoming_nack = Some(nack);
                    return true;
                }
            }
        }
        false
    }

    /// All entries whose name is a prefix of `data_name` and whose
    /// selectors accept it (§4.7.3 step 2).
    pub fn find_matching(&self, data_name: &Name) -> Vec<InterestIdentity> {
        self.entries
            .values()
            .filter(|e| {
                e.name.is_prefix_of(data_name) && e.identity.selectors().accepts(&e.name, data_name)
            })
            .map(|e| e.identity.clone())
            .collect()
    }

    /// Cancels the unsatisfy timer and starts the straggler timer (§4.7.3
    /// step 5), marking the entry as satisfied.
    pub fn start_straggler_timer(&mut self, identity: &InterestIdentity, now: Instant) {
        if let Some(entry) = self.entries.get_mut(identity) {
            entry.unsatisfy_expiry = None;
            entry.straggler_expiry = Some(now + STRAGGLER_INTERVAL);
        }
    }

    pub fn erase(&mut self, tree: &mut NameTree, identity: &InterestIdentity) {
        if let Some(entry) = self.entries.remove(identity) {
            tree.detach_pit(entry.node);
        }
    }

    /// Removes every in/out-record referencing `face`; erases entries left
    /// with no records of either kind (§4.7.5 step 2).
    pub fn remove_face(&mut self, tree: &mut NameTree, face: FaceId) {
        let mut to_erase = Vec::new();
        for (identity, entry) in self.entries.iter_mut() {
            entry.in_records.remove(&face);
            entry.out_records.remove(&face);
            entry.recompute_unsatisfy();
            if entry.in_records.is_empty() && entry.out_records.is_empty() {
                to_erase.push(identity.clone());
            }
        }
        for identity in to_erase {
            self.erase(tree, &identity);
        }
    }

    /// Returns entries whose unsatisfy or straggler timer has fired as of
    /// `now`, without removing them — the forwarder decides what to do
    /// (run the Nack/cleanup logic) before calling `erase`.
    pub fn expired(&self, now: Instant) -> Vec<(InterestIdentity, ExpiredReason)> {
        let mut out = Vec::new();
        for entry in self.entries.values() {
            if let Some(expiry) = entry.straggler_expiry {
                if now >= expiry {
                    out.push((entry.identity.clone(), ExpiredReason::Straggler));
                    continue;
                }
            }
            if let Some(expiry) = entry.unsatisfy_expiry {
                if now >= expiry && entry.in_records.is_empty() {
                    out.push((entry.identity.clone(), ExpiredReason::Unsatisfied));
                }
            } else if entry.straggler_expiry.is_none() && entry.in_records.is_empty() {
                out.push((entry.identity.clone(), ExpiredReason::Unsatisfied));
            }
        }
        out
    }
}

impl Default for Pit {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndnfd_common::packet::NackReason;

    fn interest(name: &str) -> Interest {
        Interest::new(Name::from_str(name)).with_nonce(1)
    }

    #[test]
    fn aggregates_same_identity_into_one_entry() {
        let mut tree = NameTree::new();
        let mut pit = Pit::new();
        let now = Instant::now();
        let a = interest("/a/b").with_nonce(1);
        let b = interest("/a/b").with_nonce(2);
        pit.insert_or_update_in_record(&mut tree, 1, &a, now);
        pit.insert_or_update_in_record(&mut tree, 2, &b, now);
        assert_eq!(pit.len(), 1);
        let entry = pit.get(&a.identity()).unwrap();
        assert_eq!(entry.in_records().count(), 2);
    }

    #[test]
    fn incoming_nack_rejected_on_nonce_mismatch() {
        let mut tree = NameTree::new();
        let mut pit = Pit::new();
        let now = Instant::now();
        let out = interest("/a").with_nonce(5);
        let identity = pit.insert_or_update_out_record(&mut tree, 9, &out, now);
        let stale_nack = Nack::new(interest("/a").with_nonce(6), NackReason::NoRoute);
        assert!(!pit.set_incoming_nack(&identity, 9, stale_nack));
        let fresh_nack = Nack::new(out.clone(), NackReason::NoRoute);
        assert!(pit.set_incoming_nack(&identity, 9, fresh_nack));
    }

    #[test]
    fn find_matching_matches_by_prefix() {
        let mut tree = NameTree::new();
        let mut pit = Pit::new();
        let now = Instant::now();
        let i = interest("/a/b");
        pit.insert_or_update_in_record(&mut tree, 1, &i, now);
        let matches = pit.find_matching(&Name::from_str("/a/b/c"));
        assert_eq!(matches.len(), 1);
        assert!(pit.find_matching(&Name::from_str("/x")).is_empty());
    }

    #[test]
    fn remove_face_erases_entries_left_without_records() {
        let mut tree = NameTree::new();
        let mut pit = Pit::new();
        let now = Instant::now();
        let i = interest("/a");
        pit.insert_or_update_in_record(&mut tree, 1, &i, now);
        pit.remove_face(&mut tree, 1);
        assert!(pit.is_empty());
    }

    #[test]
    fn straggler_then_expired_lists_entry() {
        let mut tree = NameTree::new();
        let mut pit = Pit::new();
        let now = Instant::now();
        let i = interest("/a");
        let identity = pit.insert_or_update_in_record(&mut tree, 1, &i, now);
        pit.start_straggler_timer(&identity, now);
        let later = now + STRAGGLER_INTERVAL + Duration::from_millis(1);
        let expired = pit.expired(later);
        assert_eq!(expired.len(), 1);
    }
}
