//! Dead-Nonce List (§4.6): a bounded FIFO/hash-set of (name, nonce)
//! fingerprints used to catch looped Interests after their PIT entry has
//! already been consumed.
//!
//! The self-tuning capacity algorithm (mark insertion, periodic adjustment)
//! is evaluated lazily against a caller-supplied `now` rather than via a
//! background timer task, so the table stays plain synchronous state owned
//! by the forwarder task (§5) — see DESIGN.md for this resolution.

use ndnfd_common::name::Name;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

pub const MIN_CAPACITY: usize = 8;
pub const MAX_CAPACITY: usize = 16_777_216;
const INITIAL_CAPACITY: usize = 128;
const EXPECTED_MARK_COUNT: u64 = 5;
const CAPACITY_UP: f64 = 1.2;
const CAPACITY_DOWN: f64 = 0.9;
const EVICT_LIMIT: usize = 64;

/// The distinguished mark fingerprint; never produced by `fingerprint_of`.
const MARK_TOKEN: u64 = 0;

fn fingerprint_of(name: &Name, nonce: u32) -> u64 {
    // FNV-1a over the wire encoding, folded with the nonce as a seed. Any
    // 64-bit hash with reasonable avalanche works here (§4.6); the exact
    // function is not observable.
    let mut hash: u64 = 0xcbf29ce484222325 ^ (nonce as u64);
    for byte in name.wire_encode() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    if hash == MARK_TOKEN {
        hash = 1;
    }
    hash
}

struct Entry {
    fingerprint: u64,
}

pub struct DeadNonceList {
    queue: VecDeque<Entry>,
    counts: HashMap<u64, u64>,
    capacity: usize,
    lifetime: Duration,
    mark_interval: Duration,
    last_mark: Option<Instant>,
    last_adjust: Instant,
    marks_since_adjust: Vec<u64>,
    started: Option<Instant>,
}

impl DeadNonceList {
    pub fn new(lifetime: Duration) -> Self {
        let lifetime = lifetime.max(Duration::from_millis(1));
        Self {
            queue: VecDeque::new(),
            counts: HashMap::new(),
            capacity: INITIAL_CAPACITY,
            mark_interval: lifetime / EXPECTED_MARK_COUNT as u32,
            lifetime,
            last_mark: None,
            last_adjust: Instant::now(),
            marks_since_adjust: Vec::new(),
            started: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn size(&self) -> usize {
        self.queue.len()
    }

    pub fn has(&self, name: &Name, nonce: u32) -> bool {
        self.counts.contains_key(&fingerprint_of(name, nonce))
    }

    pub fn add(&mut self, name: &Name, nonce: u32, now: Instant) {
        self.tick(now);
        let fp = fingerprint_of(name, nonce);
        self.push(fp);
        self.evict_to_capacity();
    }

    /// Advances the mark/adjust bookkeeping to `now`. Called by `add` and
    /// may also be driven directly from the forwarder's periodic
    /// maintenance pass so capacity tracks idle periods too.
    pub fn tick(&mut self, now: Instant) {
        let started = *self.started.get_or_insert(now);
        let _ = started;

        let last_mark = *self.last_mark.get_or_insert(now);
        let mut next_mark = last_mark;
        while now.duration_since(next_mark) >= self.mark_interval {
            next_mark += self.mark_interval;
            self.push(MARK_TOKEN);
            self.evict_to_capacity();
        }
        self.last_mark = Some(next_mark);

        if now.duration_since(self.last_adjust) >= self.lifetime {
            let count = self.counts.get(&MARK_TOKEN).copied().unwrap_or(0);
            self.marks_since_adjust.push(count);
            self.last_adjust = now;
            self.adjust_capacity();
        }
    }

    fn push(&mut self, fingerprint: u64) {
        self.queue.push_back(Entry { fingerprint });
        *self.counts.entry(fingerprint).or_insert(0) += 1;
    }

    fn pop_front(&mut self) {
        if let Some(entry) = self.queue.pop_front() {
            if let Some(count) = self.counts.get_mut(&entry.fingerprint) {
                *count -= 1;
                if *count == 0 {
                    self.counts.remove(&entry.fingerprint);
                }
            }
        }
    }

    fn evict_to_capacity(&mut self) {
        let mut evicted = 0;
        while self.queue.len() > self.capacity && evicted < EVICT_LIMIT {
            self.pop_front();
            evicted += 1;
        }
    }

    /// Grows or shrinks capacity based on whether every observed mark count
    /// since the last adjustment exceeded or fell short of the expected
    /// steady-state count (§4.6).
    fn adjust_capacity(&mut self) {
        if self.marks_since_adjust.is_empty() {
            return;
        }
        let all_above = self.marks_since_adjust.iter().all(|&c| c > EXPECTED_MARK_COUNT);
        let all_below = self.marks_since_adjust.iter().all(|&c| c < EXPECTED_MARK_COUNT);
        if all_above {
            self.capacity = ((self.capacity as f64 * CAPACITY_DOWN) as usize).max(MIN_CAPACITY);
        } else if all_below {
            self.capacity = ((self.capacity as f64 * CAPACITY_UP) as usize).min(MAX_CAPACITY);
        }
        self.marks_since_adjust.clear();
        self.evict_to_capacity();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_has_is_true() {
        let mut dnl = DeadNonceList::new(Duration::from_secs(6));
        let now = Instant::now();
        let name = Name::from_str("/a/b");
        assert!(!dnl.has(&name, 1));
        dnl.add(&name, 1, now);
        assert!(dnl.has(&name, 1));
        assert!(!dnl.has(&name, 2));
    }

    #[test]
    fn size_is_bounded_by_capacity() {
        let mut dnl = DeadNonceList::new(Duration::from_secs(6));
        let now = Instant::now();
        for i in 0..10_000u32 {
            dnl.add(&Name::from_str(&format!("/n/{}", i)), i, now);
        }
        assert!(dnl.size() <= dnl.capacity() + EVICT_LIMIT);
        assert!(dnl.size() <= MAX_CAPACITY);
    }

    #[test]
    fn capacity_grows_under_light_load() {
        let mut dnl = DeadNonceList::new(Duration::from_millis(50));
        let initial = dnl.capacity();
        let mut now = Instant::now();
        // Advance past several lifetimes with no adds beyond the occasional
        // mark tick: observed mark counts stay at/under steady state, so
        // capacity should grow.
        for _ in 0..6 {
            now += Duration::from_millis(60);
            dnl.tick(now);
        }
        assert!(dnl.capacity() >= initial);
    }
}
