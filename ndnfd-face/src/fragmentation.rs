//! NDNLP slicing (sender) and reassembly (receiver) over an unreliable
//! datagram transport (§4.1).
//!
//! Slicing is pure and synchronous. Reassembly owns a per-face partial
//! message store; each partial message gets its own idle-eviction timer
//! rather than a shared sweep, since fragments of unrelated messages arrive
//! interleaved and each has an independent deadline.

use bytes::{Bytes, BytesMut};
use log::trace;
use ndnfd_common::ndnlp::NdnlpFragment;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Conservative estimate of per-fragment TLV overhead (type+length bytes for
/// the NdnlpData/Sequence/FragIndex/FragCount/Payload headers) subtracted
/// from the configured MTU to get the usable payload chunk size.
const NDNLP_FRAGMENT_OVERHEAD: usize = 24;

/// Slices encoded network-layer packets into NDNLP fragments, handing out
/// sequence numbers from a single monotonically increasing counter shared
/// across all packets sent on a face (§4.1: "two concurrent slices never
/// share a sequence number").
#[derive(Debug, Default)]
pub struct Slicer {
    next_sequence: AtomicU64,
}

impl Slicer {
    pub fn new() -> Self {
        Self { next_sequence: AtomicU64::new(0) }
    }

    /// Splits `payload` into fragments no larger than `mtu` minus estimated
    /// overhead. A payload that already fits in one fragment yields a
    /// single fragment with `frag_count = 1` and no index/count fields.
    pub fn slice(&self, payload: &[u8], mtu: usize) -> Vec<NdnlpFragment> {
        let chunk_size = mtu.saturating_sub(NDNLP_FRAGMENT_OVERHEAD).max(1);
        let frag_count = ((payload.len() + chunk_size - 1) / chunk_size).max(1);
        assert!(frag_count <= u16::MAX as usize, "payload needs more than 65535 fragments");

        let base = self.next_sequence.fetch_add(frag_count as u64, Ordering::Relaxed);

        if frag_count == 1 {
            return vec![NdnlpFragment::single(base, Bytes::copy_from_slice(payload))];
        }

        payload
            .chunks(chunk_size)
            .enumerate()
            .map(|(i, part)| NdnlpFragment {
                sequence: base.wrapping_add(i as u64),
                frag_index: i as u16,
                frag_count: frag_count as u16,
                payload: Bytes::copy_from_slice(part),
            })
            .collect()
    }
}

struct PartialMessage {
    frag_count: u16,
    slots: Vec<Option<Bytes>>,
    received: u16,
    /// Bumped on every fragment received; used by a scheduled eviction to
    /// tell whether the message has made progress since the timer was set.
    version: u64,
}

impl PartialMessage {
    fn new(frag_count: u16) -> Self {
        Self { frag_count, slots: vec![None; frag_count as usize], received: 0, version: 0 }
    }

    fn is_complete(&self) -> bool {
        self.received == self.frag_count
    }

    fn reassemble(self) -> Option<Bytes> {
        let mut buf = BytesMut::new();
        for slot in self.slots {
            buf.extend_from_slice(&slot?);
        }
        Some(buf.freeze())
    }
}

/// Per-remote reassembly state (§4.1). One store per Face; fragments from
/// different remotes are never mixed.
#[derive(Clone)]
pub struct PartialMessageStore {
    partials: Arc<Mutex<HashMap<u64, PartialMessage>>>,
    idle: Duration,
}

impl PartialMessageStore {
    pub fn new(idle: Duration) -> Self {
        Self { partials: Arc::new(Mutex::new(HashMap::new())), idle }
    }

    /// Feeds one fragment in. Returns the reassembled payload once every
    /// index `[0, frag_count)` has arrived exactly once. A fragment whose
    /// `frag_count` disagrees with the in-progress message invalidates it
    /// (§4.1: "fails if fragment-count differs between fragments of the
    /// same id").
    pub async fn insert(&self, frag: NdnlpFragment) -> Option<Bytes> {
        let id = frag.sequence.wrapping_sub(frag.frag_index as u64);

        let (complete, version) = {
            let mut partials = self.partials.lock().await;
            let entry = partials.entry(id).or_insert_with(|| PartialMessage::new(frag.frag_count));

            if entry.frag_count != frag.frag_count {
                trace!("NDNLP partial {} fragment-count mismatch, dropping", id);
                partials.remove(&id);
                return None;
            }

            let idx = frag.frag_index as usize;
            if entry.slots[idx].is_none() {
                entry.slots[idx] = Some(frag.payload);
                entry.received += 1;
            }
            entry.version = entry.version.wrapping_add(1);
            (entry.is_complete(), entry.version)
        };

        if complete {
            let mut partials = self.partials.lock().await;
            return partials.remove(&id).and_then(PartialMessage::reassemble);
        }

        self.schedule_eviction(id, version);
        None
    }

    fn schedule_eviction(&self, id: u64, version: u64) {
        let partials = Arc::clone(&self.partials);
        let idle = self.idle;
        tokio::spawn(async move {
            tokio::time::sleep(idle).await;
            let mut partials = partials.lock().await;
            if matches!(partials.get(&id), Some(p) if p.version == version) {
                partials.remove(&id);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slicer_keeps_payloads_under_mtu_whole() {
        let slicer = Slicer::new();
        let fragments = slicer.slice(b"hello", 1400);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].frag_count, 1);
        assert_eq!(fragments[0].payload, Bytes::from_static(b"hello"));
    }

    #[test]
    fn slicer_splits_oversized_payload() {
        let slicer = Slicer::new();
        let payload = vec![7u8; 3000];
        let fragments = slicer.slice(&payload, 1000);
        assert!(fragments.len() > 1);
        for (i, frag) in fragments.iter().enumerate() {
            assert_eq!(frag.frag_index, i as u16);
            assert_eq!(frag.frag_count, fragments.len() as u16);
        }
        let total: usize = fragments.iter().map(|f| f.payload.len()).sum();
        assert_eq!(total, payload.len());
    }

    #[test]
    fn slicer_never_reuses_a_sequence_number() {
        let slicer = Slicer::new();
        let a = slicer.slice(&vec![0u8; 3000], 1000);
        let b = slicer.slice(&vec![0u8; 3000], 1000);
        let a_seqs: Vec<u64> = a.iter().map(|f| f.sequence).collect();
        let b_seqs: Vec<u64> = b.iter().map(|f| f.sequence).collect();
        assert!(a_seqs.iter().all(|s| !b_seqs.contains(s)));
    }

    #[tokio::test]
    async fn reassembles_in_order_fragments() {
        let slicer = Slicer::new();
        let payload = vec![9u8; 3000];
        let fragments = slicer.slice(&payload, 1000);
        let store = PartialMessageStore::new(Duration::from_millis(100));
        let mut reassembled = None;
        for frag in fragments {
            reassembled = store.insert(frag).await;
        }
        assert_eq!(reassembled, Some(Bytes::from(payload)));
    }

    #[tokio::test]
    async fn reassembles_out_of_order_fragments() {
        let slicer = Slicer::new();
        let payload = vec![3u8; 3000];
        let mut fragments = slicer.slice(&payload, 1000);
        fragments.reverse();
        let store = PartialMessageStore::new(Duration::from_millis(100));
        let mut reassembled = None;
        for frag in fragments {
            reassembled = store.insert(frag).await;
        }
        assert_eq!(reassembled, Some(Bytes::from(payload)));
    }

    #[tokio::test]
    async fn idle_partial_message_is_evicted() {
        let slicer = Slicer::new();
        let fragments = slicer.slice(&vec![1u8; 3000], 1000);
        let store = PartialMessageStore::new(Duration::from_millis(20));
        // Insert all but the last fragment, leave it incomplete.
        let n = fragments.len();
        for frag in fragments.into_iter().take(n - 1) {
            assert!(store.insert(frag).await.is_none());
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.partials.lock().await.is_empty());
    }

    #[tokio::test]
    async fn mismatched_frag_count_drops_the_partial() {
        let store = PartialMessageStore::new(Duration::from_millis(100));
        let a = NdnlpFragment { sequence: 10, frag_index: 0, frag_count: 2, payload: Bytes::from_static(b"a") };
        let b = NdnlpFragment { sequence: 10, frag_index: 0, frag_count: 3, payload: Bytes::from_static(b"b") };
        assert!(store.insert(a).await.is_none());
        assert!(store.insert(b).await.is_none());
        assert!(store.partials.lock().await.is_empty());
    }
}
