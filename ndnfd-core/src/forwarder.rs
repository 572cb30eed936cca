//! The Forwarder (§2 component G, §4.7): the single-threaded state machine
//! tying faces to the Name Tree, FIB, PIT, CS and Dead-Nonce List. Owns
//! every table; nothing outside this struct ever gets `&mut` access to
//! them (§5).

use crate::cs::Cs;
use crate::dead_nonce_list::DeadNonceList;
use crate::face::{Face, FaceId, FaceInfo, FaceState};
use crate::fib::Fib;
use crate::management::{ManagementRequest, ManagementResponse, StatusCode};
use crate::name_tree::NameTree;
use crate::network_region::NetworkRegionTable;
use crate::pit::{ExpiredReason, Pit, STRAGGLER_INTERVAL};
use crate::strategy::{AfterContentStoreHit, BestRouteStrategy, NackAction, Strategy, StrategyContext};
use ndnfd_common::config::{NdnfdConfig, UnsolicitedDataPolicyKind};
use ndnfd_common::metrics::ForwarderMetrics;
use ndnfd_common::packet::{Data, Interest, Nack, NackReason};
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub struct Forwarder {
    tree: NameTree,
    fib: Fib,
    pit: Pit,
    cs: Cs,
    dead_nonce_list: DeadNonceList,
    faces: HashMap<FaceId, Box<dyn Face>>,
    next_face_id: FaceId,
    strategy: Box<dyn Strategy>,
    strategy_choice: HashMap<String, String>,
    network_regions: NetworkRegionTable,
    unsolicited_policy: UnsolicitedDataPolicyKind,
    pub metrics: ForwarderMetrics,
}

impl Forwarder {
    pub fn new(config: &NdnfdConfig) -> Self {
        Self {
            tree: NameTree::new(),
            fib: Fib::new(),
            pit: Pit::new(),
            cs: Cs::new(config.tables.cs_max_packets, config.tables.cs_policy),
            dead_nonce_list: DeadNonceList::new(Duration::from_secs(6)),
            faces: HashMap::new(),
            next_face_id: 1,
            strategy: Box::new(BestRouteStrategy),
            strategy_choice: config.tables.strategy_choice.clone(),
            network_regions: NetworkRegionTable::from_names(
                config.tables.network_region.iter().map(|s| ndnfd_common::name::Name::from_str(s)),
            ),
            unsolicited_policy: config.tables.cs_unsolicited_policy,
            metrics: ForwarderMetrics::new(),
        }
    }

    pub fn register_face(&mut self, face: Box<dyn Face>) -> FaceId {
        let id = face.info().id;
        self.faces.insert(id, face);
        id
    }

    fn face(&self, id: FaceId) -> Option<&dyn Face> {
        self.faces.get(&id).map(|b| b.as_ref())
    }

    fn is_local(&self, id: FaceId) -> bool {
        matches!(self.face(id).map(|f| f.info().scope), Some(crate::face::Scope::Local))
    }

    fn localhost_violation(name: &ndnfd_common::name::Name, is_local: bool) -> bool {
        let localhost = ndnfd_common::name::Name::from_str("/localhost");
        localhost.is_prefix_of(name) && !is_local
    }

    /// §4.7.1 incoming Interest pipeline.
    pub fn handle_interest(&mut self, in_face: FaceId, mut interest: Interest, now: Instant) {
        self.metrics.interests_received.increment();

        if !interest.decrement_hop_limit() {
            self.metrics.packets_dropped.increment();
            return;
        }

        if Self::localhost_violation(&interest.name, self.is_local(in_face)) {
            self.metrics.packets_dropped.increment();
            return;
        }

        if self.dead_nonce_list.has(&interest.name, interest.nonce) {
            self.metrics.interests_looped.increment();
            self.send_nack_safe(in_face, Nack::new(interest, NackReason::Duplicate));
            return;
        }

        // Identity alone never creates a PIT entry (a CS hit must not leave
        // one behind, §4.7.1 step 6) — only `insert_or_update_in_record`
        // below does, once we know this is a miss.
        let identity = interest.identity();
        if let Some(entry) = self.pit.get(&identity) {
            let looped = entry
                .in_records()
                .any(|r| r.last_nonce == interest.nonce && r.face != in_face);
            if looped {
                self.metrics.interests_looped.increment();
                self.send_nack_safe(in_face, Nack::new(interest, NackReason::Duplicate));
                return;
            }
        }

        if let Some(data) = self.cs.find(&interest, now).cloned() {
            let ctx = StrategyContext { tree: &self.tree, fib: &self.fib };
            match self.strategy.after_content_store_hit(&ctx, in_face, &data) {
                AfterContentStoreHit::Defer => {
                    self.send_data_safe(in_face, data);
                }
                AfterContentStoreHit::Handled => {}
            }
            return;
        }

        self.metrics.pit_inserts.increment();
        self.pit.insert_or_update_in_record(&mut self.tree, in_face, &interest, now);
        self.metrics.pit_size.set(self.pit.len() as u64);

        let ctx = StrategyContext { tree: &self.tree, fib: &self.fib };
        let out_faces = self.strategy.after_receive_interest(&ctx, in_face, &interest);
        for out_face in out_faces {
            self.send_interest_out(&identity, out_face, interest.clone(), now);
        }
    }

    /// §4.7.2 outgoing Interest pipeline.
    fn send_interest_out(&mut self, identity: &ndnfd_common::packet::InterestIdentity, out_face: FaceId, interest: Interest, now: Instant) {
        self.pit.insert_or_update_out_record(&mut self.tree, out_face, &interest, now);
        if let Some(face) = self.face(out_face) {
            if face.send_interest(interest).is_ok() {
                self.metrics.interests_sent.increment();
                self.metrics.interests_forwarded.increment();
            } else {
                self.metrics.packets_dropped.increment();
            }
        }
        let _ = identity;
    }

    /// §4.7.3 incoming Data pipeline.
    pub fn handle_data(&mut self, in_face: FaceId, data: Data, now: Instant) {
        self.metrics.data_received.increment();

        if Self::localhost_violation(&data.name, self.is_local(in_face)) {
            self.metrics.packets_dropped.increment();
            return;
        }

        let matching = self.pit.find_matching(&data.name);
        if matching.is_empty() {
            let admit = match self.unsolicited_policy {
                UnsolicitedDataPolicyKind::DropAll => false,
                UnsolicitedDataPolicyKind::AdmitAll => true,
                UnsolicitedDataPolicyKind::AdmitLocal => self.is_local(in_face),
                UnsolicitedDataPolicyKind::AdmitNetwork => !self.is_local(in_face),
            };
            if admit {
                self.cs.insert(&mut self.tree, data, true, now);
                self.metrics.cs_inserts.increment();
            } else {
                self.metrics.data_unsolicited.increment();
                self.metrics.packets_dropped.increment();
            }
            return;
        }

        self.cs.insert(&mut self.tree, data.clone(), false, now);
        self.metrics.cs_inserts.increment();
        self.metrics.cs_size.set(self.cs.len() as u64);

        for identity in matching {
            let in_faces_to_send: Vec<FaceId> = {
                let Some(entry) = self.pit.get(&identity) else { continue };
                entry
                    .in_records()
                    .filter(|r| r.expiry > now)
                    .map(|r| r.face)
                    .collect()
            };

            // Record every in-record's nonce in the Dead-Nonce List before
            // deletion, so a subsequent duplicate is reliably caught (§5).
            if let Some(entry) = self.pit.get(&identity) {
                for record in entry.in_records() {
                    self.dead_nonce_list.add(&data.name, record.last_nonce, now);
                }
            }

            self.pit.start_straggler_timer(&identity, now);

            let ctx = StrategyContext { tree: &self.tree, fib: &self.fib };
            self.strategy.before_satisfy_interest(&ctx, in_face, &data);

            for face_id in in_faces_to_send {
                if face_id == in_face {
                    continue;
                }
                self.send_data_safe(face_id, data.clone());
                self.metrics.interests_satisfied.increment();
            }
        }
    }

    /// §4.7.4 incoming Nack pipeline.
    pub fn handle_nack(&mut self, in_face: FaceId, nack: Nack, now: Instant) {
        self.metrics.nacks_received.increment();
        let identity = nack.interest.identity();
        let Some(entry) = self.pit.get(&identity) else { return };
        let Some(out_record) = entry.get_out_record(in_face) else { return };
        if out_record.last_nonce != nack.nonce() {
            return; // stale Nack
        }
        if !self.pit.set_incoming_nack(&identity, in_face, nack.clone()) {
            return;
        }

        let ctx = StrategyContext { tree: &self.tree, fib: &self.fib };
        match self.strategy.after_receive_nack(&ctx, in_face, &nack) {
            NackAction::Propagate(reason) => {
                let in_faces: Vec<FaceId> = match self.pit.get(&identity) {
                    Some(e) => e.in_records().map(|r| r.face).collect(),
                    None => return,
                };
                for face_id in in_faces {
                    self.send_nack_safe(face_id, Nack::new(nack.interest.clone(), reason));
                    self.metrics.nacks_sent.increment();
                }
            }
            NackAction::Retransmit(faces) => {
                for face_id in faces {
                    let mut retry = nack.interest.clone();
                    retry.nonce = rand::random();
                    self.send_interest_out(&identity, face_id, retry, now);
                }
            }
            NackAction::Drop => {}
        }
    }

    /// §4.7.5 face-fail pipeline.
    pub fn fail_face(&mut self, face_id: FaceId) {
        self.fib.remove_face(&mut self.tree, face_id);
        self.pit.remove_face(&mut self.tree, face_id);
        if let Some(face) = self.faces.get(&face_id) {
            face.info().transition(FaceState::Failed);
            face.info().transition(FaceState::Closed);
        }
        self.faces.remove(&face_id);
    }

    /// Periodic maintenance: CS freshness sweep, Dead-Nonce List
    /// mark/adjust, and PIT timer expiry — the explicit-`now` stand-in for
    /// the scheduled timers of §5 (see DESIGN.md).
    pub fn tick(&mut self, now: Instant) {
        self.cs.tick(now);
        self.dead_nonce_list.tick(now);
        self.metrics.dead_nonce_size.set(self.dead_nonce_list.size() as u64);

        for (identity, reason) in self.pit.expired(now) {
            match reason {
                ExpiredReason::Unsatisfied => {
                    self.metrics.pit_expirations.increment();
                    self.pit.erase(&mut self.tree, &identity);
                }
                ExpiredReason::Straggler => {
                    self.pit.erase(&mut self.tree, &identity);
                }
            }
        }
        self.metrics.pit_size.set(self.pit.len() as u64);
        let _ = STRAGGLER_INTERVAL;
    }

    fn send_data_safe(&self, face_id: FaceId, data: Data) {
        if let Some(face) = self.face(face_id) {
            if face.send_data(data).is_err() {
                self.metrics.packets_dropped.increment();
            } else {
                self.metrics.data_sent.increment();
            }
        }
    }

    fn send_nack_safe(&self, face_id: FaceId, nack: Nack) {
        if let Some(face) = self.face(face_id) {
            let _ = face.send_nack(nack);
        }
    }

    /// Dispatches a management RPC (§6) and returns its status.
    pub fn handle_management(&mut self, request: ManagementRequest) -> ManagementResponse {
        match request {
            ManagementRequest::FibAddNextHop { name, face_id, cost } => {
                if !self.faces.contains_key(&face_id) {
                    return ManagementResponse::error(StatusCode::FaceNotFound, "no such face");
                }
                match self.fib.insert(&mut self.tree, &name) {
                    Ok((node, _)) => {
                        self.fib.add_next_hop(node, face_id, cost);
                        ManagementResponse::ok("next-hop added")
                    }
                    Err(_) => ManagementResponse::error(StatusCode::NameTooLong, "name exceeds max depth"),
                }
            }
            ManagementRequest::FibRemoveNextHop { name, face_id } => {
                if let Some(node) = self.tree.find_exact(&name) {
                    self.fib.remove_next_hop(&mut self.tree, node, face_id);
                    ManagementResponse::ok("next-hop removed")
                } else {
                    ManagementResponse::error(StatusCode::NotFound, "no FIB entry for name")
                }
            }
            ManagementRequest::FaceDestroy { face_id } => {
                if !self.faces.contains_key(&face_id) {
                    return ManagementResponse::error(StatusCode::FaceNotFound, "no such face");
                }
                self.fail_face(face_id);
                ManagementResponse::ok("face destroyed")
            }
            ManagementRequest::StrategyChoiceSet { name, strategy } => {
                self.strategy_choice.insert(name.to_string(), strategy);
                ManagementResponse::ok("strategy choice set")
            }
            ManagementRequest::StrategyChoiceUnset { name } => {
                self.strategy_choice.remove(&name.to_string());
                ManagementResponse::ok("strategy choice unset")
            }
            ManagementRequest::CsErase { prefix, count } => {
                let n = self.cs.erase(&mut self.tree, &prefix, count);
                ManagementResponse::ok(format!("erased {n} entries"))
            }
        }
    }

    pub fn next_face_id(&mut self) -> FaceId {
        let id = self.next_face_id;
        self.next_face_id += 1;
        id
    }

    pub fn fib(&self) -> &Fib {
        &self.fib
    }

    pub fn tree(&self) -> &NameTree {
        &self.tree
    }

    pub fn pit(&self) -> &Pit {
        &self.pit
    }

    pub fn cs(&self) -> &Cs {
        &self.cs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use ndnfd_common::name::Name;
    use ndnfd_common::Result as NdnResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct RecordingFace {
        info: FaceInfo,
        sent_data: Arc<AtomicUsize>,
        sent_nacks: Arc<AtomicUsize>,
        sent_interests: Arc<AtomicUsize>,
    }

    impl Face for RecordingFace {
        fn info(&self) -> &FaceInfo {
            &self.info
        }
        fn send_interest(&self, _interest: Interest) -> NdnResult<()> {
            self.sent_interests.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
        fn send_data(&self, _data: Data) -> NdnResult<()> {
            self.sent_data.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
        fn send_nack(&self, _nack: Nack) -> NdnResult<()> {
            self.sent_nacks.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn make_face(fwd: &mut Forwarder, scope: crate::face::Scope) -> (FaceId, Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let id = fwd.next_face_id();
        let data_count = Arc::new(AtomicUsize::new(0));
        let nack_count = Arc::new(AtomicUsize::new(0));
        let interest_count = Arc::new(AtomicUsize::new(0));
        let face = RecordingFace {
            info: FaceInfo::new(id, "test://local", "test://remote", scope, crate::face::Persistency::OnDemand, crate::face::LinkType::PointToPoint),
            sent_data: data_count.clone(),
            sent_nacks: nack_count.clone(),
            sent_interests: interest_count.clone(),
        };
        fwd.register_face(Box::new(face));
        (id, data_count, nack_count, interest_count)
    }

    #[test]
    fn cs_hit_answers_directly_without_forwarding() {
        let mut fwd = Forwarder::new(&NdnfdConfig::default());
        let now = Instant::now();
        let (downstream, data_sent, _, _) = make_face(&mut fwd, crate::face::Scope::NonLocal);
        fwd.cs.insert(&mut fwd.tree, Data::new(Name::from_str("/a"), Bytes::from_static(b"x")), false, now);
        let interest = Interest::new(Name::from_str("/a")).with_must_be_fresh(false);
        fwd.handle_interest(downstream, interest, now);
        assert_eq!(data_sent.load(Ordering::Relaxed), 1);
        assert!(fwd.pit().is_empty());
    }

    #[test]
    fn miss_forwards_via_fib_best_route() {
        let mut fwd = Forwarder::new(&NdnfdConfig::default());
        let now = Instant::now();
        let (downstream, _, _, _) = make_face(&mut fwd, crate::face::Scope::NonLocal);
        let (upstream, _, _, up_interests) = make_face(&mut fwd, crate::face::Scope::NonLocal);
        let (node, _) = fwd.fib.insert(&mut fwd.tree, &Name::from_str("/a")).unwrap();
        fwd.fib.add_next_hop(node, upstream, 10);
        let interest = Interest::new(Name::from_str("/a"));
        fwd.handle_interest(downstream, interest, now);
        assert_eq!(up_interests.load(Ordering::Relaxed), 1);
        assert_eq!(fwd.pit().len(), 1);
    }

    #[test]
    fn data_satisfies_pit_and_is_sent_downstream_not_upstream() {
        let mut fwd = Forwarder::new(&NdnfdConfig::default());
        let now = Instant::now();
        let (downstream, data_sent, _, _) = make_face(&mut fwd, crate::face::Scope::NonLocal);
        let (upstream, _, _, _) = make_face(&mut fwd, crate::face::Scope::NonLocal);
        let (node, _) = fwd.fib.insert(&mut fwd.tree, &Name::from_str("/a")).unwrap();
        fwd.fib.add_next_hop(node, upstream, 10);
        let interest = Interest::new(Name::from_str("/a"));
        fwd.handle_interest(downstream, interest, now);

        let data = Data::new(Name::from_str("/a"), Bytes::from_static(b"hi"));
        fwd.handle_data(upstream, data, now);
        assert_eq!(data_sent.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn dead_nonce_loop_is_nacked() {
        let mut fwd = Forwarder::new(&NdnfdConfig::default());
        let now = Instant::now();
        let (downstream, _, nacks, _) = make_face(&mut fwd, crate::face::Scope::NonLocal);
        let interest = Interest::new(Name::from_str("/a")).with_nonce(7);
        fwd.dead_nonce_list.add(&interest.name, interest.nonce, now);
        fwd.handle_interest(downstream, interest, now);
        assert_eq!(nacks.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn face_fail_cleans_up_fib_and_pit() {
        let mut fwd = Forwarder::new(&NdnfdConfig::default());
        let now = Instant::now();
        let (downstream, _, _, _) = make_face(&mut fwd, crate::face::Scope::NonLocal);
        let (upstream, _, _, _) = make_face(&mut fwd, crate::face::Scope::NonLocal);
        let (node, _) = fwd.fib.insert(&mut fwd.tree, &Name::from_str("/a")).unwrap();
        fwd.fib.add_next_hop(node, upstream, 10);
        let interest = Interest::new(Name::from_str("/a"));
        fwd.handle_interest(downstream, interest, now);
        fwd.fail_face(upstream);
        assert!(fwd.fib().find_exact(fwd.tree(), &Name::from_str("/a")).is_none());
    }
}
