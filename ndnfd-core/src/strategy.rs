//! The forwarding strategy interface (§2 component H, §4.7): hook points
//! the pipelines call into for forwarding decisions. This repository ships
//! one reference strategy, best-route, so the pipelines have something
//! concrete to call (§1 Non-goals — other strategies are out of scope).

use crate::face::FaceId;
use crate::fib::Fib;
use crate::name_tree::NameTree;
use ndnfd_common::packet::{Data, Interest, Nack};

/// Read-only view of the tables a strategy is allowed to consult. Strategies
/// never mutate tables directly — only the pipelines do, acting on the
/// decisions a strategy returns.
pub struct StrategyContext<'a> {
    pub tree: &'a NameTree,
    pub fib: &'a Fib,
}

/// What the pipeline should do after a CS hit, per strategy decision.
pub enum AfterContentStoreHit {
    /// Defer to the pipeline's default: send the Data back on the
    /// requesting face.
    Defer,
    /// The strategy has already handled dispatch; pipeline does nothing
    /// further.
    Handled,
}

pub enum NackAction {
    /// Propagate a Nack downstream with this reason.
    Propagate(ndnfd_common::packet::NackReason),
    /// Retransmit upstream with a fresh nonce on these faces.
    Retransmit(Vec<FaceId>),
    Drop,
}

pub trait Strategy: Send {
    fn after_content_store_hit(&mut self, _ctx: &StrategyContext, _face: FaceId, _data: &Data) -> AfterContentStoreHit {
        AfterContentStoreHit::Defer
    }

    /// Returns the upstream faces to forward `interest` to, excluding
    /// `incoming_face` implicitly (the pipeline filters it out regardless).
    fn after_receive_interest(&mut self, ctx: &StrategyContext, incoming_face: FaceId, interest: &Interest) -> Vec<FaceId>;

    fn before_satisfy_interest(&mut self, _ctx: &StrategyContext, _face: FaceId, _data: &Data) {}

    fn after_receive_nack(&mut self, _ctx: &StrategyContext, _face: FaceId, nack: &Nack) -> NackAction {
        NackAction::Propagate(nack.reason)
    }
}

/// Forwards to the single lowest-cost FIB next-hop for the Interest's name,
/// skipping the face the Interest arrived on.
#[derive(Default)]
pub struct BestRouteStrategy;

impl Strategy for BestRouteStrategy {
    fn after_receive_interest(&mut self, ctx: &StrategyContext, incoming_face: FaceId, interest: &Interest) -> Vec<FaceId> {
        let entry = ctx.fib.find_longest_prefix_match(ctx.tree, &interest.name);
        entry
            .best_next_hop()
            .filter(|&f| f != incoming_face)
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndnfd_common::name::Name;

    #[test]
    fn best_route_picks_lowest_cost_excluding_incoming_face() {
        let mut tree = NameTree::new();
        let mut fib = Fib::new();
        let (node, _) = fib.insert(&mut tree, &Name::from_str("/a")).unwrap();
        fib.add_next_hop(node, 1, 5);
        fib.add_next_hop(node, 2, 1);
        let ctx = StrategyContext { tree: &tree, fib: &fib };
        let mut strategy = BestRouteStrategy;
        let interest = Interest::new(Name::from_str("/a"));
        let out = strategy.after_receive_interest(&ctx, 99, &interest);
        assert_eq!(out, vec![2]);
    }

    #[test]
    fn best_route_excludes_incoming_face_even_if_cheapest() {
        let mut tree = NameTree::new();
        let mut fib = Fib::new();
        let (node, _) = fib.insert(&mut tree, &Name::from_str("/a")).unwrap();
        fib.add_next_hop(node, 1, 1);
        let ctx = StrategyContext { tree: &tree, fib: &fib };
        let mut strategy = BestRouteStrategy;
        let interest = Interest::new(Name::from_str("/a"));
        let out = strategy.after_receive_interest(&ctx, 1, &interest);
        assert!(out.is_empty());
    }
}
