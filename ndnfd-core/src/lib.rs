//! The forwarding core: Name Tree, FIB, PIT, CS, Dead-Nonce List, the
//! Face/Strategy contracts, and the Forwarder that ties them together
//! (§2-§5 of the specification this crate implements).
//!
//! Kept single-threaded by construction: [`forwarder::Forwarder`] owns
//! every table directly and exposes only synchronous methods taking an
//! explicit `Instant` for "now" — callers (the `ndnfd` binary, or a test)
//! decide when time advances, rather than tables racing a background
//! clock.

pub mod cs;
pub mod dead_nonce_list;
pub mod face;
pub mod fib;
pub mod forwarder;
pub mod management;
pub mod name_tree;
pub mod network_region;
pub mod pit;
pub mod strategy;

pub use face::{Face, FaceId};
pub use forwarder::Forwarder;
