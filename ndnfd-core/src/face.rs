//! The Face abstraction (§4.1): a bidirectional link-layer transport
//! endpoint as seen by the forwarding core. Concrete transports (QUIC,
//! Ethernet, ...) live in `ndnfd-face` and implement [`Face`]; the core
//! only ever holds a `Box<dyn Face>` behind a [`FaceId`].

use ndnfd_common::metrics::{Counter, Gauge};
use ndnfd_common::packet::{Data, Interest, Nack};
use ndnfd_common::Result;
use std::fmt;

pub type FaceId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    NonLocal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistency {
    OnDemand,
    Persistent,
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    PointToPoint,
    MultiAccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceState {
    Up,
    Down,
    Closing,
    Failed,
    Closed,
}

impl FaceState {
    /// Whether `self -> next` is one of the permitted transitions (§4.1).
    pub fn can_transition_to(self, next: FaceState) -> bool {
        use FaceState::*;
        matches!(
            (self, next),
            (Up, Down) | (Down, Up) | (Up, Closing) | (Up, Failed) | (Down, Closing) | (Down, Failed)
                | (Closing, Closed) | (Failed, Closed)
        )
    }
}

#[derive(Debug, Default)]
pub struct FaceCounters {
    pub in_interests: Counter,
    pub out_interests: Counter,
    pub in_data: Counter,
    pub out_data: Counter,
    pub in_nacks: Counter,
    pub out_nacks: Counter,
    pub in_bytes: Counter,
    pub out_bytes: Counter,
    pub dropped: Counter,
}

/// A Face's static identity and mutable state, independent of its
/// transport implementation — what the forwarder needs to know to route
/// and to answer `faces/list` management queries.
pub struct FaceInfo {
    pub id: FaceId,
    pub local_uri: String,
    pub remote_uri: String,
    pub scope: Scope,
    pub persistency: Persistency,
    pub link_type: LinkType,
    pub state: Gauge,
    pub counters: FaceCounters,
}

impl FaceInfo {
    pub fn new(
        id: FaceId,
        local_uri: impl Into<String>,
        remote_uri: impl Into<String>,
        scope: Scope,
        persistency: Persistency,
        link_type: LinkType,
    ) -> Self {
        let info = Self {
            id,
            local_uri: local_uri.into(),
            remote_uri: remote_uri.into(),
            scope,
            persistency,
            link_type,
            state: Gauge::new(),
            counters: FaceCounters::default(),
        };
        info.set_state(FaceState::Up);
        info
    }

    pub fn state(&self) -> FaceState {
        match self.state.value() {
            0 => FaceState::Up,
            1 => FaceState::Down,
            2 => FaceState::Closing,
            3 => FaceState::Failed,
            _ => FaceState::Closed,
        }
    }

    fn set_state(&self, state: FaceState) {
        let code = match state {
            FaceState::Up => 0,
            FaceState::Down => 1,
            FaceState::Closing => 2,
            FaceState::Failed => 3,
            FaceState::Closed => 4,
        };
        self.state.set(code);
    }

    /// Attempts the transition, returning `false` if it isn't permitted.
    pub fn transition(&self, next: FaceState) -> bool {
        if self.state().can_transition_to(next) {
            self.set_state(next);
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for FaceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaceInfo")
            .field("id", &self.id)
            .field("local_uri", &self.local_uri)
            .field("remote_uri", &self.remote_uri)
            .field("state", &self.state())
            .finish()
    }
}

/// Outbound half of the Face contract. Transports implement this; the
/// forwarder never talks to sockets directly (§5).
pub trait Face: Send {
    fn info(&self) -> &FaceInfo;

    fn send_interest(&self, interest: Interest) -> Result<()>;
    fn send_data(&self, data: Data) -> Result<()>;
    fn send_nack(&self, nack: Nack) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_transitions_follow_the_allowed_graph() {
        let info = FaceInfo::new(1, "quic://local", "quic://remote", Scope::NonLocal, Persistency::OnDemand, LinkType::PointToPoint);
        assert_eq!(info.state(), FaceState::Up);
        assert!(info.transition(FaceState::Down));
        assert!(info.transition(FaceState::Up));
        assert!(info.transition(FaceState::Failed));
        assert!(!info.transition(FaceState::Up));
        assert!(info.transition(FaceState::Closed));
        assert!(!info.transition(FaceState::Up));
    }
}
