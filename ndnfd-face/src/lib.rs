//! QUIC-based transport `Face` implementation (§4.1).
//!
//! Wraps a `quinn` connection as an `ndnfd_core::face::Face`, carrying NDN
//! packets as NDNLP fragments over unreliable QUIC datagrams rather than
//! QUIC streams, so the fragmentation/reassembly machinery in
//! [`fragmentation`] actually has loss and reordering to contend with.

mod config;
mod face;
mod fragmentation;
mod transport;

pub use config::{ClientOptions, ServerOptions};
pub use face::{FaceEvent, FaceMessage, QuicFace, QuicFaceHandle};
pub use fragmentation::{PartialMessageStore, Slicer};
pub use transport::{FaceDialer, FaceListener, PendingFace};

/// Default QUIC port for NDN.
pub const NDN_QUIC_PORT: u16 = 6367;

/// ALPN protocol string identifying NDN-over-QUIC.
pub const NDN_QUIC_ALPN: &[u8] = b"ndn1";

/// Floor for the QUIC datagram receive buffer; per-face `mtu` (§4.1,
/// `face_system.*.mtu`) can raise it but never below this.
pub const MAX_DATAGRAM_SIZE: usize = 1200;
