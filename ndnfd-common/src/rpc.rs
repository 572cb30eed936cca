//! Wire types for the management control channel (§6). Out of the core's
//! scope by design — the core only exposes the *effect* of each verb
//! (`ndnfd_core::management`) — but the daemon and the CLI both need a
//! shared, serializable shape for the request/response that crosses the
//! process boundary, so it lives here alongside the other wire formats.
//!
//! Transported today as newline-delimited JSON over a Unix socket
//! (`ndnfd-cli`'s `--socket`, the daemon's `management.socket_path`); the
//! verbs and status codes are the stable part, the framing is not.

use serde::{Deserialize, Serialize};

/// One management verb (§6). Names/prefixes travel as their NDN URI string
/// form rather than a decoded `Name`, since the wire format here is JSON,
/// not TLV.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "verb", rename_all = "kebab-case")]
pub enum ControlRequest {
    FibAddNexthop { name: String, face_id: u64, cost: u64 },
    FibRemoveNexthop { name: String, face_id: u64 },
    FaceCreate { uri: String, persistency: String },
    FaceDestroy { face_id: u64 },
    StrategyChoiceSet { name: String, strategy: String },
    StrategyChoiceUnset { name: String },
    CsErase { prefix: String, count: usize },
}

/// Status codes mirrored from `ndnfd_core::management::StatusCode` (kept as
/// a plain `u16` here rather than re-exporting the core enum, since the
/// core is explicitly not a dependency of the wire format a third-party
/// client would parse).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub status: u16,
    pub message: String,
    /// Present only for `face-create`, carrying the newly assigned face id.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub face_id: Option<u64>,
}

impl ControlResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { status: 200, message: message.into(), face_id: None }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), face_id: None }
    }
}
