//! Management RPCs the core accepts from the management plane (§6). The
//! core only implements the *effect* of each verb; transport (a CLI, a
//! future RPC protocol) lives outside this crate.

use crate::face::FaceId;
use ndnfd_common::name::Name;

/// Status codes mirrored from NFD's management protocol (§6), numeric
/// values preserved so a future RPC transport can serialize them directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum StatusCode {
    Success = 200,
    Malformed = 400,
    NotAuthorized = 403,
    NotFound = 404,
    Conflict = 409,
    FaceNotFound = 410,
    NameTooLong = 414,
    InternalError = 504,
}

#[derive(Debug)]
pub enum ManagementRequest {
    FibAddNextHop { name: Name, face_id: FaceId, cost: u64 },
    FibRemoveNextHop { name: Name, face_id: FaceId },
    FaceDestroy { face_id: FaceId },
    StrategyChoiceSet { name: Name, strategy: String },
    StrategyChoiceUnset { name: Name },
    CsErase { prefix: Name, count: usize },
}

#[derive(Debug)]
pub struct ManagementResponse {
    pub status: StatusCode,
    pub message: String,
}

impl ManagementResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { status: StatusCode::Success, message: message.into() }
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }
}
