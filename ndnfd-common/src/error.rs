//! Error types for the ndnfd implementation.

use thiserror::Error;

/// All possible errors that can occur within the ndnfd implementation.
#[derive(Error, Debug)]
pub enum Error {
    /// Error related to TLV encoding/decoding.
    #[error("TLV error: {0}")]
    Tlv(String),

    /// Error related to NDN packet processing.
    #[error("NDN packet error: {0}")]
    NdnPacket(String),

    /// Error related to NDNLP fragmentation/reassembly.
    #[error("NDNLP error: {0}")]
    Ndnlp(String),

    /// A name exceeded the configured maximum depth.
    #[error("name too long: {0} components (max {1})")]
    NameTooLong(usize, usize),

    /// Error related to face transport (QUIC, Ethernet, ...).
    #[error("face transport error: {0}")]
    Transport(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Other error: {0}")]
    Other(String),
}
