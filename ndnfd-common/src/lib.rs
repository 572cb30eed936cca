//! Wire types shared across the ndnfd workspace: names, Interest/Data/Nack
//! packets, the generic TLV codec, the NDNLP fragmentation format, metrics
//! primitives, and the recognized configuration tree.
//!
//! Kept deliberately free of any transport or table logic — those live in
//! `ndnfd-face` and `ndnfd-core` respectively — so that both can depend on a
//! single, stable definition of "what a packet is".

pub mod config;
pub mod error;
pub mod metrics;
pub mod name;
pub mod ndnlp;
pub mod packet;
pub mod rpc;
pub mod tlv;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
